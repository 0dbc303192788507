//! Append-only operation log with a single shared undo pointer.
//!
//! The server owns the authoritative log and grows it through [`OperationLog::submit`].
//! Clients keep a replica that only grows through [`OperationLog::apply`], fed
//! with the entries the server broadcast, so both ends run the same state
//! transitions and end up with the same live set.
//!
//! Edits (Draw, Erase, Clear) form the undoable stream. `undone` counts how
//! many edits at the tail of that stream are currently undone. A new edit
//! while `undone > 0` truncates the undone tail for everyone on the board.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::{
    BoardSnapshot, LoggedOperation, NoopReason, Operation, RejectReason, Sequence, Stroke,
    StrokeId, UserId,
};

pub const MAX_LIVE_STROKES: usize = 2000;

/// Why a submitted operation did not enter the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    Rejected(RejectReason),
    Noop(NoopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Committed,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: Sequence, got: Sequence },
    #[error("replica diverged at sequence {sequence}: {operation} is not applicable")]
    Diverged {
        sequence: Sequence,
        operation: &'static str,
    },
    #[error("compaction at {through} does not match last applied sequence {last}")]
    CompactionMismatch { through: Sequence, last: Sequence },
}

#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    base: Vec<Stroke>,
    base_sequence: Sequence,
    entries: Vec<LoggedOperation>,
    // Indices into `entries` of the edits still reachable by undo/redo.
    edits: Vec<usize>,
    undone: usize,
    live: Vec<Stroke>,
    drawn: HashSet<StrokeId>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from a snapshot by replaying its operations on top of
    /// the compacted base.
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Result<Self, LogError> {
        let mut log = Self {
            drawn: snapshot.base.iter().map(|stroke| stroke.id).collect(),
            live: snapshot.base.clone(),
            base: snapshot.base,
            base_sequence: snapshot.base_sequence,
            ..Self::default()
        };
        for entry in snapshot.operations {
            log.apply(entry)?;
        }
        Ok(log)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            base: self.base.clone(),
            base_sequence: self.base_sequence,
            operations: self.entries.clone(),
        }
    }

    /// Sequence of the last operation folded into this log, 0 for a fresh board.
    pub fn last_sequence(&self) -> Sequence {
        self.entries
            .last()
            .map_or(self.base_sequence, |entry| entry.sequence)
    }

    pub fn live(&self) -> &[Stroke] {
        &self.live
    }

    pub fn is_live(&self, id: StrokeId) -> bool {
        self.live.iter().any(|stroke| stroke.id == id)
    }

    pub fn entries(&self) -> &[LoggedOperation] {
        &self.entries
    }

    /// Entries appended since the last compaction.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undone
    }

    pub fn can_undo(&self) -> bool {
        self.edits.len() > self.undone
    }

    pub fn can_redo(&self) -> bool {
        self.undone > 0
    }

    /// Validates `operation` against the current state and, if it is
    /// applicable, commits it under the next sequence number.
    pub fn submit(
        &mut self,
        author: UserId,
        operation: Operation,
    ) -> Result<LoggedOperation, Refusal> {
        self.check(&operation)?;
        let entry = LoggedOperation {
            sequence: self.last_sequence() + 1,
            author,
            operation,
        };
        self.commit(entry.clone());
        Ok(entry)
    }

    /// Applies an entry accepted by the authoritative log. Entries at or
    /// below the last applied sequence are ignored.
    pub fn apply(&mut self, entry: LoggedOperation) -> Result<Applied, LogError> {
        let last = self.last_sequence();
        if entry.sequence <= last {
            trace!(sequence = entry.sequence, last, "duplicate entry ignored");
            return Ok(Applied::Duplicate);
        }
        if entry.sequence != last + 1 {
            return Err(LogError::SequenceGap {
                expected: last + 1,
                got: entry.sequence,
            });
        }
        let applicable = match &entry.operation {
            Operation::Undo => self.can_undo(),
            Operation::Redo => self.can_redo(),
            _ => true,
        };
        if !applicable {
            return Err(LogError::Diverged {
                sequence: entry.sequence,
                operation: entry.operation.name(),
            });
        }
        self.commit(entry);
        Ok(Applied::Committed)
    }

    /// Folds the visible state into a new base and drops the history window.
    /// Undo and redo cannot cross a compaction boundary.
    pub fn compact(&mut self) {
        let through = self.last_sequence();
        debug!(through, entries = self.entries.len(), "compacting operation log");
        self.base = self.live.clone();
        self.base_sequence = through;
        self.entries.clear();
        self.edits.clear();
        self.undone = 0;
        self.drawn = self.base.iter().map(|stroke| stroke.id).collect();
    }

    /// Replica side of [`OperationLog::compact`].
    pub fn compact_through(&mut self, through: Sequence) -> Result<(), LogError> {
        let last = self.last_sequence();
        if last != through {
            return Err(LogError::CompactionMismatch { through, last });
        }
        self.compact();
        Ok(())
    }

    fn check(&self, operation: &Operation) -> Result<(), Refusal> {
        match operation {
            Operation::Draw { stroke } => {
                crate::codec::validate(stroke).map_err(|error| {
                    Refusal::Rejected(RejectReason::MalformedOperation(error.to_string()))
                })?;
                if self.drawn.contains(&stroke.id) {
                    return Err(Refusal::Rejected(RejectReason::DuplicateStroke));
                }
                if self.live.len() >= MAX_LIVE_STROKES {
                    return Err(Refusal::Rejected(RejectReason::BoardFull));
                }
            }
            Operation::Erase { target } => {
                if !self.is_live(target.stroke) {
                    return Err(Refusal::Noop(NoopReason::TargetNotFound));
                }
            }
            Operation::Undo => {
                if !self.can_undo() {
                    return Err(Refusal::Noop(NoopReason::NothingToUndo));
                }
            }
            Operation::Redo => {
                if !self.can_redo() {
                    return Err(Refusal::Noop(NoopReason::NothingToRedo));
                }
            }
            Operation::Clear => {
                if self.live.is_empty() {
                    return Err(Refusal::Noop(NoopReason::NothingToClear));
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, entry: LoggedOperation) {
        trace!(sequence = entry.sequence, operation = entry.operation.name(), "commit");
        match entry.operation {
            Operation::Undo => {
                self.undone += 1;
                self.entries.push(entry);
                self.rebuild_live();
            }
            Operation::Redo => {
                let redone = self.edits[self.edits.len() - self.undone];
                self.undone -= 1;
                self.entries.push(entry);
                fold(&mut self.live, &self.entries[redone].operation);
            }
            _ => {
                if self.undone > 0 {
                    debug!(
                        discarded = self.undone,
                        sequence = entry.sequence,
                        "new edit truncates redo tail"
                    );
                    let keep = self.edits.len() - self.undone;
                    self.edits.truncate(keep);
                    self.undone = 0;
                }
                if let Operation::Draw { stroke } = &entry.operation {
                    self.drawn.insert(stroke.id);
                }
                fold(&mut self.live, &entry.operation);
                self.edits.push(self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn rebuild_live(&mut self) {
        let mut live = self.base.clone();
        let applied = self.edits.len() - self.undone;
        for &index in &self.edits[..applied] {
            fold(&mut live, &self.entries[index].operation);
        }
        self.live = live;
    }
}

fn fold(live: &mut Vec<Stroke>, operation: &Operation) {
    match operation {
        Operation::Draw { stroke } => live.push(stroke.clone()),
        Operation::Erase { target } => live.retain(|stroke| stroke.id != target.stroke),
        Operation::Clear => live.clear(),
        Operation::Undo | Operation::Redo => {}
    }
}

#[cfg(test)]
#[path = "oplog_test.rs"]
mod tests;
