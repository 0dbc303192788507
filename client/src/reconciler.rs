//! Client-side view of a board: a replica of the server's operation log
//! plus the local edits that are still waiting for a verdict.
//!
//! Local draws and erases are shown immediately. Each one is tracked until
//! the server's broadcast of the same stroke id settles it, or a rejection
//! or no-op for its request id rolls it back. Undo, redo and clear are
//! never predicted; the replica applies them when the server's entry arrives.

use syncboard_shared::codec::{self, EncodingError};
use syncboard_shared::{
    BoardId, CapturedPath, ClientMessage, EraseTarget, LoggedOperation, Operation, OperationLog,
    ParticipantId, Point, RejectReason, RequestId, ServerMessage, Stroke, StrokeId, UserId,
};
use tracing::{debug, warn};

use crate::geometry::topmost_hit;
use crate::presence::Roster;

/// Drawing surface the reconciler paints on.
pub trait Renderer {
    fn clear(&mut self);
    fn draw_stroke(&mut self, stroke: &Stroke);
    fn draw_cursor(&mut self, label: &str, point: Point);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Disconnected,
    Joining,
    Synced,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("not synced with the board")]
    NotSynced,
}

#[derive(Debug, Clone)]
enum Pending {
    Draw(Stroke),
    Erase(StrokeId),
}

#[derive(Debug, Clone)]
struct InFlight {
    request_id: RequestId,
    pending: Pending,
}

pub struct Reconciler<R> {
    renderer: R,
    board_id: BoardId,
    user_id: UserId,
    origin: u64,
    next_stroke: u64,
    next_request: RequestId,
    status: SyncStatus,
    me: Option<ParticipantId>,
    replica: OperationLog,
    in_flight: Vec<InFlight>,
    roster: Roster,
}

impl<R: Renderer> Reconciler<R> {
    pub fn new(renderer: R, board_id: BoardId, user_id: UserId, origin: u64) -> Self {
        Self {
            renderer,
            board_id,
            user_id,
            origin,
            next_stroke: 1,
            next_request: 1,
            status: SyncStatus::Disconnected,
            me: None,
            replica: OperationLog::new(),
            in_flight: Vec::new(),
            roster: Roster::default(),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn me(&self) -> Option<ParticipantId> {
        self.me
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn replica(&self) -> &OperationLog {
        &self.replica
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn pending_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Starts (or restarts) synchronization. The caller sends the returned
    /// message once the socket is open.
    pub fn join(&mut self) -> ClientMessage {
        self.status = SyncStatus::Joining;
        ClientMessage::JoinBoard {
            board_id: self.board_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Rolls back every unacknowledged edit. The server may or may not have
    /// seen them; the snapshot sent on the next join decides.
    pub fn on_disconnected(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(pending = self.in_flight.len(), "dropping in-flight edits");
        }
        self.status = SyncStatus::Disconnected;
        self.me = None;
        self.in_flight.clear();
        self.roster.clear();
        self.redraw();
    }

    /// Finishes a local stroke: shows it at once and returns the submission.
    pub fn complete_stroke(&mut self, path: CapturedPath) -> Result<ClientMessage, ReconcileError> {
        self.ensure_synced()?;
        let id = StrokeId::new(self.origin, self.next_stroke);
        let stroke = codec::encode(path, id, self.user_id.clone())?;
        self.next_stroke += 1;
        self.renderer.draw_stroke(&stroke);
        Ok(self.track(
            Pending::Draw(stroke.clone()),
            Operation::Draw { stroke },
        ))
    }

    /// Erases the topmost visible stroke under `point`, if any.
    pub fn erase_at(&mut self, point: Point) -> Result<Option<ClientMessage>, ReconcileError> {
        self.ensure_synced()?;
        match topmost_hit(&self.visible_strokes(), point) {
            Some(id) => self.erase(id).map(Some),
            None => Ok(None),
        }
    }

    pub fn erase(&mut self, id: StrokeId) -> Result<ClientMessage, ReconcileError> {
        self.ensure_synced()?;
        let message = self.track(
            Pending::Erase(id),
            Operation::Erase {
                target: EraseTarget { stroke: id },
            },
        );
        self.redraw();
        Ok(message)
    }

    pub fn undo(&mut self) -> Result<ClientMessage, ReconcileError> {
        self.request(Operation::Undo)
    }

    pub fn redo(&mut self) -> Result<ClientMessage, ReconcileError> {
        self.request(Operation::Redo)
    }

    pub fn clear(&mut self) -> Result<ClientMessage, ReconcileError> {
        self.request(Operation::Clear)
    }

    pub fn cursor_move(&self, point: Point) -> Option<ClientMessage> {
        if self.status != SyncStatus::Synced || !point.is_finite() {
            return None;
        }
        Some(ClientMessage::CursorMove {
            board_id: self.board_id.clone(),
            point,
        })
    }

    /// Folds a server message into the local view. A returned message must be
    /// sent back; it is always a fresh join after the replica lost sync.
    pub fn handle(&mut self, message: ServerMessage) -> Option<ClientMessage> {
        match message {
            ServerMessage::BoardState {
                board_id,
                you,
                snapshot,
                roster,
            } => {
                if board_id != self.board_id {
                    return None;
                }
                let replica = match OperationLog::from_snapshot(snapshot) {
                    Ok(replica) => replica,
                    Err(error) => {
                        warn!(%error, "snapshot does not replay");
                        return Some(self.resync());
                    }
                };
                self.replica = replica;
                self.me = Some(you);
                self.roster.reset(roster);
                self.status = SyncStatus::Synced;
                debug!(
                    board = %self.board_id,
                    last_sequence = self.replica.last_sequence(),
                    "synced"
                );
                self.redraw();
                None
            }
            ServerMessage::OperationAccepted { board_id, entry } => {
                if board_id != self.board_id || self.status != SyncStatus::Synced {
                    return None;
                }
                self.accept(entry)
            }
            ServerMessage::OperationRejected { request_id, reason } => {
                warn!(?request_id, %reason, "operation rejected");
                if reason == RejectReason::SessionNotFound {
                    return Some(self.resync());
                }
                if let Some(request_id) = request_id {
                    self.settle_request(request_id);
                }
                None
            }
            ServerMessage::Noop { request_id, reason } => {
                debug!(request_id, ?reason, "operation had no effect");
                self.settle_request(request_id);
                None
            }
            ServerMessage::Compacted { board_id, through } => {
                if board_id != self.board_id || self.status != SyncStatus::Synced {
                    return None;
                }
                match self.replica.compact_through(through) {
                    Ok(()) => None,
                    Err(error) => {
                        warn!(%error, "compaction out of step");
                        Some(self.resync())
                    }
                }
            }
            ServerMessage::ParticipantJoined { participant } => {
                self.roster.joined(participant);
                self.redraw();
                None
            }
            ServerMessage::ParticipantLeft { participant, .. } => {
                if self.roster.left(participant) {
                    self.redraw();
                }
                None
            }
            ServerMessage::CursorMoved {
                participant,
                user_id,
                point,
            } => {
                if Some(participant) != self.me {
                    self.roster.cursor_moved(participant, user_id, point);
                    self.redraw();
                }
                None
            }
        }
    }

    /// Confirmed strokes in log order with local predictions layered on top.
    pub fn visible_strokes(&self) -> Vec<Stroke> {
        let erasing = |id: StrokeId| {
            self.in_flight
                .iter()
                .any(|flight| matches!(flight.pending, Pending::Erase(target) if target == id))
        };
        let mut strokes: Vec<Stroke> = self
            .replica
            .live()
            .iter()
            .filter(|stroke| !erasing(stroke.id))
            .cloned()
            .collect();
        for flight in &self.in_flight {
            if let Pending::Draw(stroke) = &flight.pending {
                if !erasing(stroke.id) && !self.replica.is_live(stroke.id) {
                    strokes.push(stroke.clone());
                }
            }
        }
        strokes
    }

    pub fn redraw(&mut self) {
        let strokes = self.visible_strokes();
        self.renderer.clear();
        for stroke in &strokes {
            self.renderer.draw_stroke(stroke);
        }
        let me = self.me;
        for (participant, user_id, point) in self.roster.cursors() {
            if Some(participant) != me {
                self.renderer.draw_cursor(user_id.as_str(), point);
            }
        }
    }

    fn ensure_synced(&self) -> Result<(), ReconcileError> {
        if self.status == SyncStatus::Synced {
            Ok(())
        } else {
            Err(ReconcileError::NotSynced)
        }
    }

    fn next_request_id(&mut self) -> RequestId {
        let request_id = self.next_request;
        self.next_request += 1;
        request_id
    }

    fn submission(&self, request_id: RequestId, operation: Operation) -> ClientMessage {
        ClientMessage::Submit {
            board_id: self.board_id.clone(),
            request_id,
            operation,
        }
    }

    fn track(&mut self, pending: Pending, operation: Operation) -> ClientMessage {
        let request_id = self.next_request_id();
        self.in_flight.push(InFlight {
            request_id,
            pending,
        });
        self.submission(request_id, operation)
    }

    fn request(&mut self, operation: Operation) -> Result<ClientMessage, ReconcileError> {
        self.ensure_synced()?;
        let request_id = self.next_request_id();
        Ok(self.submission(request_id, operation))
    }

    // Predictions are dropped on resync. Edits the server did accept come
    // back as broadcasts after the new snapshot.
    fn resync(&mut self) -> ClientMessage {
        self.in_flight.clear();
        self.redraw();
        self.join()
    }

    fn accept(&mut self, entry: LoggedOperation) -> Option<ClientMessage> {
        let settled = match &entry.operation {
            Operation::Draw { stroke } => Some(stroke.id),
            Operation::Erase { target } => Some(target.stroke),
            _ => None,
        };
        let is_draw = matches!(entry.operation, Operation::Draw { .. });
        match self.replica.apply(entry) {
            Ok(_) => {
                if let Some(id) = settled {
                    self.in_flight.retain(|flight| match &flight.pending {
                        Pending::Draw(stroke) => !(is_draw && stroke.id == id),
                        Pending::Erase(target) => is_draw || *target != id,
                    });
                }
                self.redraw();
                None
            }
            Err(error) => {
                warn!(%error, "replica out of step, rejoining");
                Some(self.resync())
            }
        }
    }

    fn settle_request(&mut self, request_id: RequestId) {
        let before = self.in_flight.len();
        self.in_flight
            .retain(|flight| flight.request_id != request_id);
        if self.in_flight.len() != before {
            self.redraw();
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
