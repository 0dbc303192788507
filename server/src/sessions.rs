//! Board session registry: one session per active board id.
//!
//! Every join, leave, submit and cursor move for a board runs while holding
//! that board's session mutex, so sequence assignment and fan-out happen in
//! one critical section and every peer sees accepted operations in log order.
//! Different boards never share a lock beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use syncboard_shared::{
    BoardId, BoardSnapshot, LoggedOperation, NoopReason, Operation, ParticipantId,
    ParticipantInfo, Point, Refusal, RejectReason, RequestId, ServerMessage, UserId,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::state::{BoardSession, PeerSender};

pub type SharedSession = Arc<Mutex<BoardSession>>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no active session for board {0}")]
    SessionNotFound(BoardId),
    #[error("participant {participant} is not on board {board_id}")]
    NotParticipant {
        board_id: BoardId,
        participant: ParticipantId,
    },
    #[error("invalid board id")]
    InvalidBoardId,
    #[error("invalid user id")]
    InvalidUserId,
}

impl SessionError {
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            Self::SessionNotFound(_) | Self::NotParticipant { .. } => RejectReason::SessionNotFound,
            Self::InvalidBoardId => RejectReason::InvalidBoardId,
            Self::InvalidUserId => RejectReason::InvalidUserId,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted(LoggedOperation),
    Rejected(RejectReason),
    Noop(NoopReason),
}

#[derive(Debug, Clone)]
pub struct Joined {
    pub participant: ParticipantId,
    pub snapshot: BoardSnapshot,
    pub roster: Vec<ParticipantInfo>,
}

pub struct BoardRegistry {
    boards: RwLock<HashMap<BoardId, SharedSession>>,
    next_participant: AtomicU64,
    compact_after: usize,
}

impl BoardRegistry {
    /// `compact_after` of 0 disables compaction.
    pub fn new(compact_after: usize) -> Self {
        Self {
            boards: RwLock::new(HashMap::new()),
            next_participant: AtomicU64::new(1),
            compact_after,
        }
    }

    pub async fn session(&self, board_id: &BoardId) -> Option<SharedSession> {
        self.boards.read().await.get(board_id).cloned()
    }

    pub async fn board_count(&self) -> usize {
        self.boards.read().await.len()
    }

    /// Adds a participant to the board, creating the session on first join.
    /// The joiner receives `board_state` before any later broadcast.
    pub async fn join(
        &self,
        board_id: BoardId,
        user_id: UserId,
        tx: PeerSender,
    ) -> Result<Joined, SessionError> {
        self.enter(board_id, user_id, tx, None).await
    }

    /// Re-join from a connection already on the board: the old participant
    /// is swapped for a new one under the same lock, so the session never
    /// empties and its log survives.
    pub async fn rejoin(
        &self,
        board_id: BoardId,
        previous: ParticipantId,
        user_id: UserId,
        tx: PeerSender,
    ) -> Result<Joined, SessionError> {
        self.enter(board_id, user_id, tx, Some(previous)).await
    }

    async fn enter(
        &self,
        board_id: BoardId,
        user_id: UserId,
        tx: PeerSender,
        replacing: Option<ParticipantId>,
    ) -> Result<Joined, SessionError> {
        if !board_id.is_valid() {
            return Err(SessionError::InvalidBoardId);
        }
        if !user_id.is_valid() {
            return Err(SessionError::InvalidUserId);
        }
        let participant = ParticipantId(self.next_participant.fetch_add(1, Ordering::Relaxed));

        loop {
            let session = self.get_or_create(&board_id).await;
            let mut guard = session.lock().await;
            if guard.closed {
                drop(guard);
                self.replace_closed(&board_id, &session).await;
                continue;
            }

            if let Some(previous) = replacing {
                if guard.presence.remove(previous).is_some() {
                    debug!(board = %board_id, %previous, %participant, "participant replaced");
                }
            }
            guard
                .presence
                .insert(participant, user_id.clone(), tx.clone());
            let joined = Joined {
                participant,
                snapshot: guard.log.snapshot(),
                roster: guard.presence.roster(),
            };
            guard.presence.send_to(
                participant,
                ServerMessage::BoardState {
                    board_id: board_id.clone(),
                    you: participant,
                    snapshot: joined.snapshot.clone(),
                    roster: joined.roster.clone(),
                },
            );
            info!(
                board = %board_id,
                %participant,
                user = %user_id,
                peers = guard.presence.len(),
                sequence = guard.log.last_sequence(),
                "participant joined"
            );
            return Ok(joined);
        }
    }

    /// Removes the participant. The last one out closes the session and
    /// drops it from the registry. Never touches the operation log.
    pub async fn leave(&self, board_id: &BoardId, participant: ParticipantId) -> bool {
        let Some(session) = self.session(board_id).await else {
            return false;
        };
        let close = {
            let mut guard = session.lock().await;
            let Some(removed) = guard.presence.remove(participant) else {
                return false;
            };
            info!(
                board = %board_id,
                %participant,
                user = %removed.user_id,
                peers = guard.presence.len(),
                "participant left"
            );
            if guard.presence.is_empty() {
                guard.closed = true;
            }
            guard.closed
        };
        if close {
            let mut boards = self.boards.write().await;
            if boards
                .get(board_id)
                .is_some_and(|current| Arc::ptr_eq(current, &session))
            {
                boards.remove(board_id);
                info!(board = %board_id, "session closed");
            }
        }
        true
    }

    /// Validates and, if applicable, appends the operation to the board's
    /// log, then broadcasts it to every participant including the submitter.
    /// Refusals are answered to the submitter only.
    pub async fn submit(
        &self,
        board_id: &BoardId,
        participant: ParticipantId,
        request_id: RequestId,
        operation: Operation,
    ) -> Result<SubmitOutcome, SessionError> {
        let session = self
            .session(board_id)
            .await
            .ok_or_else(|| SessionError::SessionNotFound(board_id.clone()))?;
        let mut guard = session.lock().await;
        let Some(author) = guard.presence.user_id(participant).cloned() else {
            return Err(SessionError::NotParticipant {
                board_id: board_id.clone(),
                participant,
            });
        };

        let kind = operation.name();
        match guard.log.submit(author, operation) {
            Ok(entry) => {
                debug!(board = %board_id, %participant, sequence = entry.sequence, kind, "accepted");
                guard.presence.broadcast(
                    &ServerMessage::OperationAccepted {
                        board_id: board_id.clone(),
                        entry: entry.clone(),
                    },
                    None,
                );
                self.maybe_compact(&mut guard);
                Ok(SubmitOutcome::Accepted(entry))
            }
            Err(Refusal::Rejected(reason)) => {
                debug!(board = %board_id, %participant, kind, %reason, "rejected");
                guard.presence.send_to(
                    participant,
                    ServerMessage::OperationRejected {
                        request_id: Some(request_id),
                        reason: reason.clone(),
                    },
                );
                Ok(SubmitOutcome::Rejected(reason))
            }
            Err(Refusal::Noop(reason)) => {
                debug!(board = %board_id, %participant, kind, ?reason, "no-op");
                guard
                    .presence
                    .send_to(participant, ServerMessage::Noop { request_id, reason });
                Ok(SubmitOutcome::Noop(reason))
            }
        }
    }

    /// Best effort: silently dropped when the board or participant is gone.
    pub async fn update_cursor(&self, board_id: &BoardId, participant: ParticipantId, point: Point) {
        if !point.is_finite() {
            return;
        }
        let Some(session) = self.session(board_id).await else {
            return;
        };
        session.lock().await.presence.move_cursor(participant, point);
    }

    fn maybe_compact(&self, session: &mut BoardSession) {
        if self.compact_after == 0 || session.log.len() < self.compact_after {
            return;
        }
        session.log.compact();
        let through = session.log.last_sequence();
        info!(board = %session.board_id, through, "operation log compacted");
        session.presence.broadcast(
            &ServerMessage::Compacted {
                board_id: session.board_id.clone(),
                through,
            },
            None,
        );
    }

    async fn get_or_create(&self, board_id: &BoardId) -> SharedSession {
        if let Some(session) = self.session(board_id).await {
            return session;
        }
        let mut boards = self.boards.write().await;
        boards
            .entry(board_id.clone())
            .or_insert_with(|| {
                info!(board = %board_id, "creating session");
                Arc::new(Mutex::new(BoardSession::new(board_id.clone())))
            })
            .clone()
    }

    async fn replace_closed(&self, board_id: &BoardId, closed: &SharedSession) {
        let mut boards = self.boards.write().await;
        if boards
            .get(board_id)
            .is_some_and(|current| Arc::ptr_eq(current, closed))
        {
            boards.insert(
                board_id.clone(),
                Arc::new(Mutex::new(BoardSession::new(board_id.clone()))),
            );
        }
    }
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
