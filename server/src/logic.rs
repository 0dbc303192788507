use syncboard_shared::{BoardId, ClientMessage, ParticipantId, RejectReason, ServerMessage};
use tracing::{debug, warn};

use crate::sessions::BoardRegistry;
use crate::state::PeerSender;

/// Per-socket state: the outbound channel and the board this socket has
/// joined, if any. A socket is on at most one board at a time.
pub struct Connection {
    pub tx: PeerSender,
    pub joined: Option<(BoardId, ParticipantId)>,
}

impl Connection {
    pub fn new(tx: PeerSender) -> Self {
        Self { tx, joined: None }
    }

    fn reply(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            debug!("reply dropped, socket already closing");
        }
    }

    fn participant_on(&self, board_id: &BoardId) -> Option<ParticipantId> {
        match &self.joined {
            Some((joined, participant)) if joined == board_id => Some(*participant),
            _ => None,
        }
    }
}

pub async fn apply_client_message(
    registry: &BoardRegistry,
    connection: &mut Connection,
    message: ClientMessage,
) {
    match message {
        ClientMessage::JoinBoard { board_id, user_id } => {
            let result = match connection.participant_on(&board_id) {
                Some(previous) => {
                    registry
                        .rejoin(board_id.clone(), previous, user_id, connection.tx.clone())
                        .await
                }
                None => {
                    disconnect(registry, connection).await;
                    registry
                        .join(board_id.clone(), user_id, connection.tx.clone())
                        .await
                }
            };
            match result {
                Ok(joined) => connection.joined = Some((board_id, joined.participant)),
                Err(error) => {
                    debug!(%error, "join refused");
                    connection.reply(ServerMessage::OperationRejected {
                        request_id: None,
                        reason: error.reject_reason(),
                    });
                }
            }
        }
        ClientMessage::LeaveBoard => disconnect(registry, connection).await,
        ClientMessage::Submit {
            board_id,
            request_id,
            operation,
        } => {
            let Some(participant) = connection.participant_on(&board_id) else {
                connection.reply(ServerMessage::OperationRejected {
                    request_id: Some(request_id),
                    reason: RejectReason::SessionNotFound,
                });
                return;
            };
            if let Err(error) = registry
                .submit(&board_id, participant, request_id, operation)
                .await
            {
                warn!(board = %board_id, %participant, %error, "submit without session");
                connection.reply(ServerMessage::OperationRejected {
                    request_id: Some(request_id),
                    reason: error.reject_reason(),
                });
            }
        }
        ClientMessage::CursorMove { board_id, point } => {
            if let Some(participant) = connection.participant_on(&board_id) {
                registry.update_cursor(&board_id, participant, point).await;
            }
        }
    }
}

/// Leaves the joined board, if any.
pub async fn disconnect(registry: &BoardRegistry, connection: &mut Connection) {
    if let Some((board_id, participant)) = connection.joined.take() {
        registry.leave(&board_id, participant).await;
    }
}

pub fn reject_unknown(connection: &Connection) {
    connection.reply(ServerMessage::OperationRejected {
        request_id: None,
        reason: RejectReason::UnknownMessage,
    });
}

#[cfg(test)]
#[path = "logic_test.rs"]
mod tests;
