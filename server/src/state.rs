use std::sync::Arc;

use syncboard_shared::{BoardId, OperationLog, ServerMessage};
use tokio::sync::mpsc;

use crate::presence::Presence;
use crate::sessions::BoardRegistry;

pub const DEFAULT_COMPACT_AFTER: usize = 512;

pub type PeerSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BoardRegistry>,
}

impl AppState {
    pub fn new(compact_after: usize) -> Self {
        Self {
            registry: Arc::new(BoardRegistry::new(compact_after)),
        }
    }
}

/// Live state of one board. Only ever touched while holding the board's
/// session lock, which serializes every operation on that board.
pub struct BoardSession {
    pub board_id: BoardId,
    pub log: OperationLog,
    pub presence: Presence,
    /// Set when the last participant left; a closed session is never reused.
    pub closed: bool,
}

impl BoardSession {
    pub fn new(board_id: BoardId) -> Self {
        Self {
            board_id,
            log: OperationLog::new(),
            presence: Presence::default(),
            closed: false,
        }
    }
}
