use std::fmt;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub mod codec;
pub mod oplog;
pub mod wire;

pub use codec::{Brush, CapturedPath, EncodingError};
pub use oplog::{Applied, LogError, OperationLog, Refusal};

pub const MAX_ID_LEN: usize = 64;

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Globally unique without coordination: the creating client's random
/// origin plus its local counter.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StrokeId {
    pub origin: u64,
    pub seq: u64,
}

impl StrokeId {
    pub fn new(origin: u64, seq: u64) -> Self {
        Self { origin, seq }
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}-{}", self.origin, self.seq)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    /// Accepts 1..=64 chars of `[A-Za-z0-9_-]`.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value.len() <= MAX_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(value.to_string()))
    }

    pub fn is_valid(&self) -> bool {
        Self::parse(&self.0).is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= MAX_ID_LEN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

pub type Sequence = u64;
pub type RequestId = u64;

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    #[default]
    Normal,
    Erase,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Stroke {
    pub id: StrokeId,
    pub author: UserId,
    pub color: String,
    pub width: f32,
    pub mode: CompositeMode,
    pub points: Vec<Point>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EraseTarget {
    pub stroke: StrokeId,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Draw { stroke: Stroke },
    Erase { target: EraseTarget },
    Undo,
    Redo,
    Clear,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Draw { .. } => "draw",
            Operation::Erase { .. } => "erase",
            Operation::Undo => "undo",
            Operation::Redo => "redo",
            Operation::Clear => "clear",
        }
    }

    /// Draw, Erase and Clear change the live set and can be undone.
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Operation::Draw { .. } | Operation::Erase { .. } | Operation::Clear
        )
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct LoggedOperation {
    pub sequence: Sequence,
    pub author: UserId,
    pub operation: Operation,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq)]
pub struct BoardSnapshot {
    pub base: Vec<Stroke>,
    pub base_sequence: Sequence,
    pub operations: Vec<LoggedOperation>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct ParticipantInfo {
    pub participant: ParticipantId,
    pub user_id: UserId,
    pub cursor: Option<Point>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    MalformedOperation(String),
    DuplicateStroke,
    BoardFull,
    SessionNotFound,
    UnknownMessage,
    InvalidBoardId,
    InvalidUserId,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedOperation(detail) => write!(f, "malformed operation: {detail}"),
            RejectReason::DuplicateStroke => f.write_str("duplicate stroke"),
            RejectReason::BoardFull => f.write_str("board full"),
            RejectReason::SessionNotFound => f.write_str("session not found"),
            RejectReason::UnknownMessage => f.write_str("unknown message"),
            RejectReason::InvalidBoardId => f.write_str("invalid board id"),
            RejectReason::InvalidUserId => f.write_str("invalid user id"),
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    TargetNotFound,
    NothingToUndo,
    NothingToRedo,
    NothingToClear,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinBoard {
        board_id: BoardId,
        user_id: UserId,
    },
    LeaveBoard,
    Submit {
        board_id: BoardId,
        request_id: RequestId,
        operation: Operation,
    },
    CursorMove {
        board_id: BoardId,
        point: Point,
    },
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    BoardState {
        board_id: BoardId,
        you: ParticipantId,
        snapshot: BoardSnapshot,
        roster: Vec<ParticipantInfo>,
    },
    OperationAccepted {
        board_id: BoardId,
        entry: LoggedOperation,
    },
    OperationRejected {
        request_id: Option<RequestId>,
        reason: RejectReason,
    },
    Noop {
        request_id: RequestId,
        reason: NoopReason,
    },
    Compacted {
        board_id: BoardId,
        through: Sequence,
    },
    ParticipantJoined {
        participant: ParticipantInfo,
    },
    ParticipantLeft {
        participant: ParticipantId,
        user_id: UserId,
    },
    CursorMoved {
        participant: ParticipantId,
        user_id: UserId,
        point: Point,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::BoardState { .. } => "board_state",
            ServerMessage::OperationAccepted { .. } => "operation_accepted",
            ServerMessage::OperationRejected { .. } => "operation_rejected",
            ServerMessage::Noop { .. } => "noop",
            ServerMessage::Compacted { .. } => "compacted",
            ServerMessage::ParticipantJoined { .. } => "participant_joined",
            ServerMessage::ParticipantLeft { .. } => "participant_left",
            ServerMessage::CursorMoved { .. } => "cursor_moved",
        }
    }
}
