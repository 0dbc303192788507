//! Roster and cursor tracking for one board. Advisory only: nothing here
//! touches the operation log.

use std::collections::BTreeMap;

use syncboard_shared::{ParticipantId, ParticipantInfo, Point, ServerMessage, UserId};
use tracing::debug;

use crate::state::PeerSender;

pub struct Participant {
    pub user_id: UserId,
    pub cursor: Option<Point>,
    pub tx: PeerSender,
}

#[derive(Default)]
pub struct Presence {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl Presence {
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.participants.contains_key(&participant)
    }

    pub fn user_id(&self, participant: ParticipantId) -> Option<&UserId> {
        self.participants
            .get(&participant)
            .map(|entry| &entry.user_id)
    }

    pub fn roster(&self) -> Vec<ParticipantInfo> {
        self.participants
            .iter()
            .map(|(id, entry)| ParticipantInfo {
                participant: *id,
                user_id: entry.user_id.clone(),
                cursor: entry.cursor,
            })
            .collect()
    }

    /// Announces the newcomer to everyone already present, then adds it.
    pub fn insert(&mut self, participant: ParticipantId, user_id: UserId, tx: PeerSender) {
        let info = ParticipantInfo {
            participant,
            user_id: user_id.clone(),
            cursor: None,
        };
        self.broadcast(
            &ServerMessage::ParticipantJoined { participant: info },
            None,
        );
        self.participants.insert(
            participant,
            Participant {
                user_id,
                cursor: None,
                tx,
            },
        );
    }

    /// Removes the participant and tells the rest of the board.
    pub fn remove(&mut self, participant: ParticipantId) -> Option<Participant> {
        let removed = self.participants.remove(&participant)?;
        self.broadcast(
            &ServerMessage::ParticipantLeft {
                participant,
                user_id: removed.user_id.clone(),
            },
            None,
        );
        Some(removed)
    }

    /// Records the position and relays it to the other participants.
    /// Unknown participants are ignored.
    pub fn move_cursor(&mut self, participant: ParticipantId, point: Point) -> bool {
        let Some(entry) = self.participants.get_mut(&participant) else {
            return false;
        };
        entry.cursor = Some(point);
        let message = ServerMessage::CursorMoved {
            participant,
            user_id: entry.user_id.clone(),
            point,
        };
        self.broadcast(&message, Some(participant));
        true
    }

    pub fn send_to(&self, participant: ParticipantId, message: ServerMessage) {
        if let Some(entry) = self.participants.get(&participant) {
            if entry.tx.send(message).is_err() {
                debug!(%participant, "peer channel closed");
            }
        }
    }

    pub fn broadcast(&self, message: &ServerMessage, except: Option<ParticipantId>) {
        for (id, entry) in &self.participants {
            if Some(*id) == except {
                continue;
            }
            if entry.tx.send(message.clone()).is_err() {
                debug!(participant = %id, kind = message.kind(), "peer channel closed");
            }
        }
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
