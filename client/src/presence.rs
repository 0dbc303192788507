use syncboard_shared::{ParticipantId, ParticipantInfo, Point, UserId};

/// Who else is on the board and where their pointers are. Display only.
#[derive(Debug, Default)]
pub struct Roster {
    participants: Vec<ParticipantInfo>,
}

impl Roster {
    pub fn reset(&mut self, participants: Vec<ParticipantInfo>) {
        self.participants = participants;
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn joined(&mut self, info: ParticipantInfo) {
        self.left(info.participant);
        self.participants.push(info);
    }

    pub fn left(&mut self, participant: ParticipantId) -> bool {
        let before = self.participants.len();
        self.participants
            .retain(|entry| entry.participant != participant);
        self.participants.len() != before
    }

    pub fn cursor_moved(&mut self, participant: ParticipantId, user_id: UserId, point: Point) {
        match self
            .participants
            .iter_mut()
            .find(|entry| entry.participant == participant)
        {
            Some(entry) => entry.cursor = Some(point),
            None => self.participants.push(ParticipantInfo {
                participant,
                user_id,
                cursor: Some(point),
            }),
        }
    }

    pub fn cursors(&self) -> impl Iterator<Item = (ParticipantId, &UserId, Point)> {
        self.participants.iter().filter_map(|entry| {
            entry
                .cursor
                .map(|point| (entry.participant, &entry.user_id, point))
        })
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
