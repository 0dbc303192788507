use super::*;

fn info(participant: u64, user: &str) -> ParticipantInfo {
    ParticipantInfo {
        participant: ParticipantId(participant),
        user_id: UserId::new(user),
        cursor: None,
    }
}

#[test]
fn join_replaces_existing_entry_for_same_participant() {
    let mut roster = Roster::default();
    roster.reset(vec![info(1, "alice")]);
    roster.joined(info(2, "bob"));
    roster.joined(info(2, "bob"));
    assert_eq!(roster.len(), 2);
}

#[test]
fn cursor_for_unknown_participant_adds_entry() {
    let mut roster = Roster::default();
    roster.cursor_moved(ParticipantId(4), UserId::new("dan"), Point { x: 1.0, y: 2.0 });

    let cursors: Vec<_> = roster.cursors().collect();
    assert_eq!(cursors.len(), 1);
    assert_eq!(cursors[0].0, ParticipantId(4));
    assert_eq!(cursors[0].1.as_str(), "dan");
}

#[test]
fn leaving_drops_cursor() {
    let mut roster = Roster::default();
    roster.cursor_moved(ParticipantId(4), UserId::new("dan"), Point { x: 1.0, y: 2.0 });
    assert!(roster.left(ParticipantId(4)));
    assert!(!roster.left(ParticipantId(4)));
    assert_eq!(roster.cursors().count(), 0);
    assert!(roster.is_empty());
}
