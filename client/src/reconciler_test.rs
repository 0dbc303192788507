use super::*;
use syncboard_shared::{Brush, BoardSnapshot, CompositeMode, NoopReason, ParticipantInfo};

#[derive(Debug, Default)]
struct Recording {
    strokes: Vec<StrokeId>,
    cursors: Vec<(String, Point)>,
}

impl Renderer for Recording {
    fn clear(&mut self) {
        self.strokes.clear();
        self.cursors.clear();
    }

    fn draw_stroke(&mut self, stroke: &Stroke) {
        self.strokes.push(stroke.id);
    }

    fn draw_cursor(&mut self, label: &str, point: Point) {
        self.cursors.push((label.to_string(), point));
    }
}

fn board() -> BoardId {
    BoardId::parse("b1").unwrap()
}

fn path(x: f32) -> CapturedPath {
    CapturedPath {
        points: vec![Point { x, y: 0.0 }, Point { x, y: 40.0 }],
        brush: Brush::default(),
    }
}

fn remote_stroke(origin: u64, seq: u64) -> Stroke {
    Stroke {
        id: StrokeId::new(origin, seq),
        author: UserId::new("bob"),
        color: "#ff0000".to_string(),
        width: 4.0,
        mode: CompositeMode::Normal,
        points: vec![Point { x: 100.0, y: 0.0 }, Point { x: 100.0, y: 50.0 }],
    }
}

fn info(participant: u64, user: &str) -> ParticipantInfo {
    ParticipantInfo {
        participant: ParticipantId(participant),
        user_id: UserId::new(user),
        cursor: None,
    }
}

fn synced(user: &str, origin: u64, snapshot: BoardSnapshot) -> Reconciler<Recording> {
    let mut client = Reconciler::new(Recording::default(), board(), UserId::new(user), origin);
    client.join();
    let reply = client.handle(ServerMessage::BoardState {
        board_id: board(),
        you: ParticipantId(origin),
        snapshot,
        roster: vec![info(origin, user)],
    });
    assert!(reply.is_none());
    assert_eq!(client.status(), SyncStatus::Synced);
    client
}

/// Runs a submission through an authoritative log, returning what the server
/// would answer.
fn serve(server: &mut OperationLog, author: &str, message: &ClientMessage) -> ServerMessage {
    let ClientMessage::Submit {
        request_id,
        operation,
        ..
    } = message
    else {
        panic!("expected submission, got {message:?}");
    };
    match server.submit(UserId::new(author), operation.clone()) {
        Ok(entry) => ServerMessage::OperationAccepted {
            board_id: board(),
            entry,
        },
        Err(syncboard_shared::Refusal::Rejected(reason)) => ServerMessage::OperationRejected {
            request_id: Some(*request_id),
            reason,
        },
        Err(syncboard_shared::Refusal::Noop(reason)) => ServerMessage::Noop {
            request_id: *request_id,
            reason,
        },
    }
}

fn visible_ids(client: &Reconciler<Recording>) -> Vec<StrokeId> {
    client.visible_strokes().iter().map(|stroke| stroke.id).collect()
}

fn live_ids(log: &OperationLog) -> Vec<StrokeId> {
    log.live().iter().map(|stroke| stroke.id).collect()
}

// =============================================================================
// local edits
// =============================================================================

#[test]
fn edits_before_sync_are_refused() {
    let mut client = Reconciler::new(Recording::default(), board(), UserId::new("alice"), 7);
    assert_eq!(
        client.complete_stroke(path(1.0)).unwrap_err(),
        ReconcileError::NotSynced
    );
    assert_eq!(client.undo().unwrap_err(), ReconcileError::NotSynced);
    assert!(client.cursor_move(Point { x: 1.0, y: 1.0 }).is_none());
}

#[test]
fn invalid_path_is_refused_at_the_source() {
    let mut client = synced("alice", 7, BoardSnapshot::default());
    let mut empty = path(1.0);
    empty.points.clear();

    assert!(matches!(
        client.complete_stroke(empty),
        Err(ReconcileError::Encoding(EncodingError::EmptyPath))
    ));
    assert_eq!(client.pending_len(), 0);
}

#[test]
fn completed_stroke_shows_before_acknowledgment() {
    let mut client = synced("alice", 7, BoardSnapshot::default());

    let message = client.complete_stroke(path(10.0)).unwrap();

    let ClientMessage::Submit {
        request_id,
        operation: Operation::Draw { stroke },
        ..
    } = message
    else {
        panic!("expected draw submission");
    };
    assert_eq!(request_id, 1);
    assert_eq!(stroke.id, StrokeId::new(7, 1));
    assert_eq!(visible_ids(&client), vec![stroke.id]);
    assert_eq!(client.renderer().strokes, vec![stroke.id]);
    assert!(client.replica().live().is_empty());
}

#[test]
fn echo_settles_prediction_and_repeat_is_ignored() {
    let mut server = OperationLog::new();
    let mut client = synced("alice", 7, BoardSnapshot::default());

    let message = client.complete_stroke(path(10.0)).unwrap();
    let echo = serve(&mut server, "alice", &message);
    assert!(client.handle(echo.clone()).is_none());

    assert_eq!(client.pending_len(), 0);
    assert_eq!(visible_ids(&client), live_ids(&server));

    assert!(client.handle(echo).is_none());
    assert_eq!(client.replica().last_sequence(), 1);
    assert_eq!(visible_ids(&client), live_ids(&server));
}

#[test]
fn rejected_draw_is_rolled_back() {
    let mut client = synced("alice", 7, BoardSnapshot::default());
    let message = client.complete_stroke(path(10.0)).unwrap();
    let ClientMessage::Submit { request_id, .. } = message else {
        panic!("expected submission");
    };

    client.handle(ServerMessage::OperationRejected {
        request_id: Some(request_id),
        reason: RejectReason::BoardFull,
    });

    assert!(client.visible_strokes().is_empty());
    assert!(client.renderer().strokes.is_empty());
}

#[test]
fn erase_hides_stroke_until_noop_restores_it() {
    let mut server = OperationLog::new();
    server
        .submit(UserId::new("bob"), Operation::Draw {
            stroke: remote_stroke(2, 1),
        })
        .unwrap();
    let mut client = synced("alice", 7, server.snapshot());

    let message = client.erase(StrokeId::new(2, 1)).unwrap();
    assert!(client.visible_strokes().is_empty());
    let ClientMessage::Submit { request_id, .. } = message else {
        panic!("expected submission");
    };

    client.handle(ServerMessage::Noop {
        request_id,
        reason: NoopReason::TargetNotFound,
    });
    assert_eq!(visible_ids(&client), vec![StrokeId::new(2, 1)]);
}

#[test]
fn erase_at_targets_topmost_visible_stroke() {
    let mut server = OperationLog::new();
    let mut lower = remote_stroke(2, 1);
    lower.width = 10.0;
    let upper = remote_stroke(2, 2);
    server
        .submit(UserId::new("bob"), Operation::Draw { stroke: lower })
        .unwrap();
    server
        .submit(UserId::new("bob"), Operation::Draw { stroke: upper })
        .unwrap();
    let mut client = synced("alice", 7, server.snapshot());

    let message = client
        .erase_at(Point { x: 101.0, y: 20.0 })
        .unwrap()
        .expect("a stroke is under the pointer");

    assert!(matches!(
        message,
        ClientMessage::Submit {
            operation: Operation::Erase { target },
            ..
        } if target.stroke == StrokeId::new(2, 2)
    ));
    assert!(client.erase_at(Point { x: 500.0, y: 500.0 }).unwrap().is_none());
}

#[test]
fn disconnect_rolls_back_unacknowledged_edits() {
    let mut client = synced("alice", 7, BoardSnapshot::default());
    client.complete_stroke(path(10.0)).unwrap();
    client.complete_stroke(path(20.0)).unwrap();

    client.on_disconnected();

    assert_eq!(client.status(), SyncStatus::Disconnected);
    assert_eq!(client.pending_len(), 0);
    assert!(client.visible_strokes().is_empty());
    assert!(client.roster().is_empty());
}

#[test]
fn undo_is_never_predicted() {
    let mut server = OperationLog::new();
    let mut client = synced("alice", 7, BoardSnapshot::default());
    let draw = client.complete_stroke(path(10.0)).unwrap();
    client.handle(serve(&mut server, "alice", &draw));

    let undo = client.undo().unwrap();
    assert_eq!(visible_ids(&client), vec![StrokeId::new(7, 1)]);
    assert_eq!(client.pending_len(), 0);

    client.handle(serve(&mut server, "alice", &undo));
    assert!(client.visible_strokes().is_empty());
    assert!(client.replica().can_redo());
}

// =============================================================================
// resync
// =============================================================================

#[test]
fn sequence_gap_triggers_rejoin() {
    let mut client = synced("alice", 7, BoardSnapshot::default());

    let reply = client.handle(ServerMessage::OperationAccepted {
        board_id: board(),
        entry: LoggedOperation {
            sequence: 3,
            author: UserId::new("bob"),
            operation: Operation::Clear,
        },
    });

    assert!(matches!(reply, Some(ClientMessage::JoinBoard { .. })));
    assert_eq!(client.status(), SyncStatus::Joining);
}

#[test]
fn inapplicable_undo_triggers_rejoin() {
    let mut client = synced("alice", 7, BoardSnapshot::default());

    let reply = client.handle(ServerMessage::OperationAccepted {
        board_id: board(),
        entry: LoggedOperation {
            sequence: 1,
            author: UserId::new("bob"),
            operation: Operation::Undo,
        },
    });

    assert!(matches!(reply, Some(ClientMessage::JoinBoard { .. })));
}

#[test]
fn session_not_found_triggers_rejoin() {
    let mut client = synced("alice", 7, BoardSnapshot::default());
    client.complete_stroke(path(10.0)).unwrap();

    let reply = client.handle(ServerMessage::OperationRejected {
        request_id: Some(1),
        reason: RejectReason::SessionNotFound,
    });

    assert!(matches!(reply, Some(ClientMessage::JoinBoard { .. })));
    assert_eq!(client.pending_len(), 0);
}

#[test]
fn compaction_follows_server_and_mismatch_rejoins() {
    let mut server = OperationLog::new();
    let mut client = synced("alice", 7, BoardSnapshot::default());
    let draw = client.complete_stroke(path(10.0)).unwrap();
    client.handle(serve(&mut server, "alice", &draw));
    server.compact();

    let reply = client.handle(ServerMessage::Compacted {
        board_id: board(),
        through: server.last_sequence(),
    });
    assert!(reply.is_none());
    assert!(!client.replica().can_undo());
    assert_eq!(visible_ids(&client), live_ids(&server));

    let reply = client.handle(ServerMessage::Compacted {
        board_id: board(),
        through: 9,
    });
    assert!(matches!(reply, Some(ClientMessage::JoinBoard { .. })));
}

#[test]
fn messages_for_other_boards_are_ignored() {
    let mut client = synced("alice", 7, BoardSnapshot::default());
    let reply = client.handle(ServerMessage::OperationAccepted {
        board_id: BoardId::parse("other").unwrap(),
        entry: LoggedOperation {
            sequence: 5,
            author: UserId::new("bob"),
            operation: Operation::Clear,
        },
    });
    assert!(reply.is_none());
    assert_eq!(client.status(), SyncStatus::Synced);
}

// =============================================================================
// convergence
// =============================================================================

#[test]
fn replicas_converge_regardless_of_presence_traffic() {
    let mut server = OperationLog::new();
    let mut alice = synced("alice", 1, BoardSnapshot::default());
    let mut bob = synced("bob", 2, BoardSnapshot::default());

    let a1 = alice.complete_stroke(path(10.0)).unwrap();
    let b1 = bob.complete_stroke(path(20.0)).unwrap();
    let a2 = alice.complete_stroke(path(30.0)).unwrap();
    let b_undo = bob.undo().unwrap();
    let b_redo = bob.redo().unwrap();
    let a_clear = alice.clear().unwrap();
    let b2 = bob.complete_stroke(path(40.0)).unwrap();
    let a_undo = alice.undo().unwrap();
    let a_undo_clear = alice.undo().unwrap();

    let mut broadcasts = Vec::new();
    for (author, message) in [
        ("alice", &a1),
        ("bob", &b1),
        ("alice", &a2),
        ("bob", &b_undo),
        ("bob", &b_redo),
        ("alice", &a_clear),
        ("bob", &b2),
        ("alice", &a_undo),
        ("alice", &a_undo_clear),
    ] {
        match serve(&mut server, author, message) {
            accepted @ ServerMessage::OperationAccepted { .. } => broadcasts.push(accepted),
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    for (index, message) in broadcasts.into_iter().enumerate() {
        alice.handle(message.clone());
        alice.handle(ServerMessage::CursorMoved {
            participant: ParticipantId(2),
            user_id: UserId::new("bob"),
            point: Point {
                x: index as f32,
                y: 0.0,
            },
        });
        bob.handle(ServerMessage::ParticipantJoined {
            participant: info(10 + index as u64, "carol"),
        });
        bob.handle(message);
    }

    assert_eq!(alice.pending_len(), 0);
    assert_eq!(bob.pending_len(), 0);
    assert_eq!(live_ids(&server).len(), 3);
    assert_eq!(visible_ids(&alice), live_ids(&server));
    assert_eq!(visible_ids(&bob), live_ids(&server));
}

#[test]
fn late_joiner_matches_existing_participants() {
    let mut server = OperationLog::new();
    let mut alice = synced("alice", 1, BoardSnapshot::default());
    for x in [10.0, 20.0, 30.0] {
        let message = alice.complete_stroke(path(x)).unwrap();
        alice.handle(serve(&mut server, "alice", &message));
    }
    let undo = alice.undo().unwrap();
    alice.handle(serve(&mut server, "alice", &undo));

    let carol = synced("carol", 3, server.snapshot());

    assert_eq!(visible_ids(&carol), visible_ids(&alice));
    assert_eq!(carol.replica().can_redo(), alice.replica().can_redo());
}

// =============================================================================
// presence
// =============================================================================

#[test]
fn remote_cursors_are_drawn_but_not_our_own() {
    let mut client = synced("alice", 7, BoardSnapshot::default());

    client.handle(ServerMessage::CursorMoved {
        participant: ParticipantId(7),
        user_id: UserId::new("alice"),
        point: Point { x: 1.0, y: 1.0 },
    });
    client.handle(ServerMessage::CursorMoved {
        participant: ParticipantId(8),
        user_id: UserId::new("bob"),
        point: Point { x: 5.0, y: 6.0 },
    });

    assert_eq!(
        client.renderer().cursors,
        vec![("bob".to_string(), Point { x: 5.0, y: 6.0 })]
    );
    assert_eq!(client.roster().len(), 2);

    client.handle(ServerMessage::ParticipantLeft {
        participant: ParticipantId(8),
        user_id: UserId::new("bob"),
    });
    assert!(client.renderer().cursors.is_empty());
    assert_eq!(client.roster().len(), 1);
}
