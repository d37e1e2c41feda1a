//! End-to-end tests of the session & conflict-resolution protocol.

use serde_json::json;
use std::sync::Arc;
use tutti_session::prelude::*;
use tutti_session::EngineConfigBuilder;

fn new_engine_and_session() -> (CollabEngine, SessionId) {
    let engine = CollabEngine::new();
    let doc = ScoreDocument::new("composition", json!({"name": "Test Composition"}));
    let session = engine.create_session("test-session", doc);
    (engine, session.id)
}

/// The worked scenario: u1 updates cleanly, u2's stale edit on the same
/// path conflicts, and an overwrite resolution lands the final value.
#[test]
fn concurrent_edit_scenario_end_to_end() {
    let (engine, sid) = new_engine_and_session();

    // Op A: based on v1, applies, document moves to v2.
    let outcome = engine
        .apply_operation(
            &sid,
            OperationInput::update("name", json!("First Update"), "u1", 1),
        )
        .unwrap();
    assert!(outcome.is_applied());
    assert_eq!(engine.get_session(&sid).unwrap().document.version, 2);

    // Op B: also based on v1, different author, same path.
    let outcome = engine
        .apply_operation(
            &sid,
            OperationInput::update("name", json!("Second Update"), "u2", 1),
        )
        .unwrap();
    let conflict = match outcome {
        ApplyOutcome::Conflicted { mut conflicts } => {
            assert_eq!(conflicts.len(), 1);
            conflicts.remove(0)
        }
        other => panic!("expected a conflict, got {:?}", other),
    };
    assert_eq!(conflict.kind, ConflictKind::ConcurrentEdit);
    assert!(conflict.participants.contains("u1"));
    assert!(conflict.participants.contains("u2"));

    // The conflicting edit did not touch the document.
    let doc = engine.get_session(&sid).unwrap().document;
    assert_eq!(doc.version, 2);
    assert_eq!(doc.content["name"], "First Update");

    // Overwrite resolution replaces the content and moves to v3.
    let snapshot = engine
        .resolve_conflict(
            &conflict.id,
            ConflictResolution::new(
                ResolutionStrategy::Overwrite,
                json!({"name": "X"}),
                "u2",
                0,
            ),
        )
        .unwrap();
    assert_eq!(snapshot.document.content["name"], "X");
    assert_eq!(snapshot.document.version, 3);
    assert!(engine.session_conflicts(&sid).is_empty());
}

/// version == initial + N after N successful applications/resolutions, and
/// the log holds exactly the successful operations.
#[test]
fn version_and_log_track_successes_exactly() {
    let (engine, sid) = new_engine_and_session();
    let mut successes = 0u64;

    for (i, (path, value)) in [
        ("tempo", json!(96)),
        ("key", json!("E minor")),
        ("tempo", json!(120)),
    ]
    .into_iter()
    .enumerate()
    {
        let base = engine.get_session(&sid).unwrap().document.version;
        let outcome = engine
            .apply_operation(&sid, OperationInput::update(path, value, "u1", base))
            .unwrap();
        assert!(outcome.is_applied(), "op {} should apply", i);
        successes += 1;
    }

    // A rejected operation counts for nothing.
    let base = engine.get_session(&sid).unwrap().document.version;
    let outcome = engine
        .apply_operation(
            &sid,
            OperationInput::update("sections.3.label", json!("coda"), "u1", base),
        )
        .unwrap();
    assert!(matches!(outcome, ApplyOutcome::Rejected { .. }));

    let doc = engine.get_session(&sid).unwrap().document;
    assert_eq!(doc.version, 1 + successes);
    assert_eq!(doc.applied_operations.len() as u64, successes);
}

/// An operation at the current version with existing intermediates always
/// succeeds.
#[test]
fn current_version_operation_always_applies() {
    let (engine, sid) = new_engine_and_session();
    for i in 0..5 {
        let version = engine.get_session(&sid).unwrap().document.version;
        let outcome = engine
            .apply_operation(
                &sid,
                OperationInput::update("name", json!(format!("rev {}", i)), "u1", version),
            )
            .unwrap();
        assert!(outcome.is_applied());
    }
}

/// First stale-version operation on a path with no history is a
/// version_conflict naming only its author.
#[test]
fn stale_operation_on_untouched_path_is_version_conflict() {
    let (engine, sid) = new_engine_and_session();
    engine
        .apply_operation(&sid, OperationInput::update("name", json!("A"), "u1", 1))
        .unwrap();

    let outcome = engine
        .apply_operation(&sid, OperationInput::update("tempo", json!(80), "u2", 1))
        .unwrap();
    match outcome {
        ApplyOutcome::Conflicted { conflicts } => {
            assert_eq!(conflicts[0].kind, ConflictKind::VersionConflict);
            assert_eq!(conflicts[0].participants.len(), 1);
            assert!(conflicts[0].participants.contains("u2"));
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

/// Same author on the same path never conflicts inside the grace window,
/// regardless of base-version mismatch.
#[test]
fn same_author_rapid_edits_never_conflict() {
    let (engine, sid) = new_engine_and_session();
    engine
        .apply_operation(&sid, OperationInput::update("name", json!("draft 1"), "u1", 1))
        .unwrap();

    // Immediately follow up, still claiming base version 1.
    for revision in ["draft 2", "draft 3"] {
        let outcome = engine
            .apply_operation(&sid, OperationInput::update("name", json!(revision), "u1", 1))
            .unwrap();
        assert!(outcome.is_applied(), "rapid follow-up should apply");
    }
    assert_eq!(engine.get_session(&sid).unwrap().document.version, 4);
}

/// Outside the grace window the same stale edit becomes a concurrent_edit.
#[test]
fn same_author_edit_after_grace_window_conflicts() {
    let engine = CollabEngine::with_config(
        EngineConfigBuilder::new().grace_window_ms(30).build(),
    );
    let doc = ScoreDocument::new("composition", json!({"name": "Test Composition"}));
    let sid = engine.create_session("slow-session", doc).id;

    engine
        .apply_operation(&sid, OperationInput::update("name", json!("A"), "u1", 1))
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(80));

    let outcome = engine
        .apply_operation(&sid, OperationInput::update("name", json!("B"), "u1", 1))
        .unwrap();
    match outcome {
        ApplyOutcome::Conflicted { conflicts } => {
            assert_eq!(conflicts[0].kind, ConflictKind::ConcurrentEdit);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
}

/// merge/manual leave unrelated top-level keys alone; overwrite does not.
#[test]
fn merge_and_manual_preserve_unrelated_keys() {
    for strategy in [ResolutionStrategy::Merge, ResolutionStrategy::Manual] {
        let engine = CollabEngine::new();
        let doc = ScoreDocument::new(
            "composition",
            json!({"name": "Test Composition", "tempo": 96}),
        );
        let sid = engine.create_session("s", doc).id;

        engine
            .apply_operation(&sid, OperationInput::update("name", json!("A"), "u1", 1))
            .unwrap();
        let conflict = match engine
            .apply_operation(&sid, OperationInput::update("name", json!("B"), "u2", 1))
            .unwrap()
        {
            ApplyOutcome::Conflicted { mut conflicts } => conflicts.remove(0),
            other => panic!("expected conflict, got {:?}", other),
        };

        let resolution =
            ConflictResolution::new(strategy, json!({"name": "Merged"}), "u2", 0)
                .with_reasoning("talked it over");
        let snapshot = engine.resolve_conflict(&conflict.id, resolution).unwrap();

        assert_eq!(snapshot.document.content["name"], "Merged");
        assert_eq!(snapshot.document.content["tempo"], 96, "unrelated key survives");
        assert_eq!(snapshot.document.version, 3);
    }
}

/// A resolved conflict is gone: resolving twice is fatal.
#[test]
fn conflict_resolves_exactly_once() {
    let (engine, sid) = new_engine_and_session();
    engine
        .apply_operation(&sid, OperationInput::update("name", json!("A"), "u1", 1))
        .unwrap();
    let conflict = match engine
        .apply_operation(&sid, OperationInput::update("name", json!("B"), "u2", 1))
        .unwrap()
    {
        ApplyOutcome::Conflicted { mut conflicts } => conflicts.remove(0),
        other => panic!("expected conflict, got {:?}", other),
    };

    let resolution = || ConflictResolution::new(ResolutionStrategy::Overwrite, json!({}), "u1", 0);
    engine.resolve_conflict(&conflict.id, resolution()).unwrap();
    let err = engine.resolve_conflict(&conflict.id, resolution()).unwrap_err();
    assert!(matches!(err, SessionError::ConflictNotFound(_)));
}

/// Cursor updates for missing sessions/participants never throw and never
/// change the participant count.
#[test]
fn cursor_updates_are_best_effort() {
    let (engine, sid) = new_engine_and_session();
    engine
        .join_session(&sid, JoinRequest::new("u1", "Ada", ParticipantRole::Editor))
        .unwrap();

    engine.update_cursor(&SessionId::from_string("ghost"), "u1", json!({"beat": 1}));
    engine.update_cursor(&sid, "stranger", json!({"beat": 2}));
    engine.update_cursor(&sid, "u1", json!({"beat": 3}));

    let snapshot = engine.get_session(&sid).unwrap();
    assert_eq!(snapshot.participants.len(), 1);
    assert_eq!(snapshot.participants[0].cursor, Some(json!({"beat": 3})));
}

/// Events fire at every transition point, in protocol order.
#[test]
fn events_cover_the_session_lifecycle() {
    use parking_lot::Mutex;

    let engine = CollabEngine::new();
    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    engine.events().on(move |event| {
        sink.lock().push(match event {
            EngineEvent::SessionCreated { .. } => "created",
            EngineEvent::ParticipantJoined { .. } => "joined",
            EngineEvent::ParticipantLeft { .. } => "left",
            EngineEvent::OperationApplied { .. } => "applied",
            EngineEvent::ConflictDetected { .. } => "conflict",
            EngineEvent::ConflictResolved { .. } => "resolved",
        });
    });

    let doc = ScoreDocument::new("composition", json!({"name": "Test Composition"}));
    let sid = engine.create_session("s", doc).id;
    engine
        .join_session(&sid, JoinRequest::new("u1", "Ada", ParticipantRole::Owner))
        .unwrap();
    engine
        .apply_operation(&sid, OperationInput::update("name", json!("A"), "u1", 1))
        .unwrap();
    let conflict = match engine
        .apply_operation(&sid, OperationInput::update("name", json!("B"), "u2", 1))
        .unwrap()
    {
        ApplyOutcome::Conflicted { mut conflicts } => conflicts.remove(0),
        other => panic!("expected conflict, got {:?}", other),
    };
    engine
        .resolve_conflict(
            &conflict.id,
            ConflictResolution::new(ResolutionStrategy::Overwrite, json!({}), "u1", 0),
        )
        .unwrap();
    engine.leave_session(&sid, "u1").unwrap();

    assert_eq!(
        *seen.lock(),
        vec!["created", "joined", "applied", "conflict", "resolved", "left"]
    );
}

/// The async broadcast tap sees the same stream the sync handlers do.
#[tokio::test]
async fn broadcast_tap_mirrors_sync_events() {
    let (engine, sid) = new_engine_and_session();
    let mut rx = engine.events().subscribe();

    engine
        .apply_operation(&sid, OperationInput::update("name", json!("A"), "u1", 1))
        .unwrap();

    match rx.recv().await.unwrap() {
        EngineEvent::OperationApplied { session_id, operation } => {
            assert_eq!(session_id, sid);
            assert_eq!(operation.value, Some(json!("A")));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

/// Sessions are independent: a conflict in one never blocks another, and
/// parallel writers on different sessions all land.
#[test]
fn sessions_are_independent_under_parallel_load() {
    let engine = Arc::new(CollabEngine::new());
    let sessions: Vec<SessionId> = (0..4)
        .map(|i| {
            engine
                .create_session(
                    format!("track-{}", i),
                    ScoreDocument::new("composition", json!({"count": 0})),
                )
                .id
        })
        .collect();

    let handles: Vec<_> = sessions
        .iter()
        .cloned()
        .map(|sid| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let version = engine.get_session(&sid).unwrap().document.version;
                    let outcome = engine
                        .apply_operation(
                            &sid,
                            OperationInput::update("count", json!(version), "author", version),
                        )
                        .unwrap();
                    assert!(outcome.is_applied());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for sid in &sessions {
        let doc = engine.get_session(sid).unwrap().document;
        assert_eq!(doc.version, 26);
        assert_eq!(doc.applied_operations.len(), 25);
    }
}

/// Serialized writers on one session: every operation observes detection,
/// mutation, and version bump atomically, so at most one of two racing
/// same-base operations from different authors can apply.
#[test]
fn racing_writers_on_one_session_cannot_both_pass_detection() {
    let engine = Arc::new(CollabEngine::new());
    let sid = engine
        .create_session(
            "contended",
            ScoreDocument::new("composition", json!({"name": "base"})),
        )
        .id;

    let handles: Vec<_> = ["u1", "u2"]
        .into_iter()
        .map(|author| {
            let engine = engine.clone();
            let sid = sid.clone();
            std::thread::spawn(move || {
                engine
                    .apply_operation(
                        &sid,
                        OperationInput::update("name", json!(author), author, 1),
                    )
                    .unwrap()
            })
        })
        .collect();
    let outcomes: Vec<ApplyOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    let conflicted = outcomes
        .iter()
        .filter(|o| matches!(o, ApplyOutcome::Conflicted { .. }))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(conflicted, 1);
    assert_eq!(engine.get_session(&sid).unwrap().document.version, 2);
}
