//! Demo: two participants editing one composition, hitting a conflict,
//! and resolving it.
//!
//! Run with `RUST_LOG=debug cargo run` to watch the engine's tracing.

use serde_json::json;
use tutti_session::prelude::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║        tutti - collaborative composition session demo      ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let engine = CollabEngine::new();

    // Log every engine event as it fires.
    engine.events().on(|event| match event {
        EngineEvent::SessionCreated { session } => {
            println!("  event: session created ({})", session.name)
        }
        EngineEvent::ParticipantJoined { participant, .. } => {
            println!("  event: {} joined", participant.name)
        }
        EngineEvent::ParticipantLeft { participant_id, .. } => {
            println!("  event: {} left", participant_id)
        }
        EngineEvent::OperationApplied { operation, .. } => {
            println!("  event: applied {:?} at '{}'", operation.kind, operation.path)
        }
        EngineEvent::ConflictDetected { conflict, .. } => {
            println!(
                "  event: {:?} at '{}' between {:?}",
                conflict.kind, conflict.path, conflict.participants
            )
        }
        EngineEvent::ConflictResolved { conflict_id, .. } => {
            println!("  event: conflict {} resolved", conflict_id)
        }
    });

    let document = ScoreDocument::new(
        "composition",
        json!({
            "name": "Evening Sketch",
            "tempo": 96,
            "tracks": [
                { "instrument": "piano", "notes": [60, 64, 67] }
            ]
        }),
    );

    println!("\nCreating session (document v{})...", document.version);
    let session = engine.create_session("evening-jam", document);
    let sid = session.id.clone();

    engine
        .join_session(&sid, JoinRequest::new("ada", "Ada", ParticipantRole::Owner))
        .expect("session exists");
    engine
        .join_session(&sid, JoinRequest::new("ben", "Ben", ParticipantRole::Editor))
        .expect("session exists");

    // Ada renames the piece; her edit is based on the latest version.
    println!("\nAda renames the piece...");
    let outcome = engine
        .apply_operation(
            &sid,
            OperationInput::update("name", json!("Evening Nocturne"), "ada", 1),
        )
        .expect("session exists");
    report(&outcome);

    // Ben edits the same field, but his client only ever saw version 1.
    println!("\nBen renames it too, from a stale version...");
    let outcome = engine
        .apply_operation(
            &sid,
            OperationInput::update("name", json!("Night Piece"), "ben", 1),
        )
        .expect("session exists");
    report(&outcome);

    let pending = engine.session_conflicts(&sid);
    println!("\nPending conflicts: {}", pending.len());

    if let Some(conflict) = pending.first() {
        println!("Resolving by picking a title both can live with...");
        let resolution = ConflictResolution::new(
            ResolutionStrategy::Manual,
            json!({"name": "Nocturne for Two"}),
            "ada",
            0,
        )
        .with_reasoning("split the difference over chat");
        let snapshot = engine
            .resolve_conflict(&conflict.id, resolution)
            .expect("conflict is pending");

        println!("\nFinal document (v{}):", snapshot.document.version);
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot.document.content).unwrap()
        );
    }

    println!("\n✓ Demo complete");
}

fn report(outcome: &ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied { operation } => {
            println!("  -> applied (previous: {:?})", operation.previous_value)
        }
        ApplyOutcome::Conflicted { conflicts } => {
            println!("  -> conflicted ({} pending)", conflicts.len())
        }
        ApplyOutcome::Rejected { warnings } => println!("  -> rejected: {:?}", warnings),
    }
}
