//! Conflict detection for incoming operations.
//!
//! Version mismatch alone is not proof of conflicting intent: debounced UI
//! input produces rapid same-author edits against a stale base version, and
//! those must not be penalized. Divergent authors on the same path are the
//! genuine hazard.

use crate::conflict::ConflictKind;
use std::collections::BTreeSet;
use tutti_score::{Operation, ScoreDocument};

/// Default grace window under which same-author stale-version operations
/// are treated as rapid follow-up edits rather than conflicts.
pub const DEFAULT_GRACE_WINDOW_MS: u64 = 1_000;

/// The detector's verdict on a candidate operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Detection {
    /// Safe to apply against the document's current version.
    Clean,
    /// The operation clashes with recent history.
    Conflict {
        kind: ConflictKind,
        participants: BTreeSet<String>,
        involved_operations: Vec<Operation>,
    },
}

/// Classifies candidate operations against document state and history.
#[derive(Clone, Copy, Debug)]
pub struct ConflictDetector {
    grace_window_ms: u64,
}

impl ConflictDetector {
    pub fn new(grace_window_ms: u64) -> Self {
        Self { grace_window_ms }
    }

    pub fn grace_window_ms(&self) -> u64 {
        self.grace_window_ms
    }

    /// Assess a finalized candidate operation. `candidate.applied_at` is the
    /// submission time the elapsed-time check runs against.
    pub fn assess(&self, document: &ScoreDocument, candidate: &Operation) -> Detection {
        // Based on the latest known state: nothing to clash with.
        if candidate.base_version == document.version {
            return Detection::Clean;
        }

        match document.last_operation_on(&candidate.path) {
            None => Detection::Conflict {
                kind: ConflictKind::VersionConflict,
                participants: BTreeSet::from([candidate.author_id.clone()]),
                involved_operations: vec![candidate.clone()],
            },
            Some(prior) => {
                let elapsed = candidate.applied_at.saturating_sub(prior.applied_at);
                if prior.author_id != candidate.author_id || elapsed > self.grace_window_ms {
                    Detection::Conflict {
                        kind: ConflictKind::ConcurrentEdit,
                        participants: BTreeSet::from([
                            prior.author_id.clone(),
                            candidate.author_id.clone(),
                        ]),
                        involved_operations: vec![prior.clone(), candidate.clone()],
                    }
                } else {
                    // Same author within the window: a rapid follow-up edit.
                    // The stale base version is not an error in this one case.
                    Detection::Clean
                }
            }
        }
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_WINDOW_MS)
    }
}
