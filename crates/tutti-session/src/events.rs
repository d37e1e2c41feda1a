//! Engine events and their delivery.
//!
//! Two surfaces share one stream: a synchronous handler registry invoked in
//! registration order on the calling thread (the ordering the protocol
//! guarantees), and a tokio broadcast channel for async transport layers.

use crate::conflict::{Conflict, ConflictId};
use crate::presence::Participant;
use crate::session::{SessionId, SessionSnapshot};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tutti_score::Operation;

/// Events emitted at the engine's transition points.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// A session was created.
    SessionCreated { session: SessionSnapshot },
    /// A participant joined (or rejoined) a session.
    ParticipantJoined {
        session_id: SessionId,
        participant: Participant,
    },
    /// A participant left a session.
    ParticipantLeft {
        session_id: SessionId,
        participant_id: String,
    },
    /// An operation mutated a session's document.
    OperationApplied {
        session_id: SessionId,
        operation: Operation,
    },
    /// An incoming operation was classified as conflicting.
    ConflictDetected {
        session_id: SessionId,
        conflict: Conflict,
    },
    /// A pending conflict was resolved.
    ConflictResolved {
        session_id: SessionId,
        conflict_id: ConflictId,
    },
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Synchronous publish/subscribe registry with an async broadcast tap.
pub struct EventBus {
    handlers: RwLock<Vec<(HandlerId, Handler)>>,
    next_id: AtomicU64,
    broadcast_tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            broadcast_tx,
        }
    }

    /// Register a handler. Handlers run synchronously, in registration
    /// order, on the thread that triggered the event.
    pub fn on(&self, handler: impl Fn(&EngineEvent) + Send + Sync + 'static) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Subscribe to the async broadcast tap (for transport layers).
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.broadcast_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        // Snapshot the registry so handlers may subscribe/unsubscribe
        // without deadlocking the bus.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(&event);
        }
        // Lagging or absent receivers are not the engine's problem.
        let _ = self.broadcast_tx.send(event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}
