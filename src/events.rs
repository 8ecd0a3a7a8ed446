//! Lock and construction events emitted by [`LazySharedRegistry`](crate::LazySharedRegistry).
//!
//! Events carry the name of the thread that produced them so a trace reads like
//! `worker-1: acquired lock`. Observers decide where the trace goes.

use parking_lot::Mutex;
use std::fmt;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEventKind {
    Acquired,
    Released,
    Constructed,
    ConstructionFailed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEvent {
    pub thread: String,
    pub kind: LockEventKind,
}

impl LockEvent {
    /// Builds an event stamped with the current thread's name.
    pub fn current(kind: LockEventKind) -> Self {
        let thread = thread::current().name().unwrap_or("unnamed").to_string();
        LockEvent { thread, kind }
    }
}

impl fmt::Display for LockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LockEventKind::Acquired => write!(f, "{}: acquired lock", self.thread),
            LockEventKind::Released => write!(f, "{}: released lock", self.thread),
            LockEventKind::Constructed => write!(f, "{}: constructed instance", self.thread),
            LockEventKind::ConstructionFailed(reason) => {
                write!(f, "{}: construction failed ({})", self.thread, reason)
            }
            LockEventKind::TimedOut => write!(f, "{}: timed out waiting for lock", self.thread),
        }
    }
}

pub trait LockObserver: Send + Sync {
    fn on_event(&self, event: &LockEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LockObserver for TracingObserver {
    fn on_event(&self, event: &LockEvent) {
        match &event.kind {
            LockEventKind::Acquired | LockEventKind::Released => {
                tracing::debug!(thread = %event.thread, "{}", event)
            }
            LockEventKind::Constructed => tracing::info!(thread = %event.thread, "{}", event),
            LockEventKind::ConstructionFailed(_) | LockEventKind::TimedOut => {
                tracing::warn!(thread = %event.thread, "{}", event)
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<LockEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<LockEventKind> {
        self.events.lock().iter().map(|e| e.kind.clone()).collect()
    }

    /// Counts events of the same variant as `kind`, ignoring any payload.
    pub fn count(&self, kind: &LockEventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| std::mem::discriminant(&e.kind) == std::mem::discriminant(kind))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LockObserver for RecordingObserver {
    fn on_event(&self, event: &LockEvent) {
        self.events.lock().push(event.clone());
    }
}
