//! Lazily constructed shared state with a double-checked, fallible initializer.
//!
//! The value lives in a [`OnceLock`], so once any thread sees it the value is
//! fully built. A separate mutex serializes the slow path so the factory may
//! fail (leaving the registry empty for a retry) and so lock traffic can be
//! reported to a [`LockObserver`].

use crate::error::RegistryError;
use crate::events::{LockEvent, LockEventKind, LockObserver, TracingObserver};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

type Factory<T> = Box<dyn Fn() -> Result<T, RegistryError> + Send + Sync>;

// =============================================================================
// Counters
// =============================================================================

#[derive(Default)]
struct Counters {
    constructions: AtomicUsize,
    failed_constructions: AtomicUsize,
    lock_acquisitions: AtomicUsize,
    fast_path_hits: AtomicUsize,
}

/// Point-in-time copy of a registry's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub constructions: usize,
    pub failed_constructions: usize,
    pub lock_acquisitions: usize,
    /// Accesses answered by the unlocked first check.
    pub fast_path_hits: usize,
}

// =============================================================================
// Init guard: releases the lock, then reports the release
// =============================================================================

struct InitGuard<'a> {
    guard: Option<MutexGuard<'a, ()>>,
    observer: &'a dyn LockObserver,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.observer
            .on_event(&LockEvent::current(LockEventKind::Released));
    }
}

// =============================================================================
// LazySharedRegistry
// =============================================================================

pub struct LazySharedRegistry<T> {
    instance: OnceLock<T>,
    init_lock: Mutex<()>,
    factory: Factory<T>,
    observer: Arc<dyn LockObserver>,
    lock_timeout: Option<Duration>,
    counters: Counters,
}

impl<T> LazySharedRegistry<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        LazySharedRegistry {
            instance: OnceLock::new(),
            init_lock: Mutex::new(()),
            factory: Box::new(factory),
            observer: Arc::new(TracingObserver),
            lock_timeout: None,
            counters: Counters::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LockObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Bounds the wait for the initialization lock. Without a timeout the wait is unbounded.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Returns the shared instance, constructing it on the first call.
    ///
    /// A failed construction is logged and yields `None` for this call only;
    /// the registry stays uninitialized and the next caller retries.
    pub fn get_instance(&self) -> Option<&T> {
        match self.try_get_instance() {
            Ok(instance) => Some(instance),
            Err(err) => {
                tracing::warn!(error = %err, "lazy initialization failed, registry stays uninitialized");
                None
            }
        }
    }

    /// Like [`get_instance`](Self::get_instance), but hands back the error.
    pub fn try_get_instance(&self) -> Result<&T, RegistryError> {
        // Check 1: no lock once the value exists.
        if let Some(instance) = self.instance.get() {
            self.counters.fast_path_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(instance);
        }

        let guard = self.lock_for_init()?;
        let result = self.construct_locked();
        drop(guard);

        if let Err(err) = &result {
            self.counters
                .failed_constructions
                .fetch_add(1, Ordering::Relaxed);
            self.notify(LockEventKind::ConstructionFailed(err.to_string()));
        }
        result
    }

    /// Peeks at the instance without ever constructing it.
    pub fn get(&self) -> Option<&T> {
        self.instance.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            constructions: self.counters.constructions.load(Ordering::Relaxed),
            failed_constructions: self.counters.failed_constructions.load(Ordering::Relaxed),
            lock_acquisitions: self.counters.lock_acquisitions.load(Ordering::Relaxed),
            fast_path_hits: self.counters.fast_path_hits.load(Ordering::Relaxed),
        }
    }

    /// Returns the registry to its uninitialized state and zeroes the counters.
    ///
    /// Needs `&mut self`, so no reader can hold a reference into the old value.
    pub fn reset(&mut self) -> Option<T> {
        self.counters = Counters::default();
        self.instance.take()
    }

    fn lock_for_init(&self) -> Result<InitGuard<'_>, RegistryError> {
        let guard = match self.lock_timeout {
            Some(timeout) => match self.init_lock.try_lock_for(timeout) {
                Some(guard) => guard,
                None => {
                    self.notify(LockEventKind::TimedOut);
                    return Err(RegistryError::LockTimeout { waited: timeout });
                }
            },
            None => self.init_lock.lock(),
        };

        self.counters.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
        self.notify(LockEventKind::Acquired);

        Ok(InitGuard {
            guard: Some(guard),
            observer: self.observer.as_ref(),
        })
    }

    // Caller holds `init_lock`.
    fn construct_locked(&self) -> Result<&T, RegistryError> {
        // Check 2: another thread may have finished while we waited.
        if let Some(instance) = self.instance.get() {
            return Ok(instance);
        }

        let value = (self.factory)()?;
        let instance = self.instance.get_or_init(|| value);
        self.counters.constructions.fetch_add(1, Ordering::Relaxed);
        self.notify(LockEventKind::Constructed);
        Ok(instance)
    }

    fn notify(&self, kind: LockEventKind) {
        self.observer.on_event(&LockEvent::current(kind));
    }
}

impl<T> fmt::Debug for LazySharedRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySharedRegistry")
            .field("initialized", &self.is_initialized())
            .field("lock_timeout", &self.lock_timeout)
            .field("stats", &self.stats())
            .finish()
    }
}
