// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rustc_hash::FxHashMap;

use super::ThreadObject;
use crate::{ThreadApiError, ThreadId32};

/// Thread-safe table of live, started thread objects, keyed by thread id.
///
/// Entries are [`Weak`], so the registry never keeps an object alive on its own. It is
/// used for diagnostics ([`dump_thread_handles()`]) and by the launcher to verify that
/// its creator finished registering it. Lifecycle operations work the same with or
/// without a registry.
///
/// [`dump_thread_handles()`]: Self::dump_thread_handles
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    entries: Mutex<FxHashMap<ThreadId32, Weak<ThreadObject>>>,
}

impl ThreadRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// # Errors
    ///
    /// Fails if the registry mutex is poisoned. The thread is not started in that case.
    pub fn add(&self, object: &Arc<ThreadObject>) -> Result<(), ThreadApiError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ThreadApiError::MutexPoisoned { which: "registry" })?;
        entries.insert(object.id(), Arc::downgrade(object));
        Ok(())
    }

    /// Returns whether an entry was removed.
    pub fn remove(&self, thread_id: ThreadId32) -> bool {
        self.lock_recover().remove(&thread_id).is_some()
    }

    #[must_use]
    pub fn contains(&self, thread_id: ThreadId32) -> bool {
        self.lock_recover().contains_key(&thread_id)
    }

    #[must_use]
    pub fn lookup(&self, thread_id: ThreadId32) -> Option<Arc<ThreadObject>> {
        self.lock_recover().get(&thread_id).and_then(Weak::upgrade)
    }

    /// Find the object backed by the given OS thread.
    #[must_use]
    pub fn lookup_by_identity(
        &self,
        os_identity: std::thread::ThreadId,
    ) -> Option<Arc<ThreadObject>> {
        self.live_objects()
            .into_iter()
            .find(|object| object.os_identity() == Some(os_identity))
    }

    #[must_use]
    pub fn len(&self) -> usize { self.lock_recover().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Log every registered thread at `debug!` level, with its creation and exit
    /// backtraces when they were captured. Returns how many threads were dumped.
    pub fn dump_thread_handles(&self) -> usize {
        let objects = self.live_objects();
        tracing::debug!(
            count = objects.len(),
            message = "---------------- dump_thread_handles ----------------"
        );
        for object in &objects {
            let snapshot = object.snapshot();
            tracing::debug!(
                thread_id = snapshot.thread_id,
                started = snapshot.started,
                exited = snapshot.exited,
                finished = snapshot.finished,
                detached = snapshot.detached,
                exit_code = snapshot.exit_code,
                message = "registered thread"
            );
            if let Some(backtrace) = object.create_backtrace() {
                tracing::debug!(thread_id = snapshot.thread_id, %backtrace, message = "created at");
            }
            if let Some(backtrace) = object.exit_backtrace() {
                tracing::debug!(thread_id = snapshot.thread_id, %backtrace, message = "exited at");
            }
        }
        tracing::debug!(message = "-----------------------------------------------------");
        objects.len()
    }

    /// Upgrade outside of the registry lock's critical section, since reading an
    /// object's state takes that object's own lock.
    fn live_objects(&self) -> Vec<Arc<ThreadObject>> {
        let weak_entries: Vec<Weak<ThreadObject>> =
            self.lock_recover().values().cloned().collect();
        weak_entries.iter().filter_map(Weak::upgrade).collect()
    }

    fn lock_recover(&self) -> MutexGuard<'_, FxHashMap<ThreadId32, Weak<ThreadObject>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
