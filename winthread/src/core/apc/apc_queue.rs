// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{collections::VecDeque,
          os::fd::BorrowedFd,
          panic::{AssertUnwindSafe, catch_unwind},
          sync::{Mutex, MutexGuard, PoisonError}};

use super::ApcItem;
use crate::{ExitThreadRequest, SignalLatch, SignalLatchError, ThreadApiError};

/// FIFO of [`ApcItem`]s owned by one thread object.
///
/// Items are popped one at a time and run without holding the queue lock, so a
/// callback may queue more callbacks (to itself or to any other thread).
///
/// | Method                     | Closes queue | Runs pending items |
/// | :------------------------- | :----------- | :----------------- |
/// | [`execute_pending()`]      | no           | yes                |
/// | [`drain_for_thread_exit()`]| yes          | yes                |
/// | [`uninit()`]               | yes          | no, drops them     |
///
/// [`execute_pending()`]: Self::execute_pending
/// [`drain_for_thread_exit()`]: Self::drain_for_thread_exit
/// [`uninit()`]: Self::uninit
#[derive(Debug)]
pub struct ApcQueue {
    state: Mutex<ApcQueueState>,
    /// Set while at least one item is queued. Alertable waits poll its descriptor.
    pending: SignalLatch,
}

#[derive(Debug, Default)]
struct ApcQueueState {
    items: VecDeque<ApcItem>,
    closed: bool,
}

impl ApcQueue {
    /// # Errors
    ///
    /// Fails if the pending latch can't be created.
    pub fn try_new() -> Result<Self, SignalLatchError> {
        Ok(Self {
            state: Mutex::new(ApcQueueState::default()),
            pending: SignalLatch::try_new()?,
        })
    }

    /// Append `item`.
    ///
    /// # Errors
    ///
    /// [`ThreadApiError::CallbackQueueClosed`] once the owning thread started exiting.
    /// The item is dropped without running.
    pub fn register(&self, item: impl Into<ApcItem>) -> Result<(), ThreadApiError> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(ThreadApiError::CallbackQueueClosed);
        }
        state.items.push_back(item.into());
        self.pending.set()?;
        Ok(())
    }

    /// Run every queued item in FIFO order, including items queued by the callbacks
    /// themselves. Returns how many ran.
    ///
    /// # Errors
    ///
    /// Fails if the queue mutex is poisoned or the pending latch can't be reset.
    pub fn execute_pending(&self) -> Result<usize, ThreadApiError> {
        let mut count = 0;
        while let Some(item) = self.pop_front()? {
            item.run();
            count += 1;
        }
        Ok(count)
    }

    /// Close the queue and run what is still pending. Called by the exiting thread
    /// itself. A panicking callback is logged and the remaining ones still run.
    pub fn drain_for_thread_exit(&self) -> usize {
        let items = {
            let mut state = self.lock_recover();
            state.closed = true;
            std::mem::take(&mut state.items)
        };
        self.reset_pending_or_log();

        let count = items.len();
        for item in items {
            let kind = item.kind;
            match catch_unwind(AssertUnwindSafe(|| item.run())) {
                Ok(()) => {}
                Err(payload) if payload.is::<ExitThreadRequest>() => {
                    tracing::debug!(
                        %kind,
                        message = "exit requested by queued callback while already exiting"
                    );
                }
                Err(_) => {
                    tracing::error!(%kind, message = "queued callback panicked during thread exit");
                }
            }
        }
        count
    }

    /// Close the queue and drop pending items without running them. Idempotent.
    pub fn uninit(&self) {
        let dropped = {
            let mut state = self.lock_recover();
            state.closed = true;
            std::mem::take(&mut state.items)
        };
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), message = "dropping queued callbacks");
        }
        drop(dropped);
        self.pending.uninit();
    }

    /// Readable while items are queued. [`None`] after [`uninit()`](Self::uninit).
    #[must_use]
    pub fn pending_descriptor(&self) -> Option<BorrowedFd<'_>> { self.pending.descriptor() }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.lock_recover().closed }

    #[must_use]
    pub fn len(&self) -> usize { self.lock_recover().items.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn pop_front(&self) -> Result<Option<ApcItem>, ThreadApiError> {
        let mut state = self.lock()?;
        let item = state.items.pop_front();
        if state.items.is_empty() {
            match self.pending.reset() {
                // A concurrent uninit already tore the latch down.
                Ok(()) | Err(SignalLatchError::Uninitialized) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(item)
    }

    fn reset_pending_or_log(&self) {
        match self.pending.reset() {
            // A concurrent uninit already tore the latch down.
            Ok(()) | Err(SignalLatchError::Uninitialized) => {}
            Err(err) => {
                tracing::error!(?err, message = "failed to reset callback queue latch");
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ApcQueueState>, ThreadApiError> {
        self.state.lock().map_err(|_| ThreadApiError::MutexPoisoned {
            which: "callback queue",
        })
    }

    fn lock_recover(&self) -> MutexGuard<'_, ApcQueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
