// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! State transitions of a [`ThreadObject`]. Every transition is decided under the
//! object's `state` mutex. The public entry points live on [`ThreadRuntime`].
//!
//! [`ThreadRuntime`]: crate::ThreadRuntime

use std::{backtrace::Backtrace, sync::Arc, thread::JoinHandle};

use super::{CancelOutcome, ResumeOutcome, RendezvousOutcome, ThreadObject, ThreadState,
            launcher::thread_launcher};
use crate::{ApcItem, CloseOutcome, ThreadApiError};

impl ThreadObject {
    /// Spawn the OS thread and run the creator side of the startup rendezvous. The
    /// caller holds the `state` lock, which is what makes a concurrent resume, close or
    /// terminate wait until the thread is fully recorded.
    ///
    /// On failure the object is back in its pending state: not started, unregistered,
    /// exit latch set.
    pub(super) fn start(
        self: &Arc<Self>,
        state: &mut ThreadState,
    ) -> Result<RendezvousOutcome, ThreadApiError> {
        state.started = true;

        let spawned = self.exited_latch.reset().map_err(ThreadApiError::from).and_then(
            |()| {
                self.rendezvous
                    .run_creator(self.rendezvous_timeout, || self.register_and_spawn())
            },
        );

        match spawned {
            Ok((join_handle, outcome)) => {
                state.os_identity = Some(join_handle.thread().id());
                state.join_handle = Some(join_handle);
                if outcome == RendezvousOutcome::TimedOut {
                    tracing::warn!(
                        thread_id = self.id(),
                        message = "launcher did not acknowledge startup in time"
                    );
                }
                tracing::debug!(thread_id = self.id(), message = "thread started");
                Ok(outcome)
            }
            Err(err) => {
                state.started = false;
                // No launcher exists, so the handshake can be rearmed for a later resume.
                self.rendezvous.rearm();
                if let Some(registry) = &self.registry {
                    registry.remove(self.id());
                }
                if let Err(latch_err) = self.exited_latch.set() {
                    tracing::error!(
                        thread_id = self.id(),
                        ?latch_err,
                        message = "failed to restore exit latch after failed start"
                    );
                }
                tracing::error!(thread_id = self.id(), ?err, message = "failed to start thread");
                Err(err)
            }
        }
    }

    fn register_and_spawn(self: &Arc<Self>) -> Result<JoinHandle<()>, ThreadApiError> {
        if let Some(registry) = &self.registry {
            registry.add(self)?;
        }

        let mut builder =
            std::thread::Builder::new().name(format!("winthread-{}", self.id()));
        if self.stack_size() > 0 {
            builder = builder.stack_size(self.stack_size());
        }

        let object = Arc::clone(self);
        builder
            .spawn(move || thread_launcher(object))
            .map_err(ThreadApiError::ThreadSpawn)
    }

    pub(super) fn resume(self: &Arc<Self>) -> Result<ResumeOutcome, ThreadApiError> {
        let mut state = self.lock_state()?;
        if state.destroyed {
            return Err(ThreadApiError::InvalidHandle);
        }
        if state.started {
            tracing::warn!(thread_id = self.id(), message = "thread already started");
            return Ok(ResumeOutcome::AlreadyStarted);
        }
        if state.exited {
            tracing::warn!(
                thread_id = self.id(),
                message = "thread was terminated before it started"
            );
            return Ok(ResumeOutcome::TerminatedBeforeStart);
        }
        self.start(&mut state)?;
        Ok(ResumeOutcome::Started)
    }

    pub(super) fn terminate(&self, exit_code: u32) -> Result<CancelOutcome, ThreadApiError> {
        let mut state = self.lock_state()?;
        if state.destroyed {
            return Err(ThreadApiError::InvalidHandle);
        }
        if state.finished {
            return Ok(CancelOutcome::AlreadyExited);
        }

        state.exited = true;
        state.exit_code = exit_code;
        self.exited_latch.set()?;

        if state.started {
            tracing::warn!(
                thread_id = self.id(),
                exit_code,
                message = "thread marked exited, but a running thread can't be cancelled \
                           on this host"
            );
            Ok(CancelOutcome::UnsupportedOnPlatform)
        } else {
            tracing::debug!(
                thread_id = self.id(),
                exit_code,
                message = "pending thread terminated"
            );
            Ok(CancelOutcome::Cancelled)
        }
    }

    /// The value is final once the exit latch was observed set. Reads are taken under
    /// the same lock that the writers hold.
    pub(super) fn exit_code(&self) -> Result<u32, ThreadApiError> {
        let state = self.lock_state()?;
        if state.destroyed {
            return Err(ThreadApiError::InvalidHandle);
        }
        Ok(state.exit_code)
    }

    pub(super) fn queue_callback(&self, item: ApcItem) -> Result<(), ThreadApiError> {
        {
            let state = self.lock_state()?;
            if state.destroyed {
                return Err(ThreadApiError::InvalidHandle);
            }
            if state.exited || state.finished {
                return Err(ThreadApiError::CallbackQueueClosed);
            }
        }
        // The queue closes itself when the thread starts exiting, so a callback that
        // races with the exit is rejected there.
        self.apc_queue.register(item)
    }

    pub(super) fn close(&self) -> Result<CloseOutcome, ThreadApiError> {
        if self.is_process_main() {
            return Ok(CloseOutcome::PseudoHandle);
        }

        let join_handle = {
            let mut state = self.lock_state()?;
            if state.destroyed {
                return Err(ThreadApiError::InvalidHandle);
            }

            if state.started && !self.exited_latch.is_set() {
                state.detached = true;
                // Dropping the join handle detaches the OS thread.
                drop(state.join_handle.take());
                tracing::debug!(thread_id = self.id(), message = "thread detached");
                return Ok(CloseOutcome::Detached);
            }

            state.destroyed = true;
            let join_handle = state.join_handle.take();
            // Only a thread whose launcher is done is joined. A thread that was
            // terminated while running is left detached.
            if state.finished && !state.joined {
                state.joined = true;
                join_handle
            } else {
                None
            }
        };

        if let Some(join_handle) = join_handle {
            if join_handle.join().is_err() {
                tracing::error!(thread_id = self.id(), message = "failed to join thread on close");
            }
        }

        self.release_resources();
        Ok(CloseOutcome::Destroyed)
    }

    /// The lazy join run by a waiter that saw the exit latch set. Only joins a thread
    /// whose launcher finished, and only once.
    pub(super) fn join_if_finished(&self) -> Result<(), ThreadApiError> {
        let join_handle = {
            let mut state = self.lock_state()?;
            if state.joined || state.detached || !state.finished {
                return Ok(());
            }
            state.joined = true;
            state.join_handle.take()
        };

        match join_handle {
            Some(join_handle) => join_handle.join().map_err(|_| ThreadApiError::JoinFailed),
            None => Ok(()),
        }
    }

    /// Exit path of the launcher, run on the thread itself after the start routine
    /// returned (or never ran). `exit_code` is recorded unless an exit was already
    /// recorded by terminate.
    pub(super) fn finish_from_launcher(&self, exit_code: u32) {
        let drained = self.apc_queue.drain_for_thread_exit();
        if drained > 0 {
            tracing::debug!(
                thread_id = self.id(),
                drained,
                message = "ran queued callbacks on exit"
            );
        }

        let must_destroy = {
            let mut state = self.lock_state_recover();
            if state.destroyed {
                return;
            }
            if !state.exited {
                state.exited = true;
                state.exit_code = exit_code;
            }
            state.finished = true;
            if self.capture_backtraces {
                state.exit_backtrace = Some(Backtrace::force_capture());
            }
            if let Err(err) = self.exited_latch.set() {
                tracing::error!(thread_id = self.id(), ?err, message = "failed to set exit latch");
            }

            let must_destroy = state.detached || !state.started;
            if must_destroy {
                state.destroyed = true;
                drop(state.join_handle.take());
            }
            tracing::debug!(
                thread_id = self.id(),
                exit_code = state.exit_code,
                detached = state.detached,
                message = "thread exited"
            );
            must_destroy
        };

        if must_destroy {
            self.release_resources();
        }
    }

    /// Tear down an object whose creation failed after allocation.
    pub(super) fn abandon(&self) {
        {
            let mut state = self.lock_state_recover();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
        }
        self.release_resources();
    }

    /// Release in order: start routine, exit latch, callback queue, registry entry.
    /// The caller has already set `destroyed`, so this runs once.
    fn release_resources(&self) {
        let routine = self
            .start_routine
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        drop(routine);

        // The exit latch stays readable for waiters that already poll it.
        self.exited_latch.uninit();
        self.apc_queue.uninit();
        if let Some(registry) = &self.registry {
            registry.remove(self.id());
        }

        tracing::debug!(thread_id = self.id(), message = "thread object destroyed");
    }
}
