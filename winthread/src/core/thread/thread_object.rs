// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{any::Any,
          backtrace::Backtrace,
          fmt::{Debug, Formatter},
          os::fd::BorrowedFd,
          sync::{Arc, Mutex, MutexGuard, PoisonError},
          thread::JoinHandle,
          time::Duration};

use super::{StartRoutine, StartupRendezvous, ThreadOrigin, ThreadRegistry,
            ThreadSnapshot};
use crate::{ApcQueue, CloseOutcome, HandleKind, STILL_ACTIVE, SignalLatch,
            ThreadApiError, ThreadId32, WaitableHandle};

/// One emulated thread, referred to by one or more [`Handle`] clones.
///
/// # Owned primitives
///
/// | Field           | Guards / signals                                    |
/// | :-------------- | :-------------------------------------------------- |
/// | `state`         | every flag below plus the exit code and join handle |
/// | `exited_latch`  | "finished or not running"; the waitable descriptor  |
/// | `rendezvous`    | startup handshake only, never used afterwards       |
/// | `apc_queue`     | callbacks queued to this thread                     |
///
/// # Destruction
///
/// Exactly once, by whichever of [`close_handle()`] and the launcher's exit path
/// decides it under the `state` lock:
/// - [`close_handle()`] destroys when the thread never started or the exit latch is
///   already set. Otherwise it marks the object detached.
/// - The launcher destroys when, at the moment it sets the exit latch, the object is
///   detached.
///
/// Lock order: `state`, then the exit latch's own mutex. The latch never calls back
/// into the object.
///
/// [`Handle`]: crate::Handle
/// [`close_handle()`]: crate::close_handle
pub struct ThreadObject {
    id: ThreadId32,
    origin: ThreadOrigin,
    stack_size: usize,
    pub(super) start_routine: Mutex<Option<StartRoutine>>,
    pub(super) state: Mutex<ThreadState>,
    pub(super) exited_latch: SignalLatch,
    pub(super) rendezvous: StartupRendezvous,
    pub(super) apc_queue: ApcQueue,
    pub(super) registry: Option<Arc<ThreadRegistry>>,
    pub(super) rendezvous_timeout: Duration,
    pub(super) capture_backtraces: bool,
    create_backtrace: Option<Backtrace>,
}

#[derive(Debug)]
pub(super) struct ThreadState {
    pub started: bool,
    pub exited: bool,
    pub finished: bool,
    pub detached: bool,
    pub joined: bool,
    pub destroyed: bool,
    pub exit_code: u32,
    pub join_handle: Option<JoinHandle<()>>,
    pub os_identity: Option<std::thread::ThreadId>,
    pub exit_backtrace: Option<Backtrace>,
}

/// Construction parameters shared by both origins.
#[derive(Debug)]
pub(super) struct ThreadObjectArgs {
    pub id: ThreadId32,
    pub origin: ThreadOrigin,
    pub stack_size: usize,
    pub registry: Option<Arc<ThreadRegistry>>,
    pub rendezvous_timeout: Duration,
    pub capture_backtraces: bool,
}

impl ThreadObject {
    /// Allocate the object and its primitives. If the callback queue can't be created,
    /// the already created exit latch is released when this returns.
    pub(super) fn try_new(
        args: ThreadObjectArgs,
        start_routine: Option<StartRoutine>,
    ) -> Result<Arc<Self>, ThreadApiError> {
        let ThreadObjectArgs {
            id,
            origin,
            stack_size,
            registry,
            rendezvous_timeout,
            capture_backtraces,
        } = args;

        let exited_latch =
            SignalLatch::try_new().map_err(|source| ThreadApiError::ResourceInit {
                which: "exit latch",
                source,
            })?;
        let apc_queue =
            ApcQueue::try_new().map_err(|source| ThreadApiError::ResourceInit {
                which: "callback queue",
                source,
            })?;

        let is_main = origin == ThreadOrigin::ProcessMain;

        Ok(Arc::new(Self {
            id,
            origin,
            stack_size,
            start_routine: Mutex::new(start_routine),
            state: Mutex::new(ThreadState {
                started: is_main,
                exited: false,
                finished: false,
                detached: false,
                joined: false,
                destroyed: false,
                exit_code: STILL_ACTIVE,
                join_handle: None,
                os_identity: is_main.then(|| std::thread::current().id()),
                exit_backtrace: None,
            }),
            exited_latch,
            rendezvous: StartupRendezvous::default(),
            apc_queue,
            registry,
            rendezvous_timeout,
            capture_backtraces,
            create_backtrace: capture_backtraces.then(Backtrace::force_capture),
        }))
    }

    /// Same value that [`current_thread_id()`](crate::current_thread_id) returns on the
    /// thread itself.
    #[must_use]
    pub fn id(&self) -> ThreadId32 { self.id }

    #[must_use]
    pub fn origin(&self) -> ThreadOrigin { self.origin }

    #[must_use]
    pub fn is_process_main(&self) -> bool { self.origin == ThreadOrigin::ProcessMain }

    /// Requested stack size in bytes. `0` means the host default.
    #[must_use]
    pub fn stack_size(&self) -> usize { self.stack_size }

    /// Identity of the backing OS thread, once it was spawned.
    #[must_use]
    pub fn os_identity(&self) -> Option<std::thread::ThreadId> {
        self.lock_state_recover().os_identity
    }

    #[must_use]
    pub fn create_backtrace(&self) -> Option<&Backtrace> { self.create_backtrace.as_ref() }

    /// Rendered exit backtrace, if backtraces are captured and the thread finished.
    #[must_use]
    pub fn exit_backtrace(&self) -> Option<String> {
        self.lock_state_recover()
            .exit_backtrace
            .as_ref()
            .map(ToString::to_string)
    }

    #[must_use]
    pub fn snapshot(&self) -> ThreadSnapshot {
        let state = self.lock_state_recover();
        ThreadSnapshot {
            thread_id: self.id,
            origin: self.origin,
            started: state.started,
            exited: state.exited,
            finished: state.finished,
            detached: state.detached,
            joined: state.joined,
            destroyed: state.destroyed,
            exit_code: state.exit_code,
        }
    }

    #[must_use]
    pub fn exit_latch(&self) -> &SignalLatch { &self.exited_latch }

    #[must_use]
    pub fn apc_queue(&self) -> &ApcQueue { &self.apc_queue }

    pub(super) fn lock_state(&self) -> Result<MutexGuard<'_, ThreadState>, ThreadApiError> {
        self.state.lock().map_err(|_| ThreadApiError::MutexPoisoned {
            which: "thread state",
        })
    }

    /// For teardown and diagnostics, which must always make progress. Every writer
    /// leaves the flags consistent before it can panic, so a poisoned guard is usable.
    pub(super) fn lock_state_recover(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for ThreadObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadObject")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("stack_size", &self.stack_size)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl WaitableHandle for ThreadObject {
    fn handle_kind(&self) -> HandleKind { HandleKind::Thread }

    fn is_handled(&self) -> bool { !self.lock_state_recover().destroyed }

    fn descriptor(&self) -> Option<BorrowedFd<'_>> { self.exited_latch.descriptor() }

    fn close_handle(&self) -> Result<CloseOutcome, ThreadApiError> { self.close() }

    fn cleanup_after_wait(&self) -> Result<(), ThreadApiError> { self.join_if_finished() }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
}
