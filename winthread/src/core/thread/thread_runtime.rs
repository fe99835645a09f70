// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words APCs alertable

use std::{panic::resume_unwind,
          sync::{Arc, OnceLock},
          time::Duration};

use super::{CancelOutcome, CreationMode, ExitThreadRequest, ResumeOutcome,
            StartRoutine, ThreadObject, ThreadObjectArgs, ThreadOrigin, ThreadRegistry,
            current_thread::{allocate_thread_id, bound_thread_object},
            current_thread_id};
use crate::{ApcItem, Handle, ThreadApiError, ThreadId32, ThreadRuntimeConfig,
            WaitMode, WaitOutcome, YieldStrategy, deadline_from, poll_until,
            wait_for_handles_alertable};

static GLOBAL_RUNTIME: OnceLock<ThreadRuntime> = OnceLock::new();

/// Owns everything that is process-wide in the Win32 thread model: the configuration,
/// the optional [`ThreadRegistry`], and the thread object of the process-original
/// thread. Every lifecycle operation is a method here.
///
/// The thread that constructs a runtime becomes that runtime's process-original
/// thread. It is matched by identity in [`current_thread_object()`] and is never
/// created, started or destroyed through the lifecycle operations.
///
/// # Global vs injected
///
/// | Constructor             | Registry                   | Lifetime          |
/// | :---------------------- | :------------------------- | :---------------- |
/// | [`global()`]            | per [`from_env()`]         | init-once         |
/// | [`try_init_global()`]   | per the given config       | init-once         |
/// | [`new()`]               | per the given config       | owned by caller   |
/// | [`with_registry()`]     | the given one              | owned by caller   |
///
/// A global runtime is never torn down.
///
/// [`current_thread_object()`]: Self::current_thread_object
/// [`from_env()`]: ThreadRuntimeConfig::from_env
/// [`global()`]: Self::global
/// [`try_init_global()`]: Self::try_init_global
/// [`new()`]: Self::new
/// [`with_registry()`]: Self::with_registry
#[derive(Debug)]
pub struct ThreadRuntime {
    config: ThreadRuntimeConfig,
    registry: Option<Arc<ThreadRegistry>>,
    main_thread: Arc<ThreadObject>,
    main_identity: std::thread::ThreadId,
}

impl ThreadRuntime {
    /// # Errors
    ///
    /// Fails if the process-original thread object's primitives can't be created.
    pub fn new(config: ThreadRuntimeConfig) -> Result<Self, ThreadApiError> {
        let registry = config
            .track_threads
            .then(|| Arc::new(ThreadRegistry::default()));
        Self::build(config, registry)
    }

    /// Like [`new()`](Self::new), but always tracks threads in `registry`, regardless
    /// of [`ThreadRuntimeConfig::track_threads`].
    ///
    /// # Errors
    ///
    /// See [`new()`](Self::new).
    pub fn with_registry(
        config: ThreadRuntimeConfig,
        registry: Arc<ThreadRegistry>,
    ) -> Result<Self, ThreadApiError> {
        Self::build(config, Some(registry))
    }

    fn build(
        config: ThreadRuntimeConfig,
        registry: Option<Arc<ThreadRegistry>>,
    ) -> Result<Self, ThreadApiError> {
        let main_thread = ThreadObject::try_new(
            ThreadObjectArgs {
                id: current_thread_id(),
                origin: ThreadOrigin::ProcessMain,
                stack_size: 0,
                registry: None,
                rendezvous_timeout: config.rendezvous_timeout,
                capture_backtraces: config.capture_backtraces,
            },
            None,
        )?;
        Ok(Self {
            config,
            registry,
            main_thread,
            main_identity: std::thread::current().id(),
        })
    }

    /// The process-wide runtime, created on first use from
    /// [`ThreadRuntimeConfig::from_env()`].
    ///
    /// # Errors
    ///
    /// Fails if the runtime can't be created. A later call tries again.
    pub fn global() -> Result<&'static Self, ThreadApiError> {
        if let Some(it) = GLOBAL_RUNTIME.get() {
            return Ok(it);
        }
        Self::try_init_global(ThreadRuntimeConfig::from_env())
    }

    /// Create the process-wide runtime with `config`. If it already exists, the
    /// existing one is returned and `config` is ignored (with a warning).
    ///
    /// # Errors
    ///
    /// Fails if the runtime can't be created.
    pub fn try_init_global(
        config: ThreadRuntimeConfig,
    ) -> Result<&'static Self, ThreadApiError> {
        if let Some(it) = GLOBAL_RUNTIME.get() {
            if it.config != config {
                tracing::warn!(
                    message = "global thread runtime already initialized, ignoring config"
                );
            }
            return Ok(it);
        }
        let candidate = Self::new(config)?;
        Ok(GLOBAL_RUNTIME.get_or_init(|| candidate))
    }

    #[must_use]
    pub fn config(&self) -> &ThreadRuntimeConfig { &self.config }

    #[must_use]
    pub fn registry(&self) -> Option<&Arc<ThreadRegistry>> { self.registry.as_ref() }

    /// `CreateThread`. The closure carries the start routine's argument.
    ///
    /// With [`CreationMode::RunImmediately`] this returns once the launcher
    /// acknowledged the startup rendezvous (or its bounded wait expired). The start
    /// routine may not have begun yet.
    ///
    /// # Errors
    ///
    /// - [`ThreadApiError::ResourceInit`] if a primitive can't be created.
    /// - [`ThreadApiError::ThreadSpawn`] if the OS thread can't be spawned. The object
    ///   is torn down.
    pub fn create_thread(
        &self,
        start_routine: impl FnOnce() -> u32 + Send + 'static,
        stack_size: usize,
        creation_mode: CreationMode,
    ) -> Result<Handle, ThreadApiError> {
        let routine: StartRoutine = Box::new(start_routine);
        let object = ThreadObject::try_new(
            ThreadObjectArgs {
                id: allocate_thread_id(),
                origin: ThreadOrigin::Created,
                stack_size,
                registry: self.registry.clone(),
                rendezvous_timeout: self.config.rendezvous_timeout,
                capture_backtraces: self.config.capture_backtraces,
            },
            Some(routine),
        )?;

        let started = match creation_mode {
            // A pending thread reads as signaled until it is resumed.
            CreationMode::Suspended => {
                object.exit_latch().set().map_err(ThreadApiError::from)
            }
            CreationMode::RunImmediately => object
                .lock_state()
                .and_then(|mut state| object.start(&mut state).map(|_| ())),
        };

        if let Err(err) = started {
            object.abandon();
            return Err(err);
        }

        tracing::debug!(
            thread_id = object.id(),
            stack_size,
            ?creation_mode,
            message = "thread created"
        );
        Ok(Handle::new(object))
    }

    /// `CreateRemoteThread`. Cross-process creation is not supported.
    ///
    /// # Errors
    ///
    /// Always [`ThreadApiError::NotImplemented`].
    pub fn create_remote_thread(&self) -> Result<Handle, ThreadApiError> {
        tracing::error!(message = "CreateRemoteThread is not implemented");
        Err(ThreadApiError::NotImplemented {
            operation: "CreateRemoteThread",
        })
    }

    /// `ResumeThread`. Starts a thread created with [`CreationMode::Suspended`].
    ///
    /// # Errors
    ///
    /// [`ThreadApiError::InvalidHandle`] for a destroyed or non-thread handle, or the
    /// start failure. A failed start leaves the thread pending.
    pub fn resume_thread(&self, handle: &Handle) -> Result<ResumeOutcome, ThreadApiError> {
        thread_object(handle)?.resume()
    }

    /// `SuspendThread`. Suspending a running thread is not supported.
    ///
    /// # Errors
    ///
    /// Always fails: [`ThreadApiError::InvalidHandle`] for a bad handle, otherwise
    /// [`ThreadApiError::NotImplemented`].
    pub fn suspend_thread(&self, handle: &Handle) -> Result<u32, ThreadApiError> {
        let object = thread_object(handle)?;
        tracing::error!(thread_id = object.id(), message = "SuspendThread is not implemented");
        Err(ThreadApiError::NotImplemented {
            operation: "SuspendThread",
        })
    }

    /// `TerminateThread`. Marks the thread exited with `exit_code` and sets its exit
    /// latch. See [`CancelOutcome`] for what happens to the OS thread.
    ///
    /// # Errors
    ///
    /// [`ThreadApiError::InvalidHandle`] for a destroyed or non-thread handle.
    pub fn terminate_thread(
        &self,
        handle: &Handle,
        exit_code: u32,
    ) -> Result<CancelOutcome, ThreadApiError> {
        thread_object(handle)?.terminate(exit_code)
    }

    /// `ExitThread`. Leaves the calling thread's start routine by unwinding with an
    /// [`ExitThreadRequest`] payload that the launcher catches. Destructors of the
    /// routine's locals run. A `catch_unwind` inside the routine would swallow the
    /// request, so don't wrap calls to this in one.
    ///
    /// Called on a thread without a launcher (the process-original thread, or a thread
    /// spawned outside this crate), the unwind ends that thread like an uncaught panic.
    pub fn exit_thread(&self, exit_code: u32) -> ! {
        match self.current_thread_object() {
            Ok(object) if !object.is_process_main() => {
                tracing::debug!(thread_id = object.id(), exit_code, message = "exit requested");
            }
            _ => {
                tracing::error!(
                    thread_id = current_thread_id(),
                    exit_code,
                    message = "exit requested on a thread without a launcher"
                );
            }
        }
        resume_unwind(Box::new(ExitThreadRequest { exit_code }))
    }

    /// `GetExitCodeThread`. [`STILL_ACTIVE`](crate::STILL_ACTIVE) until the thread
    /// exited. Never blocks.
    ///
    /// # Errors
    ///
    /// [`ThreadApiError::InvalidHandle`] for a destroyed or non-thread handle.
    pub fn get_exit_code_thread(&self, handle: &Handle) -> Result<u32, ThreadApiError> {
        thread_object(handle)?.exit_code()
    }

    /// `QueueUserAPC`. `item` runs on the target thread at its next alertable point or,
    /// at the latest, when it exits.
    ///
    /// # Errors
    ///
    /// - [`ThreadApiError::InvalidHandle`] for a destroyed or non-thread handle.
    /// - [`ThreadApiError::CallbackQueueClosed`] if the target already exited.
    pub fn queue_user_apc(
        &self,
        handle: &Handle,
        item: impl Into<ApcItem>,
    ) -> Result<(), ThreadApiError> {
        thread_object(handle)?.queue_callback(item.into())
    }

    /// The calling thread's object: the process-original thread's singleton when
    /// called from the thread that built this runtime, otherwise the object bound by
    /// the launcher.
    ///
    /// # Errors
    ///
    /// [`ThreadApiError::NotAManagedThread`] for a thread spawned outside this crate.
    pub fn current_thread_object(&self) -> Result<Arc<ThreadObject>, ThreadApiError> {
        if std::thread::current().id() == self.main_identity {
            return Ok(Arc::clone(&self.main_thread));
        }
        bound_thread_object().ok_or(ThreadApiError::NotAManagedThread)
    }

    /// `GetCurrentThread`.
    ///
    /// # Errors
    ///
    /// See [`current_thread_object()`](Self::current_thread_object).
    pub fn get_current_thread(&self) -> Result<Handle, ThreadApiError> {
        self.current_thread_object()
            .map(|object| Handle::new(object))
    }

    /// `GetCurrentThreadId`.
    #[must_use]
    pub fn get_current_thread_id(&self) -> ThreadId32 { current_thread_id() }

    /// `GetThreadId`.
    ///
    /// # Errors
    ///
    /// [`ThreadApiError::InvalidHandle`] for a destroyed or non-thread handle.
    pub fn get_thread_id(&self, handle: &Handle) -> Result<ThreadId32, ThreadApiError> {
        thread_object(handle).map(|it| it.id())
    }

    /// `SwitchToThread`. Gives up the rest of the time slice according to
    /// [`ThreadRuntimeConfig::yield_strategy`].
    pub fn switch_to_thread(&self) -> bool {
        match self.config.yield_strategy {
            YieldStrategy::SchedYield => std::thread::yield_now(),
            YieldStrategy::Sleep(duration) => std::thread::sleep(duration),
        }
        true
    }

    /// `SleepEx`. [`None`] sleeps forever. When `alertable`, callbacks queued to the
    /// calling thread run and the sleep ends early with [`WaitOutcome::IoCompletion`].
    /// Otherwise the result is [`WaitOutcome::Timeout`].
    ///
    /// # Errors
    ///
    /// Fails if `poll(2)` or the callback queue fails.
    pub fn sleep_ex(
        &self,
        timeout: Option<Duration>,
        alertable: bool,
    ) -> Result<WaitOutcome, ThreadApiError> {
        let deadline = deadline_from(timeout);
        let alertable_object = self.alertable_object(alertable);

        loop {
            if let Some(object) = &alertable_object {
                if object.apc_queue().execute_pending()? > 0 {
                    return Ok(WaitOutcome::IoCompletion);
                }
            }

            let mut poll_fds: Vec<_> = alertable_object
                .as_ref()
                .and_then(|object| object.apc_queue().pending_descriptor())
                .map(|fd| {
                    rustix::event::PollFd::from_borrowed_fd(fd, rustix::event::PollFlags::IN)
                })
                .into_iter()
                .collect();

            let ready =
                poll_until(&mut poll_fds, deadline).map_err(ThreadApiError::WaitFailed)?;
            if ready == 0 {
                return Ok(WaitOutcome::Timeout);
            }
        }
    }

    /// `WaitForSingleObjectEx`.
    ///
    /// # Errors
    ///
    /// See [`wait_for_handles_ex()`](Self::wait_for_handles_ex).
    pub fn wait_for_handle_ex(
        &self,
        handle: &Handle,
        timeout: Option<Duration>,
        alertable: bool,
    ) -> Result<WaitOutcome, ThreadApiError> {
        self.wait_for_handles_ex(std::slice::from_ref(handle), WaitMode::Any, timeout, alertable)
    }

    /// `WaitForMultipleObjectsEx`. A signaled handle wins over pending callbacks. When
    /// `alertable` and no handle is signaled, callbacks queued to the calling thread run
    /// and the wait ends with [`WaitOutcome::IoCompletion`].
    ///
    /// # Errors
    ///
    /// See [`wait_for_handles()`](crate::wait_for_handles).
    pub fn wait_for_handles_ex(
        &self,
        handles: &[Handle],
        mode: WaitMode,
        timeout: Option<Duration>,
        alertable: bool,
    ) -> Result<WaitOutcome, ThreadApiError> {
        let deadline = deadline_from(timeout);
        let Some(object) = self.alertable_object(alertable) else {
            return wait_for_handles_alertable(handles, mode, deadline, None);
        };

        loop {
            let alert = object.apc_queue().pending_descriptor();
            match wait_for_handles_alertable(handles, mode, deadline, alert)? {
                WaitOutcome::IoCompletion => {
                    if object.apc_queue().execute_pending()? > 0 {
                        return Ok(WaitOutcome::IoCompletion);
                    }
                }
                other => return Ok(other),
            }
        }
    }

    fn alertable_object(&self, alertable: bool) -> Option<Arc<ThreadObject>> {
        if !alertable {
            return None;
        }
        match self.current_thread_object() {
            Ok(object) => Some(object),
            Err(_) => {
                tracing::debug!(
                    thread_id = current_thread_id(),
                    message = "alertable wait on a thread without a callback queue"
                );
                None
            }
        }
    }
}

/// Kind-checked, liveness-checked access to a thread handle.
fn thread_object(handle: &Handle) -> Result<Arc<ThreadObject>, ThreadApiError> {
    handle
        .downcast::<ThreadObject>()
        .filter(|object| crate::WaitableHandle::is_handled(object.as_ref()))
        .ok_or(ThreadApiError::InvalidHandle)
}
