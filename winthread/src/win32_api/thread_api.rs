// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::panic::resume_unwind;

use super::with_global_runtime;
use crate::{CreationMode, ERROR_INVALID_PARAMETER, ExitThreadRequest, Handle,
            LastError, ThreadApiError, ThreadId32, ThreadRuntime, UserApcItem,
            current_thread_id};

/// `CreateThread`. Returns [`None`] on failure. `thread_id` receives the id of the new
/// thread, which is what [`get_current_thread_id()`] returns on that thread.
///
/// `creation_flags` honors [`CREATE_SUSPENDED`](crate::CREATE_SUSPENDED) and ignores
/// every other bit. A `stack_size` of `0` uses the host default.
pub fn create_thread<A: Send + 'static>(
    stack_size: usize,
    start_address: fn(A) -> u32,
    parameter: A,
    creation_flags: u32,
    thread_id: Option<&mut ThreadId32>,
) -> Option<Handle> {
    let handle = with_global_runtime(None, |runtime| {
        runtime
            .create_thread(
                move || start_address(parameter),
                stack_size,
                CreationMode::from_creation_flags(creation_flags),
            )
            .map(Some)
    })?;

    if let Some(thread_id) = thread_id {
        *thread_id = get_thread_id(&handle);
    }
    Some(handle)
}

/// `CreateRemoteThread`. Always fails with `ERROR_CALL_NOT_IMPLEMENTED`.
pub fn create_remote_thread(
    _process_id: u32,
    _stack_size: usize,
    _start_address: fn(usize) -> u32,
    _parameter: usize,
    _creation_flags: u32,
    _thread_id: Option<&mut ThreadId32>,
) -> Option<Handle> {
    with_global_runtime(None, |runtime| runtime.create_remote_thread().map(Some))
}

/// `ResumeThread`. Returns the previous suspend count (`0` or `1`), or `u32::MAX`
/// on failure.
pub fn resume_thread(thread: &Handle) -> u32 {
    with_global_runtime(u32::MAX, |runtime| {
        runtime.resume_thread(thread).map(|outcome| match outcome {
            crate::ResumeOutcome::Started => 1,
            crate::ResumeOutcome::AlreadyStarted
            | crate::ResumeOutcome::TerminatedBeforeStart => 0,
        })
    })
}

/// `SuspendThread`. Always fails with `ERROR_CALL_NOT_IMPLEMENTED` and returns
/// `u32::MAX`.
pub fn suspend_thread(thread: &Handle) -> u32 {
    with_global_runtime(u32::MAX, |runtime| runtime.suspend_thread(thread))
}

/// `TerminateThread`. `true` even when the host can't stop a running thread, since the
/// object is marked exited either way. Use [`ThreadRuntime::terminate_thread()`] to
/// find out which happened.
pub fn terminate_thread(thread: &Handle, exit_code: u32) -> bool {
    with_global_runtime(false, |runtime| {
        runtime.terminate_thread(thread, exit_code).map(|_| true)
    })
}

/// `ExitThread`. See [`ThreadRuntime::exit_thread()`].
pub fn exit_thread(exit_code: u32) -> ! {
    match ThreadRuntime::global() {
        Ok(runtime) => runtime.exit_thread(exit_code),
        Err(_) => resume_unwind(Box::new(ExitThreadRequest { exit_code })),
    }
}

/// `GetExitCodeThread`. Writes [`STILL_ACTIVE`](crate::STILL_ACTIVE) while the thread
/// runs.
pub fn get_exit_code_thread(thread: &Handle, exit_code: &mut u32) -> bool {
    with_global_runtime(false, |runtime| {
        *exit_code = runtime.get_exit_code_thread(thread)?;
        Ok(true)
    })
}

/// `CloseHandle`.
pub fn close_handle(object: Handle) -> bool {
    match crate::close_handle(object) {
        Ok(_) => true,
        Err(err) => {
            LastError::set(err.last_error_code());
            false
        }
    }
}

/// `QueueUserAPC`. Returns nonzero on success. Every failure is reported as
/// `ERROR_INVALID_PARAMETER`, and `apc` never runs in that case.
pub fn queue_user_apc(apc: fn(usize), thread: &Handle, data: usize) -> u32 {
    let queued = with_global_runtime(false, |runtime| {
        runtime
            .queue_user_apc(thread, UserApcItem::from_fn(apc, data))
            .map(|()| true)
    });
    if queued {
        1
    } else {
        LastError::set(ERROR_INVALID_PARAMETER);
        0
    }
}

/// `GetCurrentThread`. [`None`] on a thread spawned outside this crate.
#[must_use]
pub fn get_current_thread() -> Option<Handle> {
    with_global_runtime(None, |runtime| runtime.get_current_thread().map(Some))
}

/// `GetCurrentThreadId`.
#[must_use]
pub fn get_current_thread_id() -> ThreadId32 { current_thread_id() }

/// `GetThreadId`. `0` on failure.
#[must_use]
pub fn get_thread_id(thread: &Handle) -> ThreadId32 {
    with_global_runtime(0, |runtime| runtime.get_thread_id(thread))
}

/// `SwitchToThread`.
pub fn switch_to_thread() -> bool {
    with_global_runtime(false, |runtime| Ok(runtime.switch_to_thread()))
}

/// `DumpThreadHandles`. Logs every registered thread at `debug!` level.
pub fn dump_thread_handles() {
    with_global_runtime((), |runtime| {
        match runtime.registry() {
            Some(registry) => {
                registry.dump_thread_handles();
            }
            None => tracing::debug!(message = "thread tracking is disabled"),
        }
        Ok::<(), ThreadApiError>(())
    });
}
