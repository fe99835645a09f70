// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{ERROR_CALL_NOT_IMPLEMENTED, ERROR_INTERNAL_ERROR, ERROR_INVALID_HANDLE,
            ERROR_INVALID_PARAMETER, ERROR_NOT_ENOUGH_MEMORY, Win32ErrorCode};
use crate::SignalLatchError;

/// Errors from the thread lifecycle operations on [`ThreadRuntime`] and from the
/// generic wait functions.
///
/// Non-fatal "already in that state" results are not errors. They are reported through
/// outcome enums like [`ResumeOutcome`] and [`CloseOutcome`].
///
/// Every variant maps onto a Win32 error code via [`last_error_code()`], which is what
/// the [`win32_api`] adapters store in the per-thread last-error slot.
///
/// [`ThreadRuntime`]: crate::ThreadRuntime
/// [`ResumeOutcome`]: crate::ResumeOutcome
/// [`CloseOutcome`]: crate::CloseOutcome
/// [`last_error_code()`]: Self::last_error_code
/// [`win32_api`]: crate::win32_api
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ThreadApiError {
    /// The handle does not refer to a live object of the expected kind.
    #[error("Invalid handle")]
    #[diagnostic(
        code(r3bl_winthread::invalid_handle),
        help("The handle was already closed, or it refers to a different kind of object")
    )]
    InvalidHandle,

    /// One of the primitives owned by a thread object could not be created. Everything
    /// that was already constructed has been released.
    #[error("Failed to initialize thread resource ({which})")]
    #[diagnostic(code(r3bl_winthread::resource_init))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "Check OS resource limits - \
             use `ulimit -n` for file descriptors, \
             `cat /proc/sys/fs/file-max` for system-wide limit"
        ))
    )]
    #[cfg_attr(
        target_os = "macos",
        diagnostic(help(
            "Check OS resource limits - \
             use `ulimit -n` for file descriptors, \
             `launchctl limit maxfiles` for system-wide limit"
        ))
    )]
    ResourceInit {
        /// Which resource failed (`"exit latch"` or `"callback queue"`).
        which: &'static str,
        #[source]
        source: SignalLatchError,
    },

    /// The operation is not supported by this emulation and is never attempted.
    #[error("{operation} is not implemented")]
    #[diagnostic(
        code(r3bl_winthread::not_implemented),
        help("Suspending a running thread and cross-process thread creation are unsupported")
    )]
    NotImplemented { operation: &'static str },

    /// [`std::thread::Builder::spawn()`] failed.
    #[error("Failed to spawn OS thread")]
    #[diagnostic(code(r3bl_winthread::thread_spawn))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `cat /proc/sys/kernel/threads-max` for system-wide limit"
        ))
    )]
    #[cfg_attr(
        target_os = "macos",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `sysctl kern.num_taskthreads` for per-process limit"
        ))
    )]
    ThreadSpawn(#[source] std::io::Error),

    /// Internal mutex was poisoned by a prior thread panic.
    #[error("Internal mutex poisoned ({which})")]
    #[diagnostic(
        code(r3bl_winthread::mutex_poisoned),
        help(
            "A prior thread panicked while holding a thread object lock. \
             Consider restarting the application."
        )
    )]
    MutexPoisoned {
        /// Which mutex was poisoned (`"thread state"`, `"registry"`, ...).
        which: &'static str,
    },

    /// The calling thread was neither created through this crate nor the thread that
    /// constructed the runtime.
    #[error("The calling thread is not managed by this runtime")]
    #[diagnostic(
        code(r3bl_winthread::not_a_managed_thread),
        help("Only threads started with `create_thread` have a thread object")
    )]
    NotAManagedThread,

    /// The target thread has exited, or its callback queue was torn down.
    #[error("The target thread no longer accepts queued callbacks")]
    #[diagnostic(code(r3bl_winthread::callback_queue_closed))]
    CallbackQueueClosed,

    /// A parameter was out of range (empty handle list, too many handles, ...).
    #[error("Invalid parameter: {reason}")]
    #[diagnostic(code(r3bl_winthread::invalid_parameter))]
    InvalidParameter { reason: &'static str },

    /// Joining the OS thread failed because it panicked outside of its start routine.
    #[error("Failed to join OS thread")]
    #[diagnostic(code(r3bl_winthread::join_failed))]
    JoinFailed,

    /// `poll(2)` on the handle descriptors failed.
    #[error("Wait on handle descriptors failed")]
    #[diagnostic(code(r3bl_winthread::wait_failed))]
    WaitFailed(#[source] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Latch(#[from] SignalLatchError),
}

impl ThreadApiError {
    /// The Win32 error code that best describes this error.
    #[must_use]
    pub fn last_error_code(&self) -> Win32ErrorCode {
        match self {
            Self::InvalidHandle | Self::NotAManagedThread => ERROR_INVALID_HANDLE,
            Self::ResourceInit { .. } | Self::ThreadSpawn(_) => ERROR_NOT_ENOUGH_MEMORY,
            Self::NotImplemented { .. } => ERROR_CALL_NOT_IMPLEMENTED,
            Self::CallbackQueueClosed | Self::InvalidParameter { .. } => {
                ERROR_INVALID_PARAMETER
            }
            Self::MutexPoisoned { .. }
            | Self::JoinFailed
            | Self::WaitFailed(_)
            | Self::Latch(_) => ERROR_INTERNAL_ERROR,
        }
    }
}
