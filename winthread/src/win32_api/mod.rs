// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words APCs

//! Win32-shaped entry points over [`ThreadRuntime::global()`].
//!
//! These keep the Win32 calling conventions so that ported code reads the same:
//! failures are reported through a sentinel return value (`None`, `false`,
//! `u32::MAX`, [`WAIT_FAILED`]) and the reason is left in a per-thread slot read by
//! [`get_last_error()`]. Successful calls do not clear that slot, as on Windows.
//!
//! Timeouts are milliseconds, with [`INFINITE`] meaning "wait forever".
//!
//! New Rust code should prefer the methods on [`ThreadRuntime`], which return
//! [`Result`]s and self-documenting outcome enums.
//!
//! [`ThreadRuntime`]: crate::ThreadRuntime
//! [`ThreadRuntime::global()`]: crate::ThreadRuntime::global

// Attach sources.
mod thread_api;
mod wait_api;

// Re-export.
pub use thread_api::*;
pub use wait_api::*;

pub use crate::core::common::{CREATE_SUSPENDED, ERROR_CALL_NOT_IMPLEMENTED,
                              ERROR_INTERNAL_ERROR, ERROR_INVALID_HANDLE,
                              ERROR_INVALID_PARAMETER, ERROR_NOT_ENOUGH_MEMORY,
                              ERROR_SUCCESS, EXIT_CODE_PANICKED, INFINITE,
                              MAXIMUM_WAIT_OBJECTS, STILL_ACTIVE, WAIT_FAILED,
                              WAIT_IO_COMPLETION, WAIT_OBJECT_0, WAIT_TIMEOUT};
use crate::{LastError, ThreadApiError, ThreadRuntime, Win32ErrorCode};

/// `GetLastError`.
#[must_use]
pub fn get_last_error() -> Win32ErrorCode { LastError::get() }

/// `SetLastError`.
pub fn set_last_error(code: Win32ErrorCode) { LastError::set(code); }

/// Run `op` against the global runtime. On failure, record the error's Win32 code and
/// return `sentinel`.
fn with_global_runtime<T>(
    sentinel: T,
    op: impl FnOnce(&ThreadRuntime) -> Result<T, ThreadApiError>,
) -> T {
    match ThreadRuntime::global().and_then(op) {
        Ok(it) => it,
        Err(err) => {
            tracing::debug!(?err, code = err.last_error_code(), message = "win32 call failed");
            LastError::set(err.last_error_code());
            sentinel
        }
    }
}
