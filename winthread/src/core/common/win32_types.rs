// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Numeric values shared with the Win32 API. Only the values that this crate can
//! actually produce are defined here.

/// Numeric thread id, as returned by `GetCurrentThreadId` / `GetThreadId`.
pub type ThreadId32 = u32;

/// A Win32 error code, as stored in the per-thread last-error slot.
pub type Win32ErrorCode = u32;

/// Timeout value meaning "wait forever".
pub const INFINITE: u32 = u32::MAX;

pub const WAIT_OBJECT_0: u32 = 0x0000_0000;
pub const WAIT_TIMEOUT: u32 = 0x0000_0102;
pub const WAIT_IO_COMPLETION: u32 = 0x0000_00C0;
pub const WAIT_FAILED: u32 = u32::MAX;

/// Exit code reported for a thread that has not exited yet.
pub const STILL_ACTIVE: u32 = 259;

/// Exit code recorded when a start routine panics instead of returning. This is the
/// value Windows reports for an unhandled exception (`STATUS_UNHANDLED_EXCEPTION`).
pub const EXIT_CODE_PANICKED: u32 = 0xC000_0409;

/// Creation flag: create the thread pending and start it with `resume_thread`.
pub const CREATE_SUSPENDED: u32 = 0x0000_0004;

/// Largest number of handles a single multi-wait accepts.
pub const MAXIMUM_WAIT_OBJECTS: usize = 64;

pub const ERROR_SUCCESS: Win32ErrorCode = 0;
pub const ERROR_INVALID_HANDLE: Win32ErrorCode = 6;
pub const ERROR_NOT_ENOUGH_MEMORY: Win32ErrorCode = 8;
pub const ERROR_INVALID_PARAMETER: Win32ErrorCode = 87;
pub const ERROR_CALL_NOT_IMPLEMENTED: Win32ErrorCode = 120;
pub const ERROR_INTERNAL_ERROR: Win32ErrorCode = 1359;
