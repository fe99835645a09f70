// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::time::Duration;

use super::with_global_runtime;
use crate::{Handle, INFINITE, WAIT_FAILED, WaitMode};

/// Milliseconds to an optional [`Duration`], [`INFINITE`] being [`None`].
#[must_use]
pub fn timeout_from_millis(milliseconds: u32) -> Option<Duration> {
    (milliseconds != INFINITE).then(|| Duration::from_millis(milliseconds.into()))
}

/// `WaitForSingleObject`. Returns `WAIT_OBJECT_0`, `WAIT_TIMEOUT`, or `WAIT_FAILED`.
pub fn wait_for_single_object(handle: &Handle, milliseconds: u32) -> u32 {
    wait_for_single_object_ex(handle, milliseconds, false)
}

/// `WaitForSingleObjectEx`. When `alertable`, may also return `WAIT_IO_COMPLETION`
/// after running callbacks queued to the calling thread.
pub fn wait_for_single_object_ex(handle: &Handle, milliseconds: u32, alertable: bool) -> u32 {
    with_global_runtime(WAIT_FAILED, |runtime| {
        runtime
            .wait_for_handle_ex(handle, timeout_from_millis(milliseconds), alertable)
            .map(crate::WaitOutcome::as_win32)
    })
}

/// `WaitForMultipleObjects`. Returns `WAIT_OBJECT_0 + index` of the first signaled
/// handle (or `WAIT_OBJECT_0` when `wait_all`), `WAIT_TIMEOUT`, or `WAIT_FAILED`.
pub fn wait_for_multiple_objects(handles: &[Handle], wait_all: bool, milliseconds: u32) -> u32 {
    let mode = if wait_all { WaitMode::All } else { WaitMode::Any };
    with_global_runtime(WAIT_FAILED, |runtime| {
        runtime
            .wait_for_handles_ex(handles, mode, timeout_from_millis(milliseconds), false)
            .map(crate::WaitOutcome::as_win32)
    })
}

/// `SleepEx`. Returns `0` when the time elapsed, or `WAIT_IO_COMPLETION` when an
/// alertable sleep ended early because queued callbacks ran.
pub fn sleep_ex(milliseconds: u32, alertable: bool) -> u32 {
    with_global_runtime(0, |runtime| {
        runtime
            .sleep_ex(timeout_from_millis(milliseconds), alertable)
            .map(|outcome| match outcome {
                crate::WaitOutcome::IoCompletion => crate::WAIT_IO_COMPLETION,
                crate::WaitOutcome::Signaled(_) | crate::WaitOutcome::Timeout => 0,
            })
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(INFINITE, None)]
    #[test_case(0, Some(Duration::ZERO))]
    #[test_case(1_500, Some(Duration::from_millis(1_500)))]
    fn test_timeout_from_millis(milliseconds: u32, expected: Option<Duration>) {
        assert_eq!(timeout_from_millis(milliseconds), expected);
    }
}
