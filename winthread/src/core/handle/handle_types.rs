// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{WAIT_FAILED, WAIT_IO_COMPLETION, WAIT_OBJECT_0, WAIT_TIMEOUT};

/// The kinds of object a [`Handle`] can refer to.
///
/// [`Handle`]: super::Handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[non_exhaustive]
pub enum HandleKind {
    Thread,
}

/// Result of a successful [`close_handle()`](super::close_handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The object was released synchronously.
    Destroyed,
    /// The object is still running. It releases itself when it finishes.
    Detached,
    /// The handle is a pseudo handle (the process-original thread). Nothing to do.
    PseudoHandle,
}

/// How [`wait_for_handles()`](super::wait_for_handles) treats several handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Return as soon as any one handle is signaled.
    #[default]
    Any,
    /// Return once every handle is signaled at the same time.
    All,
}

/// Result of a wait that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Index of the signaled handle ([`WaitMode::Any`]), or `0` ([`WaitMode::All`]).
    Signaled(usize),
    Timeout,
    /// An alertable wait was interrupted because queued callbacks ran.
    IoCompletion,
}

impl WaitOutcome {
    /// The `WAIT_*` value that `WaitForSingleObject` / `WaitForMultipleObjects` return.
    #[must_use]
    pub fn as_win32(self) -> u32 {
        match self {
            Self::Signaled(index) => u32::try_from(index)
                .ok()
                .and_then(|it| WAIT_OBJECT_0.checked_add(it))
                .unwrap_or(WAIT_FAILED),
            Self::Timeout => WAIT_TIMEOUT,
            Self::IoCompletion => WAIT_IO_COMPLETION,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(WaitOutcome::Signaled(0), WAIT_OBJECT_0)]
    #[test_case(WaitOutcome::Signaled(3), 3)]
    #[test_case(WaitOutcome::Timeout, WAIT_TIMEOUT)]
    #[test_case(WaitOutcome::IoCompletion, WAIT_IO_COMPLETION)]
    fn test_wait_outcome_as_win32(outcome: WaitOutcome, expected: u32) {
        assert_eq!(outcome.as_win32(), expected);
    }

    #[test]
    fn test_handle_kind_display() {
        assert_eq!(HandleKind::Thread.to_string(), "Thread");
    }
}
