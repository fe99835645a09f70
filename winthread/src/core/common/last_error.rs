// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::cell::Cell;

use super::{ERROR_SUCCESS, Win32ErrorCode};

thread_local! {
    static LAST_ERROR: Cell<Win32ErrorCode> = const { Cell::new(ERROR_SUCCESS) };
}

/// Per-thread last-error slot used by the Win32-shaped entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastError;

impl LastError {
    #[must_use]
    pub fn get() -> Win32ErrorCode { LAST_ERROR.with(Cell::get) }

    pub fn set(code: Win32ErrorCode) { LAST_ERROR.with(|it| it.set(code)); }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{ERROR_INVALID_HANDLE, ERROR_INVALID_PARAMETER};

    #[test]
    fn test_last_error_is_per_thread() {
        LastError::set(ERROR_INVALID_HANDLE);
        let other = std::thread::spawn(|| {
            let initial = LastError::get();
            LastError::set(ERROR_INVALID_PARAMETER);
            initial
        })
        .join()
        .unwrap();

        assert_eq!(other, ERROR_SUCCESS);
        assert_eq!(LastError::get(), ERROR_INVALID_HANDLE);
        LastError::set(ERROR_SUCCESS);
    }
}
