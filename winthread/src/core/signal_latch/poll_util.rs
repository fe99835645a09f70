// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::time::{Duration, Instant};

use rustix::{event::{PollFd, PollFlags, Timespec, poll},
             io::Errno};

/// Readiness bits that count as "signaled". A latch descriptor that errors out or
/// hangs up must wake its waiters rather than leave them blocked.
#[must_use]
pub fn readable_flags() -> PollFlags { PollFlags::IN | PollFlags::ERR | PollFlags::HUP }

/// `poll(2)` until at least one descriptor is ready or `deadline` passes.
///
/// - `deadline` of [`None`] blocks indefinitely.
/// - Interrupted calls (`EINTR`) are retried with the remaining time.
/// - Returns the number of ready descriptors, `0` meaning the deadline passed.
///
/// # Errors
///
/// Returns the OS error if `poll(2)` fails for any reason other than `EINTR`.
pub fn poll_until(
    fds: &mut [PollFd<'_>],
    deadline: Option<Instant>,
) -> std::io::Result<usize> {
    loop {
        let remaining = deadline.map(|it| it.saturating_duration_since(Instant::now()));
        let timeout = remaining.map(timespec_from);

        match poll(fds, timeout.as_ref()) {
            Ok(0) => match remaining {
                // Some hosts round the timeout down to milliseconds. Keep going until
                // the deadline has really passed.
                Some(remaining) if !remaining.is_zero() => {}
                _ => return Ok(0),
            },
            Ok(ready) => return Ok(ready),
            Err(Errno::INTR) => {}
            Err(err) => return Err(err.into()),
        }
    }
}

/// Convert a relative timeout to a deadline. [`None`] means wait forever.
#[must_use]
pub fn deadline_from(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|it| Instant::now().checked_add(it))
}

fn timespec_from(duration: Duration) -> Timespec {
    Timespec {
        tv_sec: duration.as_secs().try_into().unwrap_or(i64::MAX),
        tv_nsec: duration.subsec_nanos().try_into().unwrap_or(0),
    }
}
