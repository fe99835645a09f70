// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{os::fd::BorrowedFd,
          time::{Duration, Instant}};

use rustix::event::{PollFd, PollFlags};
use smallvec::SmallVec;

use super::{Handle, WaitMode, WaitOutcome};
use crate::{MAXIMUM_WAIT_OBJECTS, ThreadApiError, deadline_from, poll_until,
            readable_flags};

/// Inline capacity for the descriptor set. Most waits are on one or two handles plus an
/// optional alert descriptor.
const INLINE_WAIT_FDS: usize = 4;

type FdVec<'a> = SmallVec<[BorrowedFd<'a>; INLINE_WAIT_FDS]>;

/// `WaitForSingleObject`. [`None`] waits forever.
///
/// # Errors
///
/// See [`wait_for_handles()`].
pub fn wait_for_handle(
    handle: &Handle,
    timeout: Option<Duration>,
) -> Result<WaitOutcome, ThreadApiError> {
    wait_for_handles(std::slice::from_ref(handle), WaitMode::Any, timeout)
}

/// `WaitForMultipleObjects`. [`None`] waits forever.
///
/// On success, [`WaitableHandle::cleanup_after_wait()`] has been run on every handle
/// that satisfied the wait.
///
/// # Errors
///
/// - [`ThreadApiError::InvalidParameter`] for an empty list or more than
///   [`MAXIMUM_WAIT_OBJECTS`] handles.
/// - [`ThreadApiError::InvalidHandle`] if any handle refers to a destroyed object.
/// - [`ThreadApiError::WaitFailed`] if `poll(2)` fails.
///
/// [`WaitableHandle::cleanup_after_wait()`]: super::WaitableHandle::cleanup_after_wait
pub fn wait_for_handles(
    handles: &[Handle],
    mode: WaitMode,
    timeout: Option<Duration>,
) -> Result<WaitOutcome, ThreadApiError> {
    wait_for_handles_alertable(handles, mode, deadline_from(timeout), None)
}

/// Like [`wait_for_handles()`], but also returns [`WaitOutcome::IoCompletion`] as soon
/// as `alert` becomes readable while no handle satisfies the wait. Handles are checked
/// before the alert, so an object that is already signaled always wins.
///
/// # Errors
///
/// See [`wait_for_handles()`].
pub fn wait_for_handles_alertable(
    handles: &[Handle],
    mode: WaitMode,
    deadline: Option<Instant>,
    alert: Option<BorrowedFd<'_>>,
) -> Result<WaitOutcome, ThreadApiError> {
    if handles.is_empty() {
        return Err(ThreadApiError::InvalidParameter {
            reason: "no handles to wait on",
        });
    }
    if handles.len() > MAXIMUM_WAIT_OBJECTS {
        return Err(ThreadApiError::InvalidParameter {
            reason: "more than MAXIMUM_WAIT_OBJECTS handles",
        });
    }

    let mut descriptors = FdVec::new();
    for handle in handles {
        let waitable = handle.as_waitable();
        match (waitable.is_handled(), waitable.descriptor()) {
            (true, Some(fd)) => descriptors.push(fd),
            _ => return Err(ThreadApiError::InvalidHandle),
        }
    }

    let outcome = match mode {
        WaitMode::Any => wait_any(&descriptors, deadline, alert)?,
        WaitMode::All => wait_all(&descriptors, deadline, alert)?,
    };

    match (mode, outcome) {
        (WaitMode::Any, WaitOutcome::Signaled(index)) => {
            handles[index].as_waitable().cleanup_after_wait()?;
        }
        (WaitMode::All, WaitOutcome::Signaled(_)) => {
            for handle in handles {
                handle.as_waitable().cleanup_after_wait()?;
            }
        }
        _ => {}
    }

    Ok(outcome)
}

fn wait_any<'a>(
    descriptors: &[BorrowedFd<'a>],
    deadline: Option<Instant>,
    alert: Option<BorrowedFd<'a>>,
) -> Result<WaitOutcome, ThreadApiError> {
    let mut poll_fds: SmallVec<[PollFd<'_>; INLINE_WAIT_FDS]> = descriptors
        .iter()
        .copied()
        .chain(alert)
        .map(|fd| PollFd::from_borrowed_fd(fd, PollFlags::IN))
        .collect();

    let ready = poll_until(&mut poll_fds, deadline).map_err(ThreadApiError::WaitFailed)?;
    if ready == 0 {
        return Ok(WaitOutcome::Timeout);
    }

    if let Some(index) = poll_fds[..descriptors.len()]
        .iter()
        .position(|it| it.revents().intersects(readable_flags()))
    {
        return Ok(WaitOutcome::Signaled(index));
    }

    Ok(WaitOutcome::IoCompletion)
}

/// Level triggered: a signaled descriptor stays readable until its object is reset, so
/// poll the ones that are not ready yet, then re-check all of them together.
fn wait_all<'a>(
    descriptors: &[BorrowedFd<'a>],
    deadline: Option<Instant>,
    alert: Option<BorrowedFd<'a>>,
) -> Result<WaitOutcome, ThreadApiError> {
    loop {
        let not_ready = not_ready_descriptors(descriptors)?;
        if not_ready.is_empty() {
            return Ok(WaitOutcome::Signaled(0));
        }

        match wait_any(&not_ready, deadline, alert)? {
            WaitOutcome::Signaled(_) => {}
            other => return Ok(other),
        }
    }
}

fn not_ready_descriptors<'a>(
    descriptors: &[BorrowedFd<'a>],
) -> Result<FdVec<'a>, ThreadApiError> {
    let mut poll_fds: SmallVec<[PollFd<'_>; INLINE_WAIT_FDS]> = descriptors
        .iter()
        .map(|fd| PollFd::from_borrowed_fd(*fd, PollFlags::IN))
        .collect();

    poll_until(&mut poll_fds, Some(Instant::now())).map_err(ThreadApiError::WaitFailed)?;

    Ok(descriptors
        .iter()
        .zip(poll_fds.iter())
        .filter(|(_, it)| !it.revents().intersects(readable_flags()))
        .map(|(fd, _)| *fd)
        .collect())
}
