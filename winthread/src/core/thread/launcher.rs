// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{any::Any,
          panic::{AssertUnwindSafe, catch_unwind},
          sync::Arc};

use super::{ExitThreadRequest, RendezvousOutcome, ThreadObject,
            current_thread::{bind_current_thread, unbind_current_thread}};
use crate::EXIT_CODE_PANICKED;

/// Entry point of every OS thread spawned for a [`ThreadObject`].
///
/// 1. Bind the current-thread slot.
/// 2. Launcher side of the [`StartupRendezvous`].
/// 3. Run the start routine, unless startup failed (not in the registry) or the object
///    was terminated in the meantime.
/// 4. Exit path: drain queued callbacks, record the exit code, set the exit latch, and
///    destroy the object if its handle was already closed.
///
/// [`StartupRendezvous`]: super::StartupRendezvous
pub(super) fn thread_launcher(object: Arc<ThreadObject>) {
    bind_current_thread(&object);

    if object.rendezvous.run_launcher(object.rendezvous_timeout)
        == RendezvousOutcome::TimedOut
    {
        tracing::warn!(
            thread_id = object.id(),
            message = "creator did not release launcher in time"
        );
    }

    let exit_code = if should_run_start_routine(&object) {
        run_start_routine(&object)
    } else {
        0
    };

    object.finish_from_launcher(exit_code);
    unbind_current_thread();
}

/// Also waits for the creator to release the `state` lock, so the join handle is
/// recorded before the start routine runs.
fn should_run_start_routine(object: &ThreadObject) -> bool {
    let registered = object
        .registry
        .as_ref()
        .is_none_or(|registry| registry.contains(object.id()));
    if !registered {
        tracing::error!(
            thread_id = object.id(),
            message = "thread is not registered, not running start routine"
        );
        return false;
    }

    let state = object.lock_state_recover();
    if state.exited {
        tracing::debug!(
            thread_id = object.id(),
            message = "thread was terminated during startup, not running start routine"
        );
        return false;
    }
    true
}

fn run_start_routine(object: &ThreadObject) -> u32 {
    let routine = object
        .start_routine
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .take();
    let Some(routine) = routine else {
        return 0;
    };

    match catch_unwind(AssertUnwindSafe(routine)) {
        Ok(exit_code) => exit_code,
        Err(payload) => match payload.downcast::<ExitThreadRequest>() {
            Ok(request) => request.exit_code,
            Err(payload) => {
                tracing::error!(
                    thread_id = object.id(),
                    panic = panic_message(payload.as_ref()),
                    message = "start routine panicked"
                );
                EXIT_CODE_PANICKED
            }
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
