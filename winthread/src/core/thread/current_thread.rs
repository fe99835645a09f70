// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{cell::{Cell, RefCell},
          sync::{Arc,
                 atomic::{AtomicU32, Ordering}}};

use super::ThreadObject;
use crate::ThreadId32;

/// Ids start at 1 so that 0 never names a thread.
static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(1);

thread_local! {
    /// Bound by the launcher right after spawn, cleared when it returns.
    static CURRENT_THREAD_OBJECT: RefCell<Option<Arc<ThreadObject>>> =
        const { RefCell::new(None) };

    /// Numeric id of the calling OS thread. Assigned lazily for threads that were not
    /// created through this crate.
    static CURRENT_THREAD_ID: Cell<Option<ThreadId32>> = const { Cell::new(None) };
}

/// `GetCurrentThreadId`. Stable for the lifetime of the calling OS thread. A thread
/// created through this crate reports the same id as [`ThreadObject::id()`] of its
/// object.
#[must_use]
pub fn current_thread_id() -> ThreadId32 {
    CURRENT_THREAD_ID.with(|slot| {
        slot.get().unwrap_or_else(|| {
            let id = allocate_thread_id();
            slot.set(Some(id));
            id
        })
    })
}

pub(crate) fn allocate_thread_id() -> ThreadId32 {
    loop {
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        // Skip 0 after wrapping.
        if id != 0 {
            return id;
        }
    }
}

/// Bind the calling OS thread to `object`. Called first thing by the launcher.
pub(crate) fn bind_current_thread(object: &Arc<ThreadObject>) {
    CURRENT_THREAD_ID.with(|slot| slot.set(Some(object.id())));
    CURRENT_THREAD_OBJECT.with(|slot| *slot.borrow_mut() = Some(Arc::clone(object)));
}

pub(crate) fn unbind_current_thread() {
    let previous = CURRENT_THREAD_OBJECT.with(|slot| slot.borrow_mut().take());
    drop(previous);
}

pub(crate) fn bound_thread_object() -> Option<Arc<ThreadObject>> {
    CURRENT_THREAD_OBJECT.with(|slot| slot.borrow().clone())
}
