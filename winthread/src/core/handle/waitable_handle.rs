// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{any::Any,
          fmt::{Debug, Formatter},
          os::fd::BorrowedFd,
          sync::Arc};

use super::{CloseOutcome, HandleKind};
use crate::ThreadApiError;

/// The plug-in contract between an object kind and the generic wait / close functions.
///
/// | Hook                     | Used by                                       |
/// | :----------------------- | :-------------------------------------------- |
/// | [`is_handled()`]         | every operation, to validate the handle       |
/// | [`descriptor()`]         | [`wait_for_handles()`], to `poll(2)` the object |
/// | [`close_handle()`]       | [`close_handle()`](super::close_handle)        |
/// | [`cleanup_after_wait()`] | [`wait_for_handles()`], once the wait succeeded |
///
/// [`is_handled()`]: Self::is_handled
/// [`descriptor()`]: Self::descriptor
/// [`close_handle()`]: Self::close_handle
/// [`cleanup_after_wait()`]: Self::cleanup_after_wait
/// [`wait_for_handles()`]: super::wait_for_handles
pub trait WaitableHandle: Debug + Send + Sync + 'static {
    fn handle_kind(&self) -> HandleKind;

    /// Is this still a live object of its kind? `false` once it has been destroyed.
    fn is_handled(&self) -> bool;

    /// Readable exactly while the object is signaled. [`None`] once the object has been
    /// destroyed.
    fn descriptor(&self) -> Option<BorrowedFd<'_>>;

    /// Release the caller's interest in the object.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadApiError::InvalidHandle`] if the object was already destroyed.
    fn close_handle(&self) -> Result<CloseOutcome, ThreadApiError>;

    /// Final synchronization before a waiter that saw this object signaled proceeds.
    ///
    /// # Errors
    ///
    /// Implementation specific. The wait reports it as its own failure.
    fn cleanup_after_wait(&self) -> Result<(), ThreadApiError>;

    /// Type erasure hook for [`Handle::downcast()`].
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Opaque, cloneable reference to a waitable object. Cloning a [`Handle`] does not
/// duplicate the underlying object. Only the first [`close_handle()`] call on any of the
/// clones has an effect, later ones fail with [`ThreadApiError::InvalidHandle`] once the
/// object is gone.
///
/// [`close_handle()`]: super::close_handle
#[derive(Clone)]
pub struct Handle {
    inner: Arc<dyn WaitableHandle>,
}

impl Handle {
    #[must_use]
    pub fn new(inner: Arc<dyn WaitableHandle>) -> Self { Self { inner } }

    #[must_use]
    pub fn kind(&self) -> HandleKind { self.inner.handle_kind() }

    /// Do both handles refer to the same object?
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    /// Kind-checked access to the concrete object. [`None`] if the handle refers to a
    /// different kind.
    #[must_use]
    pub fn downcast<T: WaitableHandle>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).into_any_arc().downcast::<T>().ok()
    }

    #[must_use]
    pub fn as_waitable(&self) -> &dyn WaitableHandle { self.inner.as_ref() }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind())
            .field("object", &self.inner)
            .finish()
    }
}

/// `CloseHandle`.
///
/// # Errors
///
/// Returns [`ThreadApiError::InvalidHandle`] if the object was already destroyed, or
/// whatever the object kind's own close hook reports.
pub fn close_handle(handle: Handle) -> Result<CloseOutcome, ThreadApiError> {
    if !handle.inner.is_handled() {
        return Err(ThreadApiError::InvalidHandle);
    }
    handle.inner.close_handle()
}
