// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::{Debug, Formatter};

/// What produced an [`ApcItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ApcKind {
    /// Queued through `QueueUserAPC`.
    User,
}

/// The generic queued callback record. Running it consumes it, which is what marks it
/// removable from its queue.
pub struct ApcItem {
    pub kind: ApcKind,
    completion: Box<dyn FnOnce() + Send + 'static>,
}

impl ApcItem {
    pub fn new(kind: ApcKind, completion: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind,
            completion: Box::new(completion),
        }
    }

    /// Invoke the completion hook.
    pub fn run(self) { (self.completion)(); }
}

impl Debug for ApcItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApcItem").field("kind", &self.kind).finish()
    }
}

/// Pairs a user callback with its argument, the way `QueueUserAPC(pfnAPC, hThread,
/// dwData)` does.
pub struct UserApcItem {
    callback: Box<dyn FnOnce(usize) + Send + 'static>,
    data: usize,
}

impl UserApcItem {
    /// Bridge for a plain function pointer, the `PAPCFUNC` shape.
    #[must_use]
    pub fn from_fn(callback: fn(usize), data: usize) -> Self {
        Self::new(callback, data)
    }

    pub fn new(callback: impl FnOnce(usize) + Send + 'static, data: usize) -> Self {
        Self {
            callback: Box::new(callback),
            data,
        }
    }

    #[must_use]
    pub fn data(&self) -> usize { self.data }
}

impl Debug for UserApcItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserApcItem")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl From<UserApcItem> for ApcItem {
    fn from(user: UserApcItem) -> Self {
        let UserApcItem { callback, data } = user;
        ApcItem::new(ApcKind::User, move || callback(data))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc,
                    atomic::{AtomicUsize, Ordering}};

    use pretty_assertions::assert_eq;

    use super::*;

    static LAST_DATA: AtomicUsize = AtomicUsize::new(0);

    fn record(data: usize) { LAST_DATA.store(data, Ordering::SeqCst); }

    #[test]
    fn test_fn_pointer_bridge_passes_argument() {
        let item: ApcItem = UserApcItem::from_fn(record, 42).into();
        assert_eq!(item.kind, ApcKind::User);
        item.run();
        assert_eq!(LAST_DATA.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_closure_bridge_passes_argument() {
        let seen = Arc::new(AtomicUsize::new(0));
        let item: ApcItem = {
            let seen = Arc::clone(&seen);
            UserApcItem::new(move |data| seen.store(data, Ordering::SeqCst), 7).into()
        };
        item.run();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
