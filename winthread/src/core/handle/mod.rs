// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The generic waitable-handle contract and a `poll(2)` based multiplexer on top of it.
//! Any object kind that can expose a [`SignalLatch`] style descriptor plugs in by
//! implementing [`WaitableHandle`].
//!
//! [`SignalLatch`]: crate::SignalLatch

// Attach sources.
mod handle_types;
mod wait;
mod waitable_handle;

// Re-export.
pub use handle_types::*;
pub use wait::*;
pub use waitable_handle::*;
