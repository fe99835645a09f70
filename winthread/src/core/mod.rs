// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Rust-native building blocks: the exit latch, the generic waitable-handle contract,
//! the per-thread callback queue, and the thread object itself.

// Attach sources.
pub mod apc;
pub mod common;
pub mod handle;
pub mod log;
pub mod signal_latch;
pub mod thread;

// Re-export.
pub use apc::*;
pub use common::*;
pub use handle::*;
pub use log::*;
pub use signal_latch::*;
pub use thread::*;
