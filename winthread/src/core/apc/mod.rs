// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words APCs

//! Per-thread FIFO of asynchronous procedure calls (APCs). A callback queued to a
//! thread runs inside that thread, either at an alertable point
//! ([`ThreadRuntime::sleep_ex()`], [`ThreadRuntime::wait_for_handle_ex()`]) or when the
//! thread exits.
//!
//! [`ThreadRuntime::sleep_ex()`]: crate::ThreadRuntime::sleep_ex
//! [`ThreadRuntime::wait_for_handle_ex()`]: crate::ThreadRuntime::wait_for_handle_ex

// Attach sources.
mod apc_queue;
mod user_apc;

// Re-export.
pub use apc_queue::*;
pub use user_apc::*;
