// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Opt-in [`tracing`] setup. Every lifecycle event in this crate is emitted through
//! [`tracing`] macros; nothing is printed unless the application (or a test) installs a
//! subscriber, either on its own or via [`try_initialize_logging_global()`] /
//! [`try_initialize_logging_thread_local()`].

// Attach sources.
mod tracing_config;
mod tracing_init;

// Re-export.
pub use tracing_config::*;
pub use tracing_init::*;
