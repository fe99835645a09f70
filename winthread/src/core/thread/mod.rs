// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The emulated thread object and its lifecycle. Start with [`ThreadRuntime`], which
//! owns the process-original thread object and the optional [`ThreadRegistry`], and
//! exposes every lifecycle operation.

// Attach sources.
mod current_thread;
mod launcher;
mod rendezvous;
mod thread_lifecycle;
mod thread_object;
mod thread_registry;
mod thread_runtime;
mod thread_types;

// Re-export.
pub use current_thread::*;
pub use rendezvous::*;
pub use thread_object::*;
pub use thread_registry::*;
pub use thread_runtime::*;
pub use thread_types::*;
