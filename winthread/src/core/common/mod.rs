// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
mod config;
mod last_error;
mod thread_api_error;
mod win32_types;

// Re-export.
pub use config::*;
pub use last_error::*;
pub use thread_api_error::*;
pub use win32_types::*;
