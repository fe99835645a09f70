// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words eventfd

//! A settable / resettable boolean latch whose state is mirrored by a pollable file
//! descriptor. [`SignalLatch`] is what makes a thread object waitable: its descriptor
//! becomes readable when the thread exits.

// Attach sources.
mod poll_util;
mod signal_latch_error;
mod signal_latch_impl;

// Re-export.
pub use poll_util::*;
pub use signal_latch_error::*;
pub use signal_latch_impl::*;
