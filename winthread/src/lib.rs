// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words eventfd APCs alertable

//! # r3bl_winthread
//!
//! Win32-style thread handles for POSIX hosts. Code that was written against
//! `CreateThread`, `ResumeThread`, `TerminateThread`, `ExitThread`,
//! `GetExitCodeThread`, `QueueUserAPC` and `CloseHandle` can run on Linux and macOS
//! without changes to its threading model.
//!
//! # Table of contents
//!
//! <!-- TOC -->
//! - [Two API surfaces](#two-api-surfaces)
//! - [Thread object lifecycle](#thread-object-lifecycle)
//! - [Startup rendezvous](#startup-rendezvous)
//! - [Known quirks](#known-quirks)
//! <!-- /TOC -->
//!
//! # Two API surfaces
//!
//! | Surface          | Error style                                      | Where             |
//! | :--------------- | :----------------------------------------------- | :---------------- |
//! | Rust-native      | [`Result`] with [`ThreadApiError`], outcome enums | [`ThreadRuntime`] |
//! | Win32-shaped     | sentinel return value + [`get_last_error()`]     | [`win32_api`]     |
//!
//! The Win32-shaped functions are thin adapters over the process-wide
//! [`ThreadRuntime::global()`]. Tests and embedders that want isolation construct their
//! own [`ThreadRuntime`] and inject a [`ThreadRegistry`].
//!
//! # Thread object lifecycle
//!
//! ```text
//! Created ──(suspended)──► Pending ──resume()──┐
//!    │                    (latch preset set)   │
//!    └──(run immediately)──────────────────────┤
//!                                              ▼
//!                                          Started (latch reset, OS thread spawned)
//!                                              │
//!                 start routine returns / exit_thread() / terminate
//!                                              ▼
//!                                          Exited (latch set, callbacks drained)
//!                                              │
//!                              joined by a waiter, or detached by close
//!                                              ▼
//!                                          Destroyed (exactly once)
//! ```
//!
//! Exactly one of [`close_handle()`] and the exiting thread itself destroys a given
//! [`ThreadObject`]. The decision is taken under the object's state mutex, using the
//! exit latch and the `detached` flag.
//!
//! # Startup rendezvous
//!
//! The creator and the launcher run a two-phase handshake over two independent
//! mutex + condvar pairs (see [`StartupRendezvous`]). The start routine never runs
//! before the creator has recorded the thread, and the creator never returns before the
//! launcher has acknowledged it is alive. Both waits are bounded by
//! [`ThreadRuntimeConfig::rendezvous_timeout`].
//!
//! # Known quirks
//!
//! - A thread created suspended has its exit latch preset to "set", so a zero-timeout
//!   wait on it reports signaled before it ever ran. [`ThreadRuntime::resume_thread()`]
//!   resets it.
//! - Rust threads can't be forcibly cancelled. [`ThreadRuntime::terminate_thread()`]
//!   marks the object exited and reports [`CancelOutcome::UnsupportedOnPlatform`] for a
//!   thread that is already running; that thread keeps running until its start routine
//!   returns.
//!
//! [`close_handle()`]: crate::close_handle
//! [`get_last_error()`]: crate::win32_api::get_last_error
//! [`win32_api`]: crate::win32_api

// Only POSIX hosts need the emulation. Windows has the real thing.
#![cfg(unix)]
// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules.
pub mod core;
pub mod win32_api;

// Re-export the Rust-native API. The Win32-shaped functions stay namespaced under
// `win32_api` since several of them share names with the native ones.
pub use core::*;
