// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Errors from [`SignalLatch`] operations.
///
/// [`SignalLatch`]: super::SignalLatch
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SignalLatchError {
    /// The eventfd or self-pipe could not be created.
    #[error("Failed to create signal latch descriptor")]
    #[diagnostic(
        code(r3bl_winthread::latch::create),
        help("Check the per-process file descriptor limit with `ulimit -n`")
    )]
    Create(#[source] std::io::Error),

    /// Reading or writing the descriptor failed.
    #[error("I/O on signal latch descriptor failed")]
    #[diagnostic(code(r3bl_winthread::latch::io))]
    Io(#[source] std::io::Error),

    /// The latch was used after [`SignalLatch::uninit()`].
    ///
    /// [`SignalLatch::uninit()`]: super::SignalLatch::uninit
    #[error("Signal latch used after uninit")]
    #[diagnostic(code(r3bl_winthread::latch::uninitialized))]
    Uninitialized,

    /// Internal mutex was poisoned by a prior thread panic.
    #[error("Signal latch mutex poisoned")]
    #[diagnostic(code(r3bl_winthread::latch::mutex_poisoned))]
    MutexPoisoned,
}
