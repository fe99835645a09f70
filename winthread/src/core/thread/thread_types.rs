// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// The user start routine. Its return value becomes the thread's exit code.
pub type StartRoutine = Box<dyn FnOnce() -> u32 + Send + 'static>;

/// Whether [`ThreadRuntime::create_thread()`] starts the OS thread right away.
///
/// [`ThreadRuntime::create_thread()`]: crate::ThreadRuntime::create_thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreationMode {
    #[default]
    RunImmediately,
    /// Stay pending until [`ThreadRuntime::resume_thread()`]. The exit latch of a
    /// pending thread reads as set.
    ///
    /// [`ThreadRuntime::resume_thread()`]: crate::ThreadRuntime::resume_thread
    Suspended,
}

impl CreationMode {
    /// Decode the `CREATE_SUSPENDED` bit of Win32 creation flags.
    #[must_use]
    pub fn from_creation_flags(creation_flags: u32) -> Self {
        if creation_flags & crate::CREATE_SUSPENDED == 0 {
            Self::RunImmediately
        } else {
            Self::Suspended
        }
    }
}

/// How a thread object came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ThreadOrigin {
    /// The thread that constructed the [`ThreadRuntime`]. Never created, started or
    /// destroyed through the lifecycle operations.
    ///
    /// [`ThreadRuntime`]: crate::ThreadRuntime
    ProcessMain,
    Created,
}

/// Result of a successful [`ThreadRuntime::resume_thread()`].
///
/// [`ThreadRuntime::resume_thread()`]: crate::ThreadRuntime::resume_thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The pending thread was started.
    Started,
    /// Already running or finished. Nothing happened.
    AlreadyStarted,
    /// The pending thread was terminated before it ever ran, so it is not started.
    TerminatedBeforeStart,
}

/// Result of a successful [`ThreadRuntime::terminate_thread()`]. In every case the
/// object is marked exited and its exit latch is set.
///
/// [`ThreadRuntime::terminate_thread()`]: crate::ThreadRuntime::terminate_thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// There was no OS thread to stop (the thread was still pending).
    Cancelled,
    /// The OS thread is running and this host can't stop it. It keeps running until
    /// its start routine returns, but its exit code stays the one given to terminate.
    UnsupportedOnPlatform,
    /// The thread had already finished. Its exit code is unchanged.
    AlreadyExited,
}

/// How one side of the [`StartupRendezvous`] ended.
///
/// [`StartupRendezvous`]: crate::StartupRendezvous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousOutcome {
    Acknowledged,
    /// The bounded wait expired first. The handshake continues regardless.
    TimedOut,
}

/// Unwind payload used by [`ThreadRuntime::exit_thread()`] to leave the start routine
/// early. The launcher catches it and records `exit_code`.
///
/// [`ThreadRuntime::exit_thread()`]: crate::ThreadRuntime::exit_thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitThreadRequest {
    pub exit_code: u32,
}

/// Point-in-time copy of a thread object's flags, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSnapshot {
    pub thread_id: crate::ThreadId32,
    pub origin: ThreadOrigin,
    pub started: bool,
    pub exited: bool,
    /// The launcher ran its exit path (start routine returned, exited early, or
    /// panicked).
    pub finished: bool,
    pub detached: bool,
    pub joined: bool,
    pub destroyed: bool,
    pub exit_code: u32,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::CREATE_SUSPENDED;

    #[test_case(0, CreationMode::RunImmediately)]
    #[test_case(CREATE_SUSPENDED, CreationMode::Suspended)]
    #[test_case(CREATE_SUSPENDED | 0x0001_0000, CreationMode::Suspended)]
    #[test_case(0x0001_0000, CreationMode::RunImmediately)]
    fn test_creation_mode_from_flags(flags: u32, expected: CreationMode) {
        assert_eq!(CreationMode::from_creation_flags(flags), expected);
    }
}
