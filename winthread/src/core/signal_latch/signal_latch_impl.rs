// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words eventfd EFD

use std::{os::fd::{AsFd, BorrowedFd, OwnedFd},
          sync::{Mutex, MutexGuard},
          time::Duration};

use rustix::{event::{PollFd, PollFlags},
             io::Errno};

use super::{SignalLatchError, deadline_from, poll_until, readable_flags};

/// A boolean latch with a pollable descriptor.
///
/// | State   | Descriptor     |
/// | :------ | :------------- |
/// | set     | readable       |
/// | unset   | not readable   |
///
/// The boolean lives in a [`Mutex`], and the descriptor is only written on the
/// unset → set transition and only drained on the set → unset transition. So the
/// descriptor never carries more than one pending "token", and waiters that
/// `poll(2)` it see exactly the latch state.
///
/// Backed by a non-blocking `eventfd(2)` on Linux and Android and by a non-blocking
/// self-pipe on other unix hosts. The descriptors are closed when the latch is dropped.
/// [`uninit()`] only makes the latch unusable, so that a waiter that is still polling a
/// [`BorrowedFd`] never sees the number reused by an unrelated file.
///
/// [`uninit()`]: Self::uninit
#[derive(Debug)]
pub struct SignalLatch {
    state: Mutex<LatchState>,
    fds: LatchFds,
}

#[derive(Debug, Clone, Copy)]
struct LatchState {
    is_set: bool,
    initialized: bool,
}

#[derive(Debug)]
struct LatchFds {
    reader: OwnedFd,
    /// [`None`] for an eventfd, which is read and written through the same descriptor.
    writer: Option<OwnedFd>,
}

impl SignalLatch {
    /// Create an unset latch.
    ///
    /// # Errors
    ///
    /// Returns [`SignalLatchError::Create`] if the descriptor can't be created.
    pub fn try_new() -> Result<Self, SignalLatchError> {
        Ok(Self {
            state: Mutex::new(LatchState {
                is_set: false,
                initialized: true,
            }),
            fds: LatchFds::try_new()?,
        })
    }

    /// Set the latch. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the latch was uninitialized, its mutex is poisoned, or the descriptor
    /// write fails.
    pub fn set(&self) -> Result<(), SignalLatchError> {
        let mut state = self.lock_initialized()?;
        if !state.is_set {
            self.fds.signal()?;
            state.is_set = true;
        }
        Ok(())
    }

    /// Reset the latch. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the latch was uninitialized, its mutex is poisoned, or the descriptor
    /// drain fails.
    pub fn reset(&self) -> Result<(), SignalLatchError> {
        let mut state = self.lock_initialized()?;
        if state.is_set {
            self.fds.drain()?;
            state.is_set = false;
        }
        Ok(())
    }

    /// Never blocks. An uninitialized latch reports `false`.
    #[must_use]
    pub fn is_set(&self) -> bool {
        let state = self.lock_recover();
        state.initialized && state.is_set
    }

    /// Block until the latch is set or `timeout` passes. [`None`] waits forever.
    /// Returns whether the latch was observed set.
    ///
    /// # Errors
    ///
    /// Fails if the latch was uninitialized or `poll(2)` fails.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<bool, SignalLatchError> {
        let fd = self.descriptor().ok_or(SignalLatchError::Uninitialized)?;
        let mut fds = [PollFd::from_borrowed_fd(fd, PollFlags::IN)];
        let ready = poll_until(&mut fds, deadline_from(timeout))
            .map_err(SignalLatchError::Io)?;
        Ok(ready > 0 && fds[0].revents().intersects(readable_flags()))
    }

    /// Tear the latch down. Later [`set()`] / [`reset()`] calls fail with
    /// [`SignalLatchError::Uninitialized`] and [`descriptor()`] returns [`None`]. A
    /// second call is a no-op. A poisoned mutex is recovered, since teardown must
    /// always complete.
    ///
    /// The descriptor is left as it is. A waiter that is already polling it keeps
    /// seeing a set latch as readable until the latch is dropped.
    ///
    /// [`set()`]: Self::set
    /// [`reset()`]: Self::reset
    /// [`descriptor()`]: Self::descriptor
    pub fn uninit(&self) { self.lock_recover().initialized = false; }

    /// The descriptor that is readable exactly while the latch is set. [`None`] after
    /// [`uninit()`](Self::uninit).
    #[must_use]
    pub fn descriptor(&self) -> Option<BorrowedFd<'_>> {
        let state = self.lock_recover();
        state.initialized.then(|| self.fds.reader.as_fd())
    }

    fn lock_initialized(&self) -> Result<MutexGuard<'_, LatchState>, SignalLatchError> {
        let state = self
            .state
            .lock()
            .map_err(|_| SignalLatchError::MutexPoisoned)?;
        if state.initialized {
            Ok(state)
        } else {
            Err(SignalLatchError::Uninitialized)
        }
    }

    /// The state is two booleans that are always written together, so a poisoned
    /// guard still holds a consistent value.
    fn lock_recover(&self) -> MutexGuard<'_, LatchState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl LatchFds {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn try_new() -> Result<Self, SignalLatchError> {
        use rustix::event::{EventfdFlags, eventfd};

        let fd = eventfd(0, EventfdFlags::CLOEXEC | EventfdFlags::NONBLOCK)
            .map_err(|err| SignalLatchError::Create(err.into()))?;
        Ok(Self {
            reader: fd,
            writer: None,
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn try_new() -> Result<Self, SignalLatchError> {
        use rustix::io::{FdFlags, fcntl_setfd, ioctl_fionbio};

        let (reader, writer) =
            rustix::pipe::pipe().map_err(|err| SignalLatchError::Create(err.into()))?;
        for fd in [&reader, &writer] {
            fcntl_setfd(fd, FdFlags::CLOEXEC)
                .and_then(|()| ioctl_fionbio(fd, true))
                .map_err(|err| SignalLatchError::Create(err.into()))?;
        }
        Ok(Self {
            reader,
            writer: Some(writer),
        })
    }

    fn writer(&self) -> BorrowedFd<'_> {
        self.writer.as_ref().unwrap_or(&self.reader).as_fd()
    }

    /// Make the reader readable. An eventfd takes an 8 byte counter increment, a pipe
    /// takes any single byte.
    fn signal(&self) -> Result<(), SignalLatchError> {
        let token = 1_u64.to_ne_bytes();
        let token: &[u8] = if self.writer.is_some() { &token[..1] } else { &token };
        loop {
            match rustix::io::write(self.writer(), token) {
                Ok(_) => return Ok(()),
                Err(Errno::INTR) => {}
                // The counter or pipe is already full, so the reader is already readable.
                Err(Errno::AGAIN) => return Ok(()),
                Err(err) => return Err(SignalLatchError::Io(err.into())),
            }
        }
    }

    /// Read until the reader would block. One read resets an eventfd counter to zero.
    fn drain(&self) -> Result<(), SignalLatchError> {
        let mut buf = [0_u8; 64];
        loop {
            match rustix::io::read(&self.reader, &mut buf[..]) {
                Ok(0) | Err(Errno::AGAIN) => return Ok(()),
                Ok(_) | Err(Errno::INTR) => {}
                Err(err) => return Err(SignalLatchError::Io(err.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Instant};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_latch_is_unset_and_not_readable() {
        let latch = SignalLatch::try_new().unwrap();
        assert!(!latch.is_set());
        assert!(!latch.wait(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn test_set_makes_descriptor_readable_and_reset_clears_it() {
        let latch = SignalLatch::try_new().unwrap();

        latch.set().unwrap();
        // Idempotent: the second set must not queue a second token.
        latch.set().unwrap();
        assert!(latch.is_set());
        assert!(latch.wait(Some(Duration::ZERO)).unwrap());

        latch.reset().unwrap();
        assert!(!latch.is_set());
        assert!(!latch.wait(Some(Duration::ZERO)).unwrap());
    }

    #[test]
    fn test_wait_wakes_when_set_from_another_thread() {
        let latch = Arc::new(SignalLatch::try_new().unwrap());
        let setter = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                latch.set().unwrap();
            })
        };

        let start = Instant::now();
        assert!(latch.wait(Some(Duration::from_secs(5))).unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
        setter.join().unwrap();
    }

    #[test]
    fn test_uninit_makes_latch_unusable() {
        let latch = SignalLatch::try_new().unwrap();
        latch.set().unwrap();
        latch.uninit();
        // Second uninit is a no-op.
        latch.uninit();

        assert!(!latch.is_set());
        assert!(latch.descriptor().is_none());
        assert!(matches!(latch.set(), Err(SignalLatchError::Uninitialized)));
        assert!(matches!(latch.reset(), Err(SignalLatchError::Uninitialized)));
        assert!(matches!(
            latch.wait(Some(Duration::ZERO)),
            Err(SignalLatchError::Uninitialized)
        ));
    }

    #[test]
    fn test_uninit_keeps_set_descriptor_readable_for_active_pollers() {
        let latch = Arc::new(SignalLatch::try_new().unwrap());
        let (polling_tx, polling_rx) = std::sync::mpsc::channel::<()>();

        let poller = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                let fd = latch.descriptor().unwrap();
                let mut fds = [PollFd::from_borrowed_fd(fd, PollFlags::IN)];
                polling_tx.send(()).unwrap();
                let ready = poll_until(
                    &mut fds,
                    deadline_from(Some(Duration::from_secs(10))),
                )
                .unwrap();
                ready > 0 && fds[0].revents().intersects(readable_flags())
            })
        };

        polling_rx.recv().unwrap();
        latch.set().unwrap();
        latch.uninit();

        assert!(poller.join().unwrap());
    }
}
