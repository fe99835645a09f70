// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{sync::{Condvar, Mutex, MutexGuard, PoisonError},
          time::Duration};

use super::RendezvousOutcome;

/// Two-phase startup handshake between the thread that starts a thread object (the
/// creator) and the newly spawned OS thread (the launcher).
///
/// ```text
/// creator                                launcher
/// ───────                                ────────
/// lock launcher_ready
/// register + spawn ─────────────────────► bind current-thread slot
/// wait launcher_ready (bounded) ◄──┐      lock creator_ready
///                                  └───── set launcher_ready, notify
/// unlock launcher_ready                   wait creator_ready (bounded)
/// set creator_ready, notify ────────────► unlock creator_ready
/// return from create / resume             run start routine
/// ```
///
/// Each side waits on its own flag + [`Condvar`] pair. A flag is set before its
/// condvar is notified and every wait re-checks the flag, so a notification that
/// arrives before the other side starts waiting is never lost. The bounded timeout
/// only caps the damage if a side is starved.
///
/// Lock order is `creator_ready` then `launcher_ready`. Only the launcher ever holds
/// both.
#[derive(Debug, Default)]
pub struct StartupRendezvous {
    launcher_ready: ReadyFlag,
    creator_ready: ReadyFlag,
}

#[derive(Debug, Default)]
struct ReadyFlag {
    is_ready: Mutex<bool>,
    condvar: Condvar,
}

impl ReadyFlag {
    /// The flag is a lone boolean, so a poisoned guard still holds a usable value.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.is_ready.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signal(&self) {
        *self.lock() = true;
        self.condvar.notify_all();
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, bool>,
        timeout: Duration,
    ) -> (MutexGuard<'a, bool>, RendezvousOutcome) {
        let (guard, result) = self
            .condvar
            .wait_timeout_while(guard, timeout, |is_ready| !*is_ready)
            .unwrap_or_else(PoisonError::into_inner);
        let outcome = if result.timed_out() && !*guard {
            RendezvousOutcome::TimedOut
        } else {
            RendezvousOutcome::Acknowledged
        };
        (guard, outcome)
    }
}

impl StartupRendezvous {
    /// Creator side. `register_and_spawn` runs while `launcher_ready` is held, so the
    /// launcher can't acknowledge before the creator is waiting for it. The launcher is
    /// released whether the wait was acknowledged or timed out, and also when
    /// `register_and_spawn` fails.
    ///
    /// # Errors
    ///
    /// Whatever `register_and_spawn` returns. No wait happens in that case.
    pub fn run_creator<T, E>(
        &self,
        timeout: Duration,
        register_and_spawn: impl FnOnce() -> Result<T, E>,
    ) -> Result<(T, RendezvousOutcome), E> {
        let guard = self.launcher_ready.lock();

        let spawned = match register_and_spawn() {
            Ok(it) => it,
            Err(err) => {
                drop(guard);
                self.creator_ready.signal();
                return Err(err);
            }
        };

        let (guard, outcome) = self.launcher_ready.wait(guard, timeout);
        drop(guard);

        self.creator_ready.signal();
        Ok((spawned, outcome))
    }

    /// Clear both flags after a start attempt that never spawned a launcher.
    pub(crate) fn rearm(&self) {
        *self.launcher_ready.lock() = false;
        *self.creator_ready.lock() = false;
    }

    /// Launcher side. Returns once the creator released it or `timeout` passed.
    pub fn run_launcher(&self, timeout: Duration) -> RendezvousOutcome {
        let guard = self.creator_ready.lock();
        self.launcher_ready.signal();
        let (guard, outcome) = self.creator_ready.wait(guard, timeout);
        drop(guard);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::{Arc,
                     atomic::{AtomicBool, Ordering}},
              thread,
              time::Instant};

    use pretty_assertions::assert_eq;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_both_sides_acknowledge() {
        let rendezvous = Arc::new(StartupRendezvous::default());
        let spawned = Arc::new(AtomicBool::new(false));

        let (launcher, outcome) = rendezvous
            .run_creator(TIMEOUT, || {
                let rendezvous = Arc::clone(&rendezvous);
                let spawned_flag = Arc::clone(&spawned);
                let launcher = thread::spawn(move || {
                    let outcome = rendezvous.run_launcher(TIMEOUT);
                    // Everything the creator did while spawning is visible once released.
                    (outcome, spawned_flag.load(Ordering::SeqCst))
                });
                spawned.store(true, Ordering::SeqCst);
                Ok::<_, ()>(launcher)
            })
            .unwrap();

        assert_eq!(outcome, RendezvousOutcome::Acknowledged);
        let (launcher_outcome, saw_registration) = launcher.join().unwrap();
        assert_eq!(launcher_outcome, RendezvousOutcome::Acknowledged);
        assert!(saw_registration);
    }

    #[test]
    fn test_launcher_that_already_signaled_is_not_lost() {
        let rendezvous = Arc::new(StartupRendezvous::default());
        let (launcher, outcome) = rendezvous
            .run_creator(TIMEOUT, || {
                let rendezvous = Arc::clone(&rendezvous);
                let launcher = thread::spawn(move || rendezvous.run_launcher(TIMEOUT));
                // Give the launcher time to block on `launcher_ready`.
                thread::sleep(Duration::from_millis(20));
                Ok::<_, ()>(launcher)
            })
            .unwrap();
        assert_eq!(outcome, RendezvousOutcome::Acknowledged);
        assert_eq!(launcher.join().unwrap(), RendezvousOutcome::Acknowledged);
    }

    #[test]
    fn test_creator_times_out_without_launcher() {
        let rendezvous = StartupRendezvous::default();
        let start = Instant::now();
        let ((), outcome) = rendezvous
            .run_creator(Duration::from_millis(30), || Ok::<_, ()>(()))
            .unwrap();
        assert_eq!(outcome, RendezvousOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));

        // The creator side was released, so a late launcher does not block.
        assert_eq!(
            rendezvous.run_launcher(TIMEOUT),
            RendezvousOutcome::Acknowledged
        );
    }

    #[test]
    fn test_spawn_failure_skips_wait() {
        let rendezvous = StartupRendezvous::default();
        let start = Instant::now();
        let result = rendezvous.run_creator(TIMEOUT, || Err::<(), _>("spawn failed"));
        assert_eq!(result, Err("spawn failed"));
        assert!(start.elapsed() < TIMEOUT);
    }
}
