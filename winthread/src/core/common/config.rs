// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::time::Duration;

/// Environment variable overriding [`ThreadRuntimeConfig::rendezvous_timeout`], in
/// milliseconds.
pub const ENV_RENDEZVOUS_TIMEOUT_MS: &str = "R3BL_WINTHREAD_RENDEZVOUS_TIMEOUT_MS";
/// Environment variable overriding [`ThreadRuntimeConfig::track_threads`].
pub const ENV_TRACK_THREADS: &str = "R3BL_WINTHREAD_TRACK_THREADS";
/// Environment variable overriding [`ThreadRuntimeConfig::capture_backtraces`].
pub const ENV_CAPTURE_BACKTRACES: &str = "R3BL_WINTHREAD_CAPTURE_BACKTRACES";

pub const DEFAULT_RENDEZVOUS_TIMEOUT: Duration = Duration::from_secs(1);

/// How [`ThreadRuntime::switch_to_thread()`] gives up the processor.
///
/// [`ThreadRuntime::switch_to_thread()`]: crate::ThreadRuntime::switch_to_thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YieldStrategy {
    /// [`std::thread::yield_now()`], which is `sched_yield(2)` on POSIX hosts.
    #[default]
    SchedYield,
    /// Sleep for at least the given duration so one scheduling quantum passes. For
    /// hosts where `sched_yield` is a no-op.
    Sleep(Duration),
}

/// Tunables for a [`ThreadRuntime`].
///
/// ```
/// use std::time::Duration;
/// use r3bl_winthread::ThreadRuntimeConfig;
///
/// let config = ThreadRuntimeConfig::default()
///     .with_rendezvous_timeout(Duration::from_millis(250))
///     .with_track_threads(false);
/// assert!(!config.track_threads);
/// ```
///
/// [`ThreadRuntime`]: crate::ThreadRuntime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadRuntimeConfig {
    /// Upper bound for each side of the creator / launcher startup handshake. This is a
    /// safety valve against a lost wakeup, not the normal path.
    pub rendezvous_timeout: Duration,
    /// Keep a [`ThreadRegistry`] of live thread objects. When enabled, the launcher
    /// refuses to run a start routine whose thread object was never registered.
    ///
    /// [`ThreadRegistry`]: crate::ThreadRegistry
    pub track_threads: bool,
    /// Capture a [`std::backtrace::Backtrace`] at creation and at exit of every thread,
    /// shown by [`ThreadRegistry::dump_thread_handles()`].
    ///
    /// [`ThreadRegistry::dump_thread_handles()`]: crate::ThreadRegistry::dump_thread_handles
    pub capture_backtraces: bool,
    pub yield_strategy: YieldStrategy,
}

impl Default for ThreadRuntimeConfig {
    fn default() -> Self {
        Self {
            rendezvous_timeout: DEFAULT_RENDEZVOUS_TIMEOUT,
            track_threads: true,
            capture_backtraces: false,
            yield_strategy: YieldStrategy::default(),
        }
    }
}

impl ThreadRuntimeConfig {
    #[must_use]
    pub fn with_rendezvous_timeout(mut self, rendezvous_timeout: Duration) -> Self {
        self.rendezvous_timeout = rendezvous_timeout;
        self
    }

    #[must_use]
    pub fn with_track_threads(mut self, track_threads: bool) -> Self {
        self.track_threads = track_threads;
        self
    }

    #[must_use]
    pub fn with_capture_backtraces(mut self, capture_backtraces: bool) -> Self {
        self.capture_backtraces = capture_backtraces;
        self
    }

    #[must_use]
    pub fn with_yield_strategy(mut self, yield_strategy: YieldStrategy) -> Self {
        self.yield_strategy = yield_strategy;
        self
    }

    /// [`Default`] overlaid with the `R3BL_WINTHREAD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self { Self::default().overlay(|key| std::env::var(key).ok()) }

    /// Overlay values from `lookup`. Malformed values are logged and ignored.
    #[must_use]
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_RENDEZVOUS_TIMEOUT_MS) {
            match value.trim().parse::<u64>() {
                Ok(millis) => self.rendezvous_timeout = Duration::from_millis(millis),
                Err(_) => warn_ignored(ENV_RENDEZVOUS_TIMEOUT_MS, &value),
            }
        }
        if let Some(value) = lookup(ENV_TRACK_THREADS) {
            match parse_bool(&value) {
                Some(flag) => self.track_threads = flag,
                None => warn_ignored(ENV_TRACK_THREADS, &value),
            }
        }
        if let Some(value) = lookup(ENV_CAPTURE_BACKTRACES) {
            match parse_bool(&value) {
                Some(flag) => self.capture_backtraces = flag,
                None => warn_ignored(ENV_CAPTURE_BACKTRACES, &value),
            }
        }
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn warn_ignored(key: &str, value: &str) {
    tracing::warn!(key, value, message = "ignoring malformed environment variable");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default() {
        let it = ThreadRuntimeConfig::default();
        assert_eq!(it.rendezvous_timeout, Duration::from_secs(1));
        assert!(it.track_threads);
        assert!(!it.capture_backtraces);
        assert_eq!(it.yield_strategy, YieldStrategy::SchedYield);
    }

    #[test]
    fn test_overlay_applies_valid_values() {
        let it = ThreadRuntimeConfig::default().overlay(lookup_from(&[
            (ENV_RENDEZVOUS_TIMEOUT_MS, "250"),
            (ENV_TRACK_THREADS, "off"),
            (ENV_CAPTURE_BACKTRACES, "TRUE"),
        ]));
        assert_eq!(it.rendezvous_timeout, Duration::from_millis(250));
        assert!(!it.track_threads);
        assert!(it.capture_backtraces);
    }

    #[test_case(ENV_RENDEZVOUS_TIMEOUT_MS, "soon")]
    #[test_case(ENV_RENDEZVOUS_TIMEOUT_MS, "-5")]
    #[test_case(ENV_TRACK_THREADS, "maybe")]
    #[test_case(ENV_CAPTURE_BACKTRACES, "")]
    fn test_overlay_ignores_malformed_values(key: &str, value: &str) {
        let it = ThreadRuntimeConfig::default().overlay(lookup_from(&[(key, value)]));
        assert_eq!(it, ThreadRuntimeConfig::default());
    }
}
