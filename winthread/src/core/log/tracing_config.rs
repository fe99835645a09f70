// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tracing_core::LevelFilter;

/// Configure where thread lifecycle logs go and how verbose they are.
///
/// Instead of taking a long list of arguments, [`try_initialize_logging_global()`] and
/// [`try_initialize_logging_thread_local()`] take anything that implements
/// [`Into<TracingConfig>`]:
///
/// ```no_run
/// use r3bl_winthread::{DisplayPreference, TracingConfig,
///                      try_initialize_logging_thread_local};
///
/// let config_1: TracingConfig = tracing::Level::DEBUG.into();
/// let config_2: TracingConfig = DisplayPreference::Stderr.into();
/// let _guard = try_initialize_logging_thread_local(config_1);
/// ```
///
/// [`try_initialize_logging_global()`]: crate::try_initialize_logging_global
/// [`try_initialize_logging_thread_local()`]: crate::try_initialize_logging_thread_local
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    pub level_filter: LevelFilter,
    pub display_preference: DisplayPreference,
}

/// Where the formatted log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayPreference {
    Stdout,
    #[default]
    Stderr,
    /// Captured by the libtest harness, so output only shows up for failing tests.
    TestWriter,
}

impl Default for TracingConfig {
    /// Logging is **disabled** by default.
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::OFF,
            display_preference: DisplayPreference::default(),
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn get_display_preference(&self) -> DisplayPreference { self.display_preference }

    #[must_use]
    pub fn is_enabled(&self) -> bool { self.level_filter != LevelFilter::OFF }
}

pub mod tracing_config_options {
    use super::*;

    impl From<tracing::Level> for TracingConfig {
        fn from(level: tracing::Level) -> Self {
            Self {
                level_filter: level.into(),
                display_preference: DisplayPreference::default(),
            }
        }
    }

    impl From<LevelFilter> for TracingConfig {
        fn from(level_filter: LevelFilter) -> Self {
            Self {
                level_filter,
                display_preference: DisplayPreference::default(),
            }
        }
    }

    impl From<DisplayPreference> for TracingConfig {
        fn from(display_preference: DisplayPreference) -> Self {
            Self {
                level_filter: LevelFilter::DEBUG,
                display_preference,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_is_off() {
        let it = TracingConfig::default();
        assert!(!it.is_enabled());
        assert_eq!(it.get_display_preference(), DisplayPreference::Stderr);
    }

    #[test]
    fn test_conversions() {
        let from_level: TracingConfig = tracing::Level::INFO.into();
        assert_eq!(from_level.get_level_filter(), LevelFilter::INFO);

        let from_filter: TracingConfig = LevelFilter::OFF.into();
        assert!(!from_filter.is_enabled());

        let from_display: TracingConfig = DisplayPreference::TestWriter.into();
        assert_eq!(from_display.get_level_filter(), LevelFilter::DEBUG);
        assert_eq!(
            from_display.get_display_preference(),
            DisplayPreference::TestWriter
        );
    }
}
