// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use miette::IntoDiagnostic;
use tracing::dispatcher;
use tracing_core::LevelFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt, registry::LookupSpan,
                         util::SubscriberInitExt};

use super::{DisplayPreference, TracingConfig};

/// Type alias for a boxed layer.
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_thread_ids(false)
            .with_thread_names(true)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
    };
}

/// Global default subscriber, which once set, can't be unset or changed.
/// - This is great for apps.
/// - Returns an error if some other global subscriber was installed first.
///
/// Logging is **DISABLED** by **default**. Passing [`LevelFilter::OFF`] is a no-op.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn try_initialize_logging_global(
    options: impl Into<TracingConfig>,
) -> miette::Result<()> {
    let it: TracingConfig = options.into();

    // Early return if the level filter is off.
    if !it.is_enabled() {
        return Ok(());
    }

    let layers = try_create_layers(it)?;
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .into_diagnostic()
}

/// Thread local subscriber, which you can assign differently to different threads.
/// - This is great for tests.
/// - Drop the returned guard to restore the previous subscriber for this thread.
///
/// Threads spawned by this crate do **not** inherit a thread local subscriber. Use
/// [`try_initialize_logging_global()`] if you want to see the logs emitted by the
/// launcher of a spawned thread.
///
/// # Errors
///
/// Returns an error if the layers can't be created.
pub fn try_initialize_logging_thread_local(
    options: impl Into<TracingConfig>,
) -> miette::Result<Option<dispatcher::DefaultGuard>> {
    let it: TracingConfig = options.into();

    // Early return if the level filter is off.
    if !it.is_enabled() {
        return Ok(None);
    }

    let layers = try_create_layers(it)?;
    Ok(Some(tracing_subscriber::registry().with(layers).set_default()))
}

/// Returns the layers. This does not initialize the tracing system.
///
/// # Errors
///
/// Returns an error if the display layer can't be created.
pub fn try_create_layers(
    tracing_config: TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<tracing_subscriber::Registry>>>> {
    let mut return_it: Vec<Box<DynLayer<tracing_subscriber::Registry>>> = vec![];

    // Set the level filter from the tracing configuration. Needed if more layers get
    // added that don't have a level filter of their own.
    return_it.push(Box::new(tracing_config.get_level_filter()));

    return_it.push(try_create_display_layer(
        tracing_config.get_level_filter(),
        tracing_config.get_display_preference(),
    )?);

    Ok(return_it)
}

/// This erases the concrete type of the writer, and returns a boxed layer.
///
/// # Errors
///
/// Infallible for the current writers. The signature leaves room for writers that
/// need to acquire resources.
pub fn try_create_display_layer<S>(
    level_filter: LevelFilter,
    display_preference: DisplayPreference,
) -> miette::Result<Box<DynLayer<S>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    Ok(match display_preference {
        DisplayPreference::Stdout => Box::new(
            fmt_layer
                .with_writer(std::io::stdout)
                .with_filter(level_filter),
        ),
        DisplayPreference::Stderr => Box::new(
            fmt_layer
                .with_writer(std::io::stderr)
                .with_filter(level_filter),
        ),
        DisplayPreference::TestWriter => {
            Box::new(fmt_layer.with_test_writer().with_filter(level_filter))
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_off_does_not_install_anything() {
        let guard = try_initialize_logging_thread_local(LevelFilter::OFF).unwrap();
        assert!(guard.is_none());
    }

    #[test]
    fn test_create_layers_has_filter_and_display() {
        let layers = try_create_layers(DisplayPreference::TestWriter.into()).unwrap();
        assert_eq!(layers.len(), 2);
    }

    #[test]
    fn test_thread_local_guard_scopes_subscriber() {
        let guard = try_initialize_logging_thread_local(TracingConfig {
            level_filter: LevelFilter::DEBUG,
            display_preference: DisplayPreference::TestWriter,
        })
        .unwrap();
        assert!(guard.is_some());
        tracing::debug!(message = "visible only in failing test output");
        drop(guard);
    }
}
