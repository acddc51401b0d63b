//! Logging setup for ShadowWalker.
//!
//! Everything in the workspace logs through `tracing`. This crate installs the
//! global subscriber: a console layer for humans and, in debug builds, a JSON
//! file for post-mortem analysis of a session.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::time::Uptime;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use walker_config::Config;

pub use tracing_subscriber::util::TryInitError;

/// Filter used when neither `RUST_LOG` nor the config set one.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log written in debug builds.
pub const LOG_FILE: &str = "walker.log";

type JsonFileLayer<S> = fmt::Layer<S, JsonFields, Format<Json, Uptime>, Mutex<File>>;

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` if set, else from `config.debug.log_level`,
/// else [`DEFAULT_FILTER`]. When `debug_build` is set and `log_dir` can be
/// created, events are also written as JSON lines to `log_dir/walker.log`.
///
/// Fails if a global subscriber is already installed.
///
/// ```no_run
/// use walker_config::Config;
/// use walker_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config)).unwrap();
/// ```
pub fn init_logging(
    log_dir: Option<&Path>,
    debug_build: bool,
    config: Option<&Config>,
) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config)))
        .unwrap_or_else(|_| default_env_filter());

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true) // workers are named walker-send / walker-recv
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let file_layer = if debug_build {
        log_dir.and_then(json_file_layer)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
}

/// The filter directive taken from the config, or [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> &str {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.as_str()
        }
        _ => DEFAULT_FILTER,
    }
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

fn json_file_layer<S>(log_dir: &Path) -> Option<JsonFileLayer<S>> {
    std::fs::create_dir_all(log_dir).ok()?;
    let file = File::create(log_dir.join(LOG_FILE)).ok()?;
    Some(
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json(),
    )
}
