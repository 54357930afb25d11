/*!
 * Tracing setup for the mixer binary
 *
 * Human-readable compact lines go to stderr so stdout stays free for
 * reports. With `log_file` set, JSON records go to that file instead.
 */

use std::fs::File;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::MixConfig;
use crate::error::{MixerError, Result};

/// Crates whose events are shown at the configured level
const LOG_TARGETS: [&str; 3] = ["mixer", "mixer_core_manifest", "mixer_core_interface"];

/// Level actually used for a configuration
pub fn effective_level(config: &MixConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Filter directives for `level`, e.g. `mixer=info,mixer_core_manifest=info,...`
pub fn default_directives(level: Level) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// `RUST_LOG` wins over the configured level
fn build_filter(config: &MixConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directives(effective_level(config)))
            .map_err(|e| MixerError::Config(format!("invalid log filter: {}", e))),
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails when a subscriber is already installed.
pub fn init_logging(config: &MixConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.log_file {
        Some(ref path) => {
            let file = File::create(path).map_err(|e| {
                MixerError::Config(format!("cannot create log file {}: {}", path.display(), e))
            })?;
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_thread_names(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .try_init()
        }
        None => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };

    installed.map_err(|e| MixerError::Config(format!("logging already initialized: {}", e)))
}

/// Debug logging routed through the test harness; safe to call repeatedly
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(default_directives(Level::DEBUG)))
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}
