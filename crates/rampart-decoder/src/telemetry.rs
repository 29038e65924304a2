//! Telemetry bootstrap for hosts embedding the decoder.
//!
//! The decoder emits `tracing` events under per-concern targets (decode,
//! store, forward) and leaves subscriber installation to its host. Engine
//! workers that run the decoder standalone call [`init`] once at startup;
//! deployments that already install their own subscriber skip this module
//! entirely and the decoder's events flow into it unchanged.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use rampart_config::Config;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Witness that telemetry has been set up for this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("log filter '{expression}' is invalid: {message}")]
    Filter { expression: String, message: String },
    /// Another subscriber was installed concurrently.
    #[error("cannot install telemetry subscriber: {0}")]
    Install(#[from] SetGlobalDefaultError),
}

/// Installs the process-wide subscriber described by the configuration.
///
/// Only the first call installs anything; later calls hand back a fresh
/// [`TelemetryHandle`] without touching global state, so the engine may
/// bootstrap every worker through the same code path.
///
/// # Examples
///
/// ```
/// use rampart_config::Config;
/// use rampart_decoder::telemetry;
///
/// let config = Config::default();
/// let handle = telemetry::init(&config).expect("install telemetry");
/// // Re-initialisation is a no-op handing back another handle.
/// telemetry::init(&config).expect("idempotent");
/// # drop(handle);
/// ```
pub fn init(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED.get_or_try_init(|| {
        let filter = parse_filter(&config.log_filter)?;
        if config.log_format.is_json() {
            install_json(filter)
        } else {
            install_compact(filter)
        }
    })?;
    Ok(TelemetryHandle)
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        expression: expression.to_string(),
        message: error.to_string(),
    })
}

/// One JSON object per line on stderr, fields flattened so log shippers
/// index the decoder's targets and agent ids directly.
fn install_json(filter: EnvFilter) -> Result<(), TelemetryError> {
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .json()
        .flatten_event(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::from)
}

/// Single-line human-readable output for interactive runs, coloured only
/// when stderr is a terminal.
fn install_compact(filter: EnvFilter) -> Result<(), TelemetryError> {
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::from)
}
