//! Tracing subscriber setup

use crate::config::{LogFormat, Verbosity};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over the verbosity flags. Returns `false` when a
/// subscriber was already installed.
pub fn init_logging(verbosity: Verbosity, format: LogFormat, ansi: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("demoflow={0},demoflow_cli={0}", verbosity.log_filter())));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(ansi)
                    .with_target(verbosity.is_debug()),
            )
            .try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        let _ = init_logging(Verbosity::Normal, LogFormat::Text, false);
        assert!(!init_logging(Verbosity::Debug, LogFormat::Json, false));
    }
}
