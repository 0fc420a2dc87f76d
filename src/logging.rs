use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter `{filter}`: {message}")]
    Filter { filter: String, message: String },
    #[error("a global subscriber is already installed")]
    AlreadyInstalled,
}

/// `RUST_LOG` when set, else the configured directives.
pub fn filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| LoggingError::Filter {
        filter: config.filter.clone(),
        message: err.to_string(),
    })
}

/// Installs the stderr subscriber; stdout stays free for observation lines.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(config.ansi)
        .with_timer(tracing_subscriber::fmt::time::uptime());
    tracing_subscriber::registry()
        .with(formatter)
        .with(filter(config)?)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directives_parse() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(filter(&LoggingConfig::default()).is_ok());
        let err = filter(&LoggingConfig {
            filter: "sequence_arena=loud".into(),
            ansi: false,
        })
        .unwrap_err();
        assert!(matches!(err, LoggingError::Filter { .. }));
    }
}
