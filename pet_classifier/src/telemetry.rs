use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directives(log_level: &LogLevel) -> String {
    format!("{},ort=info", log_level.as_str())
}

/// Installs a JSON subscriber. `RUST_LOG` takes precedence over `log_level`.
pub fn init_tracing(log_level: &LogLevel) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_level(true)
                .with_thread_names(true)
                .with_thread_ids(true),
        )
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(&LogLevel::Debug), "debug,ort=info");
        assert_eq!(default_directives(&LogLevel::Info), "info,ort=info");
    }

    #[test]
    fn test_init_tracing_only_once() {
        let _ = init_tracing(&LogLevel::Info);
        assert!(init_tracing(&LogLevel::Debug).is_err());
    }
}
