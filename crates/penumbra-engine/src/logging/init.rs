use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` provides one. wgpu's
/// internals are chatty at `info`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` uses `env_logger` filter syntax, e.g.
/// `"penumbra_engine=debug,wgpu_core=warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Filter string in effect: the explicit one, then `RUST_LOG`, then
    /// [`DEFAULT_FILTER`].
    pub fn resolve_filter(&self, rust_log: Option<String>) -> String {
        self.env_filter
            .clone()
            .or(rust_log)
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(std::env::var("RUST_LOG").ok());
        env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .format_timestamp_millis()
            .init();

        log::debug!("logging initialized with filter `{filter}`");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let cfg = LoggingConfig {
            env_filter: Some("debug".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(cfg.resolve_filter(Some("trace".into())), "debug");
    }

    #[test]
    fn rust_log_then_default() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.resolve_filter(Some("warn".into())), "warn");
        assert_eq!(cfg.resolve_filter(None), DEFAULT_FILTER);
    }
}
