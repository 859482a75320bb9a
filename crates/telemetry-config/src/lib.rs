//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, LoggingConfig, StoreSettings};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Prefix for environment overrides, e.g. `TELEMETRY__STORE__URL`.
pub const ENV_PREFIX: &str = "TELEMETRY";

/// Load configuration from an optional file and the environment.
///
/// Every section has defaults, so with no file and no environment the
/// result is `AppConfig::default()`.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;
    use telemetry_client::ReconnectPolicy;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("telemetry-config-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_partial_file() {
        let path = write_config(
            "partial",
            r#"
[store]
url = "memory://"

[server]
bind = "127.0.0.1:4100"

[server.cadence]
performance_ms = 0

[client.reconnect]
kind = "exponential"
initial_ms = 250
max_ms = 4000

[metrics]
starting_capital = 25000
"#,
        );

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.store.url, "memory://");
        assert_eq!(config.server.bind, "127.0.0.1:4100");
        assert_eq!(config.server.cadence.performance_ms, 0);
        assert_eq!(config.server.cadence.system_status_ms, 1000);
        assert_eq!(
            config.client.reconnect,
            ReconnectPolicy::Exponential {
                initial_ms: 250,
                max_ms: 4000
            }
        );
        assert_eq!(config.metrics.starting_capital, dec!(25000));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_default_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = load_config(Some(&path)).unwrap();
        let defaults = AppConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.store, defaults.store);
        assert_eq!(config.server.cadence, defaults.server.cadence);
        assert_eq!(config.client, defaults.client);
        assert_eq!(config.metrics, defaults.metrics);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("telemetry-config-does-not-exist.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let path = write_config(
            "env",
            r#"
[server]
signals_limit = 5
"#,
        );

        std::env::set_var("TELEMETRY__SERVER__SIGNALS_LIMIT", "7");
        let config = load_config(Some(&path));
        std::env::remove_var("TELEMETRY__SERVER__SIGNALS_LIMIT");

        assert_eq!(config.unwrap().server.signals_limit, 7);
    }
}
