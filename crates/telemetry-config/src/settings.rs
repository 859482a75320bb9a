//! Configuration structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use telemetry_client::ClientConfig;
use telemetry_core::error::{TelemetryError, TelemetryResult};
use telemetry_metrics::MetricsConfig;
use telemetry_server::ServerConfig;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Reject settings no component can run with.
    pub fn validate(&self) -> TelemetryResult<()> {
        let invalid = |msg: &str| Err(TelemetryError::Config(msg.to_string()));

        if self.store.url.trim().is_empty() {
            return invalid("store.url must not be empty");
        }
        if self.server.trades_limit == 0 {
            return invalid("server.trades_limit must be positive");
        }
        if self.server.signals_limit == 0 {
            return invalid("server.signals_limit must be positive");
        }
        if self.server.max_sessions == 0 {
            return invalid("server.max_sessions must be positive");
        }
        if self.server.send_timeout_ms == 0 {
            return invalid("server.send_timeout_ms must be positive");
        }
        if self.metrics.starting_capital <= Decimal::ZERO {
            return invalid("metrics.starting_capital must be positive");
        }
        if self.client.url.trim().is_empty() {
            return invalid("client.url must not be empty");
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> TelemetryResult<String> {
        toml::to_string_pretty(self).map_err(|e| TelemetryError::Config(e.to_string()))
    }
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "telemetry".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Where telemetry rows are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// `memory://`, `csv://<dir>` or a bare directory
    pub url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: "csv://data/sample".to_string(),
        }
    }
}
