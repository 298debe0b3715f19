//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homebus.toml` in the working directory (or the file named by
//! `HOMEBUS_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use serde::Deserialize;

use homebus_adapter_mqtt::MqttConfig;
use homebus_app::router::{PredictedSeries, RouterSettings};
use homebus_app::services::command_service::CommandRouting;
use homebus_domain::device::Device;
use homebus_domain::error::HomeBusError;
use homebus_domain::feedback::FeedbackGuard;
use homebus_domain::id::{DeviceId, SeriesId};
use homebus_domain::mapping::IdentifierMap;
use homebus_domain::prediction::PredictorConfig;
use homebus_domain::threshold::AlertThreshold;
use homebus_domain::topic::TopicCodec;

const DEFAULT_PATH: &str = "homebus.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection settings.
    pub broker: MqttConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Prediction and auto-control settings.
    pub control: ControlConfig,
    /// Topic key to store id mapping.
    pub mapping: IdentifierMap,
    /// Static alert limits.
    pub alerts: AlertsConfig,
    /// Actuators registered in the store at startup.
    pub devices: Vec<DeviceSeed>,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Trend prediction and auto-control.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub predictor: PredictorConfig,
    /// Confidence a prediction must exceed before actuators are switched.
    pub confidence_gate: f64,
    /// Series whose trend drives actuators.
    pub predicted: Vec<PredictedSeriesConfig>,
    /// Additional `source` tags treated as this bus's own commands.
    pub extra_source_tags: Vec<String>,
    /// Capacity of the in-process event bus.
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictedSeriesConfig {
    pub series: SeriesId,
    pub threshold: f64,
    pub actuator_class: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub thresholds: Vec<AlertThreshold>,
}

/// A device upserted at startup. Existing status is kept.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSeed {
    pub id: DeviceId,
    pub name: String,
    pub class: String,
}

impl DeviceSeed {
    /// Build the domain device, inactive until reported otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`HomeBusError::Validation`] if the name or class is empty.
    pub fn to_device(&self) -> Result<Device, HomeBusError> {
        Device::builder()
            .id(self.id.clone())
            .name(&self.name)
            .class(&self.class)
            .build()
    }
}

impl Config {
    /// Load configuration from `homebus.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HOMEBUS_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOMEBUS_BROKER_HOST") {
            self.broker.broker_host = val;
        }
        if let Ok(val) = std::env::var("HOMEBUS_BROKER_PORT") {
            if let Ok(port) = val.parse() {
                self.broker.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("HOMEBUS_BROKER_USERNAME") {
            self.broker.username = Some(val);
        }
        if let Ok(val) = std::env::var("HOMEBUS_BROKER_PASSWORD") {
            self.broker.password = Some(val);
        }
        if let Ok(val) = std::env::var("HOMEBUS_BASE_TOPIC") {
            self.broker.base_topic = val;
        }
        if let Ok(val) = std::env::var("HOMEBUS_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("HOMEBUS_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.broker_port == 0 {
            return Err(ConfigError::Validation(
                "broker port must be non-zero".to_string(),
            ));
        }
        let namespace = &self.broker.base_topic;
        if namespace.is_empty() || namespace.contains(['/', '+', '#']) {
            return Err(ConfigError::Validation(format!(
                "base topic {namespace:?} must be a single non-empty topic level"
            )));
        }

        let predictor = &self.control.predictor;
        if predictor.min_samples < 2 {
            return Err(ConfigError::Validation(
                "predictor min_samples must be at least 2".to_string(),
            ));
        }
        if predictor.capacity < predictor.min_samples {
            return Err(ConfigError::Validation(
                "predictor capacity must hold at least min_samples".to_string(),
            ));
        }
        if predictor.trend_samples < 2 {
            return Err(ConfigError::Validation(
                "predictor trend_samples must be at least 2".to_string(),
            ));
        }
        if predictor.variance_normalizer.is_nan() || predictor.variance_normalizer <= 0.0 {
            return Err(ConfigError::Validation(
                "predictor variance_normalizer must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.control.confidence_gate) {
            return Err(ConfigError::Validation(
                "confidence_gate must be within [0, 1]".to_string(),
            ));
        }
        if let Some(predicted) = self
            .control
            .predicted
            .iter()
            .find(|predicted| !predicted.threshold.is_finite())
        {
            return Err(ConfigError::Validation(format!(
                "threshold of series {} must be finite",
                predicted.series
            )));
        }
        if let Some(seed) = self
            .devices
            .iter()
            .find(|seed| seed.name.is_empty() || seed.class.is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "device {} needs a name and a class",
                seed.id
            )));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Router settings derived from the broker, control, mapping and alert
    /// sections.
    #[must_use]
    pub fn router_settings(&self) -> RouterSettings {
        let guard =
            FeedbackGuard::default().with_extra_tags(self.control.extra_source_tags.iter().cloned());
        RouterSettings {
            routing: CommandRouting {
                codec: TopicCodec::new(self.broker.base_topic.clone()),
                mapping: self.mapping.clone(),
                guard,
            },
            predictor: self.control.predictor,
            predicted: self
                .control
                .predicted
                .iter()
                .map(|predicted| PredictedSeries {
                    series: predicted.series.clone(),
                    threshold: predicted.threshold,
                    actuator_class: predicted.actuator_class.clone(),
                })
                .collect(),
            confidence_gate: self.control.confidence_gate,
            thresholds: self.alerts.thresholds.clone(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:homebus.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homebusd=info,homebus=info".to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        let defaults = RouterSettings::default();
        Self {
            predictor: defaults.predictor,
            confidence_gate: defaults.confidence_gate,
            predicted: defaults
                .predicted
                .into_iter()
                .map(|predicted| PredictedSeriesConfig {
                    series: predicted.series,
                    threshold: predicted.threshold,
                    actuator_class: predicted.actuator_class,
                })
                .collect(),
            extra_source_tags: Vec::new(),
            event_capacity: 256,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.broker.broker_host, "localhost");
        assert_eq!(config.broker.base_topic, "home");
        assert_eq!(config.database.url, "sqlite:homebus.db?mode=rwc");
        assert!((config.control.confidence_gate - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.control.predicted.len(), 1);
        assert_eq!(config.control.predicted[0].series.as_str(), "temperature");
        assert_eq!(config.control.predicted[0].actuator_class, "fan");
        assert!(config.devices.is_empty());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.broker.broker_port, 1883);
        assert_eq!(config.control.predictor.capacity, 24);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [broker]
            broker_host = 'mqtt.local'
            broker_port = 8883
            base_topic = 'yolohome'

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [control]
            confidence_gate = 0.5
            extra_source_tags = ['dashboard']

            [control.predictor]
            capacity = 48
            min_samples = 6

            [[control.predicted]]
            series = 'humidity'
            threshold = 70.0
            actuator_class = 'dehumidifier'

            [mapping.sensors]
            'board-1-temp' = 'temperature'

            [mapping.devices]
            'relay-a' = '7'

            [[alerts.thresholds]]
            series = 'humidity'
            max = 80.0

            [[devices]]
            id = '3'
            name = 'Living room fan'
            class = 'fan'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.broker.broker_host, "mqtt.local");
        assert_eq!(config.broker.broker_port, 8883);
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.control.predictor.capacity, 48);
        assert_eq!(config.control.predictor.min_samples, 6);
        assert_eq!(config.control.predictor.trend_samples, 5);
        assert_eq!(config.control.predicted[0].series.as_str(), "humidity");
        assert_eq!(
            config.mapping.series("board-1-temp").unwrap().as_str(),
            "temperature"
        );
        assert_eq!(config.alerts.thresholds.len(), 1);
        assert_eq!(config.devices[0].id.as_str(), "3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_build_router_settings_from_sections() {
        let toml = "
            [broker]
            base_topic = 'yolohome'

            [control]
            extra_source_tags = ['dashboard']

            [mapping.devices]
            'relay-a' = '7'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        let settings = config.router_settings();

        assert_eq!(settings.routing.codec.namespace(), "yolohome");
        assert!(settings.routing.guard.is_echo(Some("dashboard")));
        assert!(settings.routing.guard.is_echo(Some("auto-control")));
        assert_eq!(
            settings.routing.mapping.device("relay-a").unwrap().as_str(),
            "7"
        );
        assert_eq!(settings.predicted[0].actuator_class, "fan");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.broker.broker_port, 1883);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.broker.broker_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_multi_level_base_topic() {
        let mut config = Config::default();
        config.broker.base_topic = "home/ground".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_window_smaller_than_min_samples() {
        let mut config = Config::default();
        config.control.predictor.capacity = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_non_positive_normalizer() {
        let mut config = Config::default();
        config.control.predictor.variance_normalizer = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_gate_outside_unit_interval() {
        let mut config = Config::default();
        config.control.confidence_gate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_invalid_device_key() {
        let toml = "
            [[devices]]
            id = 'a/b'
            name = 'Fan'
            class = 'fan'
        ";
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_device_seed_without_class() {
        let toml = "
            [[devices]]
            id = '3'
            name = 'Fan'
            class = ''
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_build_inactive_device_from_seed() {
        let seed = DeviceSeed {
            id: DeviceId::new("3").unwrap(),
            name: "Fan".to_string(),
            class: "fan".to_string(),
        };
        let device = seed.to_device().unwrap();
        assert!(!device.status.is_active());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
