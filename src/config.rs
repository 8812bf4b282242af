use crate::client::providers::{arxiv, ieee};
use crate::client::HttpClientConfig;
use crate::{Error, Result};
use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Prefix of environment overrides, e.g. `PAPERTRAIL_HTTP__TIMEOUT_SECS=10`
pub const ENV_PREFIX: &str = "PAPERTRAIL";

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aggregation: AggregationConfig,
    pub http: HttpSettings,
    pub health: HealthConfig,
    pub arxiv: ArxivConfig,
    pub ieee: IeeeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Shared deadline for one fan-out search
    pub deadline_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { deadline_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let defaults = HttpClientConfig::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            user_agent: defaults.user_agent,
            proxy: None,
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub probe_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub enabled: bool,
    pub base_url: String,
    pub priority: u32,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: arxiv::DEFAULT_BASE_URL.to_string(),
            priority: arxiv::DEFAULT_PRIORITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IeeeConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub priority: u32,
}

impl Default for IeeeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: ieee::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            priority: ieee::DEFAULT_PRIORITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Values supplied on the command line, applied over every other layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub deadline_secs: Option<u64>,
}

impl Config {
    /// Default location of the configuration file, if the platform has one
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let dir = dirs::config_dir()?;
        Some(dir.join("papertrail").join("config.toml"))
    }

    /// Load defaults, then the TOML file, then `PAPERTRAIL_*` environment variables.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Self::default())?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        let required = path.is_some();
        if let Some(file) = path.map(Path::to_path_buf).or_else(Self::default_path) {
            debug!(required, "Loading configuration from {}", file.display());
            let source = File::from(file).format(FileFormat::Toml).required(required);
            builder = builder.add_source(source);
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides and re-validate
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if let Some(format) = &overrides.log_format {
            self.logging.format.clone_from(format);
        }
        if let Some(deadline) = overrides.deadline_secs {
            self.aggregation.deadline_secs = deadline;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("aggregation.deadline_secs", self.aggregation.deadline_secs),
            ("http.timeout_secs", self.http.timeout_secs),
            ("http.connect_timeout_secs", self.http.connect_timeout_secs),
            ("health.probe_timeout_secs", self.health.probe_timeout_secs),
        ] {
            if value == 0 {
                return Err(Error::invalid_input(field, "must be greater than zero"));
            }
        }

        if self.http.user_agent.trim().is_empty() {
            return Err(Error::invalid_input("http.user_agent", "cannot be blank"));
        }

        if let Some(proxy) = self.http.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            Url::parse(proxy)
                .map_err(|e| Error::invalid_input("http.proxy", format!("invalid URL: {e}")))?;
        }

        for (field, value) in [
            ("arxiv.base_url", &self.arxiv.base_url),
            ("ieee.base_url", &self.ieee.base_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::invalid_input(field, format!("invalid URL: {e}")))?;
        }

        let format = &self.logging.format;
        if !LOG_FORMATS.contains(&format.as_str()) {
            return Err(Error::invalid_input(
                "logging.format",
                format!("expected one of {LOG_FORMATS:?}, got '{format}'"),
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::invalid_input(
                "logging.level",
                format!("expected one of {LOG_LEVELS:?}, got '{level}'"),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn deadline(&self) -> Duration {
        Duration::from_secs(self.aggregation.deadline_secs)
    }

    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health.probe_timeout_secs)
    }
}
