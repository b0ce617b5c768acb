//! Configuration management for the pet store service
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (petstore.toml)
//! - Environment variables (PETSTORE__*)
//!
//! ## Example config file (petstore.toml):
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//! seed_sample_data = true
//!
//! [versioning]
//! header = "API-Version"
//! missing_shim = "reject"
//!
//! [normalization]
//! strategy = "route_template"
//! segment_pattern = "^[0-9a-f-]+$"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::dispatch::MissingShimPolicy;
use crate::negotiation::DEFAULT_VERSION_HEADER;
use crate::path::{NormalizationStrategy, DEFAULT_SEGMENT_PATTERN};

/// Main configuration for the service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Version negotiation settings
    #[serde(default)]
    pub versioning: VersioningConfig,

    /// Path normalization settings
    #[serde(default)]
    pub normalization: NormalizationConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Populate the in-memory store with a few pets at startup
    #[serde(default = "default_true")]
    pub seed_sample_data: bool,
}

/// Version negotiation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Name of the declared-version header
    #[serde(default = "default_header")]
    pub header: String,

    /// Behaviour when a hop in a version chain has no shim
    #[serde(default)]
    pub missing_shim: MissingShimPolicy,
}

/// Path normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// How request paths are mapped to registry keys
    #[serde(default)]
    pub strategy: NormalizationStrategy,

    /// Regex deciding which literal segments are identifiers
    #[serde(default = "default_segment_pattern")]
    pub segment_pattern: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

// Default value functions
fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_true() -> bool {
    true
}

fn default_header() -> String {
    DEFAULT_VERSION_HEADER.to_string()
}

fn default_segment_pattern() -> String {
    DEFAULT_SEGMENT_PATTERN.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            seed_sample_data: true,
        }
    }
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            missing_shim: MissingShimPolicy::default(),
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strategy: NormalizationStrategy::default(),
            segment_pattern: default_segment_pattern(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration, optionally from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["petstore.toml", ".petstore.toml", "config/petstore.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from the platform config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "petstore") {
            let platform_config = config_dir.config_dir().join("petstore.toml");
            if platform_config.exists() {
                builder = builder.add_source(File::from(platform_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (PETSTORE__SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("PETSTORE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_toml()?)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
