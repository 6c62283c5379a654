//! Sluice Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use sluice_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[[components]]\nname = \"archive\"").unwrap();
//! assert_eq!(config.components.len(), 1);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [router]
//! record_strategy = "copy_on_fan_out"
//!
//! [[routes]]
//! name = "errors"
//! [[routes.conditions]]
//! field = "level"
//! value = "error"
//!
//! [[components]]
//! name = "alerts"
//! routes = ["errors"]
//!
//! [[components]]
//! name = "archive"
//! ```

mod components;
mod error;
mod logging;
mod router;
mod routes;
mod stage;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use components::ComponentConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogOutput};
pub use router::{DeliveryFailureMode, RecordStrategyKind, RouterConfig};
pub use routes::{
    ConditionConfig, ConditionValue, KNOWN_OPERATORS, MatchMode, RouteConfig, is_known_operator,
};
pub use stage::StageConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Router tunables
    pub router: RouterConfig,

    /// Stage driver sizing
    pub stage: StageConfig,

    /// Named routes (predicates over events)
    pub routes: Vec<RouteConfig>,

    /// Downstream components, in delivery order
    pub components: Vec<ComponentConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Components with `enabled = true`, in declaration order
    pub fn enabled_components(&self) -> impl Iterator<Item = &ComponentConfig> {
        self.components.iter().filter(|c| c.enabled)
    }

    /// Look up a route definition by name
    pub fn route(&self, name: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.name == name)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
