//! Downstream component declarations
//!
//! Each component names the routes gating delivery to it. An empty route
//! list makes the component unconditional: it receives every record.
//!
//! # Example
//!
//! ```toml
//! [[components]]
//! name = "archive"          # no routes: receives everything
//!
//! [[components]]
//! name = "alerts"
//! routes = ["server_errors", "security"]
//! ```

use serde::Deserialize;

/// A downstream component and the routes it subscribes to
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentConfig {
    /// Unique component name
    pub name: String,

    /// Route names gating delivery (empty = unconditional)
    #[serde(default)]
    pub routes: Vec<String>,

    /// Whether the component participates in routing
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ComponentConfig {
    /// Whether the component receives every record
    pub fn is_unconditional(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        components: Vec<ComponentConfig>,
    }

    #[test]
    fn test_deserialize_components() {
        let toml = r#"
[[components]]
name = "archive"

[[components]]
name = "alerts"
routes = ["errors", "security"]
enabled = false
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.components.len(), 2);

        let archive = &wrapper.components[0];
        assert!(archive.enabled);
        assert!(archive.is_unconditional());

        let alerts = &wrapper.components[1];
        assert!(!alerts.enabled);
        assert!(!alerts.is_unconditional());
        assert_eq!(alerts.routes, vec!["errors", "security"]);
    }
}
