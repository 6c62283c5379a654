//! Route definitions
//!
//! A route is a named predicate over an event. Each `[[routes]]` entry lists
//! field conditions combined with `all` (AND) or `any` (OR) logic.
//!
//! # Example
//!
//! ```toml
//! [[routes]]
//! name = "server_errors"
//! match = "all"
//!
//! [[routes.conditions]]
//! field = "status"
//! operator = "gte"
//! value = 500
//!
//! [[routes.conditions]]
//! field = "/http/method"
//! operator = "ne"
//! value = "HEAD"
//! ```

use std::fmt;

use serde::Deserialize;

/// Operator names accepted in `[[routes.conditions]]`
pub const KNOWN_OPERATORS: &[&str] = &[
    "eq",
    "ne",
    "contains",
    "starts_with",
    "ends_with",
    "regex",
    "exists",
    "gt",
    "lt",
    "gte",
    "lte",
];

/// Check if an operator name is known
pub fn is_known_operator(name: &str) -> bool {
    KNOWN_OPERATORS.contains(&name)
}

/// How to combine a route's conditions
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// All conditions must match (AND)
    #[default]
    All,
    /// Any condition must match (OR)
    Any,
}

/// Comparison value for a condition
///
/// TOML scalars are accepted as-is so numeric thresholds need no quoting.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionValue {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// String literal
    String(String),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            // Debug keeps the fraction, so 5.0 stays "5.0"
            Self::Float(x) => write!(f, "{:?}", x),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A single field condition
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionConfig {
    /// Field key (dot notation `user.email` or pointer `/user/email`)
    pub field: String,

    /// Operator name, see `KNOWN_OPERATORS`
    /// Default: eq
    #[serde(default = "default_operator")]
    pub operator: String,

    /// Value to compare against (not used by `exists`)
    #[serde(default)]
    pub value: Option<ConditionValue>,
}

fn default_operator() -> String {
    "eq".to_string()
}

/// A named route
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Unique route name, referenced by components
    pub name: String,

    /// How conditions combine
    /// Default: all
    #[serde(rename = "match", default)]
    pub match_mode: MatchMode,

    /// Conditions evaluated against each event
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        routes: Vec<RouteConfig>,
    }

    #[test]
    fn test_deserialize_route() {
        let toml = r#"
[[routes]]
name = "errors"

[[routes.conditions]]
field = "level"
value = "error"
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        let route = &wrapper.routes[0];
        assert_eq!(route.name, "errors");
        assert_eq!(route.match_mode, MatchMode::All);
        assert_eq!(route.conditions.len(), 1);
        assert_eq!(route.conditions[0].operator, "eq");
        assert_eq!(
            route.conditions[0].value,
            Some(ConditionValue::String("error".into()))
        );
    }

    #[test]
    fn test_deserialize_scalar_values() {
        let toml = r#"
[[routes]]
name = "mixed"
match = "any"
conditions = [
    { field = "status", operator = "gte", value = 500 },
    { field = "ratio", operator = "lt", value = 0.5 },
    { field = "debug", value = true },
    { field = "trace_id", operator = "exists" },
]
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        let route = &wrapper.routes[0];
        assert_eq!(route.match_mode, MatchMode::Any);
        assert_eq!(route.conditions[0].value, Some(ConditionValue::Integer(500)));
        assert_eq!(route.conditions[1].value, Some(ConditionValue::Float(0.5)));
        assert_eq!(route.conditions[2].value, Some(ConditionValue::Bool(true)));
        assert_eq!(route.conditions[3].value, None);
    }

    #[test]
    fn test_condition_value_display() {
        assert_eq!(ConditionValue::Integer(500).to_string(), "500");
        assert_eq!(ConditionValue::Float(0.5).to_string(), "0.5");
        assert_eq!(ConditionValue::Float(5.0).to_string(), "5.0");
        assert_eq!(ConditionValue::Float(-2.0).to_string(), "-2.0");
        assert_eq!(ConditionValue::Bool(false).to_string(), "false");
        assert_eq!(ConditionValue::String("A".into()).to_string(), "A");
    }

    #[test]
    fn test_known_operators() {
        assert!(is_known_operator("eq"));
        assert!(is_known_operator("regex"));
        assert!(is_known_operator("lte"));
        assert!(!is_known_operator("like"));
        assert!(!is_known_operator(""));
    }
}
