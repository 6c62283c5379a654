//! Configuration validation
//!
//! Validates config consistency:
//! - Route names are present and unique
//! - Routes have at least one condition with a known operator
//! - Component names are present and unique
//! - Components only reference defined routes
//! - Stage sizing is non-zero

use std::collections::HashSet;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::routes::is_known_operator;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_stage(config)?;
    let routes = validate_routes(config)?;
    validate_components(config, &routes)?;
    Ok(())
}

/// Validate stage sizing
fn validate_stage(config: &Config) -> Result<()> {
    let stage = &config.stage;

    for (field, value) in [
        ("workers", stage.workers),
        ("channel_size", stage.channel_size),
        ("batch_size", stage.batch_size),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid_value(
                "stage",
                "stage",
                field,
                "must be at least 1",
            ));
        }
    }

    Ok(())
}

/// Validate route definitions, returning the set of defined names
fn validate_routes(config: &Config) -> Result<HashSet<&str>> {
    let mut names = HashSet::with_capacity(config.routes.len());

    for route in &config.routes {
        if route.name.is_empty() {
            return Err(ConfigError::missing_field("route", "<unnamed>", "name"));
        }

        if !names.insert(route.name.as_str()) {
            return Err(ConfigError::duplicate_route(&route.name));
        }

        if route.conditions.is_empty() {
            return Err(ConfigError::missing_field("route", &route.name, "conditions"));
        }

        for condition in &route.conditions {
            if condition.field.is_empty() {
                return Err(ConfigError::missing_field("route", &route.name, "field"));
            }

            if !is_known_operator(&condition.operator) {
                return Err(ConfigError::invalid_value(
                    "route",
                    &route.name,
                    "operator",
                    format!("unknown operator '{}'", condition.operator),
                ));
            }

            if condition.operator != "exists" && condition.value.is_none() {
                return Err(ConfigError::missing_field("route", &route.name, "value"));
            }
        }
    }

    Ok(names)
}

/// Validate component declarations against the defined routes
fn validate_components(config: &Config, routes: &HashSet<&str>) -> Result<()> {
    let mut names = HashSet::with_capacity(config.components.len());

    for component in &config.components {
        if component.name.is_empty() {
            return Err(ConfigError::missing_field("component", "<unnamed>", "name"));
        }

        if !names.insert(component.name.as_str()) {
            return Err(ConfigError::duplicate_component(&component.name));
        }

        for route in &component.routes {
            if !routes.contains(route.as_str()) {
                return Err(ConfigError::unknown_route(&component.name, route));
            }
        }
    }

    Ok(())
}
