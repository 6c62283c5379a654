//! Field conditions - the configurable route predicate
//!
//! Routes declared in TOML compile into a `ConditionPredicate`: a list of
//! field conditions combined with `all` (AND) or `any` (OR).
//!
//! # Operators
//!
//! | Operator | Matches when |
//! |----------|--------------|
//! | `eq` | field equals value |
//! | `ne` | field differs from value, or is missing |
//! | `contains` | field (as string) contains value |
//! | `starts_with` | field (as string) starts with value |
//! | `ends_with` | field (as string) ends with value |
//! | `regex` | field (as string) matches the pattern |
//! | `exists` | field is present (value ignored) |
//! | `gt` `lt` `gte` `lte` | numeric comparison |
//!
//! Missing fields never match, except for `ne`. A numeric operator on a
//! present field that is not a number (or a numeric string) is an
//! evaluation error, which the evaluator treats as "not matched".

use std::fmt;

use serde_json::Value;
use sluice_config::{ConditionConfig, RouteConfig};
use sluice_model::{Event, EventKey};

use crate::error::{EvaluationError, RoutingError};
use crate::route::{Route, RoutePredicate};

pub use sluice_config::MatchMode;

/// Comparison operator for conditions
#[derive(Debug, Clone)]
pub enum Operator {
    /// Equals
    Eq,
    /// Not equals
    Ne,
    /// String contains
    Contains,
    /// String starts with
    StartsWith,
    /// String ends with
    EndsWith,
    /// Regex match
    Regex(regex::Regex),
    /// Field exists
    Exists,
    /// Greater than (numeric)
    Gt,
    /// Less than (numeric)
    Lt,
    /// Greater than or equal (numeric)
    Gte,
    /// Less than or equal (numeric)
    Lte,
}

impl Operator {
    /// Parse an operator name; `regex` needs the pattern to compile
    fn parse(name: &str, value: Option<&str>) -> Result<Self, String> {
        Ok(match name {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "contains" => Self::Contains,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "exists" => Self::Exists,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "regex" => {
                let pattern = value.ok_or("regex operator requires a pattern")?;
                let re = regex::Regex::new(pattern)
                    .map_err(|e| format!("invalid regex '{}': {}", pattern, e))?;
                Self::Regex(re)
            }
            other => return Err(format!("unknown operator '{}'", other)),
        })
    }

    /// Operator name as written in config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Regex(_) => "regex",
            Self::Exists => "exists",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }

    /// Whether the operator compares numbers
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Gte | Self::Lte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field condition
#[derive(Debug, Clone)]
pub struct Condition {
    key: EventKey,
    operator: Operator,
    value: Option<String>,
    /// Pre-parsed `value` for numeric operators and numeric equality
    number: Option<f64>,
}

impl Condition {
    /// Create a condition from an operator name
    ///
    /// # Errors
    ///
    /// Returns a message if the key is invalid, the operator unknown, the
    /// value missing (all operators but `exists`), a numeric operator has a
    /// non-numeric value, or a regex fails to compile.
    pub fn new(field: &str, operator: &str, value: Option<String>) -> Result<Self, String> {
        let key = EventKey::parse(field).map_err(|e| e.to_string())?;
        let op = Operator::parse(operator, value.as_deref())?;

        if !matches!(op, Operator::Exists) && value.is_none() {
            return Err(format!("operator '{}' on field '{}' requires a value", op, field));
        }

        let number = value.as_deref().and_then(|v| v.parse::<f64>().ok());
        if op.is_numeric() && number.is_none() {
            return Err(format!(
                "operator '{}' on field '{}' requires a numeric value",
                op, field
            ));
        }

        Ok(Self {
            key,
            operator: op,
            value,
            number,
        })
    }

    /// Create an equals condition
    pub fn eq(field: &str, value: impl Into<String>) -> Result<Self, String> {
        Self::new(field, "eq", Some(value.into()))
    }

    /// Create a not-equals condition
    pub fn ne(field: &str, value: impl Into<String>) -> Result<Self, String> {
        Self::new(field, "ne", Some(value.into()))
    }

    /// Create an exists condition
    pub fn exists(field: &str) -> Result<Self, String> {
        Self::new(field, "exists", None)
    }

    /// Create a regex condition
    pub fn regex(field: &str, pattern: &str) -> Result<Self, String> {
        Self::new(field, "regex", Some(pattern.to_string()))
    }

    /// Field key
    #[inline]
    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// Comparison operator
    #[inline]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Comparison value, if any
    #[inline]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Evaluate the condition against an event
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::TypeMismatch` when a numeric operator meets
    /// a present, non-numeric field.
    pub fn evaluate(&self, event: &Event) -> Result<bool, EvaluationError> {
        event.with_value_at(&self.key, |field| self.eval_field(field))
    }

    fn eval_field(&self, field: Option<&Value>) -> Result<bool, EvaluationError> {
        let Some(field) = field else {
            return Ok(matches!(self.operator, Operator::Ne));
        };
        let expected = self.value.as_deref().unwrap_or_default();

        Ok(match &self.operator {
            Operator::Exists => true,
            Operator::Eq => self.value_equals(field, expected),
            Operator::Ne => !self.value_equals(field, expected),
            Operator::Contains => string_test(field, |s| s.contains(expected)),
            Operator::StartsWith => string_test(field, |s| s.starts_with(expected)),
            Operator::EndsWith => string_test(field, |s| s.ends_with(expected)),
            Operator::Regex(re) => string_test(field, |s| re.is_match(s)),
            Operator::Gt => self.numeric_compare(field, |a, b| a > b)?,
            Operator::Lt => self.numeric_compare(field, |a, b| a < b)?,
            Operator::Gte => self.numeric_compare(field, |a, b| a >= b)?,
            Operator::Lte => self.numeric_compare(field, |a, b| a <= b)?,
        })
    }

    /// Compare a JSON value to the configured value for equality
    ///
    /// Numbers compare numerically so `500` equals `500.0`.
    fn value_equals(&self, field: &Value, expected: &str) -> bool {
        match field {
            Value::String(s) => s == expected,
            Value::Number(n) => match (n.as_f64(), self.number) {
                (Some(a), Some(b)) => a == b,
                _ => n.to_string() == expected,
            },
            Value::Bool(b) => (expected == "true" && *b) || (expected == "false" && !*b),
            Value::Null => expected == "null",
            Value::Array(_) | Value::Object(_) => false,
        }
    }

    fn numeric_compare<F>(&self, field: &Value, cmp: F) -> Result<bool, EvaluationError>
    where
        F: Fn(f64, f64) -> bool,
    {
        let actual = match field {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        };

        match (actual, self.number) {
            (Some(a), Some(b)) => Ok(cmp(a, b)),
            (None, _) => Err(EvaluationError::type_mismatch(
                self.key.as_str(),
                "number",
                json_type_name(field),
            )),
            // Rejected at construction
            (Some(_), None) => Ok(false),
        }
    }
}

/// Run a string test on a scalar field; arrays, objects and null never match
fn string_test(field: &Value, test: impl FnOnce(&str) -> bool) -> bool {
    match field {
        Value::String(s) => test(s),
        Value::Number(n) => test(&n.to_string()),
        Value::Bool(b) => test(if *b { "true" } else { "false" }),
        _ => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Conditions combined with a match mode
#[derive(Debug, Clone)]
pub struct ConditionPredicate {
    conditions: Vec<Condition>,
    match_mode: MatchMode,
}

impl ConditionPredicate {
    /// Create a predicate
    pub fn new(conditions: Vec<Condition>, match_mode: MatchMode) -> Self {
        Self {
            conditions,
            match_mode,
        }
    }

    /// The conditions, in declaration order
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// How conditions combine
    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }
}

impl RoutePredicate for ConditionPredicate {
    /// Evaluate conditions in order, short-circuiting
    ///
    /// An error from any condition that is reached fails the whole test.
    fn test(&self, event: &Event) -> Result<bool, EvaluationError> {
        match self.match_mode {
            MatchMode::All => {
                for condition in &self.conditions {
                    if !condition.evaluate(event)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            MatchMode::Any => {
                for condition in &self.conditions {
                    if condition.evaluate(event)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl TryFrom<&ConditionConfig> for Condition {
    type Error = String;

    fn try_from(config: &ConditionConfig) -> Result<Self, Self::Error> {
        let value = config.value.as_ref().map(ToString::to_string);
        Self::new(&config.field, &config.operator, value)
    }
}

impl TryFrom<&RouteConfig> for Route {
    type Error = RoutingError;

    fn try_from(config: &RouteConfig) -> Result<Self, Self::Error> {
        if config.conditions.is_empty() {
            return Err(RoutingError::invalid_condition(
                &config.name,
                "at least one condition is required",
            ));
        }

        let conditions = config
            .conditions
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Condition::try_from(c).map_err(|message| {
                    RoutingError::invalid_condition(&config.name, format!("condition {}: {}", i, message))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Route::new(
            config.name.as_str(),
            ConditionPredicate::new(conditions, config.match_mode),
        ))
    }
}
