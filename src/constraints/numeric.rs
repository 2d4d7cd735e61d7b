use serde::{Deserialize, Serialize};

use super::ViolationKind;
use super::value::ParamValue;
use crate::{Error, Result};

fn default_true() -> bool {
    true
}

/// Numeric range constraint such as `temperature` in `[0, 2]`.
///
/// `max_value` may be absent for limits that depend on the model, in which
/// case the caller supplies the ceiling (see [`Self::validate_with_max`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericConstraint {
    #[serde(default)]
    pub min_value: f64,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default = "default_true")]
    pub allow_float: bool,
    #[serde(default = "default_true")]
    pub allow_int: bool,
    #[serde(default)]
    pub description: String,
}

impl NumericConstraint {
    pub fn new(min_value: f64, max_value: Option<f64>) -> Self {
        Self {
            min_value,
            max_value,
            allow_float: true,
            allow_int: true,
            description: String::new(),
        }
    }

    pub fn integers_only(mut self) -> Self {
        self.allow_float = false;
        self.allow_int = true;
        self
    }

    pub fn floats_only(mut self) -> Self {
        self.allow_float = true;
        self.allow_int = false;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if !self.allow_float && !self.allow_int {
            return Err("at least one of allow_float or allow_int must be true".into());
        }
        if !self.min_value.is_finite() {
            return Err(format!("min_value {} is not finite", self.min_value));
        }
        if let Some(max) = self.max_value
            && (max.is_nan() || max < self.min_value)
        {
            return Err(format!(
                "min_value {} is greater than max_value {}",
                self.min_value, max
            ));
        }
        Ok(())
    }

    /// Human-readable name of the accepted numeric kinds.
    pub fn allowed_kinds(&self) -> &'static str {
        match (self.allow_int, self.allow_float) {
            (true, true) => "a number (integer or float)",
            (true, false) => "an integer",
            _ => "a float",
        }
    }

    pub fn validate(&self, name: &str, value: &ParamValue) -> Result<()> {
        self.validate_with_max(name, value, self.max_value)
    }

    /// Validates against an explicit ceiling instead of the constraint's own
    /// `max_value`.
    pub fn validate_with_max(&self, name: &str, value: &ParamValue, max: Option<f64>) -> Result<()> {
        let number = match value {
            ParamValue::Float(f) if !f.is_finite() => {
                return Err(self.violation(
                    name,
                    ViolationKind::NonFinite,
                    value,
                    format!("Parameter '{}' must be a finite number", name),
                ));
            }
            ParamValue::Float(_) if !self.allow_float => {
                return Err(self.violation(
                    name,
                    ViolationKind::Type,
                    value,
                    format!("Parameter '{}' must be an integer, got float", name),
                ));
            }
            ParamValue::Int(_) if !self.allow_int => {
                return Err(self.violation(
                    name,
                    ViolationKind::Type,
                    value,
                    format!("Parameter '{}' must be a float, got integer", name),
                ));
            }
            ParamValue::Float(f) => *f,
            ParamValue::Int(i) => *i as f64,
            other => {
                return Err(self.violation(
                    name,
                    ViolationKind::Type,
                    value,
                    format!(
                        "Parameter '{}' must be {}, got {}",
                        name,
                        self.allowed_kinds(),
                        other.type_name()
                    ),
                ));
            }
        };

        let below = number < self.min_value;
        let above = max.is_some_and(|max| number > max);
        if below || above {
            let range = match max {
                Some(max) => format!("must be between {} and {}", self.min_value, max),
                None => format!("must be greater than or equal to {}", self.min_value),
            };
            return Err(self.violation(
                name,
                ViolationKind::Range,
                value,
                format!("Parameter '{}' {}", name, range),
            ));
        }

        Ok(())
    }

    fn violation(
        &self,
        name: &str,
        kind: ViolationKind,
        value: &ParamValue,
        headline: String,
    ) -> Error {
        Error::violation(name, kind, value, headline, &self.description)
    }
}
