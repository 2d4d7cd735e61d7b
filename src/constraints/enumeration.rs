use serde::{Deserialize, Serialize};

use super::ViolationKind;
use super::value::ParamValue;
use crate::{Error, Result};

/// Closed set of string values. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumConstraint {
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl EnumConstraint {
    pub fn new(allowed_values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut values: Vec<String> = Vec::new();
        for value in allowed_values.into_iter().map(Into::into) {
            if !values.contains(&value) {
                values.push(value);
            }
        }
        Self {
            allowed_values: values,
            description: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if self.allowed_values.is_empty() {
            return Err("allowed_values must not be empty".into());
        }
        Ok(())
    }

    pub fn sorted_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = self.allowed_values.iter().map(String::as_str).collect();
        values.sort_unstable();
        values
    }

    pub fn validate(&self, name: &str, value: &ParamValue) -> Result<()> {
        let Some(s) = value.as_str() else {
            return Err(Error::violation(
                name,
                ViolationKind::Type,
                value,
                format!("Parameter '{}' must be a string, got {}", name, value.type_name()),
                &self.description,
            ));
        };

        if !self.allowed_values.iter().any(|v| v == s) {
            return Err(Error::violation(
                name,
                ViolationKind::Value,
                value,
                format!(
                    "Invalid value for parameter '{}'. Allowed values: {}",
                    name,
                    self.sorted_values().join(", ")
                ),
                &self.description,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effort() -> EnumConstraint {
        EnumConstraint::new(["low", "medium", "high"]).description("Reasoning effort level")
    }

    #[test]
    fn test_exact_match_required() {
        let c = effort();
        assert!(c.validate("reasoning_effort", &"low".into()).is_ok());
        assert!(c.validate("reasoning_effort", &"high".into()).is_ok());

        let err = c.validate("reasoning_effort", &"Low".into()).unwrap_err();
        assert_eq!(err.violation_kind(), Some(ViolationKind::Value));
        let msg = err.to_string();
        assert!(msg.contains("Allowed values: high, low, medium"));
        assert!(msg.contains("'Low'"));
        assert!(msg.contains("Reasoning effort level"));
    }

    #[test]
    fn test_non_string_rejected() {
        let err = effort().validate("reasoning_effort", &5.into()).unwrap_err();
        assert_eq!(err.violation_kind(), Some(ViolationKind::Type));
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_empty_set_is_invalid_definition() {
        assert!(EnumConstraint::new(Vec::<String>::new()).check().is_err());
        assert!(effort().check().is_ok());
    }

    #[test]
    fn test_duplicates_collapsed() {
        assert_eq!(EnumConstraint::new(["a", "b", "a"]).allowed_values.len(), 2);
    }
}
