//! Structural checks on a registry document before it is parsed.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::schema::{ALIASES_SECTION, FIXED_SETS_SECTION, LEGACY_MODELS_SECTION, MODELS_SECTION};
use super::{ConfigError, ConfigResult, ValidationErrors};

static SCHEMA_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+(\.\d+){0,2}\s*$").expect("valid schema version regex")
});

pub type ValidationFn = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

/// Collects every structural problem in a document instead of stopping at
/// the first one.
pub struct DocumentValidator {
    type_rules: BTreeMap<String, ValueType>,
    suffix_rules: Vec<(String, ValueType)>,
    pattern_rules: BTreeMap<String, Regex>,
    custom_rules: BTreeMap<String, ValidationFn>,
}

impl DocumentValidator {
    pub fn new() -> Self {
        Self {
            type_rules: BTreeMap::new(),
            suffix_rules: Vec::new(),
            pattern_rules: BTreeMap::new(),
            custom_rules: BTreeMap::new(),
        }
    }

    /// Rules every registry or constraints document must satisfy.
    pub fn registry_document() -> Self {
        Self::new()
            .expect_type(MODELS_SECTION, ValueType::Object)
            .expect_type(LEGACY_MODELS_SECTION, ValueType::Object)
            .expect_type(ALIASES_SECTION, ValueType::Object)
            .expect_type(FIXED_SETS_SECTION, ValueType::Object)
            .expect_suffix_type("_constraints", ValueType::Object)
            .custom("version", |v| match v {
                Value::String(_) | Value::Number(_) | Value::Null => Ok(()),
                _ => Err("must be a string or a number".to_string()),
            })
            .expect_pattern("version", SCHEMA_VERSION_RE.clone())
    }

    pub fn expect_type(mut self, key: impl Into<String>, value_type: ValueType) -> Self {
        self.type_rules.insert(key.into(), value_type);
        self
    }

    /// Applies to every top-level key ending in `suffix`.
    pub fn expect_suffix_type(mut self, suffix: impl Into<String>, value_type: ValueType) -> Self {
        self.suffix_rules.push((suffix.into(), value_type));
        self
    }

    /// String values at `key` must match `pattern`.
    pub fn expect_pattern(mut self, key: impl Into<String>, pattern: Regex) -> Self {
        self.pattern_rules.insert(key.into(), pattern);
        self
    }

    pub fn custom<F>(mut self, key: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.custom_rules.insert(key.into(), Box::new(validator));
        self
    }

    pub fn validate(&self, document: &Value) -> ConfigResult<()> {
        let errors = self.collect_errors(document);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }

    pub fn validate_partial(&self, document: &Value) -> Vec<ConfigError> {
        self.collect_errors(document)
    }

    fn collect_errors(&self, document: &Value) -> Vec<ConfigError> {
        let Some(root) = document.as_object() else {
            return vec![ConfigError::InvalidValue {
                key: "<root>".into(),
                message: format!("expected object, got {}", value_type_name(document)),
            }];
        };

        let mut errors = Vec::new();
        let mut type_error = |key: &str, expected: ValueType, value: &Value| {
            errors.push(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected {}, got {}", expected.name(), value_type_name(value)),
            });
        };

        for (key, expected) in &self.type_rules {
            if let Some(value) = root.get(key)
                && !expected.matches(value)
            {
                type_error(key, *expected, value);
            }
        }

        for (key, value) in root {
            for (suffix, expected) in &self.suffix_rules {
                if key.ends_with(suffix.as_str()) && !expected.matches(value) {
                    type_error(key, *expected, value);
                }
            }
        }

        for (key, validator) in &self.custom_rules {
            if let Some(value) = root.get(key)
                && let Err(message) = validator(value)
            {
                errors.push(ConfigError::InvalidValue {
                    key: key.clone(),
                    message,
                });
            }
        }

        for (key, pattern) in &self.pattern_rules {
            if let Some(Value::String(s)) = root.get(key)
                && !pattern.is_match(s)
            {
                errors.push(ConfigError::InvalidValue {
                    key: key.clone(),
                    message: format!("value '{}' does not match pattern", s),
                });
            }
        }

        errors
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_document_accepts_minimal() {
        let validator = DocumentValidator::registry_document();
        assert!(validator.validate(&json!({})).is_ok());
        assert!(
            validator
                .validate(&json!({"version": "1.0.0", "dated_models": {}, "aliases": {}}))
                .is_ok()
        );
        assert!(validator.validate(&json!({"version": 1})).is_ok());
    }

    #[test]
    fn test_root_must_be_object() {
        let errors = DocumentValidator::registry_document().validate_partial(&json!("text"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("expected object, got string"));
    }

    #[test]
    fn test_errors_are_collected() {
        let doc = json!({
            "version": "v1",
            "dated_models": [],
            "numeric_constraints": "nope",
            "aliases": 3
        });
        let errors = DocumentValidator::registry_document().validate_partial(&doc);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_version_type() {
        let errors = DocumentValidator::registry_document().validate_partial(&json!({"version": []}));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_custom_rule() {
        let validator = DocumentValidator::new().custom("aliases", |v| {
            if v.as_object().is_some_and(|m| m.is_empty()) {
                return Err("aliases cannot be empty".to_string());
            }
            Ok(())
        });
        assert!(validator.validate(&json!({"aliases": {"a": "b"}})).is_ok());
        assert!(validator.validate(&json!({"aliases": {}})).is_err());
    }
}
