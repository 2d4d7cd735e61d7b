//! Parameter constraint definitions.
//!
//! Constraints are built once per registry load and shared read-only by every
//! capability record that references them through a string key such as
//! `"numeric_constraints.temperature"`.

mod enumeration;
mod fixed;
mod numeric;
mod object;
mod value;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use enumeration::EnumConstraint;
pub use fixed::FixedParameterSet;
pub use numeric::NumericConstraint;
pub use object::ObjectConstraint;
pub use value::ParamValue;

use crate::{Error, Result};

/// Sub-kind of a constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Value has the wrong type for the constraint.
    Type,
    /// Numeric value outside the permitted range.
    Range,
    /// NaN or an infinity.
    NonFinite,
    /// Value not in an enumeration, or differs from a fixed value.
    Value,
    /// Mapping is missing required keys or has disallowed ones.
    Shape,
    /// Parameter supplied more than once in the same request.
    DuplicateUse,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Type => "type",
            Self::Range => "range",
            Self::NonFinite => "non-finite",
            Self::Value => "value",
            Self::Shape => "shape",
            Self::DuplicateUse => "duplicate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintDefinition {
    Numeric(NumericConstraint),
    Enum(EnumConstraint),
    Object(ObjectConstraint),
    Fixed(FixedParameterSet),
}

impl ConstraintDefinition {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Enum(_) => "enum",
            Self::Object(_) => "object",
            Self::Fixed(_) => "fixed",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Numeric(c) => &c.description,
            Self::Enum(c) => &c.description,
            Self::Object(c) => &c.description,
            Self::Fixed(c) => &c.description,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericConstraint> {
        match self {
            Self::Numeric(c) => Some(c),
            _ => None,
        }
    }

    /// Checks the definition's own invariants.
    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        match self {
            Self::Numeric(c) => c.check(),
            Self::Enum(c) => c.check(),
            Self::Object(c) => c.check(),
            Self::Fixed(_) => Ok(()),
        }
    }

    pub fn validate(&self, name: &str, value: &ParamValue) -> Result<()> {
        match self {
            Self::Numeric(c) => c.validate(name, value),
            Self::Enum(c) => c.validate(name, value),
            Self::Object(c) => c.validate(name, value),
            Self::Fixed(c) => c.validate(name, value),
        }
    }
}

impl From<NumericConstraint> for ConstraintDefinition {
    fn from(c: NumericConstraint) -> Self {
        Self::Numeric(c)
    }
}

impl From<EnumConstraint> for ConstraintDefinition {
    fn from(c: EnumConstraint) -> Self {
        Self::Enum(c)
    }
}

impl From<ObjectConstraint> for ConstraintDefinition {
    fn from(c: ObjectConstraint) -> Self {
        Self::Object(c)
    }
}

impl From<FixedParameterSet> for ConstraintDefinition {
    fn from(c: FixedParameterSet) -> Self {
        Self::Fixed(c)
    }
}

/// A model's pointer to a shared constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterReference {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub description: String,
    /// Per-model ceiling. It can only tighten the shared constraint's
    /// `max_value`, never raise it.
    #[serde(default, rename = "max_value", skip_serializing_if = "Option::is_none")]
    pub max_value_override: Option<f64>,
}

impl ParameterReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            description: String::new(),
            max_value_override: None,
        }
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max_value_override = Some(max);
        self
    }

    /// Final dotted segment of the reference, i.e. the parameter name.
    pub fn name(&self) -> &str {
        self.reference
            .rsplit('.')
            .next()
            .unwrap_or(self.reference.as_str())
    }

    pub fn matches(&self, param_name: &str) -> bool {
        self.reference == param_name || self.name() == param_name
    }

    /// Effective ceiling given the shared constraint's own maximum.
    pub fn effective_max(&self, shared_max: Option<f64>) -> Option<f64> {
        match (self.max_value_override, shared_max) {
            (Some(over), Some(shared)) => Some(over.min(shared)),
            (over, shared) => over.or(shared),
        }
    }
}

/// Immutable map of constraint key to definition.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    entries: BTreeMap<String, Arc<ConstraintDefinition>>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, definition: Arc<ConstraintDefinition>) {
        self.entries.insert(key.into(), definition);
    }

    pub fn get(&self, reference: &str) -> Result<&Arc<ConstraintDefinition>> {
        self.entries
            .get(reference)
            .ok_or_else(|| Error::ConstraintNotFound {
                reference: reference.to_string(),
            })
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ConstraintDefinition>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_name_is_final_segment() {
        let r = ParameterReference::new("numeric_constraints.temperature");
        assert_eq!(r.name(), "temperature");
        assert!(r.matches("temperature"));
        assert!(r.matches("numeric_constraints.temperature"));
        assert!(!r.matches("numeric_constraints"));
        assert_eq!(ParameterReference::new("seed").name(), "seed");
    }

    #[test]
    fn test_override_only_tightens() {
        let r = ParameterReference::new("numeric_constraints.temperature").with_max(1.0);
        assert_eq!(r.effective_max(Some(2.0)), Some(1.0));

        let loosen = ParameterReference::new("numeric_constraints.temperature").with_max(5.0);
        assert_eq!(loosen.effective_max(Some(2.0)), Some(2.0));
        assert_eq!(loosen.effective_max(None), Some(5.0));

        assert_eq!(ParameterReference::new("x").effective_max(None), None);
    }

    #[test]
    fn test_reference_deserializes_ref_key() {
        let r: ParameterReference = serde_json::from_value(serde_json::json!({
            "ref": "numeric_constraints.max_tokens",
            "max_value": 4096
        }))
        .unwrap();
        assert_eq!(r.reference, "numeric_constraints.max_tokens");
        assert_eq!(r.max_value_override, Some(4096.0));
        assert!(r.description.is_empty());
    }

    #[test]
    fn test_table_lookup() {
        let mut table = ConstraintTable::new();
        table.insert(
            "numeric_constraints.temperature",
            Arc::new(NumericConstraint::new(0.0, Some(2.0)).into()),
        );
        assert!(table.get("numeric_constraints.temperature").is_ok());
        assert!(matches!(
            table.get("numeric_constraints.top_p"),
            Err(Error::ConstraintNotFound { .. })
        ));
    }
}
