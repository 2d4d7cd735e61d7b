use std::collections::BTreeMap;

use super::ViolationKind;
use super::value::ParamValue;
use crate::{Error, Result};

/// Parameters whose values are pinned by the provider rather than chosen by
/// the caller. Validation only asserts that the caller agrees.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedParameterSet {
    pub values: BTreeMap<String, ParamValue>,
    pub description: String,
}

impl FixedParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn fixed_value(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn validate(&self, name: &str, value: &ParamValue) -> Result<()> {
        match self.values.get(name) {
            None => Err(Error::violation(
                name,
                ViolationKind::Value,
                value,
                format!("Parameter '{}' is not part of this fixed parameter set", name),
                &self.description,
            )),
            Some(expected) if !expected.loosely_eq(value) => Err(Error::violation(
                name,
                ViolationKind::Value,
                value,
                format!("Parameter '{}' is fixed to {}", name, expected),
                &self.description,
            )),
            Some(_) => Ok(()),
        }
    }
}
