use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ViolationKind;
use super::value::ParamValue;
use crate::{Error, Result};

/// Shape constraint for mapping-valued parameters such as `response_format`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectConstraint {
    #[serde(default)]
    pub required_keys: BTreeSet<String>,
    #[serde(default)]
    pub allowed_keys: Option<BTreeSet<String>>,
    #[serde(default)]
    pub description: String,
}

impl ObjectConstraint {
    pub fn new() -> Self {
        Self {
            required_keys: BTreeSet::new(),
            allowed_keys: None,
            description: String::new(),
        }
    }

    pub fn require(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn allow(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_keys
            .get_or_insert_with(BTreeSet::new)
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if let Some(allowed) = &self.allowed_keys {
            let stray: Vec<&str> = self
                .required_keys
                .difference(allowed)
                .map(String::as_str)
                .collect();
            if !stray.is_empty() {
                return Err(format!(
                    "required keys not in allowed_keys: {}",
                    stray.join(", ")
                ));
            }
        }
        Ok(())
    }

    pub fn validate(&self, name: &str, value: &ParamValue) -> Result<()> {
        let Some(map) = value.as_map() else {
            return Err(Error::violation(
                name,
                ViolationKind::Type,
                value,
                format!("Parameter '{}' must be an object, got {}", name, value.type_name()),
                &self.description,
            ));
        };

        let missing: Vec<&str> = self
            .required_keys
            .iter()
            .filter(|k| !map.contains_key(*k))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::violation(
                name,
                ViolationKind::Shape,
                value,
                format!(
                    "Parameter '{}' is missing required keys: {}",
                    name,
                    missing.join(", ")
                ),
                &self.description,
            ));
        }

        if let Some(allowed) = &self.allowed_keys {
            let disallowed: Vec<&str> = map
                .keys()
                .filter(|k| !allowed.contains(*k))
                .map(String::as_str)
                .collect();
            if !disallowed.is_empty() {
                return Err(Error::violation(
                    name,
                    ViolationKind::Shape,
                    value,
                    format!(
                        "Parameter '{}' contains disallowed keys: {}",
                        name,
                        disallowed.join(", ")
                    ),
                    &self.description,
                ));
            }
        }

        Ok(())
    }
}

impl Default for ObjectConstraint {
    fn default() -> Self {
        Self::new()
    }
}
