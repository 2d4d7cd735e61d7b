//! Identifier resolution with date-based fallback.
//!
//! Lookup order:
//! 1. exact key (alias, base or dated name)
//! 2. `<base>-YYYY-MM-DD` split, date validated
//! 3. dated siblings sharing `<base>`
//! 4. newest sibling whose `min_version` is not after the requested date

use std::sync::Arc;

use super::map::CapabilityMap;
use super::record::CapabilityRecord;
use super::version::ModelVersion;
use crate::{Error, Result};

pub struct VersionResolver<'a> {
    map: &'a CapabilityMap,
}

impl<'a> VersionResolver<'a> {
    pub fn new(map: &'a CapabilityMap) -> Self {
        Self { map }
    }

    /// Resolves `identifier` to a record.
    ///
    /// A dated request fails with [`Error::VersionTooOld`] only when no
    /// sibling's `min_version` is on or before the requested date; a newer
    /// sibling existing alongside a matching one does not cause a failure.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<CapabilityRecord>> {
        if let Some(record) = self.map.get(identifier) {
            return Ok(Arc::clone(record));
        }

        let Some((base, date)) = ModelVersion::split_dated(identifier) else {
            return Err(self.not_supported(identifier));
        };
        let requested: ModelVersion = date.parse()?;

        let siblings: Vec<(&str, &Arc<CapabilityRecord>)> =
            self.map.dated_siblings(base).collect();
        if siblings.is_empty() {
            if self.map.contains(base) && !ModelVersion::is_dated_model(base) {
                return Err(Error::ModelNotSupported {
                    message: format!(
                        "Model '{}' not found. Try using '{}' instead.",
                        identifier, base
                    ),
                    model: identifier.to_string(),
                    suggestions: vec![base.to_string()],
                });
            }
            return Err(self.not_supported(identifier));
        }

        // Siblings without a min_version rank lowest; on equal versions the
        // first sibling in key order wins.
        let mut best: Option<(&str, &Arc<CapabilityRecord>)> = None;
        for (name, record) in siblings.iter().copied() {
            if record.min_version.is_some_and(|min| requested < min) {
                continue;
            }
            match best {
                Some((_, current)) if record.min_version <= current.min_version => {}
                _ => best = Some((name, record)),
            }
        }

        let Some((matched, record)) = best else {
            return Err(self.too_old(identifier, base, &siblings));
        };

        tracing::debug!(
            requested = identifier,
            matched,
            min_version = ?record.min_version,
            "model resolved via dated sibling"
        );
        Ok(Arc::new(record.with_identifier(identifier)))
    }

    fn not_supported(&self, identifier: &str) -> Error {
        let available = self.map.undated_keys();
        Error::ModelNotSupported {
            message: format!(
                "Model '{}' not found. Available base models: {}",
                identifier,
                available.join(", ")
            ),
            model: identifier.to_string(),
            suggestions: available,
        }
    }

    /// Every sibling requires a newer date. Reports the lowest minimum, which
    /// is the earliest date the caller could use.
    fn too_old(
        &self,
        identifier: &str,
        base: &str,
        siblings: &[(&str, &Arc<CapabilityRecord>)],
    ) -> Error {
        let mut floor: Option<(&str, &Arc<CapabilityRecord>, ModelVersion)> = None;
        for (name, record) in siblings.iter().copied() {
            let Some(min) = record.min_version else {
                continue;
            };
            if floor.is_none_or(|(_, _, lowest)| min < lowest) {
                floor = Some((name, record, min));
            }
        }

        // Unreachable in practice: an unversioned sibling always matches.
        let Some((name, record, min_version)) = floor else {
            return self.not_supported(identifier);
        };

        let suggestion = record
            .aliases
            .iter()
            .filter(|alias| base == alias.as_str() || base.starts_with(alias.as_str()))
            .max_by_key(|alias| alias.len())
            .cloned()
            .unwrap_or_else(|| name.to_string());

        Error::VersionTooOld {
            model: identifier.to_string(),
            base: base.to_string(),
            min_version,
            suggestion: Some(suggestion),
        }
    }
}
