use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::{Value, json};

use super::builtin;
use super::map::CapabilityMap;
use super::record::CapabilityRecord;
use super::resolver::VersionResolver;
use crate::config::{ModelEntry, RegistryConfig, RegistryData};
use crate::constraints::{ConstraintDefinition, ConstraintTable, ParameterReference};
use crate::Result;

/// Counts from building one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Model entries seen in the source.
    pub total: usize,
    pub loaded: usize,
    pub skipped: usize,
    pub dangling_aliases: usize,
}

/// One fully built, immutable view of the registry.
#[derive(Debug)]
pub struct RegistrySnapshot {
    pub models: CapabilityMap,
    pub constraints: Arc<ConstraintTable>,
    pub schema_version: String,
    pub stats: LoadStats,
}

impl RegistrySnapshot {
    pub fn build(data: RegistryData) -> Self {
        let RegistryData {
            schema_version,
            mut constraints,
            models,
            aliases,
            skipped,
        } = data;
        let mut stats = LoadStats {
            total: models.len() + skipped,
            skipped,
            ..Default::default()
        };

        let mut entries: Vec<(String, ModelEntry)> = Vec::with_capacity(models.len());
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();
        for (name, mut entry) in models {
            if let Err(reason) = entry.check() {
                tracing::warn!(model = %name, reason = %reason, "skipping invalid model entry");
                stats.skipped += 1;
                continue;
            }
            warn_loosened_overrides(&name, &entry, &constraints);
            register_inline_parameters(&name, &mut entry, &mut constraints);

            if let Some(&i) = positions.get(&name) {
                tracing::warn!(model = %name, "duplicate model entry replaces earlier definition");
                entries[i].1 = entry;
                stats.skipped += 1;
            } else {
                positions.insert(name.clone(), entries.len());
                entries.push((name, entry));
            }
        }

        let constraints = Arc::new(constraints);

        let mut alias_sets: Vec<BTreeSet<String>> = vec![BTreeSet::new(); entries.len()];
        let mut index = positions.clone();
        for (alias, target) in aliases {
            if positions.contains_key(&alias) {
                tracing::warn!(alias = %alias, "alias shadows a model name; skipped");
                continue;
            }
            match positions.get(&target) {
                Some(&i) => {
                    alias_sets[i].insert(alias.clone());
                    index.insert(alias, i);
                }
                None => {
                    tracing::warn!(alias = %alias, target = %target, "alias target not found");
                    stats.dangling_aliases += 1;
                }
            }
        }

        let records: Vec<Arc<CapabilityRecord>> = entries
            .into_iter()
            .zip(alias_sets)
            .map(|((name, entry), aliases)| {
                Arc::new(CapabilityRecord::from_entry(
                    &name,
                    entry,
                    aliases,
                    Arc::clone(&constraints),
                ))
            })
            .collect();
        stats.loaded = records.len();

        Self {
            models: CapabilityMap::new(records, index),
            constraints,
            schema_version,
            stats,
        }
    }
}

/// Moves a model's inline definitions into the table under model-scoped keys
/// and points the model's parameter list at them.
fn register_inline_parameters(model: &str, entry: &mut ModelEntry, constraints: &mut ConstraintTable) {
    for (param, definition) in std::mem::take(&mut entry.inline_parameters) {
        let key = ModelEntry::inline_key(model, &param);
        entry.supported_parameters.retain(|p| !p.matches(&param));
        let reference = ParameterReference {
            description: definition.description().to_string(),
            ..ParameterReference::new(key.clone())
        };
        entry.supported_parameters.push(reference);
        constraints.insert(key, Arc::new(definition));
    }
}

/// An override may only tighten a shared ceiling.
fn warn_loosened_overrides(model: &str, entry: &ModelEntry, constraints: &ConstraintTable) {
    for param in &entry.supported_parameters {
        if let Some(override_max) = param.max_value_override
            && let Ok(definition) = constraints.get(&param.reference)
            && let Some(shared_max) = definition.as_numeric().and_then(|n| n.max_value)
            && override_max > shared_max
        {
            tracing::warn!(
                model,
                parameter = %param.reference,
                override_max,
                shared_max,
                "parameter override exceeds shared maximum; shared maximum applies"
            );
        }
    }
}

/// Model capability registry.
///
/// Readers always see one complete snapshot; reloads build a new snapshot
/// off to the side and swap it in atomically.
pub struct Registry {
    snapshot: ArcSwap<RegistrySnapshot>,
}

impl Registry {
    pub fn new(data: RegistryData) -> Self {
        let snapshot = RegistrySnapshot::build(data);
        log_summary(&snapshot);
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn builtin() -> Self {
        Self::new(builtin::registry_data())
    }

    /// Builds a registry from an already parsed document.
    pub fn from_value(document: &Value) -> Result<Self> {
        Ok(Self::new(RegistryData::from_document(document)?))
    }

    /// Loads the configured documents, falling back to the built-in data set
    /// when they are missing or unusable.
    pub async fn from_config(config: &RegistryConfig) -> Self {
        match config.load().await {
            Ok(data) => Self::new(data),
            Err(e) => {
                tracing::warn!(error = %e, "registry configuration unavailable, using built-in defaults");
                Self::builtin()
            }
        }
    }

    /// Replaces all state with a snapshot built from `data`.
    pub fn reload(&self, data: RegistryData) -> LoadStats {
        let snapshot = RegistrySnapshot::build(data);
        log_summary(&snapshot);
        let stats = snapshot.stats;
        self.snapshot.store(Arc::new(snapshot));
        stats
    }

    /// Replaces all state from a parsed document. On error the current
    /// snapshot stays in place.
    pub fn load(&self, document: &Value) -> Result<LoadStats> {
        Ok(self.reload(RegistryData::from_document(document)?))
    }

    /// Reloads from files. On error the current snapshot stays in place.
    pub async fn reload_from_config(&self, config: &RegistryConfig) -> Result<LoadStats> {
        Ok(self.reload(config.load().await?))
    }

    /// The current snapshot. Holding it pins that version across reloads.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    pub fn get_capabilities(&self, identifier: &str) -> Result<Arc<CapabilityRecord>> {
        let snapshot = self.snapshot.load();
        VersionResolver::new(&snapshot.models).resolve(identifier)
    }

    pub fn get_constraint(&self, reference: &str) -> Result<Arc<ConstraintDefinition>> {
        self.snapshot.load().constraints.get(reference).cloned()
    }

    /// Every loaded identifier, aliases included.
    pub fn models(&self) -> BTreeMap<String, Arc<CapabilityRecord>> {
        self.snapshot
            .load()
            .models
            .iter()
            .map(|(name, record)| (name.to_string(), Arc::clone(record)))
            .collect()
    }

    /// Fails for sunset models; logs a warning for deprecated ones.
    pub fn assert_model_active(&self, identifier: &str) -> Result<()> {
        self.get_capabilities(identifier)?
            .deprecation
            .assert_active(identifier)
    }

    /// HTTP deprecation headers for `identifier`; empty for active models.
    pub fn sunset_headers(&self, identifier: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.get_capabilities(identifier)?.deprecation.sunset_headers())
    }

    pub fn schema_version(&self) -> String {
        self.snapshot.load().schema_version.clone()
    }

    pub fn stats(&self) -> LoadStats {
        self.snapshot.load().stats
    }

    /// Effective registry contents as JSON.
    pub fn dump(&self) -> Value {
        let snapshot = self.snapshot.load_full();
        let models: BTreeMap<&str, &CapabilityRecord> = snapshot
            .models
            .iter()
            .map(|(name, record)| (name, record.as_ref()))
            .collect();
        let constraints: Vec<&str> = snapshot.constraints.keys().collect();

        json!({
            "schema_version": snapshot.schema_version,
            "stats": snapshot.stats,
            "constraints": constraints,
            "models": models,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("Registry")
            .field("schema_version", &snapshot.schema_version)
            .field("stats", &snapshot.stats)
            .finish()
    }
}

fn log_summary(snapshot: &RegistrySnapshot) {
    let stats = snapshot.stats;
    tracing::info!(
        schema_version = %snapshot.schema_version,
        total = stats.total,
        loaded = stats.loaded,
        skipped = stats.skipped,
        dangling_aliases = stats.dangling_aliases,
        constraints = snapshot.constraints.len(),
        "model registry loaded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::constraints::ParamValue;
    use crate::models::ModelVersion;

    fn document() -> Value {
        json!({
            "version": "1.0.0",
            "dated_models": {
                "gpt-4o-2024-08-06": {
                    "context_window": 128000,
                    "max_output_tokens": 16384,
                    "min_version": {"year": 2024, "month": 8, "day": 6},
                    "supported_parameters": [
                        {"ref": "numeric_constraints.temperature"},
                        {"ref": "numeric_constraints.max_completion_tokens"}
                    ]
                },
                "gpt-4o-2024-11-20": {
                    "context_window": 128000,
                    "max_output_tokens": 32768,
                    "min_version": "2024-11-20",
                    "supported_parameters": [{"ref": "numeric_constraints.temperature"}]
                },
                "o1-2024-12-17": {
                    "context_window": 200000,
                    "max_output_tokens": 100000,
                    "min_version": "2024-12-17",
                    "supported_parameters": [{"ref": "enum_constraints.reasoning_effort"}]
                }
            },
            "aliases": {
                "gpt-4o": "gpt-4o-2024-11-20",
                "o1": "o1-2024-12-17",
                "ghost": "missing-2024-01-01"
            },
            "numeric_constraints": {
                "temperature": {"min_value": 0, "max_value": 2},
                "max_completion_tokens": {"min_value": 1, "allow_float": false}
            },
            "enum_constraints": {
                "reasoning_effort": {"allowed_values": ["low", "medium", "high"]}
            }
        })
    }

    fn registry() -> Registry {
        Registry::from_value(&document()).unwrap()
    }

    #[test]
    fn test_alias_shares_record() {
        let registry = registry();
        let alias = registry.get_capabilities("gpt-4o").unwrap();
        let target = registry.get_capabilities("gpt-4o-2024-11-20").unwrap();
        assert!(Arc::ptr_eq(&alias, &target));
        assert!(target.aliases.contains("gpt-4o"));
        assert_eq!(target.identifier, "gpt-4o-2024-11-20");
    }

    #[test]
    fn test_closest_from_below() {
        let registry = registry();

        let mid = registry.get_capabilities("gpt-4o-2024-09-15").unwrap();
        assert_eq!(mid.identifier, "gpt-4o-2024-09-15");
        assert_eq!(mid.provider_name, "gpt-4o-2024-09-15");
        assert_eq!(mid.max_output_tokens, 16384);

        let late = registry.get_capabilities("gpt-4o-2025-06-01").unwrap();
        assert_eq!(late.max_output_tokens, 32768);
        assert_eq!(late.min_version, Some(ModelVersion::ymd(2024, 11, 20)));
    }

    #[test]
    fn test_resolved_copies_are_independent() {
        let registry = registry();
        let a = registry.get_capabilities("gpt-4o-2024-09-15").unwrap();
        let b = registry.get_capabilities("gpt-4o-2024-10-01").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.identifier, b.identifier);
        assert_eq!(a.max_output_tokens, b.max_output_tokens);

        let stored = registry.get_capabilities("gpt-4o-2024-08-06").unwrap();
        assert_eq!(stored.identifier, "gpt-4o-2024-08-06");
    }

    #[test]
    fn test_version_too_old() {
        let registry = registry();

        match registry.get_capabilities("gpt-4o-2024-01-01").unwrap_err() {
            Error::VersionTooOld {
                min_version,
                suggestion,
                ..
            } => {
                assert_eq!(min_version.to_string(), "2024-08-06");
                assert_eq!(suggestion.as_deref(), Some("gpt-4o-2024-08-06"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match registry.get_capabilities("o1-2024-01-01").unwrap_err() {
            Error::VersionTooOld { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("o1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_date() {
        let err = registry().get_capabilities("gpt-4o-2024-02-30").unwrap_err();
        assert!(matches!(err, Error::InvalidDate { .. }));
        assert!(err.to_string().contains("2024-02-30"));
    }

    #[test]
    fn test_unknown_models() {
        let registry = registry();

        match registry.get_capabilities("unknown-2024-01-01").unwrap_err() {
            Error::ModelNotSupported { suggestions, .. } => {
                assert_eq!(suggestions, vec!["gpt-4o".to_string(), "o1".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            registry.get_capabilities("gpt-5").unwrap_err(),
            Error::ModelNotSupported { .. }
        ));
        assert!(registry.get_capabilities("ghost").is_err());
    }

    #[test]
    fn test_undated_base_is_suggested() {
        let registry = Registry::new(RegistryData::new().model(
            "claude",
            ModelEntry {
                context_window: 200_000,
                max_output_tokens: 8192,
                ..Default::default()
            },
        ));

        let err = registry.get_capabilities("claude-2024-01-01").unwrap_err();
        assert!(err.to_string().contains("Try using 'claude' instead"));
        match err {
            Error::ModelNotSupported { suggestions, .. } => {
                assert_eq!(suggestions, vec!["claude".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_inline_parameters() {
        let mut doc = document();
        doc["dated_models"]["m-2024-01-01"] = json!({
            "context_window": 1000,
            "max_output_tokens": 100,
            "min_version": "2024-01-01",
            "supported_parameters": [{"ref": "numeric_constraints.temperature"}],
            "parameters": {
                "temperature": {"type": "numeric", "min": 0.0, "max": 1.0},
                "verbosity": {"type": "enum", "enum": ["low", "high"]}
            }
        });
        let registry = Registry::from_value(&doc).unwrap();

        let record = registry.get_capabilities("m-2024-06-01").unwrap();
        assert_eq!(record.supported_parameter_names(), vec!["temperature", "verbosity"]);
        assert!(record.validate_parameter("temperature", &ParamValue::from(0.5), None).is_ok());
        assert!(record.validate_parameter("verbosity", &ParamValue::from("low"), None).is_ok());

        // The inline maximum wins over the shared constraint for the same name.
        let err = record
            .validate_parameter("temperature", &ParamValue::from(1.5), None)
            .unwrap_err();
        assert_eq!(err.violation_kind(), Some(crate::ViolationKind::Range));
        let err = record
            .validate_parameter("verbosity", &ParamValue::from("medium"), None)
            .unwrap_err();
        assert_eq!(err.violation_kind(), Some(crate::ViolationKind::Value));

        let constraint = registry
            .get_constraint("parameters.m-2024-01-01.temperature")
            .unwrap();
        assert_eq!(constraint.kind(), "numeric");
        assert!(registry.get_constraint("numeric_constraints.temperature").is_ok());
    }

    #[test]
    fn test_load_stats() {
        let stats = registry().stats();
        assert_eq!(
            stats,
            LoadStats {
                total: 3,
                loaded: 3,
                skipped: 0,
                dangling_aliases: 1,
            }
        );
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let mut doc = document();
        doc["dated_models"]["broken-2024-01-01"] = json!({"context_window": 0, "max_output_tokens": 5});
        doc["dated_models"]["garbled-2024-01-01"] = json!({"context_window": "wide"});

        let registry = Registry::from_value(&doc).unwrap();
        let stats = registry.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.loaded, 3);
        assert_eq!(stats.skipped, 2);
        assert!(registry.get_capabilities("broken-2024-01-01").is_err());
    }

    #[test]
    fn test_alias_cannot_shadow_model() {
        let data = builtin::registry_data().alias("o1-2024-12-17", "gpt-4o-2024-08-06");
        let registry = Registry::new(data);
        let record = registry.get_capabilities("o1-2024-12-17").unwrap();
        assert_eq!(record.identifier, "o1-2024-12-17");
    }

    #[test]
    fn test_get_constraint() {
        let registry = registry();
        let temperature = registry
            .get_constraint("numeric_constraints.temperature")
            .unwrap();
        assert_eq!(temperature.kind(), "numeric");
        assert!(matches!(
            registry.get_constraint("numeric_constraints.missing"),
            Err(Error::ConstraintNotFound { .. })
        ));
    }

    #[test]
    fn test_validation_through_registry() {
        let registry = registry();
        let record = registry.get_capabilities("gpt-4o-2024-09-15").unwrap();
        assert!(
            record
                .validate_parameter("temperature", &ParamValue::from(0.7), None)
                .is_ok()
        );
        assert!(
            record
                .validate_parameter("max_completion_tokens", &ParamValue::from(20_000), None)
                .is_err()
        );
        assert!(
            record
                .validate_parameter("reasoning_effort", &ParamValue::from("low"), None)
                .is_err()
        );
    }

    #[test]
    fn test_failed_load_keeps_snapshot() {
        let registry = registry();
        let err = registry.load(&json!({"version": "2.0.0"})).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(registry.get_capabilities("gpt-4o").is_ok());
    }

    #[test]
    fn test_reload_replaces_state() {
        let registry = registry();
        let pinned = registry.snapshot();

        let stats = registry.reload(builtin::registry_data());
        assert_eq!(stats.loaded, 3);
        assert!(registry.get_capabilities("gpt-4o-mini").is_ok());
        assert!(registry.get_capabilities("gpt-4o-2024-11-20").is_err());

        assert!(pinned.models.contains("gpt-4o-2024-11-20"));
    }

    #[test]
    fn test_concurrent_reads_during_reload() {
        let registry = registry();
        let small = || {
            let mut doc = document();
            doc["dated_models"]["gpt-4o-2024-11-20"]["max_output_tokens"] = json!(4096);
            RegistryData::from_document(&doc).unwrap()
        };

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let snapshot = registry.snapshot();
                        let record = snapshot.models.get("gpt-4o").unwrap();
                        let stored = snapshot.models.get("gpt-4o-2024-11-20").unwrap();
                        assert!(Arc::ptr_eq(record, stored));
                        assert!(matches!(record.max_output_tokens, 4096 | 32768));
                        assert!(registry.get_capabilities("gpt-4o-2025-01-01").is_ok());
                    }
                });
            }
            scope.spawn(|| {
                for i in 0..50 {
                    if i % 2 == 0 {
                        registry.reload(small());
                    } else {
                        registry.reload(RegistryData::from_document(&document()).unwrap());
                    }
                }
            });
        });
    }

    #[test]
    fn test_dump() {
        let dump = registry().dump();
        assert_eq!(dump["schema_version"], "1.0.0");
        assert_eq!(dump["stats"]["loaded"], 3);
        assert_eq!(dump["models"]["gpt-4o"]["identifier"], "gpt-4o-2024-11-20");
        assert_eq!(dump["models"]["o1-2024-12-17"]["min_version"], "2024-12-17");
        assert!(
            dump["constraints"]
                .as_array()
                .unwrap()
                .iter()
                .any(|c| c == "enum_constraints.reasoning_effort")
        );
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::default();
        assert_eq!(registry.schema_version(), "1.0.0");
        let record = registry.get_capabilities("gpt-4o").unwrap();
        assert!(record.pricing.is_some());
        assert!(registry.models().contains_key("o1"));
        assert!(registry.assert_model_active("gpt-4o").is_ok());
        assert!(registry.sunset_headers("gpt-4o").unwrap().is_empty());
    }
}
