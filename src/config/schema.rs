//! Typed registry data and its parsing from a loosely shaped document.
//!
//! Parsing is tolerant per entry: a malformed model or constraint is logged
//! and skipped so that one bad definition does not empty the registry.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::validator::DocumentValidator;
use super::{ConfigError, ConfigResult};
use crate::constraints::{
    ConstraintDefinition, ConstraintTable, EnumConstraint, FixedParameterSet, NumericConstraint,
    ObjectConstraint, ParamValue, ParameterReference,
};
use crate::models::{DeprecationInfo, ModelVersion};
use crate::pricing::{PricingInfo, WebSearchBilling};

pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";
pub const SUPPORTED_SCHEMA_MAJOR: u64 = 1;

pub(crate) const MODELS_SECTION: &str = "dated_models";
pub(crate) const LEGACY_MODELS_SECTION: &str = "models";
pub(crate) const ALIASES_SECTION: &str = "aliases";
pub(crate) const FIXED_SETS_SECTION: &str = "fixed_parameter_sets";
pub(crate) const INLINE_PARAMETERS_PREFIX: &str = "parameters";
const CONSTRAINT_SECTION_SUFFIX: &str = "_constraints";

/// One model definition with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub provider_name: Option<String>,
    pub context_window: u64,
    pub max_output_tokens: u64,
    pub supports_structured: bool,
    pub supports_streaming: bool,
    pub supports_vision: bool,
    pub supports_functions: bool,
    pub supports_json_mode: bool,
    pub supports_web_search: bool,
    pub supports_audio: bool,
    pub input_modalities: Vec<String>,
    pub output_modalities: Vec<String>,
    pub supported_parameters: Vec<ParameterReference>,
    /// Constraints declared on the model itself, keyed by parameter name.
    /// They take precedence over a shared reference for the same name.
    pub inline_parameters: BTreeMap<String, ConstraintDefinition>,
    pub min_version: Option<ModelVersion>,
    pub description: String,
    pub deprecation: DeprecationInfo,
    pub pricing: Option<PricingInfo>,
    pub web_search_billing: Option<WebSearchBilling>,
}

impl Default for ModelEntry {
    fn default() -> Self {
        Self {
            provider_name: None,
            context_window: 0,
            max_output_tokens: 0,
            supports_structured: true,
            supports_streaming: true,
            supports_vision: false,
            supports_functions: false,
            supports_json_mode: false,
            supports_web_search: false,
            supports_audio: false,
            input_modalities: Vec::new(),
            output_modalities: Vec::new(),
            supported_parameters: Vec::new(),
            inline_parameters: BTreeMap::new(),
            min_version: None,
            description: String::new(),
            deprecation: DeprecationInfo::default(),
            pricing: None,
            web_search_billing: None,
        }
    }
}

impl ModelEntry {
    /// Field-level invariants. Violations make the entry unusable.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.context_window == 0 {
            return Err("context_window must be greater than 0".into());
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".into());
        }
        let mut seen = HashSet::new();
        for param in &self.supported_parameters {
            if !seen.insert(param.reference.as_str()) {
                return Err(format!("duplicate supported parameter '{}'", param.reference));
            }
        }
        for (param, definition) in &self.inline_parameters {
            definition
                .check()
                .map_err(|e| format!("parameter '{}': {}", param, e))?;
        }
        self.deprecation.check()?;
        if let Some(pricing) = &self.pricing {
            pricing.check()?;
        }
        if let Some(billing) = &self.web_search_billing {
            billing.check()?;
        }
        Ok(())
    }

    /// Constraint table key for an inline parameter of `model`.
    pub(crate) fn inline_key(model: &str, param: &str) -> String {
        format!("{}.{}.{}", INLINE_PARAMETERS_PREFIX, model, param)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContextWindowRepr {
    Total(u64),
    Split {
        total: u64,
        #[serde(default)]
        output: Option<u64>,
    },
}

fn default_true() -> bool {
    true
}

/// One entry of a model's `parameters` block.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InlineParameter {
    Numeric {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default = "default_true")]
        allow_float: bool,
        #[serde(default = "default_true")]
        allow_int: bool,
        #[serde(default)]
        description: String,
    },
    Enum {
        #[serde(rename = "enum")]
        values: Vec<String>,
        #[serde(default)]
        description: String,
    },
}

impl From<InlineParameter> for ConstraintDefinition {
    fn from(param: InlineParameter) -> Self {
        match param {
            InlineParameter::Numeric {
                min,
                max,
                allow_float,
                allow_int,
                description,
            } => NumericConstraint {
                min_value: min.unwrap_or(f64::MIN),
                max_value: max,
                allow_float,
                allow_int,
                description,
            }
            .into(),
            InlineParameter::Enum {
                values,
                description,
            } => EnumConstraint::new(values).description(description).into(),
        }
    }
}

#[derive(Deserialize)]
struct RawModelEntry {
    #[serde(default, alias = "openai_name")]
    provider_name: Option<String>,
    context_window: ContextWindowRepr,
    #[serde(default)]
    max_output_tokens: Option<u64>,
    #[serde(default = "default_true")]
    supports_structured: bool,
    #[serde(default = "default_true")]
    supports_streaming: bool,
    #[serde(default)]
    supports_vision: bool,
    #[serde(default)]
    supports_functions: bool,
    #[serde(default)]
    supports_json_mode: bool,
    #[serde(default)]
    supports_web_search: bool,
    #[serde(default)]
    supports_audio: bool,
    #[serde(default)]
    input_modalities: Vec<String>,
    #[serde(default)]
    output_modalities: Vec<String>,
    #[serde(default)]
    supported_parameters: Vec<ParameterReference>,
    #[serde(default)]
    min_version: Option<ModelVersion>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    deprecation: DeprecationInfo,
    #[serde(default)]
    parameters: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pricing: Option<Value>,
    #[serde(default)]
    billing: Option<Value>,
}

impl ModelEntry {
    /// Parses one model definition. A bad pricing block, billing block or
    /// inline parameter is dropped with a warning; anything else malformed
    /// fails the entry.
    pub fn from_value(name: &str, value: &Value) -> ConfigResult<Self> {
        let raw: RawModelEntry =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
                key: format!("{}.{}", MODELS_SECTION, name),
                message: e.to_string(),
            })?;

        let (context_window, split_output) = match raw.context_window {
            ContextWindowRepr::Total(total) => (total, None),
            ContextWindowRepr::Split { total, output } => (total, output),
        };

        let pricing = raw.pricing.filter(|p| !p.is_null()).and_then(|p| {
            serde_json::from_value::<PricingInfo>(p)
                .map_err(|e| {
                    tracing::warn!(model = name, error = %e, "invalid pricing block ignored");
                })
                .ok()
        });

        let web_search_billing = raw
            .billing
            .and_then(|mut b| b.get_mut("web_search").map(Value::take))
            .filter(|ws| !ws.is_null())
            .and_then(|ws| {
                serde_json::from_value::<WebSearchBilling>(ws)
                    .map_err(|e| e.to_string())
                    .and_then(|billing| billing.check().map(|()| billing))
                    .map_err(|e| {
                        tracing::warn!(model = name, error = %e, "invalid web search billing ignored");
                    })
                    .ok()
            });

        let mut inline_parameters = BTreeMap::new();
        for (param, body) in raw.parameters.unwrap_or_default() {
            let parsed = serde_json::from_value::<InlineParameter>(body)
                .map(ConstraintDefinition::from)
                .map_err(|e| e.to_string())
                .and_then(|definition| definition.check().map(|()| definition));
            match parsed {
                Ok(definition) => {
                    inline_parameters.insert(param, definition);
                }
                Err(e) => {
                    tracing::warn!(model = name, parameter = %param, error = %e, "invalid inline parameter ignored")
                }
            }
        }

        Ok(Self {
            provider_name: raw.provider_name,
            context_window,
            max_output_tokens: raw.max_output_tokens.or(split_output).unwrap_or(0),
            supports_structured: raw.supports_structured,
            supports_streaming: raw.supports_streaming,
            supports_vision: raw.supports_vision,
            supports_functions: raw.supports_functions,
            supports_json_mode: raw.supports_json_mode,
            supports_web_search: raw.supports_web_search,
            supports_audio: raw.supports_audio,
            input_modalities: raw.input_modalities,
            output_modalities: raw.output_modalities,
            supported_parameters: raw.supported_parameters,
            inline_parameters,
            min_version: raw.min_version,
            description: raw.description,
            deprecation: raw.deprecation,
            pricing,
            web_search_billing,
        })
    }
}

/// Everything a registry snapshot is built from.
#[derive(Debug, Clone, Default)]
pub struct RegistryData {
    pub schema_version: String,
    pub constraints: ConstraintTable,
    /// Model definitions in document order.
    pub models: Vec<(String, ModelEntry)>,
    /// Alias name to target model name.
    pub aliases: BTreeMap<String, String>,
    /// Entries dropped while parsing the document.
    pub skipped: usize,
}

impl RegistryData {
    pub fn new() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            ..Default::default()
        }
    }

    pub fn constraint(mut self, key: impl Into<String>, definition: impl Into<ConstraintDefinition>) -> Self {
        self.constraints.insert(key, Arc::new(definition.into()));
        self
    }

    /// Registers a fixed set under `fixed_parameter_sets.<name>` and each of
    /// its parameters under `fixed_parameter_sets.<name>.<param>`.
    pub fn fixed_set(mut self, name: &str, set: FixedParameterSet) -> Self {
        register_fixed_set(&mut self.constraints, name, set);
        self
    }

    pub fn model(mut self, name: impl Into<String>, entry: ModelEntry) -> Self {
        self.models.push((name.into(), entry));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    /// Parses a whole registry document.
    ///
    /// Fails only when the document as a whole is unusable (not a mapping,
    /// wrong section types, unsupported schema version).
    pub fn from_document(document: &Value) -> ConfigResult<Self> {
        DocumentValidator::registry_document().validate(document)?;

        let mut data = Self {
            schema_version: schema_version(document.get("version"))?,
            ..Default::default()
        };

        data.merge_constraints(document);

        let models = document
            .get(MODELS_SECTION)
            .or_else(|| document.get(LEGACY_MODELS_SECTION))
            .and_then(Value::as_object);
        for (name, value) in models.into_iter().flatten() {
            match ModelEntry::from_value(name, value) {
                Ok(entry) => data.models.push((name.clone(), entry)),
                Err(e) => {
                    tracing::warn!(model = %name, error = %e, "skipping malformed model entry");
                    data.skipped += 1;
                }
            }
        }

        let aliases = document.get(ALIASES_SECTION).and_then(Value::as_object);
        for (alias, target) in aliases.into_iter().flatten() {
            match target.as_str() {
                Some(target) => {
                    data.aliases.insert(alias.clone(), target.to_string());
                }
                None => tracing::warn!(alias = %alias, "alias target must be a string; skipped"),
            }
        }

        Ok(data)
    }

    /// Adds every constraint section of `document`, replacing existing keys.
    pub fn merge_constraints(&mut self, document: &Value) {
        let Some(sections) = document.as_object() else {
            return;
        };

        for (section, entries) in sections {
            let Some(entries) = entries.as_object() else {
                continue;
            };
            if section == FIXED_SETS_SECTION {
                for (name, body) in entries {
                    match parse_fixed_set(body) {
                        Some(set) => register_fixed_set(&mut self.constraints, name, set),
                        None => tracing::error!(
                            constraint = %name,
                            "fixed parameter set must be a mapping; skipped"
                        ),
                    }
                }
            } else if let Some(kind) = section.strip_suffix(CONSTRAINT_SECTION_SUFFIX) {
                for (name, body) in entries {
                    let key = format!("{}.{}", section, name);
                    match parse_constraint(kind, body) {
                        Ok(definition) => self.constraints.insert(key, Arc::new(definition)),
                        Err(reason) => {
                            tracing::error!(constraint = %key, reason = %reason, "invalid constraint skipped")
                        }
                    }
                }
            }
        }
    }
}

fn register_fixed_set(table: &mut ConstraintTable, name: &str, set: FixedParameterSet) {
    let params: Vec<String> = set.values.keys().cloned().collect();
    let shared = Arc::new(ConstraintDefinition::Fixed(set));
    for param in params {
        table.insert(
            format!("{}.{}.{}", FIXED_SETS_SECTION, name, param),
            Arc::clone(&shared),
        );
    }
    table.insert(format!("{}.{}", FIXED_SETS_SECTION, name), shared);
}

fn parse_fixed_set(body: &Value) -> Option<FixedParameterSet> {
    let map = body.as_object()?;
    let mut set = FixedParameterSet::new();
    for (key, value) in map {
        match (key.as_str(), value) {
            ("description", Value::String(text)) => set.description = text.clone(),
            _ => {
                set.values.insert(key.clone(), ParamValue::from(value));
            }
        }
    }
    Some(set)
}

/// `section_kind` is the section name without `_constraints`; an explicit
/// `type` field takes precedence over it.
fn parse_constraint(section_kind: &str, body: &Value) -> Result<ConstraintDefinition, String> {
    if !body.is_object() {
        return Err("constraint must be a mapping".into());
    }
    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(section_kind);

    let definition: ConstraintDefinition = match kind {
        "numeric" => serde_json::from_value::<NumericConstraint>(body.clone())
            .map_err(|e| e.to_string())?
            .into(),
        "enum" => serde_json::from_value::<EnumConstraint>(body.clone())
            .map_err(|e| e.to_string())?
            .into(),
        "object" => serde_json::from_value::<ObjectConstraint>(body.clone())
            .map_err(|e| e.to_string())?
            .into(),
        other => return Err(format!("unknown constraint type '{}'", other)),
    };
    definition.check()?;
    Ok(definition)
}

/// Normalises `1` / `1.2` / `1.2.3` to three components and accepts only
/// the supported major version. A missing version assumes the default.
fn schema_version(raw: Option<&Value>) -> ConfigResult<String> {
    let text = match raw {
        None | Some(Value::Null) => {
            tracing::warn!(
                default_version = DEFAULT_SCHEMA_VERSION,
                "missing schema version, using default"
            );
            return Ok(DEFAULT_SCHEMA_VERSION.to_string());
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                key: "version".into(),
                message: format!("expected string, got {}", other),
            });
        }
    };

    let invalid = || ConfigError::InvalidValue {
        key: "version".into(),
        message: format!("invalid schema version format: {}", text),
    };

    let mut parts: Vec<u64> = Vec::with_capacity(3);
    for part in text.split('.') {
        parts.push(part.parse().map_err(|_| invalid())?);
    }
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }
    parts.resize(3, 0);

    if parts[0] != SUPPORTED_SCHEMA_MAJOR {
        return Err(ConfigError::UnsupportedSchema {
            found: text,
            supported: format!(">={}.0.0,<{}.0.0", SUPPORTED_SCHEMA_MAJOR, SUPPORTED_SCHEMA_MAJOR + 1),
        });
    }

    Ok(format!("{}.{}.{}", parts[0], parts[1], parts[2]))
}
