use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::deprecation::{DeprecationInfo, DeprecationStatus};
use super::version::ModelVersion;
use crate::config::ModelEntry;
use crate::constraints::{
    ConstraintDefinition, ConstraintTable, ParamValue, ParameterReference, ViolationKind,
};
use crate::pricing::{PricingInfo, WebSearchBilling};
use crate::{Error, Result};

/// Parameters whose numeric value is capped by the model's output limit.
pub const TOKEN_LIMIT_PARAMS: [&str; 3] = ["max_tokens", "max_completion_tokens", "max_output_tokens"];

pub fn is_token_limit_param(name: &str) -> bool {
    TOKEN_LIMIT_PARAMS.contains(&name)
}

/// Capability data for one model identifier.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityRecord {
    pub identifier: String,
    /// Name to send to the provider's API.
    pub provider_name: String,
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
    pub min_version: Option<ModelVersion>,
    pub aliases: BTreeSet<String>,
    pub description: String,
    pub deprecation: DeprecationInfo,
    pub pricing: Option<PricingInfo>,
    pub web_search_billing: Option<WebSearchBilling>,
    #[serde(skip)]
    constraints: Arc<ConstraintTable>,
}

impl CapabilityRecord {
    pub(crate) fn from_entry(
        identifier: &str,
        entry: ModelEntry,
        aliases: BTreeSet<String>,
        constraints: Arc<ConstraintTable>,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            provider_name: entry.provider_name.unwrap_or_else(|| identifier.to_string()),
            context_window: entry.context_window,
            max_output_tokens: entry.max_output_tokens,
            supports_structured: entry.supports_structured,
            supports_streaming: entry.supports_streaming,
            supports_vision: entry.supports_vision,
            supports_functions: entry.supports_functions,
            supports_json_mode: entry.supports_json_mode,
            supports_web_search: entry.supports_web_search,
            supports_audio: entry.supports_audio,
            input_modalities: entry.input_modalities,
            output_modalities: entry.output_modalities,
            supported_parameters: entry.supported_parameters,
            min_version: entry.min_version,
            aliases,
            description: entry.description,
            deprecation: entry.deprecation,
            pricing: entry.pricing,
            web_search_billing: entry.web_search_billing,
            constraints,
        }
    }

    /// Copy of this record answering to a different identifier.
    pub fn with_identifier(&self, identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            provider_name: identifier.to_string(),
            ..self.clone()
        }
    }

    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    pub fn is_deprecated(&self) -> bool {
        matches!(
            self.deprecation.status,
            DeprecationStatus::Deprecated | DeprecationStatus::Sunset
        )
    }

    pub fn is_sunset(&self) -> bool {
        self.deprecation.status == DeprecationStatus::Sunset
    }

    pub fn supports_parameter(&self, name: &str) -> bool {
        self.find_parameter(name).is_some()
    }

    pub fn find_parameter(&self, name: &str) -> Option<&ParameterReference> {
        self.supported_parameters.iter().find(|p| p.matches(name))
    }

    /// Sorted parameter names this model accepts.
    pub fn supported_parameter_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.supported_parameters.iter().map(|p| p.name()).collect();
        names.into_iter().map(String::from).collect()
    }

    /// Validates one parameter against the model's declared constraints.
    ///
    /// When `used_params` is supplied, the name is recorded in it and a
    /// second use of the same name fails.
    pub fn validate_parameter(
        &self,
        name: &str,
        value: &ParamValue,
        used_params: Option<&mut HashSet<String>>,
    ) -> Result<()> {
        if let Some(used) = used_params
            && !used.insert(name.to_string())
        {
            let description = self
                .find_parameter(name)
                .map(|p| p.description.as_str())
                .unwrap_or_default();
            return Err(Error::violation(
                name,
                ViolationKind::DuplicateUse,
                value,
                format!("Parameter '{}' specified multiple times", name),
                description,
            ));
        }

        let token_param = is_token_limit_param(name);
        if token_param
            && let Some(requested) = value.as_f64()
            && requested.is_finite()
            && requested > self.max_output_tokens as f64
        {
            return Err(Error::TokenLimitExceeded {
                param: name.to_string(),
                model: self.identifier.clone(),
                value: value.clone(),
                limit: self.max_output_tokens,
            });
        }

        let Some(param) = self.find_parameter(name) else {
            return Err(Error::ParameterNotSupported {
                param: name.to_string(),
                model: self.identifier.clone(),
                supported: self.supported_parameter_names(),
            });
        };

        let constraint = self.constraints.get(&param.reference)?;
        match constraint.as_ref() {
            ConstraintDefinition::Numeric(numeric) => {
                let ceiling = param
                    .effective_max(numeric.max_value)
                    .or_else(|| token_param.then_some(self.max_output_tokens as f64));
                numeric.validate_with_max(name, value, ceiling)
            }
            other => other.validate(name, value),
        }
    }

    /// Validates every pair, stopping at the first failure.
    pub fn validate_parameters<'a, I>(
        &self,
        params: I,
        mut used_params: Option<&mut HashSet<String>>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (&'a String, &'a ParamValue)>,
    {
        for (name, value) in params {
            self.validate_parameter(name, value, used_params.as_deref_mut())?;
        }
        Ok(())
    }
}
