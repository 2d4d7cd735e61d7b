//! # model-registry
//!
//! Capability registry for dated LLM model identifiers.
//!
//! Answers two questions for a model identifier such as `gpt-4o` or
//! `gpt-4o-2024-09-15`: what can this model do, and is a given request
//! parameter acceptable for it. Unknown dated identifiers resolve to the
//! newest known snapshot whose minimum version does not exceed the
//! requested date.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use model_registry::{ParamValue, Registry};
//!
//! fn main() -> Result<(), model_registry::Error> {
//!     let registry = Registry::builtin();
//!
//!     let record = registry.get_capabilities("gpt-4o-2024-09-15")?;
//!     println!("context window: {}", record.context_window);
//!
//!     record.validate_parameter("temperature", &ParamValue::from(0.7), None)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Loading From Files
//!
//! ```rust,no_run
//! use model_registry::{Registry, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RegistryConfig::new()
//!         .registry_path("config/models.yml")
//!         .constraints_path("config/parameter_constraints.yml");
//!     let registry = Registry::from_config(&config).await;
//!     println!("{:?}", registry.stats());
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod constraints;
pub mod models;
pub mod prelude;
pub mod pricing;

use chrono::NaiveDate;

pub use config::{ConfigError, ConfigResult, ModelEntry, RegistryConfig, RegistryData};
pub use constraints::{
    ConstraintDefinition, ConstraintTable, EnumConstraint, FixedParameterSet, NumericConstraint,
    ObjectConstraint, ParamValue, ParameterReference, ViolationKind,
};
pub use models::{
    CapabilityMap, CapabilityRecord, DeprecationInfo, DeprecationStatus, LoadStats, ModelVersion,
    Registry, RegistrySnapshot, VersionResolver,
};
pub use pricing::{ContentTokenPolicy, PricingInfo, PricingScheme, PricingUnit, WebSearchBilling};

/// Error type for registry lookups and parameter validation.
///
/// Every variant carries enough context for a caller to correct the request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Identifier does not resolve to any record.
    #[error("{message}")]
    ModelNotSupported {
        model: String,
        /// Sorted identifiers the caller could use instead.
        suggestions: Vec<String>,
        message: String,
    },

    /// A date-shaped suffix is not a real calendar date.
    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// The requested snapshot predates every known definition.
    #[error(
        "Model '{model}' version is too old. Minimum version for {base} is {min_version}.{hint}",
        hint = suggestion.as_deref().map(|s| format!(" Try using '{}' instead.", s)).unwrap_or_default()
    )]
    VersionTooOld {
        model: String,
        base: String,
        min_version: ModelVersion,
        suggestion: Option<String>,
    },

    /// A record references a constraint that was never loaded.
    #[error("Constraint reference '{reference}' not found in registry")]
    ConstraintNotFound { reference: String },

    #[error(
        "Parameter '{param}' is not supported for model '{model}'. Supported parameters: {}",
        supported.join(", ")
    )]
    ParameterNotSupported {
        param: String,
        model: String,
        supported: Vec<String>,
    },

    #[error(
        "Parameter '{param}' value {value} exceeds the output token limit of {limit} for model '{model}'"
    )]
    TokenLimitExceeded {
        param: String,
        model: String,
        value: ParamValue,
        limit: u64,
    },

    /// A value failed its constraint.
    #[error("{message}")]
    ConstraintViolation {
        param: String,
        kind: ViolationKind,
        value: ParamValue,
        message: String,
    },

    #[error(
        "Model '{model}' has been sunset{on}.{alt}",
        on = sunset_on.map(|d| format!(" on {}", d)).unwrap_or_default(),
        alt = replacement.as_deref().map(|r| format!(" Use '{}' instead.", r)).unwrap_or_default()
    )]
    ModelSunset {
        model: String,
        sunset_on: Option<NaiveDate>,
        replacement: Option<String>,
    },

    /// A configuration source could not be used as a whole.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The identifier could not be mapped to a record
    Resolution,
    /// A request parameter was rejected
    Validation,
    /// Registry data is missing or inconsistent
    Configuration,
    /// The model is past its sunset date
    Lifecycle,
}

impl Error {
    /// Builds a constraint violation whose message names the parameter, the
    /// constraint's description and the offending value.
    pub fn violation(
        param: &str,
        kind: ViolationKind,
        value: &ParamValue,
        headline: String,
        description: &str,
    ) -> Self {
        let mut message = headline;
        if !description.is_empty() {
            message.push_str(". Description: ");
            message.push_str(description);
        }
        message.push_str(&format!(". Current value: {}", value));

        Error::ConstraintViolation {
            param: param.to_string(),
            kind,
            value: value.clone(),
            message,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ModelNotSupported { .. }
            | Error::InvalidDate { .. }
            | Error::VersionTooOld { .. } => ErrorCategory::Resolution,

            Error::ParameterNotSupported { .. }
            | Error::TokenLimitExceeded { .. }
            | Error::ConstraintViolation { .. } => ErrorCategory::Validation,

            Error::ConstraintNotFound { .. } | Error::Config(_) => ErrorCategory::Configuration,

            Error::ModelSunset { .. } => ErrorCategory::Lifecycle,
        }
    }

    pub fn is_resolution_error(&self) -> bool {
        self.category() == ErrorCategory::Resolution
    }

    pub fn is_validation_error(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn violation_kind(&self) -> Option<ViolationKind> {
        match self {
            Error::ConstraintViolation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Identifiers offered as alternatives, if any.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::ModelNotSupported { suggestions, .. } => suggestions.clone(),
            Error::VersionTooOld { suggestion, .. } => suggestion.iter().cloned().collect(),
            Error::ModelSunset { replacement, .. } => replacement.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
