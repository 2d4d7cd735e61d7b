//! Registry configuration: where documents live and how they are parsed.
//!
//! ```rust,no_run
//! use model_registry::config::RegistryConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let data = RegistryConfig::new()
//!     .registry_path("config/models.yml")
//!     .constraints_path("config/parameter_constraints.yml")
//!     .load()
//!     .await?;
//! println!("{} models", data.models.len());
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod source;
pub mod validator;

use std::path::{Path, PathBuf};

pub use schema::{DEFAULT_SCHEMA_VERSION, ModelEntry, RegistryData, SUPPORTED_SCHEMA_MAJOR};
pub use source::{parse_document, read_document};
pub use validator::{DocumentValidator, ValueType};

use thiserror::Error;

/// Errors that can occur while loading registry documents
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Document or key not found
    #[error("Not found: {key}")]
    NotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unsupported schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: String, supported: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),

    /// Multiple validation errors
    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: ")?;
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Locations of the registry documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub registry_path: Option<PathBuf>,
    pub constraints_path: Option<PathBuf>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry_path(mut self, path: impl AsRef<Path>) -> Self {
        self.registry_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// A separate constraints document, merged over the registry's own
    /// constraint sections.
    pub fn constraints_path(mut self, path: impl AsRef<Path>) -> Self {
        self.constraints_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads and parses the configured documents.
    pub async fn load(&self) -> ConfigResult<RegistryData> {
        let path = self.registry_path.as_deref().ok_or_else(|| ConfigError::NotFound {
            key: "registry_path".into(),
        })?;
        let document = read_document(path).await?;
        let mut data = RegistryData::from_document(&document)?;

        if let Some(constraints_path) = &self.constraints_path {
            let constraints = read_document(constraints_path).await?;
            DocumentValidator::registry_document().validate(&constraints)?;
            data.merge_constraints(&constraints);
        }

        tracing::debug!(
            path = %path.display(),
            models = data.models.len(),
            constraints = data.constraints.len(),
            "loaded registry configuration"
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnsupportedSchema {
            found: "2.0.0".into(),
            supported: ">=1.0.0,<2.0.0".into(),
        };
        assert!(err.to_string().contains("2.0.0"));

        let err = ConfigError::ValidationErrors(ValidationErrors(vec![
            ConfigError::NotFound { key: "a".into() },
            ConfigError::NotFound { key: "b".into() },
        ]));
        assert_eq!(err.to_string(), "Validation failed: Not found: a; Not found: b");
    }

    #[tokio::test]
    async fn test_load_without_path() {
        let err = RegistryConfig::new().load().await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_merges_constraints_document() {
        let dir = tempdir().unwrap();
        let registry = dir.path().join("models.yml");
        let constraints = dir.path().join("constraints.yml");
        tokio::fs::write(
            &registry,
            concat!(
                "version: \"1.0.0\"\n",
                "dated_models:\n",
                "  m-2024-01-01:\n",
                "    context_window: 100\n",
                "    max_output_tokens: 50\n",
                "numeric_constraints:\n",
                "  temperature:\n",
                "    min_value: 0\n",
                "    max_value: 1\n",
            ),
        )
        .await
        .unwrap();
        tokio::fs::write(
            &constraints,
            concat!(
                "numeric_constraints:\n",
                "  temperature:\n",
                "    min_value: 0\n",
                "    max_value: 2\n",
                "enum_constraints:\n",
                "  reasoning_effort:\n",
                "    allowed_values: [low, medium, high]\n",
            ),
        )
        .await
        .unwrap();

        let data = RegistryConfig::new()
            .registry_path(&registry)
            .constraints_path(&constraints)
            .load()
            .await
            .unwrap();

        assert_eq!(data.models.len(), 1);
        let temperature = data
            .constraints
            .get("numeric_constraints.temperature")
            .unwrap();
        assert_eq!(temperature.as_numeric().unwrap().max_value, Some(2.0));
        assert!(data.constraints.contains("enum_constraints.reasoning_effort"));
    }
}
