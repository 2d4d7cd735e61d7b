//! Reading registry documents from disk.
//!
//! `.json` files are parsed as JSON; everything else is treated as YAML.

use std::path::Path;

use serde_json::Value;

use super::{ConfigError, ConfigResult};

/// Reads and parses the document at `path`.
pub async fn read_document(path: &Path) -> ConfigResult<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                key: path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    parse_document(path, &content)
}

pub fn parse_document(path: &Path, content: &str) -> ConfigResult<Value> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let document = if is_json {
        serde_json::from_str(content)?
    } else {
        serde_yaml_bw::from_str(content)?
    };

    tracing::debug!(path = %path.display(), "parsed registry document");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_yaml_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models.yaml");
        tokio::fs::write(
            &path,
            "version: \"1.0.0\"\ndated_models:\n  m-2024-01-01:\n    context_window: 10\n",
        )
        .await
        .unwrap();

        let doc = read_document(&path).await.unwrap();
        assert_eq!(doc["version"], "1.0.0");
        assert_eq!(doc["dated_models"]["m-2024-01-01"]["context_window"], 10);
    }

    #[tokio::test]
    async fn test_read_json_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models.json");
        tokio::fs::write(&path, r#"{"aliases": {"a": "b"}}"#)
            .await
            .unwrap();

        let doc = read_document(&path).await.unwrap();
        assert_eq!(doc["aliases"]["a"], "b");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.yml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_document(Path::new("x.json"), "{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
