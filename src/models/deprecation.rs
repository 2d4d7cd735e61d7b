//! Deprecation and sunset metadata.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeprecationStatus {
    #[default]
    Active,
    Deprecated,
    Sunset,
}

impl DeprecationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deprecated => "deprecated",
            Self::Sunset => "sunset",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationInfo {
    #[serde(default)]
    pub status: DeprecationStatus,
    #[serde(default, deserialize_with = "lenient_date")]
    pub deprecates_on: Option<NaiveDate>,
    #[serde(default, alias = "sunset_date", deserialize_with = "lenient_date")]
    pub sunsets_on: Option<NaiveDate>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub migration_guide: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Blank and `"null"` dates mean "not scheduled". Unparseable dates are
/// dropped with a warning rather than failing the whole model entry.
fn lenient_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()) else {
        return Ok(None);
    };
    if raw.is_empty() || raw == "null" {
        return Ok(None);
    }
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Ok(Some(date)),
        Err(e) => {
            tracing::warn!(value = %raw, error = %e, "ignoring unparseable deprecation date");
            Ok(None)
        }
    }
}

impl DeprecationInfo {
    pub fn active() -> Self {
        Self::default()
    }

    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if let (Some(deprecates), Some(sunsets)) = (self.deprecates_on, self.sunsets_on)
            && deprecates > sunsets
        {
            return Err(format!(
                "deprecates_on ({}) must be <= sunsets_on ({})",
                deprecates, sunsets
            ));
        }
        Ok(())
    }

    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or(self.status.as_str())
    }

    /// Fails for sunset models and logs a warning for deprecated ones.
    pub fn assert_active(&self, model: &str) -> Result<()> {
        match self.status {
            DeprecationStatus::Sunset => Err(Error::ModelSunset {
                model: model.to_string(),
                sunset_on: self.sunsets_on,
                replacement: self.replacement.clone(),
            }),
            DeprecationStatus::Deprecated => {
                let sunset = self
                    .sunsets_on
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown date".into());
                tracing::warn!(
                    model,
                    sunsets_on = %sunset,
                    replacement = self.replacement.as_deref().unwrap_or(""),
                    "{} is deprecated; will sunset {}",
                    model,
                    sunset
                );
                Ok(())
            }
            DeprecationStatus::Active => Ok(()),
        }
    }

    /// HTTP headers announcing the deprecation (RFC 9745 `Deprecation`,
    /// RFC 8594 `Sunset`). Empty for active models.
    pub fn sunset_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if self.status == DeprecationStatus::Active {
            return headers;
        }
        if let Some(date) = self.deprecates_on {
            headers.insert("Deprecation".to_string(), date.to_string());
        }
        if let Some(date) = self.sunsets_on {
            headers.insert("Sunset".to_string(), date.to_string());
        }
        if let Some(guide) = self.migration_guide.as_deref().filter(|g| !g.is_empty()) {
            headers.insert("Link".to_string(), format!("<{}>; rel=\"deprecation\"", guide));
        }
        headers
    }
}
