//! Calendar-dated model versions (`YYYY-MM-DD`).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

static DATED_MODEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-(\d{4}-\d{2}-\d{2})$").expect("valid dated model regex")
});

/// A provider snapshot date. Ordered by year, then month, then day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelVersion {
    year: u16,
    month: u8,
    day: u8,
}

impl ModelVersion {
    /// Builds a version, rejecting dates that do not exist on the calendar.
    pub fn new(year: i64, month: i64, day: i64) -> Result<Self> {
        let text = format!("{:04}-{:02}-{:02}", year, month, day);
        let invalid = |reason: String| Error::InvalidDate {
            value: text.clone(),
            reason,
        };

        if !(1000..=9999).contains(&year) {
            return Err(invalid(format!("Invalid year: {}. Must be 1000-9999.", year)));
        }
        if !(1..=12).contains(&month) {
            return Err(invalid(format!("Invalid month: {}. Must be 1-12.", month)));
        }
        if !(1..=31).contains(&day) {
            return Err(invalid(format!("Invalid day: {}. Must be 1-31.", day)));
        }
        // Ranges are checked above, so the narrowing casts are lossless.
        if NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).is_none() {
            return Err(invalid("day is out of range for month".into()));
        }

        Ok(Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
        })
    }

    /// For hardcoded dates already known to be valid.
    pub(crate) const fn ymd(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn as_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
            .unwrap_or(NaiveDate::MIN)
    }

    /// Splits `gpt-4o-2024-08-06` into `("gpt-4o", "2024-08-06")` without
    /// validating the date itself.
    pub fn split_dated(identifier: &str) -> Option<(&str, &str)> {
        let caps = DATED_MODEL_RE.captures(identifier)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    /// Parses a dated identifier into base name and version. Returns `None`
    /// when the identifier is not dated or the date is invalid.
    pub fn parse_from_model(identifier: &str) -> Option<(&str, ModelVersion)> {
        let (base, date) = Self::split_dated(identifier)?;
        date.parse().ok().map(|version| (base, version))
    }

    pub fn is_dated_model(identifier: &str) -> bool {
        DATED_MODEL_RE.is_match(identifier)
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for ModelVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidDate {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split('-').collect();
        let [year, month, day] = parts.as_slice() else {
            return Err(invalid("Invalid version format. Expected YYYY-MM-DD."));
        };
        if year.len() != 4 {
            return Err(invalid("Year must have four digits."));
        }

        let component = |part: &str| -> Result<i64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("Year, month, and day must be integers."));
            }
            part.parse()
                .map_err(|_| invalid("Year, month, and day must be integers."))
        };

        Self::new(component(year)?, component(month)?, component(day)?).map_err(|e| match e {
            Error::InvalidDate { reason, .. } => Error::InvalidDate {
                value: s.to_string(),
                reason,
            },
            other => other,
        })
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Parts { year: i64, month: i64, day: i64 },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Parts { year, month, day } => {
                Self::new(year, month, day).map_err(serde::de::Error::custom)
            }
        }
    }
}
