use std::collections::BTreeMap;
use std::sync::Arc;

use super::record::CapabilityRecord;
use super::version::ModelVersion;

/// Records stored once, addressed by every name (dated, base, alias) that
/// resolves to them.
///
/// Keys are kept sorted, which fixes the order in which dated siblings are
/// discovered during resolution.
#[derive(Debug, Clone, Default)]
pub struct CapabilityMap {
    records: Vec<Arc<CapabilityRecord>>,
    index: BTreeMap<String, usize>,
}

impl CapabilityMap {
    pub(crate) fn new(records: Vec<Arc<CapabilityRecord>>, index: BTreeMap<String, usize>) -> Self {
        Self { records, index }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CapabilityRecord>> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every name with its record, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<CapabilityRecord>)> {
        self.index
            .iter()
            .map(|(name, &i)| (name.as_str(), &self.records[i]))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Names without a `-YYYY-MM-DD` suffix: base models and aliases.
    pub fn undated_keys(&self) -> Vec<String> {
        self.keys()
            .filter(|k| !ModelVersion::is_dated_model(k))
            .map(String::from)
            .collect()
    }

    /// Dated entries whose base name is exactly `base`, in key order.
    pub fn dated_siblings<'a>(
        &'a self,
        base: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Arc<CapabilityRecord>)> + 'a {
        let prefix = format!("{}-", base);
        self.index
            .range(prefix.clone()..)
            .take_while(move |(name, _)| name.starts_with(&prefix))
            .filter(move |(name, _)| {
                ModelVersion::split_dated(name).is_some_and(|(b, _)| b == base)
            })
            .map(|(name, &i)| (name.as_str(), &self.records[i]))
    }

    /// Number of distinct records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of names, aliases included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
