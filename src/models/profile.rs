use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Accumulated keyword counts from a user's likes
///
/// Counts only grow; the whole profile is replaced on reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct PreferenceProfile {
    counts: HashMap<String, u64>,
}

impl PreferenceProfile {
    /// Creates an empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Count recorded for a keyword, 0 when absent
    pub fn count(&self, keyword: &str) -> u64 {
        self.counts.get(keyword).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Increments every distinct keyword of a liked item by one
    pub fn apply_like(mut self, item_keywords: &[String]) -> Self {
        let mut seen = HashSet::new();
        for keyword in item_keywords {
            if seen.insert(keyword.as_str()) {
                *self.counts.entry(keyword.clone()).or_insert(0) += 1;
            }
        }
        self
    }

    /// The `n` highest counted keywords, ties broken alphabetically
    pub fn top_keywords(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(keyword, count)| (keyword.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

impl FromIterator<(String, u64)> for PreferenceProfile {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}
