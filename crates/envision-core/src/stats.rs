//! Per-category counts of non-empty nodes, pushed to the footer after every structural
//! change.

use crate::model::{NodeKind, Tree};
use crate::taxonomy::{HarmTheme, StakeholderCategory, UseCaseCategory};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryStats {
    counts: IndexMap<String, usize>,
}

impl Default for CategoryStats {
    fn default() -> Self {
        let keys = UseCaseCategory::ALL
            .iter()
            .map(|c| c.as_str())
            .chain(StakeholderCategory::ALL.iter().map(|c| c.as_str()))
            .chain(HarmTheme::ALL.iter().map(|t| t.as_str()));
        Self {
            counts: keys.map(|k| (k.to_string(), 0)).collect(),
        }
    }
}

impl CategoryStats {
    pub fn get(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn bump(&mut self, key: &str) {
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Walks the full tree (hidden subtrees included) and counts non-empty nodes per
/// use-case category, stakeholder category and harm theme.
pub fn compute_stats(tree: &Tree) -> CategoryStats {
    let mut stats = CategoryStats::default();
    for id in tree.walk() {
        let Some(node) = tree.node(&id) else { continue };
        if node.is_empty() {
            continue;
        }
        match &node.kind {
            NodeKind::Summary => {}
            NodeKind::UseCase { category } => stats.bump(category.as_str()),
            NodeKind::Stakeholder { category, .. } => stats.bump(category.as_str()),
            NodeKind::Harm(h) => stats.bump(h.category.theme().as_str()),
        }
    }
    stats
}

/// Footer collaborator receiving fresh statistics.
pub trait StatsSink {
    fn update_stats(&mut self, stats: &CategoryStats);
}

impl<F: FnMut(&CategoryStats)> StatsSink for F {
    fn update_stats(&mut self, stats: &CategoryStats) {
        self(stats)
    }
}
