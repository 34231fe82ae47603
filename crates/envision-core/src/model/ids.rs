use super::LayerType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, type-prefixed node id (`use-case-3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Per-session id source with one monotonically increasing counter per layer.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counters: [u64; 4],
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, layer: LayerType) -> NodeId {
        let slot = &mut self.counters[layer.depth()];
        let id = NodeId(format!("{}-{}", layer.as_str(), *slot));
        *slot += 1;
        id
    }

    /// Number of ids handed out so far for `layer`.
    pub fn issued(&self, layer: LayerType) -> u64 {
        self.counters[layer.depth()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent_per_layer() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next(LayerType::Summary).as_str(), "summary-0");
        assert_eq!(ids.next(LayerType::Harm).as_str(), "harm-0");
        assert_eq!(ids.next(LayerType::Harm).as_str(), "harm-1");
        assert_eq!(ids.next(LayerType::UseCase).as_str(), "use-case-0");
        assert_eq!(ids.issued(LayerType::Harm), 2);
        assert_eq!(ids.issued(LayerType::Stakeholder), 0);
    }
}
