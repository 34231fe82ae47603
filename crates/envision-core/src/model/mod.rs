//! Envision node model: a closed sum type over the four tree layers.

mod ids;
mod tree;

pub use ids::{IdGenerator, NodeId};
pub use tree::{Tree, VisibleNode};

use crate::taxonomy::{Relevance, Severity, StakeholderCategory, SubHarmCategory, UseCaseCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four tree depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Summary,
    UseCase,
    Stakeholder,
    Harm,
}

impl LayerType {
    pub const ALL: [Self; 4] = [Self::Summary, Self::UseCase, Self::Stakeholder, Self::Harm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::UseCase => "use-case",
            Self::Stakeholder => "stakeholder",
            Self::Harm => "harm",
        }
    }

    pub fn depth(self) -> usize {
        match self {
            Self::Summary => 0,
            Self::UseCase => 1,
            Self::Stakeholder => 2,
            Self::Harm => 3,
        }
    }

    /// Layer of this layer's children; harms are leaves.
    pub fn child_layer(self) -> Option<Self> {
        match self {
            Self::Summary => Some(Self::UseCase),
            Self::UseCase => Some(Self::Stakeholder),
            Self::Stakeholder => Some(Self::Harm),
            Self::Harm => None,
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmDetail {
    pub category: SubHarmCategory,
    pub severity: Severity,
    /// User override, 0 (unrated) to 3.
    pub user_rated_severity: u8,
    pub validated: bool,
}

/// Layer-specific payload of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Summary,
    UseCase {
        category: UseCaseCategory,
    },
    Stakeholder {
        category: StakeholderCategory,
        relevance: Relevance,
    },
    Harm(HarmDetail),
}

impl NodeKind {
    pub fn layer(&self) -> LayerType {
        match self {
            Self::Summary => LayerType::Summary,
            Self::UseCase { .. } => LayerType::UseCase,
            Self::Stakeholder { .. } => LayerType::Stakeholder,
            Self::Harm(_) => LayerType::Harm,
        }
    }

    /// Category label, `None` for the summary.
    pub fn category_label(&self) -> Option<&'static str> {
        match self {
            Self::Summary => None,
            Self::UseCase { category } => Some(category.as_str()),
            Self::Stakeholder { category, .. } => Some(category.as_str()),
            Self::Harm(h) => Some(h.category.as_str()),
        }
    }
}

/// Progress of the generation request that fills a node's children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum GenerationState {
    #[default]
    Idle,
    Pending {
        request_id: String,
    },
    Failed {
        message: String,
    },
}

/// Layout-computed fields. `x` is the horizontal (depth) axis, `y` the vertical
/// (sibling) axis; both are node centres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub x_previous: Option<f64>,
    pub y_previous: Option<f64>,
    pub measured: bool,
}

impl Geometry {
    /// Position a transition should start from: the previous position when one
    /// was recorded, the current one otherwise.
    pub fn previous_or_current(&self) -> (f64, f64) {
        (
            self.x_previous.unwrap_or(self.x),
            self.y_previous.unwrap_or(self.y),
        )
    }
}

/// A generated item in a node's candidate pool. Selected children share the
/// candidate's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: NodeId,
    pub text: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvisionNode {
    pub id: NodeId,
    pub text: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub candidates: Vec<Candidate>,
    pub show_children: bool,
    pub deleted: bool,
    pub generation: GenerationState,
    pub geometry: Geometry,
}

impl EnvisionNode {
    pub fn new(id: NodeId, text: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            text: text.into(),
            kind,
            parent: None,
            children: Vec::new(),
            candidates: Vec::new(),
            show_children: false,
            deleted: false,
            generation: GenerationState::Idle,
            geometry: Geometry::default(),
        }
    }

    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self::new(candidate.id.clone(), candidate.text.clone(), candidate.kind)
    }

    pub fn layer(&self) -> LayerType {
        self.kind.layer()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.generation, GenerationState::Pending { .. })
    }

    pub fn harm(&self) -> Option<&HarmDetail> {
        match &self.kind {
            NodeKind::Harm(h) => Some(h),
            _ => None,
        }
    }

    pub fn harm_mut(&mut self) -> Option<&mut HarmDetail> {
        match &mut self.kind {
            NodeKind::Harm(h) => Some(h),
            _ => None,
        }
    }

    pub fn to_candidate(&self) -> Candidate {
        Candidate {
            id: self.id.clone(),
            text: self.text.clone(),
            kind: self.kind,
        }
    }
}
