//! Generation-response parsing.
//!
//! Each parser turns raw model text into the candidate pool of one node plus the
//! quota-capped subset that is displayed right away. Malformed markup never fails: every
//! recovery is logged with `tracing::warn!` and replaced by a default.

mod harm;
mod markup;
mod stakeholder;
mod use_case;

pub use harm::{parse_harms, validate_harm};
pub use markup::parse_summary;
pub use stakeholder::parse_stakeholders;
pub use use_case::parse_use_cases;

use crate::config::QuotaConfig;
use crate::model::{Candidate, IdGenerator, LayerType};

/// Output of one generation round for one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedChildren {
    /// Pool members to display, in pool order.
    pub selected: Vec<Candidate>,
    /// Every syntactically valid item.
    pub candidates: Vec<Candidate>,
}

impl ParsedChildren {
    /// Builds the result from a pool and a per-item selection mask.
    fn from_mask(candidates: Vec<Candidate>, mask: &[bool]) -> Self {
        let selected = candidates
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(c, _)| c.clone())
            .collect();
        Self {
            selected,
            candidates,
        }
    }
}

/// Parses the children of a `parent_layer` node.
///
/// `parent_text` is only read for harms, whose validation depends on the stakeholder.
/// Returns `None` for harms, which never have children.
pub fn parse_children(
    parent_layer: LayerType,
    parent_text: &str,
    response: &str,
    quotas: &QuotaConfig,
    ids: &mut IdGenerator,
) -> Option<ParsedChildren> {
    match parent_layer {
        LayerType::Summary => Some(parse_use_cases(response, quotas, ids)),
        LayerType::UseCase => Some(parse_stakeholders(response, quotas, ids)),
        LayerType::Stakeholder => Some(parse_harms(response, parent_text, quotas, ids)),
        LayerType::Harm => None,
    }
}
