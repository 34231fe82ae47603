//! Confirmation gate for destructive actions.

use envision_core::{LayerType, NodeId};
use rustc_hash::FxHashSet;
use serde::Serialize;

/// Keys under which a host remembers "don't ask again".
pub mod action_key {
    pub const DELETION: &str = "deletion";
    pub const REGENERATE: &str = "regenerate";
    pub const REGENERATE_CHILDREN: &str = "regenerate-children";
}

/// Where the user's "skip this prompt" choices live. Owned by the host.
pub trait ConfirmationPreferences {
    fn skip_confirmation(&self, action_key: &str) -> bool;
    fn remember_skip(&mut self, action_key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    skipped: FxHashSet<String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipping(keys: &[&str]) -> Self {
        Self {
            skipped: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl ConfirmationPreferences for MemoryPreferences {
    fn skip_confirmation(&self, action_key: &str) -> bool {
        self.skipped.contains(action_key)
    }

    fn remember_skip(&mut self, action_key: &str) {
        self.skipped.insert(action_key.to_string());
    }
}

/// Dialog contents handed to the host. Answer with
/// [`crate::EnvisionSession::confirm`] or [`crate::EnvisionSession::dismiss`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationRequest {
    pub ticket: u64,
    pub header: String,
    pub message: String,
    pub confirm_text: &'static str,
    pub action_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GatedAction {
    Delete,
    Refresh,
    RegenerateChildren,
}

impl GatedAction {
    pub(crate) fn action_key(self) -> &'static str {
        match self {
            Self::Delete => action_key::DELETION,
            Self::Refresh => action_key::REGENERATE,
            Self::RegenerateChildren => action_key::REGENERATE_CHILDREN,
        }
    }

    fn confirm_text(self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Refresh | Self::RegenerateChildren => "Regenerate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingConfirmation {
    pub(crate) action: GatedAction,
    pub(crate) target: NodeId,
}

fn noun(layer: LayerType) -> &'static str {
    match layer {
        LayerType::Summary => "summary",
        LayerType::UseCase => "use case",
        LayerType::Stakeholder => "stakeholder",
        LayerType::Harm => "harm",
    }
}

fn title(layer: LayerType) -> &'static str {
    match layer {
        LayerType::Summary => "Summary",
        LayerType::UseCase => "Use Case",
        LayerType::Stakeholder => "Stakeholder",
        LayerType::Harm => "Harm",
    }
}

/// What else goes away with a node's subtree.
fn cascade(layer: LayerType) -> Option<&'static str> {
    match layer {
        LayerType::UseCase => Some("stakeholders and harms"),
        LayerType::Stakeholder => Some("harms"),
        LayerType::Summary | LayerType::Harm => None,
    }
}

pub(crate) fn build_request(
    ticket: u64,
    action: GatedAction,
    layer: LayerType,
    has_children: bool,
) -> ConfirmationRequest {
    let (header, mut message) = match action {
        GatedAction::Delete => (
            format!("Delete {}?", title(layer)),
            format!("Are you sure you want to delete this {}? ", noun(layer)),
        ),
        GatedAction::Refresh => (
            format!("Regenerate {}?", title(layer)),
            format!("Are you sure you want to regenerate this {}? ", noun(layer)),
        ),
        GatedAction::RegenerateChildren => {
            let children = noun(layer.child_layer().unwrap_or(layer));
            (
                format!("Regenerate {} Suggestions?", title(layer.child_layer().unwrap_or(layer))),
                format!(
                    "Are you sure you want to regenerate this {}'s {children} suggestions? ",
                    noun(layer)
                ),
            )
        }
    };

    match action {
        GatedAction::Delete | GatedAction::Refresh => {
            if let (true, Some(lost)) = (has_children, cascade(layer)) {
                message.push_str(&format!("It will also delete its {lost}. "));
            }
        }
        GatedAction::RegenerateChildren => match layer {
            LayerType::UseCase if has_children => {
                message.push_str("It will delete existing stakeholders and their harms. ")
            }
            _ => {
                let children = noun(layer.child_layer().unwrap_or(layer));
                message.push_str(&format!("It will delete existing {children}s. "));
            }
        },
    }
    message.push_str("This action cannot be undone.");

    ConfirmationRequest {
        ticket,
        header,
        message,
        confirm_text: action.confirm_text(),
        action_key: action.action_key(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_texts_mention_the_cascade() {
        let req = build_request(1, GatedAction::Delete, LayerType::UseCase, true);
        assert_eq!(req.header, "Delete Use Case?");
        assert_eq!(
            req.message,
            "Are you sure you want to delete this use case? \
It will also delete its stakeholders and harms. This action cannot be undone."
        );
        assert_eq!(req.action_key, "deletion");

        let req = build_request(2, GatedAction::Delete, LayerType::Harm, false);
        assert_eq!(
            req.message,
            "Are you sure you want to delete this harm? This action cannot be undone."
        );
    }

    #[test]
    fn regenerate_texts() {
        let req = build_request(3, GatedAction::Refresh, LayerType::Stakeholder, true);
        assert_eq!(req.header, "Regenerate Stakeholder?");
        assert_eq!(req.action_key, "regenerate");
        assert!(req.message.contains("It will also delete its harms."));

        let req = build_request(4, GatedAction::RegenerateChildren, LayerType::Stakeholder, true);
        assert_eq!(req.header, "Regenerate Harm Suggestions?");
        assert_eq!(
            req.message,
            "Are you sure you want to regenerate this stakeholder's harm suggestions? \
It will delete existing harms. This action cannot be undone."
        );
        assert_eq!(req.action_key, "regenerate-children");

        let req = build_request(5, GatedAction::RegenerateChildren, LayerType::UseCase, false);
        assert_eq!(req.header, "Regenerate Stakeholder Suggestions?");
        assert!(req.message.ends_with("It will delete existing stakeholders. This action cannot be undone."));
    }

    #[test]
    fn memory_preferences_remember_skips() {
        let mut prefs = MemoryPreferences::new();
        assert!(!prefs.skip_confirmation(action_key::DELETION));
        prefs.remember_skip(action_key::DELETION);
        assert!(prefs.skip_confirmation(action_key::DELETION));
        assert!(!prefs.skip_confirmation(action_key::REGENERATE));
    }
}
