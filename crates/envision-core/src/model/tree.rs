use super::{Candidate, EnvisionNode, HarmDetail, IdGenerator, LayerType, NodeId, NodeKind};
use crate::taxonomy::{
    HarmTheme, Relevance, Severity, StakeholderCategory, SubHarmCategory, UseCaseCategory,
};
use crate::{Error, Result};
use rand::Rng;
use rustc_hash::FxHashMap;

/// A node of the visible tree, in pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
}

/// Arena holding one session's tree.
///
/// Nodes removed by a delete or a regenerate stay in the arena with `deleted = true` until
/// [`Tree::purge`] is called for them, so the renderer can finish their exit transition.
#[derive(Debug, Clone)]
pub struct Tree {
    root: NodeId,
    nodes: FxHashMap<NodeId, EnvisionNode>,
    ids: IdGenerator,
}

impl Tree {
    pub fn new(summary: impl Into<String>) -> Self {
        Self::with_ids(summary, IdGenerator::new())
    }

    pub fn with_ids(summary: impl Into<String>, mut ids: IdGenerator) -> Self {
        let root = ids.next(LayerType::Summary);
        let mut nodes = FxHashMap::default();
        nodes.insert(
            root.clone(),
            EnvisionNode::new(root.clone(), summary, NodeKind::Summary),
        );
        Self { root, nodes, ids }
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn ids_mut(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Number of nodes in the arena, including deleted ones awaiting purge.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&EnvisionNode> {
        self.nodes.get(id)
    }

    pub fn get(&self, id: &NodeId) -> Result<&EnvisionNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::NodeNotFound { id: id.clone() })
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Result<&mut EnvisionNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound { id: id.clone() })
    }

    /// True when `id` is attached to the tree (present and not deleted).
    pub fn is_live(&self, id: &NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| !n.deleted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvisionNode> {
        self.nodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnvisionNode> {
        self.nodes.values_mut()
    }

    /// Pre-order walk of the whole attached tree (hidden subtrees included).
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = vec![self.root.clone()];
        out.extend(self.descendants(&self.root));
        out
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(id) {
            Some(n) => n.children.iter().rev().cloned().collect(),
            None => return out,
        };
        while let Some(cur) = stack.pop() {
            if let Some(n) = self.nodes.get(&cur) {
                stack.extend(n.children.iter().rev().cloned());
            }
            out.push(cur);
        }
        out
    }

    /// Pre-order walk that only descends into nodes with `show_children = true`.
    pub fn visible(&self) -> Vec<VisibleNode> {
        let mut out = Vec::new();
        let mut stack = vec![VisibleNode {
            id: self.root.clone(),
            parent: None,
            depth: 0,
        }];
        while let Some(cur) = stack.pop() {
            let shown = self.nodes.get(&cur.id).filter(|n| n.show_children);
            if let Some(n) = shown {
                for child in n.children.iter().rev() {
                    stack.push(VisibleNode {
                        id: child.clone(),
                        parent: Some(cur.id.clone()),
                        depth: cur.depth + 1,
                    });
                }
            }
            out.push(cur);
        }
        out
    }

    /// Children of `id` that are part of the visible tree.
    pub fn visible_children(&self, id: &NodeId) -> &[NodeId] {
        match self.nodes.get(id) {
            Some(n) if n.show_children => &n.children,
            _ => &[],
        }
    }

    /// Creates an empty node of the child layer and appends it to `parent`.
    pub fn create_empty_child<R: Rng + ?Sized>(
        &mut self,
        parent: &NodeId,
        rng: &mut R,
    ) -> Result<NodeId> {
        let layer = self.get(parent)?.layer();
        let (child_layer, kind) = match layer {
            LayerType::Summary => (
                LayerType::UseCase,
                NodeKind::UseCase {
                    category: UseCaseCategory::Intended,
                },
            ),
            LayerType::UseCase => (
                LayerType::Stakeholder,
                NodeKind::Stakeholder {
                    category: StakeholderCategory::Direct,
                    relevance: Relevance::Relevant,
                },
            ),
            LayerType::Stakeholder => (
                LayerType::Harm,
                NodeKind::Harm(HarmDetail {
                    category: placeholder_harm_category(rng),
                    severity: Severity::NotSevere,
                    user_rated_severity: 0,
                    validated: false,
                }),
            ),
            LayerType::Harm => {
                return Err(Error::UnsupportedOperation {
                    id: parent.clone(),
                    layer,
                    operation: "add child",
                });
            }
        };
        let id = self.ids.next(child_layer);
        self.attach(parent, EnvisionNode::new(id.clone(), "", kind))?;
        Ok(id)
    }

    /// Appends `node` as the last child of `parent`.
    pub fn attach(&mut self, parent: &NodeId, mut node: EnvisionNode) -> Result<()> {
        let parent_layer = self.get(parent)?.layer();
        if parent_layer.child_layer() != Some(node.layer()) {
            return Err(Error::UnsupportedOperation {
                id: parent.clone(),
                layer: parent_layer,
                operation: "attach child of another layer",
            });
        }
        node.parent = Some(parent.clone());
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        self.get_mut(parent)?.children.push(id);
        Ok(())
    }

    /// Installs one generation round under `parent`: the full pool becomes the candidate
    /// list and `selected` (pool members, in pool order) become the children.
    pub fn set_generated_children(
        &mut self,
        parent: &NodeId,
        selected: &[Candidate],
        candidates: Vec<Candidate>,
    ) -> Result<()> {
        let stale = {
            let p = self.get_mut(parent)?;
            p.candidates.clear();
            std::mem::take(&mut p.children)
        };
        for id in stale {
            self.mark_deleted(&id);
        }
        for c in selected {
            self.attach(parent, EnvisionNode::from_candidate(c))?;
        }
        self.get_mut(parent)?.candidates = candidates;
        Ok(())
    }

    /// Appends an empty slot to `parent` unless one of its children is already empty.
    /// Nodes without children are left alone.
    pub fn ensure_placeholder<R: Rng + ?Sized>(
        &mut self,
        parent: &NodeId,
        rng: &mut R,
    ) -> Result<Option<NodeId>> {
        let p = self.get(parent)?;
        if p.children.is_empty() || self.empty_child(parent).is_some() {
            return Ok(None);
        }
        self.create_empty_child(parent, rng).map(Some)
    }

    /// First child of `parent` without text.
    pub fn empty_child(&self, parent: &NodeId) -> Option<&NodeId> {
        let p = self.nodes.get(parent)?;
        p.children
            .iter()
            .find(|c| self.nodes.get(*c).is_some_and(EnvisionNode::is_empty))
    }

    /// Removes every empty sibling of `id`, leaving `id` as its parent's only empty slot.
    /// Returns the removed ids.
    pub fn drop_empty_siblings(&mut self, id: &NodeId) -> Result<Vec<NodeId>> {
        let Some(parent) = self.get(id)?.parent.clone() else {
            return Ok(Vec::new());
        };
        let empties: Vec<NodeId> = self
            .get(&parent)?
            .children
            .iter()
            .filter(|c| *c != id && self.nodes.get(*c).is_some_and(EnvisionNode::is_empty))
            .cloned()
            .collect();
        let mut removed = Vec::new();
        for e in &empties {
            removed.extend(self.remove(e)?);
        }
        Ok(removed)
    }

    /// Splices `id` out of its parent and marks it and its subtree deleted.
    /// Returns every marked id, `id` first.
    pub fn remove(&mut self, id: &NodeId) -> Result<Vec<NodeId>> {
        let node = self.get(id)?;
        let Some(parent) = node.parent.clone() else {
            return Err(Error::UnsupportedOperation {
                id: id.clone(),
                layer: node.layer(),
                operation: "delete",
            });
        };
        let p = self.get_mut(&parent)?;
        p.children.retain(|c| c != id);
        Ok(self.mark_deleted(id))
    }

    /// Drops every child and candidate of `id`, marking the old subtree deleted and
    /// hiding the node's children. Returns the marked descendants.
    pub fn clear_children(&mut self, id: &NodeId) -> Result<Vec<NodeId>> {
        let children = {
            let n = self.get_mut(id)?;
            n.candidates.clear();
            n.show_children = false;
            std::mem::take(&mut n.children)
        };
        let mut marked = Vec::new();
        for child in children {
            marked.extend(self.mark_deleted(&child));
        }
        Ok(marked)
    }

    fn mark_deleted(&mut self, id: &NodeId) -> Vec<NodeId> {
        let mut marked = vec![id.clone()];
        marked.extend(self.descendants(id));
        for m in &marked {
            if let Some(n) = self.nodes.get_mut(m) {
                n.deleted = true;
            }
        }
        marked
    }

    /// Removes a deleted node from the arena once its exit has finished.
    pub fn purge(&mut self, id: &NodeId) -> bool {
        if self.nodes.get(id).is_some_and(|n| n.deleted) {
            self.nodes.remove(id);
            return true;
        }
        false
    }

    pub fn deleted(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.values().filter(|n| n.deleted).map(|n| &n.id)
    }
}

/// Provisional category of an empty harm: the first sub-harm of a random theme.
pub fn placeholder_harm_category<R: Rng + ?Sized>(rng: &mut R) -> SubHarmCategory {
    let theme = HarmTheme::ALL[rng.gen_range(0..HarmTheme::ALL.len())];
    theme
        .sub_harms()
        .next()
        .unwrap_or(SubHarmCategory::EconomicLoss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn harm_candidate(ids: &mut IdGenerator, text: &str) -> Candidate {
        Candidate {
            id: ids.next(LayerType::Harm),
            text: text.to_string(),
            kind: NodeKind::Harm(HarmDetail {
                category: SubHarmCategory::EconomicLoss,
                severity: Severity::VerySevere,
                user_rated_severity: 0,
                validated: true,
            }),
        }
    }

    #[test]
    fn visible_walk_skips_hidden_subtrees() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = Tree::new("summary");
        let root = tree.root().clone();
        let uc = tree.create_empty_child(&root, &mut rng).unwrap();
        let sh = tree.create_empty_child(&uc, &mut rng).unwrap();
        tree.get_mut(&root).unwrap().show_children = true;

        let visible: Vec<_> = tree.visible().into_iter().map(|v| v.id).collect();
        assert_eq!(visible, vec![root.clone(), uc.clone()]);

        tree.get_mut(&uc).unwrap().show_children = true;
        let visible = tree.visible();
        assert_eq!(visible.len(), 3);
        assert_eq!(visible[2].id, sh);
        assert_eq!(visible[2].depth, 2);
        assert_eq!(visible[2].parent.as_ref(), Some(&uc));
    }

    #[test]
    fn placeholder_is_not_duplicated() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut tree = Tree::new("summary");
        let root = tree.root().clone();
        assert_eq!(tree.ensure_placeholder(&root, &mut rng).unwrap(), None);

        let uc = tree.create_empty_child(&root, &mut rng).unwrap();
        assert_eq!(tree.ensure_placeholder(&root, &mut rng).unwrap(), None);

        tree.get_mut(&uc).unwrap().text = "Diagnosis".to_string();
        let fresh = tree.ensure_placeholder(&root, &mut rng).unwrap();
        assert!(fresh.is_some());
        assert_eq!(tree.get(&root).unwrap().children.len(), 2);
    }

    #[test]
    fn generated_children_are_pool_members() {
        let mut tree = Tree::new("summary");
        let root = tree.root().clone();
        let mut rng = StdRng::seed_from_u64(3);
        let uc = tree.create_empty_child(&root, &mut rng).unwrap();
        let sh = tree.create_empty_child(&uc, &mut rng).unwrap();

        let ids = tree.ids_mut();
        let pool = vec![harm_candidate(ids, "a"), harm_candidate(ids, "b")];
        tree.set_generated_children(&sh, &pool[1..], pool.clone())
            .unwrap();

        let node = tree.get(&sh).unwrap();
        assert_eq!(node.children, vec![pool[1].id.clone()]);
        assert_eq!(node.candidates.len(), 2);
        assert_eq!(tree.get(&pool[1].id).unwrap().parent.as_ref(), Some(&sh));
    }

    #[test]
    fn harms_cannot_have_children() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = Tree::new("summary");
        let root = tree.root().clone();
        let uc = tree.create_empty_child(&root, &mut rng).unwrap();
        let sh = tree.create_empty_child(&uc, &mut rng).unwrap();
        let harm = tree.create_empty_child(&sh, &mut rng).unwrap();
        let err = tree.create_empty_child(&harm, &mut rng).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn purge_only_removes_deleted_nodes() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut tree = Tree::new("summary");
        let root = tree.root().clone();
        let uc = tree.create_empty_child(&root, &mut rng).unwrap();
        assert!(!tree.purge(&uc));
        tree.remove(&uc).unwrap();
        assert!(!tree.is_live(&uc));
        assert!(tree.purge(&uc));
        assert!(tree.node(&uc).is_none());
        assert!(!tree.purge(&root));
    }
}
