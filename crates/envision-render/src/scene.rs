//! Keyed scene reconciliation.
//!
//! A [`Scene`] holds what is currently on screen. Each draw pass diffs the newly laid
//! out visible tree against it, by stable node id (edges by `"<source>-<target>"`),
//! and gives every element an [`AnimationState`] plus a start and end [`Frame`]:
//!
//! - entering nodes start at the trigger node's previous position; harms also fade in
//! - updating nodes move from where they are now to their new position
//! - nodes hidden by a collapse move into the trigger node before removal
//! - deleted nodes fade out in place
//!
//! A pass runs for the configured duration under cubic in-out easing. Only one pass
//! runs at a time: beginning a new pass while one is animating first settles the
//! running one at its end state.

use crate::easing::cubic_in_out;
use crate::labels::{LayerLabel, layer_labels, placeholder_hint, random_placeholder_hint};
use crate::path::{LinkPath, lerp};
use crate::{Error, Result};
use envision_core::config::{AnimationConfig, LayoutConfig};
use envision_core::{LayerType, NodeId, Tree};
use envision_layout::{NodePosition, TreeLayout};
use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitReason {
    /// An ancestor collapsed; the element retracts into the trigger node.
    Hide,
    /// The node was deleted; the element fades out where it stands.
    Delete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum AnimationState {
    #[default]
    Idle,
    Entering,
    Updating,
    Exiting(ExitReason),
}

/// Animated visual state of a node: centre position and opacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub opacity: f64,
}

impl Frame {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, opacity: 1.0 }
    }

    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            x: lerp(self.x, to.x, t),
            y: lerp(self.y, to.y, t),
            opacity: lerp(self.opacity, to.opacity, t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub layer: LayerType,
    pub depth: usize,
    pub text: String,
    pub width: f64,
    pub height: f64,
    /// Hint shown inside an empty harm box.
    pub placeholder: Option<String>,
    pub state: AnimationState,
    pub from: Frame,
    pub to: Frame,
    pub current: Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub state: AnimationState,
    pub from: LinkPath,
    pub to: LinkPath,
    pub current: LinkPath,
    pub from_opacity: f64,
    pub to_opacity: f64,
    pub opacity: f64,
}

impl SceneEdge {
    pub fn key(source: &NodeId, target: &NodeId) -> String {
        format!("{source}-{target}")
    }
}

/// What a pass started with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub entered: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub exiting: Vec<(NodeId, ExitReason)>,
}

/// What a pass ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassEnd {
    pub pass: u64,
    pub trigger: NodeId,
    /// Nodes whose exit finished and that left the scene.
    pub removed: Vec<NodeId>,
    /// The subset of `removed` that exited because it was deleted; the tree can purge
    /// these now.
    pub deleted: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct ActivePass {
    number: u64,
    trigger: NodeId,
    elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Scene {
    layout: LayoutConfig,
    duration: Duration,
    nodes: IndexMap<NodeId, SceneNode>,
    edges: IndexMap<String, SceneEdge>,
    labels: Vec<LayerLabel>,
    active: Option<ActivePass>,
    passes: u64,
}

impl Scene {
    pub fn new(layout: LayoutConfig, animation: AnimationConfig) -> Self {
        Self {
            layout,
            duration: Duration::from_millis(animation.duration_ms),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            labels: Vec::new(),
            active: None,
            passes: 0,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    pub fn node(&self, id: &NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &SceneEdge> {
        self.edges.values()
    }

    pub fn edge(&self, source: &NodeId, target: &NodeId) -> Option<&SceneEdge> {
        self.edges.get(&SceneEdge::key(source, target))
    }

    pub fn labels(&self) -> &[LayerLabel] {
        &self.labels
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// Number of passes begun so far.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Drops everything on screen; used when the session starts a new tree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.labels.clear();
        self.active = None;
    }

    /// Starts a pass that animates the scene towards `layout`.
    ///
    /// `trigger` is the node whose change caused the redraw; it anchors entering and
    /// hiding elements and must be part of `layout`. Once the pass has been set up, every
    /// visible node's current position is recorded as its previous position in `tree`.
    pub fn begin_pass(
        &mut self,
        tree: &mut Tree,
        layout: &TreeLayout,
        trigger: &NodeId,
    ) -> Result<PassReport> {
        let Some(anchor) = layout.position(trigger) else {
            return Err(Error::UnknownTrigger {
                id: trigger.clone(),
            });
        };
        if let Some(end) = self.settle() {
            tracing::debug!(pass = end.pass, "interrupting running pass");
        }

        let origin = tree
            .node(trigger)
            .map(|n| n.geometry.previous_or_current())
            .unwrap_or((anchor.x, anchor.y));
        let destination = (anchor.x, anchor.y);

        let mut report = PassReport::default();
        self.reconcile_nodes(tree, layout, origin, destination, &mut report);
        self.reconcile_edges(tree, layout, origin, destination);
        self.labels = layer_labels(layout, &self.layout, &self.labels);

        for pos in &layout.nodes {
            if let Ok(node) = tree.get_mut(&pos.id) {
                node.geometry.x_previous = Some(pos.x);
                node.geometry.y_previous = Some(pos.y);
            }
        }

        self.passes += 1;
        self.active = Some(ActivePass {
            number: self.passes,
            trigger: trigger.clone(),
            elapsed: Duration::ZERO,
        });
        tracing::debug!(
            pass = self.passes,
            trigger = %trigger,
            entered = report.entered.len(),
            updated = report.updated.len(),
            exiting = report.exiting.len(),
            "draw pass started"
        );
        Ok(report)
    }

    fn reconcile_nodes(
        &mut self,
        tree: &Tree,
        layout: &TreeLayout,
        origin: (f64, f64),
        destination: (f64, f64),
        report: &mut PassReport,
    ) {
        let mut next: IndexMap<NodeId, SceneNode> = IndexMap::with_capacity(layout.nodes.len());
        for pos in &layout.nodes {
            let (text, placeholder) = match tree.node(&pos.id) {
                Some(n) => {
                    let hint = match (n.is_empty(), n.harm()) {
                        (true, Some(h)) => Some(placeholder_hint(h.category)),
                        _ => None,
                    };
                    (n.text.clone(), hint)
                }
                None => (String::new(), None),
            };
            let to = Frame::at(pos.x, pos.y);
            let node = match self.nodes.shift_remove(&pos.id) {
                Some(prev) => {
                    report.updated.push(pos.id.clone());
                    SceneNode {
                        text,
                        placeholder: prev.placeholder.filter(|_| placeholder.is_some()).or(placeholder),
                        state: AnimationState::Updating,
                        from: prev.current,
                        to,
                        ..scene_node(pos, prev.current)
                    }
                }
                None => {
                    report.entered.push(pos.id.clone());
                    let from = match &pos.parent {
                        Some(_) => Frame {
                            x: origin.0,
                            y: origin.1,
                            opacity: if pos.layer == LayerType::Harm { 0.0 } else { 1.0 },
                        },
                        None => to,
                    };
                    SceneNode {
                        text,
                        placeholder,
                        state: AnimationState::Entering,
                        from,
                        to,
                        ..scene_node(pos, from)
                    }
                }
            };
            next.insert(pos.id.clone(), node);
        }

        // Whatever is left is leaving the screen.
        for (id, mut node) in std::mem::take(&mut self.nodes) {
            if node.parent.is_none() {
                continue;
            }
            let reason = exit_reason(tree, &id);
            let to = match reason {
                ExitReason::Hide => Frame {
                    x: destination.0,
                    y: destination.1,
                    opacity: if node.layer == LayerType::Harm { 0.0 } else { 1.0 },
                },
                ExitReason::Delete => Frame {
                    opacity: 0.0,
                    ..node.current
                },
            };
            node.state = AnimationState::Exiting(reason);
            node.from = node.current;
            node.to = to;
            report.exiting.push((id.clone(), reason));
            next.insert(id, node);
        }
        self.nodes = next;
    }

    fn reconcile_edges(
        &mut self,
        tree: &Tree,
        layout: &TreeLayout,
        origin: (f64, f64),
        destination: (f64, f64),
    ) {
        let mut next: IndexMap<String, SceneEdge> = IndexMap::with_capacity(layout.nodes.len());
        for pos in &layout.nodes {
            let Some(parent) = pos.parent.as_ref().and_then(|p| layout.position(p)) else {
                continue;
            };
            let key = SceneEdge::key(&parent.id, &pos.id);
            let to = LinkPath::between((parent.x, parent.y), (pos.x, pos.y), &self.layout);
            let edge = match self.edges.shift_remove(&key) {
                Some(prev) => SceneEdge {
                    state: AnimationState::Updating,
                    from: prev.current,
                    to,
                    from_opacity: prev.opacity,
                    to_opacity: 1.0,
                    ..prev
                },
                None => {
                    let from = LinkPath::collapsed(origin, &self.layout);
                    SceneEdge {
                        source: parent.id.clone(),
                        target: pos.id.clone(),
                        state: AnimationState::Entering,
                        from,
                        to,
                        current: from,
                        from_opacity: 1.0,
                        to_opacity: 1.0,
                        opacity: 1.0,
                    }
                }
            };
            next.insert(key, edge);
        }

        for (key, mut edge) in std::mem::take(&mut self.edges) {
            let reason = exit_reason(tree, &edge.target);
            edge.state = AnimationState::Exiting(reason);
            edge.from = edge.current;
            edge.from_opacity = edge.opacity;
            match reason {
                ExitReason::Hide => {
                    edge.to = LinkPath::collapsed(destination, &self.layout);
                    edge.to_opacity = edge.opacity;
                }
                ExitReason::Delete => {
                    edge.to = edge.current;
                    edge.to_opacity = 0.0;
                }
            }
            next.insert(key, edge);
        }
        self.edges = next;
    }

    /// Advances the running pass by `dt`. Returns the pass summary when it completes.
    pub fn advance(&mut self, dt: Duration) -> Option<PassEnd> {
        let active = self.active.as_mut()?;
        active.elapsed += dt;
        if active.elapsed >= self.duration {
            return self.settle();
        }
        let t = cubic_in_out(active.elapsed.as_secs_f64() / self.duration.as_secs_f64());
        for node in self.nodes.values_mut() {
            node.current = node.from.lerp(&node.to, t);
        }
        for edge in self.edges.values_mut() {
            edge.current = edge.from.lerp(&edge.to, t);
            edge.opacity = lerp(edge.from_opacity, edge.to_opacity, t);
        }
        None
    }

    /// Jumps the running pass to its end state. `None` when nothing is animating.
    pub fn settle(&mut self) -> Option<PassEnd> {
        let active = self.active.take()?;
        let mut removed = Vec::new();
        let mut deleted = Vec::new();
        self.nodes.retain(|id, node| {
            if let AnimationState::Exiting(reason) = node.state {
                if reason == ExitReason::Delete {
                    deleted.push(id.clone());
                }
                removed.push(id.clone());
                return false;
            }
            node.current = node.to;
            node.from = node.to;
            node.state = AnimationState::Idle;
            true
        });
        self.edges.retain(|_, edge| {
            if matches!(edge.state, AnimationState::Exiting(_)) {
                return false;
            }
            edge.current = edge.to;
            edge.from = edge.to;
            edge.opacity = edge.to_opacity;
            edge.from_opacity = edge.to_opacity;
            edge.state = AnimationState::Idle;
            true
        });
        tracing::debug!(pass = active.number, removed = removed.len(), "draw pass settled");
        Some(PassEnd {
            pass: active.number,
            trigger: active.trigger,
            removed,
            deleted,
        })
    }

    /// Gives every empty harm box a fresh random hint.
    pub fn rotate_placeholders<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for node in self.nodes.values_mut() {
            if node.placeholder.is_some() {
                node.placeholder = Some(random_placeholder_hint(rng));
            }
        }
    }

    /// Bounding box of every node's current frame as `(x0, y0, x1, y1)`.
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let half = self.layout.rect_width / 2.0;
        self.nodes.values().fold(None, |acc, n| {
            let x0 = n.current.x - half;
            let y0 = n.current.y - n.height / 2.0;
            let (x1, y1) = (x0 + n.width, y0 + n.height);
            Some(match acc {
                None => (x0, y0, x1, y1),
                Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
            })
        })
    }
}

fn scene_node(pos: &NodePosition, current: Frame) -> SceneNode {
    SceneNode {
        id: pos.id.clone(),
        parent: pos.parent.clone(),
        layer: pos.layer,
        depth: pos.depth,
        text: String::new(),
        width: pos.width,
        height: pos.height,
        placeholder: None,
        state: AnimationState::Idle,
        from: current,
        to: current,
        current,
    }
}

/// A node leaving the visible set was deleted when the tree no longer holds it live.
fn exit_reason(tree: &Tree, id: &NodeId) -> ExitReason {
    if tree.is_live(id) {
        ExitReason::Hide
    } else {
        ExitReason::Delete
    }
}
