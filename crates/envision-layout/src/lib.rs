#![forbid(unsafe_code)]

//! Two-pass layout for envision trees (headless).
//!
//! 1. Measure: every visible node is sized through an injected [`NodeMeasurer`]; harm
//!    boxes use the wider `rect_long_width`.
//! 2. Position: a tidy tree layout where depth maps to the horizontal axis and sibling
//!    order to the vertical axis. Two neighbours need `h_a / 2 + h_b / 2 + gap` between
//!    their centres, where `gap` is `short_v_gap` for harm siblings sharing a stakeholder
//!    and `v_gap` otherwise.
//!
//! The layout writes sizes and positions back into the tree's node geometry and returns
//! a [`TreeLayout`] snapshot with per-layer bounding boxes.

pub mod error;
pub mod measure;
pub mod tidy;

pub use error::{Error, Result};
pub use measure::{DeterministicNodeMeasurer, NodeMeasurer, NodeSize};

use envision_core::config::LayoutConfig;
use envision_core::{LayerType, NodeId, Tree};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tidy::{TidyInput, tidy_breadth};

/// Axis-aligned extent of one layer's boxes. Starts out empty (inverted infinities).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerBounds {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Default for LayerBounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl LayerBounds {
    pub fn empty() -> Self {
        Self {
            x0: f64::INFINITY,
            y0: f64::INFINITY,
            x1: f64::NEG_INFINITY,
            y1: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    pub fn include(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.x0 = self.x0.min(x0);
        self.y0 = self.y0.min(y0);
        self.x1 = self.x1.max(x1);
        self.y1 = self.y1.max(y1);
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Computed placement of one visible node. `x`/`y` are the node's anchor centre; the box
/// spans `[x - rect_width / 2, x - rect_width / 2 + width]` horizontally so that wider
/// harm boxes grow to the right.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePosition {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub layer: LayerType,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodePosition {
    pub fn left(&self, config: &LayoutConfig) -> f64 {
        self.x - config.rect_width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.height / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeLayout {
    /// Visible nodes in pre-order.
    pub nodes: Vec<NodePosition>,
    /// One box per layer, indexed by [`LayerType::depth`].
    pub layer_bounds: [LayerBounds; 4],
    /// Deepest visible depth.
    pub height: usize,
}

impl TreeLayout {
    pub fn bounds(&self, layer: LayerType) -> &LayerBounds {
        &self.layer_bounds[layer.depth()]
    }

    pub fn position(&self, id: &NodeId) -> Option<&NodePosition> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Bounding box of every visible node.
    pub fn extent(&self) -> LayerBounds {
        let mut out = LayerBounds::empty();
        for b in self.layer_bounds.iter().filter(|b| !b.is_empty()) {
            out.include(b.x0, b.y0, b.x1, b.y1);
        }
        out
    }
}

/// Required centre-to-centre distance between two vertically adjacent nodes.
///
/// `None` heights mean "not measured yet" and fall back to `rect_height + v_gap`.
pub fn separation(
    config: &LayoutConfig,
    a: (Option<f64>, LayerType, Option<&NodeId>),
    b: (Option<f64>, LayerType, Option<&NodeId>),
) -> f64 {
    let (Some(ha), Some(hb)) = (a.0, b.0) else {
        return config.rect_height + config.v_gap;
    };
    let siblings = a.2.is_some() && a.2 == b.2;
    let gap = if a.1 == LayerType::Harm && b.1 == LayerType::Harm && siblings {
        config.short_v_gap
    } else {
        config.v_gap
    };
    ha / 2.0 + hb / 2.0 + gap
}

/// Measures and positions the visible tree, writing geometry back into `tree`.
pub fn layout_tree(
    tree: &mut Tree,
    measurer: &dyn NodeMeasurer,
    config: &LayoutConfig,
) -> Result<TreeLayout> {
    if tree.node(tree.root()).is_none() {
        return Err(Error::MissingRoot);
    }
    let visible = tree.visible();

    // Measure pass.
    let mut heights: Vec<Option<f64>> = Vec::with_capacity(visible.len());
    let mut layers = Vec::with_capacity(visible.len());
    for v in &visible {
        let node = tree.get_mut(&v.id)?;
        let layer = node.layer();
        let size = measurer.measure(node, config.box_width(layer));
        let measured = size.height.is_finite() && size.height > 0.0;
        node.geometry.width = config.box_width(layer);
        node.geometry.height = if measured { size.height } else { config.rect_height };
        node.geometry.measured = measured;
        heights.push(measured.then_some(size.height));
        layers.push(layer);
    }

    // Position pass.
    let index: FxHashMap<&NodeId, usize> =
        visible.iter().enumerate().map(|(i, v)| (&v.id, i)).collect();
    let mut inputs: Vec<TidyInput> = visible
        .iter()
        .map(|v| TidyInput {
            parent: v.parent.as_ref().and_then(|p| index.get(p).copied()),
            children: Vec::new(),
        })
        .collect();
    for i in 0..inputs.len() {
        if let Some(p) = inputs[i].parent {
            inputs[p].children.push(i);
        }
    }

    let sep = |a: usize, b: usize| {
        separation(
            config,
            (heights[a], layers[a], visible[a].parent.as_ref()),
            (heights[b], layers[b], visible[b].parent.as_ref()),
        )
    };
    let breadth = tidy_breadth(&inputs, 0, &sep);

    let column = config.rect_width + config.h_gap;
    let mut layer_bounds = [LayerBounds::empty(); 4];
    let mut nodes = Vec::with_capacity(visible.len());
    let mut height = 0;
    for (i, v) in visible.iter().enumerate() {
        let x = v.depth as f64 * column;
        let y = breadth[i];
        let node = tree.get_mut(&v.id)?;
        node.geometry.x = x;
        node.geometry.y = y;

        let g = node.geometry;
        let left = x - config.rect_width / 2.0;
        layer_bounds[layers[i].depth()].include(
            left,
            y - g.height / 2.0,
            left + g.width,
            y + g.height / 2.0,
        );
        height = height.max(v.depth);
        nodes.push(NodePosition {
            id: v.id.clone(),
            parent: v.parent.clone(),
            layer: layers[i],
            depth: v.depth,
            x,
            y,
            width: g.width,
            height: g.height,
        });
    }

    tracing::debug!(nodes = nodes.len(), height, "tree layout computed");
    Ok(TreeLayout {
        nodes,
        layer_bounds,
        height,
    })
}
