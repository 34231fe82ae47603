//! Node measurement capability.
//!
//! Node boxes have a fixed width per layer; their height depends on how the text wraps.
//! Hosts with a real rendering surface implement [`NodeMeasurer`]; tests and headless
//! tools use [`DeterministicNodeMeasurer`] or a closure.

use envision_core::EnvisionNode;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

pub trait NodeMeasurer {
    /// Rendered size of `node` laid out in a box `box_width` wide.
    fn measure(&self, node: &EnvisionNode, box_width: f64) -> NodeSize;
}

impl<F> NodeMeasurer for F
where
    F: Fn(&EnvisionNode, f64) -> NodeSize,
{
    fn measure(&self, node: &EnvisionNode, box_width: f64) -> NodeSize {
        self(node, box_width)
    }
}

/// Monospace approximation: greedy word wrap with a fixed advance per terminal column.
#[derive(Debug, Clone)]
pub struct DeterministicNodeMeasurer {
    pub char_width: f64,
    pub line_height: f64,
    pub padding: f64,
    /// Lower bound on the box height (room for the node's controls).
    pub min_height: f64,
}

impl Default for DeterministicNodeMeasurer {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 18.0,
            padding: 10.0,
            min_height: 40.0,
        }
    }
}

impl DeterministicNodeMeasurer {
    /// Wraps `text` into lines no wider than `max_width` pixels. Words longer than a line
    /// get a line of their own.
    pub fn wrap(&self, text: &str, max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut cur = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if cur.is_empty() {
                    word.to_string()
                } else {
                    format!("{cur} {word}")
                };
                if !cur.is_empty() && self.text_width(&candidate) > max_width {
                    lines.push(std::mem::replace(&mut cur, word.to_string()));
                } else {
                    cur = candidate;
                }
            }
            lines.push(cur);
        }
        lines
    }

    pub fn text_width(&self, text: &str) -> f64 {
        UnicodeWidthStr::width(text) as f64 * self.char_width
    }
}

impl NodeMeasurer for DeterministicNodeMeasurer {
    fn measure(&self, node: &EnvisionNode, box_width: f64) -> NodeSize {
        let inner = (box_width - 2.0 * self.padding).max(self.char_width);
        let lines = self.wrap(&node.text, inner).len().max(1);
        let height = lines as f64 * self.line_height + 2.0 * self.padding;
        NodeSize {
            width: box_width,
            height: height.max(self.min_height),
        }
    }
}
