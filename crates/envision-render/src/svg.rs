//! Static SVG snapshot of a scene.
//!
//! The snapshot reflects each element's current frame, so rendering a settled scene gives
//! the final layout. It is meant for offline inspection and regression fixtures, not as
//! a styled product view.

use crate::scene::Scene;
use crate::util::{escape_xml_into, fmt_num, fmt_path_into};

const MARGIN: f64 = 40.0;
const LINE_HEIGHT: f64 = 16.0;

#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Characters per text line before wrapping inside a node box.
    pub wrap_chars: usize,
    pub font_size: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            wrap_chars: 28,
            font_size: 12.0,
        }
    }
}

pub fn render_svg(scene: &Scene, options: &SvgOptions) -> String {
    let cfg = scene.layout_config();
    let (x0, y0, x1, y1) = scene.extent().unwrap_or((0.0, 0.0, cfg.rect_width, cfg.rect_height));
    let label_room = cfg.label_padding + options.font_size;
    let (vx, vy) = (x0 - MARGIN, y0 - MARGIN - label_room);
    let (vw, vh) = (x1 - x0 + 2.0 * MARGIN, y1 - y0 + 2.0 * MARGIN + label_room);

    let mut out = String::with_capacity(4096);
    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg" class="envision-tree" viewBox=""#);
    for (i, v) in [vx, vy, vw, vh].into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        fmt_path_into(&mut out, v);
    }
    out.push_str(r#"">"#);

    out.push_str(r#"<g class="link-group">"#);
    for edge in scene.edges() {
        out.push_str(r#"<path class="link" fill="none" stroke="currentColor" d=""#);
        out.push_str(&edge.current.to_svg_path());
        if edge.opacity < 1.0 {
            out.push_str(r#"" opacity=""#);
            fmt_path_into(&mut out, edge.opacity);
        }
        out.push_str(r#""/>"#);
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="node-group">"#);
    let half = cfg.rect_width / 2.0;
    for node in scene.nodes() {
        out.push_str(r#"<g class="node-container node-"#);
        out.push_str(node.layer.as_str());
        out.push_str(r#"" data-id=""#);
        escape_xml_into(&mut out, node.id.as_str());
        if node.current.opacity < 1.0 {
            out.push_str(r#"" opacity=""#);
            fmt_path_into(&mut out, node.current.opacity);
        }
        out.push_str(r#""><rect x=""#);
        let left = node.current.x - half;
        let top = node.current.y - node.height / 2.0;
        fmt_path_into(&mut out, left);
        out.push_str(r#"" y=""#);
        fmt_path_into(&mut out, top);
        out.push_str(r#"" width=""#);
        fmt_path_into(&mut out, node.width);
        out.push_str(r#"" height=""#);
        fmt_path_into(&mut out, node.height);
        out.push_str(r#"" rx="4" fill="white" stroke="currentColor"/>"#);

        let (text, class) = match (&node.placeholder, node.text.is_empty()) {
            (Some(hint), true) => (hint.as_str(), "placeholder"),
            _ => (node.text.as_str(), "label"),
        };
        let lines = wrap_chars(text, options.wrap_chars);
        let first = node.current.y - (lines.len().saturating_sub(1) as f64) * LINE_HEIGHT / 2.0;
        for (i, line) in lines.iter().enumerate() {
            out.push_str(r#"<text class=""#);
            out.push_str(class);
            out.push_str(r#"" x=""#);
            fmt_path_into(&mut out, left + 10.0);
            out.push_str(r#"" y=""#);
            fmt_path_into(&mut out, first + i as f64 * LINE_HEIGHT);
            out.push_str(r#"" font-size=""#);
            fmt_path_into(&mut out, options.font_size);
            out.push_str(r#"" dominant-baseline="middle">"#);
            escape_xml_into(&mut out, line);
            out.push_str("</text>");
        }
        out.push_str("</g>");
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="annotation-group">"#);
    for label in scene.labels().iter().filter(|l| l.visible) {
        out.push_str(r#"<text class="layer-label layer-label-"#);
        out.push_str(label.layer.as_str());
        out.push_str(r#"" text-anchor="middle" x=""#);
        out.push_str(&fmt_num(label.x));
        out.push_str(r#"" y=""#);
        out.push_str(&fmt_num(label.y));
        out.push_str(r#"">"#);
        escape_xml_into(&mut out, label.text);
        out.push_str("</text>");
    }
    out.push_str("</g></svg>\n");
    out
}

/// Greedy word wrap on character counts.
fn wrap_chars(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.chars().count() + 1 + word.chars().count() > max {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() || lines.is_empty() {
        lines.push(cur);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_words_by_character_count() {
        assert_eq!(
            wrap_chars("one two three four", 9),
            vec!["one two".to_string(), "three".to_string(), "four".to_string()]
        );
        assert_eq!(wrap_chars("", 9), vec![String::new()]);
    }
}
