//! Horizontal link curves between node anchors.

use crate::util::fmt_path_into;
use envision_core::config::LayoutConfig;
use serde::Serialize;

/// A horizontal cubic link from a parent's right anchor to a child's left anchor.
///
/// Rendered as `M sx,sy C mx,sy mx,ty tx,ty` with `mx` halfway between the two anchors,
/// the same shape as d3's `linkHorizontal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkPath {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl LinkPath {
    /// Link between two node centres.
    pub fn between(source: (f64, f64), target: (f64, f64), config: &LayoutConfig) -> Self {
        let half = config.rect_width / 2.0;
        Self {
            sx: source.0 + half - config.link_head_offset,
            sy: source.1,
            tx: target.0 - half + config.link_head_offset,
            ty: target.1,
        }
    }

    /// Degenerate link with both ends on the node centred at `at`; used as the start of
    /// an entering edge and the end of a hiding one.
    pub fn collapsed(at: (f64, f64), config: &LayoutConfig) -> Self {
        Self::between(at, at, config)
    }

    pub fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            sx: lerp(self.sx, to.sx, t),
            sy: lerp(self.sy, to.sy, t),
            tx: lerp(self.tx, to.tx, t),
            ty: lerp(self.ty, to.ty, t),
        }
    }

    pub fn to_svg_path(&self) -> String {
        let mx = (self.sx + self.tx) / 2.0;
        let mut out = String::with_capacity(64);
        out.push('M');
        fmt_path_into(&mut out, self.sx);
        out.push(',');
        fmt_path_into(&mut out, self.sy);
        out.push('C');
        for (i, (x, y)) in [(mx, self.sy), (mx, self.ty), (self.tx, self.ty)]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                out.push(',');
            }
            fmt_path_into(&mut out, x);
            out.push(',');
            fmt_path_into(&mut out, y);
        }
        out
    }
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
