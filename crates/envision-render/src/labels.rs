//! Layer labels and placeholder hints.

use envision_core::LayerType;
use envision_core::config::LayoutConfig;
use envision_core::taxonomy::SubHarmCategory;
use envision_layout::TreeLayout;
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerLabel {
    pub layer: LayerType,
    pub text: &'static str,
    /// Horizontal centre of the layer box.
    pub x: f64,
    /// `label_padding` above the layer box.
    pub y: f64,
    pub visible: bool,
}

pub fn layer_title(layer: LayerType) -> &'static str {
    match layer {
        LayerType::Summary => "Functionality",
        LayerType::UseCase => "Use Cases",
        LayerType::Stakeholder => "Stakeholders",
        LayerType::Harm => "Harms",
    }
}

/// One label per layer. A label is visible while its layer has visible nodes; a hidden
/// label keeps its last position from `previous` so it fades out in place.
pub fn layer_labels(
    layout: &TreeLayout,
    config: &LayoutConfig,
    previous: &[LayerLabel],
) -> Vec<LayerLabel> {
    LayerType::ALL
        .into_iter()
        .map(|layer| {
            let bounds = layout.bounds(layer);
            if bounds.is_empty() {
                let (x, y) = previous
                    .iter()
                    .find(|l| l.layer == layer)
                    .map_or((0.0, 0.0), |l| (l.x, l.y));
                return LayerLabel {
                    layer,
                    text: layer_title(layer),
                    x,
                    y,
                    visible: false,
                };
            }
            LayerLabel {
                layer,
                text: layer_title(layer),
                x: bounds.center_x(),
                y: bounds.y0 - config.label_padding,
                visible: true,
            }
        })
        .collect()
}

/// "<short label>?" prompt shown in an empty harm box.
pub fn placeholder_hint(category: SubHarmCategory) -> String {
    format!("{}?", category.short_label())
}

pub fn random_placeholder_hint<R: Rng + ?Sized>(rng: &mut R) -> String {
    let category = SubHarmCategory::ALL[rng.gen_range(0..SubHarmCategory::ALL.len())];
    placeholder_hint(category)
}
