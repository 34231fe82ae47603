#![forbid(unsafe_code)]

//! Headless render and animation engine for envision trees.
//!
//! The engine keeps a [`Scene`] of what is on screen and, for every draw, reconciles it
//! against a freshly computed [`envision_layout::TreeLayout`]. Each element carries an
//! explicit [`AnimationState`] record and is interpolated by [`Scene::advance`]; hosts
//! either drive the clock themselves or call [`Scene::settle`] to jump to the end.
//! [`svg::render_svg`] writes the current frame as a static SVG document.

pub mod easing;
pub mod error;
pub mod labels;
pub mod path;
pub mod scene;
pub mod svg;

mod util;

pub use error::{Error, Result};
pub use labels::{LayerLabel, layer_labels, placeholder_hint};
pub use path::LinkPath;
pub use scene::{
    AnimationState, ExitReason, Frame, PassEnd, PassReport, Scene, SceneEdge, SceneNode,
};
pub use svg::{SvgOptions, render_svg};
