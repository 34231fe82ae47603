#![forbid(unsafe_code)]

//! `envision` is a headless engine for harm-envisioning trees.
//!
//! A tree starts from a one-sentence functionality summary and grows, one generation round
//! at a time, into use cases, the stakeholders each use case affects, and the harms each
//! stakeholder may suffer. [`EnvisionSession`] owns the tree and drives everything else:
//! - generation requests go out through a [`GenerationService`] and come back through
//!   [`EnvisionSession::handle_response`]
//! - every structural change lays the visible tree out again and starts an animated pass
//!   in the render scene; harm insertions are serialized so passes never overlap
//! - destructive actions go through a confirmation gate the host answers
//!
//! The data model is re-exported at the crate root; layout and rendering are available as
//! [`layout`] and [`render`].

pub mod confirm;
pub mod error;
pub mod service;
pub mod session;

mod draw;

pub use envision_core::*;
pub use envision_layout as layout;
pub use envision_render as render;

pub use confirm::{ConfirmationPreferences, ConfirmationRequest, MemoryPreferences, action_key};
pub use draw::DrawHandle;
pub use error::{Error, Result};
pub use service::{GenerationService, QueuedGenerationService};
pub use session::{EnvisionSession, MutationOutcome, NodeControls, SessionEvent};
