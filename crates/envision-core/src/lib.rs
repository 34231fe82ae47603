#![forbid(unsafe_code)]

//! Envision tree model, response parser and generation coordinator (headless).
//!
//! The envision tree is a four-layer hierarchy (summary → use case → stakeholder → harm)
//! grown incrementally from generation-model responses. This crate holds the data side:
//! - the node model and its arena ([`model::Tree`]) with an injected id generator
//! - parsers that turn raw model text into candidate pools and quota-capped selections
//! - the [`generation::GenerationCoordinator`], which compiles prompts, consults the
//!   prompt cache, and routes responses back to their target nodes
//! - statistics and export
//!
//! Layout and rendering live in `envision-layout` and `envision-render`; the session
//! engine that ties them together is the `envision` crate.

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod stats;
pub mod taxonomy;

pub use cache::{MemoryPromptCache, PromptCache};
pub use config::EnvisionConfig;
pub use error::{Error, Result};
pub use generation::{
    Dispatch, GenerationCoordinator, GenerationOutcome, GenerationRequest, GenerationResponse,
};
pub use model::{
    Candidate, EnvisionNode, GenerationState, Geometry, HarmDetail, IdGenerator, LayerType,
    NodeId, NodeKind, Tree, VisibleNode,
};
pub use stats::{CategoryStats, StatsSink, compute_stats};

#[cfg(test)]
mod tests;
