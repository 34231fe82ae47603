//! Generation coordinator.
//!
//! The coordinator owns the request side of the generation channel. It compiles a prompt
//! per pending node, answers from the prompt cache when it can, tags each request with a
//! unique id, and routes responses back into the tree. The transport itself is the
//! host's business: the coordinator only produces [`Dispatch`] values and consumes
//! [`GenerationResponse`] values.

use crate::cache::{MemoryPromptCache, PromptCache};
use crate::config::{GenerationConfig, QuotaConfig};
use crate::model::{GenerationState, LayerType, NodeId, Tree};
use crate::parse::{parse_children, parse_summary};
use crate::prompt::{PromptContext, compile};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request sent to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub request_id: String,
    /// Layer of the nodes this request will produce.
    pub layer: LayerType,
    pub compiled_prompt: String,
    pub temperature: f64,
    /// Opaque echo; carries the target node id.
    pub context_detail: Option<String>,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum GenerationResponse {
    Finished {
        request_id: String,
        result_text: String,
        context_detail: Option<String>,
    },
    Failed {
        request_id: String,
        error_message: String,
    },
}

impl GenerationResponse {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Finished { request_id, .. } | Self::Failed { request_id, .. } => request_id,
        }
    }
}

/// What the host must do to get a response for a new request.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Send the request to the generation service.
    Send(GenerationRequest),
    /// Cache hit: deliver `response` back after `delay`.
    Replay {
        response: GenerationResponse,
        delay: Duration,
    },
}

impl Dispatch {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Send(req) => &req.request_id,
            Self::Replay { response, .. } => response.request_id(),
        }
    }
}

/// Effect of a routed response.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// A summary request finished.
    Summary { text: String },
    /// A node received one generation round of children.
    Children {
        parent: NodeId,
        layer: LayerType,
        selected: Vec<NodeId>,
    },
    /// The service reported an error for this request.
    Failed {
        target: Option<NodeId>,
        message: String,
    },
    /// Late, unknown or stale response; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Summary,
    Node(NodeId),
}

#[derive(Debug, Clone)]
struct Pending {
    target: Target,
    compiled_prompt: String,
    from_cache: bool,
}

pub struct GenerationCoordinator<C = MemoryPromptCache> {
    config: GenerationConfig,
    quotas: QuotaConfig,
    cache: C,
    counter: u64,
    pending: IndexMap<String, Pending>,
}

impl<C: PromptCache> GenerationCoordinator<C> {
    pub fn new(config: GenerationConfig, quotas: QuotaConfig, cache: C) -> Self {
        Self {
            config,
            quotas,
            cache,
            counter: 0,
            pending: IndexMap::new(),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    pub fn quotas(&self) -> &QuotaConfig {
        &self.quotas
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    /// Drops every outstanding request; their responses will be ignored.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(dropped = self.pending.len(), "discarding pending generation requests");
        }
        self.pending.clear();
    }

    fn next_request_id(&mut self, layer: LayerType) -> String {
        let id = format!("{}-{}-{}", self.config.namespace, layer.as_str(), self.counter);
        self.counter += 1;
        id
    }

    fn dispatch(
        &mut self,
        target: Target,
        layer: LayerType,
        compiled_prompt: String,
        stop_sequences: Vec<String>,
    ) -> Dispatch {
        let request_id = self.next_request_id(layer);
        let context_detail = match &target {
            Target::Summary => None,
            Target::Node(id) => Some(id.to_string()),
        };

        if let Some(cached) = self.cache.get(&compiled_prompt) {
            tracing::debug!(request = %request_id, layer = ?layer, "prompt cache hit");
            self.pending.insert(
                request_id.clone(),
                Pending {
                    target,
                    compiled_prompt,
                    from_cache: true,
                },
            );
            return Dispatch::Replay {
                response: GenerationResponse::Finished {
                    request_id,
                    result_text: cached,
                    context_detail,
                },
                delay: Duration::from_millis(self.config.cache_replay_delay_ms),
            };
        }

        tracing::debug!(request = %request_id, layer = ?layer, "dispatching generation request");
        self.pending.insert(
            request_id.clone(),
            Pending {
                target,
                compiled_prompt: compiled_prompt.clone(),
                from_cache: false,
            },
        );
        Dispatch::Send(GenerationRequest {
            request_id,
            layer,
            compiled_prompt,
            temperature: self.config.temperature,
            context_detail,
            stop_sequences,
        })
    }

    /// Requests a functionality summary for a fresh user prompt.
    pub fn request_summary(&mut self, user_prompt: &str) -> Dispatch {
        let template = &self.config.summary_prompt;
        let compiled = compile(
            template,
            &PromptContext {
                user_prompt: Some(user_prompt),
                ..Default::default()
            },
        );
        let stop = template.stop_sequences.clone();
        self.dispatch(Target::Summary, LayerType::Summary, compiled, stop)
    }

    /// Requests the children of `id`, marking the node pending.
    ///
    /// Fails when the node is unknown, is a harm, or already has a request in flight.
    pub fn request_children(&mut self, tree: &mut Tree, id: &NodeId) -> Result<Dispatch> {
        let node = tree.get(id)?;
        if node.deleted {
            return Err(Error::NodeNotFound { id: id.clone() });
        }
        let layer = node.layer();
        let Some(child_layer) = layer.child_layer() else {
            return Err(Error::UnsupportedOperation {
                id: id.clone(),
                layer,
                operation: "generate children",
            });
        };
        if node.is_pending() {
            return Err(Error::UnsupportedOperation {
                id: id.clone(),
                layer,
                operation: "generate while a request is pending",
            });
        }

        let functionality = tree.get(tree.root())?.text.clone();
        let parent_text = match &node.parent {
            Some(p) => Some(tree.get(p)?.text.clone()),
            None => None,
        };
        let own_text = node.text.clone();
        let ctx = match layer {
            LayerType::Summary => PromptContext {
                functionality: Some(&functionality),
                ..Default::default()
            },
            LayerType::UseCase => PromptContext {
                functionality: Some(&functionality),
                use_case: Some(&own_text),
                ..Default::default()
            },
            _ => PromptContext {
                functionality: Some(&functionality),
                use_case: parent_text.as_deref(),
                stakeholder: Some(&own_text),
                ..Default::default()
            },
        };

        let Some(template) = self.config.template_for_children_of(layer) else {
            return Err(Error::UnsupportedOperation {
                id: id.clone(),
                layer,
                operation: "generate children",
            });
        };
        let compiled = compile(template, &ctx);
        let stop = template.stop_sequences.clone();
        let dispatch = self.dispatch(Target::Node(id.clone()), child_layer, compiled, stop);
        tree.get_mut(id)?.generation = GenerationState::Pending {
            request_id: dispatch.request_id().to_string(),
        };
        Ok(dispatch)
    }

    /// Routes a response to its target.
    ///
    /// Responses for unknown requests, vanished nodes or superseded requests are ignored.
    /// Finished responses are parsed into the node's candidate pool and selected children;
    /// failures mark the node failed so the same user action can retry it.
    pub fn handle_response(
        &mut self,
        tree: &mut Tree,
        response: GenerationResponse,
    ) -> Result<GenerationOutcome> {
        let Some(pending) = self.pending.shift_remove(response.request_id()) else {
            tracing::debug!(request = %response.request_id(), "ignoring response for unknown request");
            return Ok(GenerationOutcome::Ignored);
        };

        match response {
            GenerationResponse::Failed {
                request_id,
                error_message,
            } => {
                tracing::warn!(request = %request_id, error = %error_message, "generation failed");
                let target = match pending.target {
                    Target::Summary => None,
                    Target::Node(id) => {
                        if !self.owns(tree, &id, &request_id) {
                            return Ok(GenerationOutcome::Ignored);
                        }
                        tree.get_mut(&id)?.generation = GenerationState::Failed {
                            message: error_message.clone(),
                        };
                        Some(id)
                    }
                };
                Ok(GenerationOutcome::Failed {
                    target,
                    message: error_message,
                })
            }
            GenerationResponse::Finished {
                request_id,
                result_text,
                context_detail,
            } => match pending.target {
                Target::Summary => {
                    let text = parse_summary(&result_text);
                    self.remember(pending.from_cache, pending.compiled_prompt, result_text);
                    Ok(GenerationOutcome::Summary { text })
                }
                Target::Node(id) => {
                    if context_detail.as_deref().is_some_and(|d| d != id.as_str()) {
                        tracing::debug!(request = %request_id, node = %id, "context echo does not match target");
                        return Ok(GenerationOutcome::Ignored);
                    }
                    if !self.owns(tree, &id, &request_id) {
                        return Ok(GenerationOutcome::Ignored);
                    }
                    let node = tree.get(&id)?;
                    let layer = node.layer();
                    let parent_text = node.text.clone();
                    let Some(parsed) = parse_children(
                        layer,
                        &parent_text,
                        &result_text,
                        &self.quotas,
                        tree.ids_mut(),
                    ) else {
                        return Err(Error::UnsupportedOperation {
                            id,
                            layer,
                            operation: "receive children",
                        });
                    };
                    let selected = parsed.selected.iter().map(|c| c.id.clone()).collect();
                    tree.set_generated_children(&id, &parsed.selected, parsed.candidates)?;
                    tree.get_mut(&id)?.generation = GenerationState::Idle;
                    self.remember(pending.from_cache, pending.compiled_prompt, result_text);
                    tracing::info!(node = %id, request = %request_id, "generation round applied");
                    Ok(GenerationOutcome::Children {
                        parent: id,
                        layer: layer.child_layer().unwrap_or(layer),
                        selected,
                    })
                }
            },
        }
    }

    /// True when `id` is live and still waiting on `request_id`.
    fn owns(&self, tree: &Tree, id: &NodeId, request_id: &str) -> bool {
        let owned = tree.node(id).is_some_and(|n| {
            !n.deleted
                && matches!(&n.generation, GenerationState::Pending { request_id: r } if r == request_id)
        });
        if !owned {
            tracing::debug!(request = %request_id, node = %id, "dropping response for stale target");
        }
        owned
    }

    fn remember(&mut self, from_cache: bool, compiled_prompt: String, result_text: String) {
        if !from_cache {
            self.cache.put(compiled_prompt, result_text);
        }
    }
}
