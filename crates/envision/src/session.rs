//! The envision session: one tree, its generation traffic, and the mutation state machine.
//!
//! Everything runs on the caller's thread. Time only moves when the host calls
//! [`EnvisionSession::tick`] (or [`EnvisionSession::settle`] to jump to the end of all
//! pending animation), and generation responses only arrive through
//! [`EnvisionSession::handle_response`].

use crate::confirm::{
    ConfirmationPreferences, ConfirmationRequest, GatedAction, MemoryPreferences,
    PendingConfirmation, build_request,
};
use crate::draw::{DrawAction, DrawHandle, DrawJob, DrawScheduler, FollowUp};
use crate::service::{GenerationService, QueuedGenerationService};
use crate::{Error, Result};
use envision_core::export::{export_json, export_text};
use envision_core::{
    CategoryStats, Dispatch, EnvisionConfig, EnvisionNode, GenerationCoordinator,
    GenerationOutcome, GenerationResponse, GenerationState, LayerType, MemoryPromptCache, NodeId,
    StatsSink, Tree, compute_stats,
};
use envision_layout::{DeterministicNodeMeasurer, NodeMeasurer, TreeLayout, layout_tree};
use envision_render::{PassEnd, Scene};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Notifications for the host, drained with [`EnvisionSession::drain_events`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// The functionality summary for the user prompt is ready; pass it to
    /// [`EnvisionSession::start`].
    SummaryReady { text: String },
    ChildrenReady {
        parent: NodeId,
        layer: LayerType,
        selected: Vec<NodeId>,
    },
    GenerationFailed {
        target: Option<NodeId>,
        message: String,
    },
}

/// Result of a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// Children are being generated for the node.
    Generating { request_id: String },
    /// An empty slot is now the node's trailing child.
    Appended(NodeId),
    /// The action waits for the host's confirmation dialog.
    AwaitingConfirmation(ConfirmationRequest),
    /// Not applicable to this node right now.
    Ignored,
}

/// Per-node control state for a host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeControls {
    pub loading: bool,
    pub add_disabled: bool,
    pub failed: bool,
    pub has_shown_children: bool,
    pub has_hidden_children: bool,
}

pub struct EnvisionSession<S = QueuedGenerationService> {
    config: EnvisionConfig,
    service: S,
    coordinator: GenerationCoordinator,
    tree: Tree,
    started: bool,
    prompt: String,
    scene: Scene,
    layout: Option<TreeLayout>,
    scheduler: DrawScheduler,
    follow_ups: VecDeque<FollowUp>,
    measurer: Box<dyn NodeMeasurer>,
    preferences: Box<dyn ConfirmationPreferences>,
    stats_sink: Option<Box<dyn StatsSink>>,
    stats: CategoryStats,
    confirmations: IndexMap<u64, PendingConfirmation>,
    next_ticket: u64,
    events: Vec<SessionEvent>,
    rng: StdRng,
}

impl<S: GenerationService> EnvisionSession<S> {
    pub fn new(config: EnvisionConfig, service: S) -> Self {
        let coordinator = GenerationCoordinator::new(
            config.generation.clone(),
            config.quotas,
            MemoryPromptCache::new(),
        );
        let scene = Scene::new(config.layout, config.animation);
        Self {
            config,
            service,
            coordinator,
            tree: Tree::new(""),
            started: false,
            prompt: String::new(),
            scene,
            layout: None,
            scheduler: DrawScheduler::default(),
            follow_ups: VecDeque::new(),
            measurer: Box::new(DeterministicNodeMeasurer::default()),
            preferences: Box::new(MemoryPreferences::new()),
            stats_sink: None,
            stats: CategoryStats::default(),
            confirmations: IndexMap::new(),
            next_ticket: 0,
            events: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_cache(mut self, cache: MemoryPromptCache) -> Self {
        self.coordinator = GenerationCoordinator::new(
            self.config.generation.clone(),
            self.config.quotas,
            cache,
        );
        self
    }

    pub fn with_measurer(mut self, measurer: impl NodeMeasurer + 'static) -> Self {
        self.measurer = Box::new(measurer);
        self
    }

    pub fn with_preferences(mut self, preferences: impl ConfirmationPreferences + 'static) -> Self {
        self.preferences = Box::new(preferences);
        self
    }

    pub fn with_stats_sink(mut self, sink: impl StatsSink + 'static) -> Self {
        self.stats_sink = Some(Box::new(sink));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &EnvisionConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Layout of the most recent draw pass.
    pub fn layout(&self) -> Option<&TreeLayout> {
        self.layout.as_ref()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn cache(&self) -> &MemoryPromptCache {
        self.coordinator.cache()
    }

    pub fn stats(&self) -> &CategoryStats {
        &self.stats
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn pending_requests(&self) -> usize {
        self.coordinator.pending_count()
    }

    /// Serialized draws waiting for the running pass to settle.
    pub fn queued_draws(&self) -> usize {
        self.scheduler.queued()
    }

    /// No animation running, no draw queued, no generation outstanding.
    pub fn is_quiescent(&self) -> bool {
        !self.scene.is_animating()
            && self.scheduler.is_idle()
            && self.follow_ups.is_empty()
            && self.coordinator.pending_count() == 0
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resolves once every running and queued draw has settled.
    pub fn when_settled(&mut self) -> DrawHandle {
        self.scheduler.when_idle()
    }

    /// Records the user prompt quoted in exports without asking for a summary.
    pub fn set_prompt(&mut self, user_prompt: &str) {
        self.prompt = user_prompt.to_string();
    }

    /// Asks for a functionality summary of `user_prompt`. The answer comes back as
    /// [`SessionEvent::SummaryReady`].
    pub fn summarize(&mut self, user_prompt: &str) {
        self.prompt = user_prompt.to_string();
        let dispatch = self.coordinator.request_summary(user_prompt);
        self.route(dispatch);
    }

    /// Replaces the tree with a fresh root for `summary` and starts use-case generation.
    ///
    /// Requests still in flight for an earlier tree are forgotten; their responses will be
    /// ignored.
    pub fn start(&mut self, summary: &str) -> Result<DrawHandle> {
        self.coordinator.reset();
        self.scheduler.clear();
        self.scene.clear();
        self.follow_ups.clear();
        self.confirmations.clear();
        self.layout = None;

        self.tree = Tree::new(summary);
        let root = self.tree.root().clone();
        self.tree.get_mut(&root)?.show_children = true;
        self.started = true;
        tracing::info!(root = %root, "envision session started");

        let (job, handle) = DrawJob::new(root.clone(), DrawAction::Redraw);
        self.start_job(job)?;
        self.generate(&root)?;
        self.publish_stats();
        Ok(handle)
    }

    /// Feeds a generation response back into the session.
    pub fn handle_response(&mut self, response: GenerationResponse) -> Result<()> {
        match self.coordinator.handle_response(&mut self.tree, response)? {
            GenerationOutcome::Summary { text } => {
                self.events.push(SessionEvent::SummaryReady { text });
            }
            GenerationOutcome::Children {
                parent,
                layer,
                selected,
            } => self.apply_children(parent, layer, selected)?,
            GenerationOutcome::Failed { target, message } => {
                self.events
                    .push(SessionEvent::GenerationFailed { target, message });
            }
            GenerationOutcome::Ignored => {}
        }
        self.pump()
    }

    /// Advances running animations by `dt` and returns the passes that settled.
    pub fn tick(&mut self, dt: Duration) -> Result<Vec<PassEnd>> {
        let mut ended = Vec::new();
        if let Some(end) = self.scene.advance(dt) {
            ended.push(end.clone());
            self.complete_pass(end);
        }
        self.pump()?;
        Ok(ended)
    }

    /// Runs every running and queued draw, and their follow-ups, to completion.
    pub fn settle(&mut self) -> Result<()> {
        loop {
            if let Some(end) = self.scene.settle() {
                self.complete_pass(end);
            }
            self.pump()?;
            if !self.scene.is_animating() && self.scheduler.is_idle() && self.follow_ups.is_empty()
            {
                return Ok(());
            }
        }
    }

    /// Picks a new "<label>?" hint for every empty harm slot on screen. Hosts call this on
    /// a timer.
    pub fn rotate_placeholders(&mut self) {
        self.scene.rotate_placeholders(&mut self.rng);
    }

    /// Redraws the visible tree with `trigger` as the animation anchor.
    pub fn draw(&mut self, trigger: &NodeId) -> Result<DrawHandle> {
        self.ensure_started()?;
        let (job, handle) = DrawJob::new(trigger.clone(), DrawAction::Redraw);
        self.start_job(job)?;
        Ok(handle)
    }

    /// Toggles a node's children; nodes without children ignore clicks.
    pub fn click(&mut self, id: &NodeId) -> Result<MutationOutcome> {
        self.ensure_started()?;
        let node = self.live(id)?;
        if node.children.is_empty() {
            return Ok(MutationOutcome::Ignored);
        }
        let show = !node.show_children;
        self.tree.get_mut(id)?.show_children = show;
        tracing::debug!(node = %id, show, "toggling children");
        self.redraw(id)?;
        Ok(MutationOutcome::Applied)
    }

    /// The add control: generate when the node has no candidates yet, reveal hidden
    /// children, or append an empty slot to shown children.
    pub fn add(&mut self, id: &NodeId) -> Result<MutationOutcome> {
        self.ensure_started()?;
        let node = self.live(id)?;
        let layer = node.layer();
        if layer == LayerType::Harm || node.is_pending() {
            return Ok(MutationOutcome::Ignored);
        }
        if layer != LayerType::Summary && node.candidates.is_empty() {
            let request_id = self.generate(id)?;
            return Ok(MutationOutcome::Generating { request_id });
        }
        if !node.show_children && !node.children.is_empty() {
            self.tree.get_mut(id)?.show_children = true;
            self.redraw(id)?;
            return Ok(MutationOutcome::Applied);
        }

        let slot = match self.tree.empty_child(id).cloned() {
            Some(existing) => existing,
            None => self.tree.create_empty_child(id, &mut self.rng)?,
        };
        self.tree.get_mut(id)?.show_children = true;
        self.redraw(id)?;
        self.publish_stats();
        Ok(MutationOutcome::Appended(slot))
    }

    pub fn delete(&mut self, id: &NodeId) -> Result<MutationOutcome> {
        self.ensure_started()?;
        if self.live(id)?.parent.is_none() {
            return Ok(MutationOutcome::Ignored);
        }
        self.gate(GatedAction::Delete, id)
    }

    /// Swaps the node's content for an unused candidate of its parent. Empty nodes skip
    /// the confirmation.
    pub fn refresh(&mut self, id: &NodeId) -> Result<MutationOutcome> {
        self.ensure_started()?;
        let node = self.live(id)?;
        let Some(parent) = node.parent.clone() else {
            return Ok(MutationOutcome::Ignored);
        };
        if node.is_pending() {
            return Ok(MutationOutcome::Ignored);
        }
        let empty = node.is_empty();
        if self.tree.get(&parent)?.candidates.is_empty() {
            return Err(envision_core::Error::NoCandidates { id: parent }.into());
        }
        if empty {
            self.apply(GatedAction::Refresh, id)?;
            return Ok(MutationOutcome::Applied);
        }
        self.gate(GatedAction::Refresh, id)
    }

    /// Drops a use case's or stakeholder's children and candidates and generates anew.
    pub fn regenerate_children(&mut self, id: &NodeId) -> Result<MutationOutcome> {
        self.ensure_started()?;
        let node = self.live(id)?;
        let eligible = matches!(node.layer(), LayerType::UseCase | LayerType::Stakeholder);
        if !eligible || node.is_pending() {
            return Ok(MutationOutcome::Ignored);
        }
        self.gate(GatedAction::RegenerateChildren, id)
    }

    /// Applies a gated action the host's dialog accepted. With `remember`, later actions
    /// of the same kind skip the dialog.
    pub fn confirm(&mut self, ticket: u64, remember: bool) -> Result<MutationOutcome> {
        let Some(pending) = self.confirmations.shift_remove(&ticket) else {
            return Err(Error::UnknownConfirmation { ticket });
        };
        if remember {
            self.preferences.remember_skip(pending.action.action_key());
        }
        if !self.tree.is_live(&pending.target) {
            return Ok(MutationOutcome::Ignored);
        }
        self.apply(pending.action, &pending.target)?;
        Ok(MutationOutcome::Applied)
    }

    pub fn dismiss(&mut self, ticket: u64) -> Result<()> {
        match self.confirmations.shift_remove(&ticket) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownConfirmation { ticket }),
        }
    }

    /// Stores the user's severity rating (0 to 3) on a harm. Layout is unaffected.
    pub fn update_severity(&mut self, id: &NodeId, rating: u8) -> Result<()> {
        let node = self.tree.get_mut(id)?;
        let layer = node.layer();
        match node.harm_mut() {
            Some(harm) => {
                harm.user_rated_severity = rating.min(3);
                Ok(())
            }
            None => Err(envision_core::Error::UnsupportedOperation {
                id: id.clone(),
                layer,
                operation: "rate severity",
            }
            .into()),
        }
    }

    /// Replaces a node's text. Filling the last empty slot of a sibling set appends a
    /// fresh one.
    pub fn edit_text(&mut self, id: &NodeId, text: &str) -> Result<()> {
        self.ensure_started()?;
        self.live(id)?;
        let node = self.tree.get_mut(id)?;
        let was_empty = node.is_empty();
        node.text = text.to_string();
        let parent = node.parent.clone();

        match (was_empty, text.is_empty(), parent) {
            (true, false, Some(parent)) => {
                self.tree.ensure_placeholder(&parent, &mut self.rng)?;
            }
            (false, true, Some(_)) => {
                let removed = self.tree.drop_empty_siblings(id)?;
                tracing::debug!(node = %id, removed = removed.len(), "emptied node replaces the open slot");
            }
            _ => {}
        }
        self.redraw(id)?;
        self.publish_stats();
        Ok(())
    }

    pub fn controls(&self, id: &NodeId) -> Result<NodeControls> {
        let node = self.tree.get(id)?;
        let loading = node.is_pending();
        let has_children = !node.children.is_empty();
        Ok(NodeControls {
            loading,
            add_disabled: loading || node.layer() == LayerType::Harm,
            failed: matches!(node.generation, GenerationState::Failed { .. }),
            has_shown_children: has_children && node.show_children,
            has_hidden_children: has_children && !node.show_children,
        })
    }

    pub fn export_text(&self) -> String {
        export_text(&self.tree, &self.prompt)
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(export_json(&self.tree, &self.prompt)?)
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started {
            Ok(())
        } else {
            Err(Error::NotStarted)
        }
    }

    fn live(&self, id: &NodeId) -> Result<&EnvisionNode> {
        let node = self.tree.get(id)?;
        if node.deleted {
            return Err(envision_core::Error::NodeNotFound { id: id.clone() }.into());
        }
        Ok(node)
    }

    fn route(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Send(request) => self.service.dispatch(request),
            Dispatch::Replay { response, delay } => self.service.replay(response, delay),
        }
    }

    fn generate(&mut self, id: &NodeId) -> Result<String> {
        let dispatch = self.coordinator.request_children(&mut self.tree, id)?;
        let request_id = dispatch.request_id().to_string();
        self.route(dispatch);
        Ok(request_id)
    }

    fn gate(&mut self, action: GatedAction, id: &NodeId) -> Result<MutationOutcome> {
        if self.preferences.skip_confirmation(action.action_key()) {
            self.apply(action, id)?;
            return Ok(MutationOutcome::Applied);
        }
        let node = self.tree.get(id)?;
        let request = build_request(
            self.next_ticket,
            action,
            node.layer(),
            !node.children.is_empty(),
        );
        self.confirmations.insert(
            self.next_ticket,
            PendingConfirmation {
                action,
                target: id.clone(),
            },
        );
        self.next_ticket += 1;
        Ok(MutationOutcome::AwaitingConfirmation(request))
    }

    fn apply(&mut self, action: GatedAction, id: &NodeId) -> Result<()> {
        let parent = self.tree.get(id)?.parent.clone();
        let trigger = parent.unwrap_or_else(|| self.tree.root().clone());
        match action {
            GatedAction::Delete => {
                let removed = self.tree.remove(id)?;
                tracing::info!(node = %id, removed = removed.len(), "node deleted");
                self.redraw(&trigger)?;
            }
            GatedAction::Refresh => {
                self.tree.clear_children(id)?;
                let (job, _) = DrawJob::new(trigger, DrawAction::Redraw);
                self.start_job(job.then(FollowUp::SwapContent(id.clone())))?;
            }
            GatedAction::RegenerateChildren => {
                let cleared = self.tree.clear_children(id)?;
                tracing::info!(node = %id, cleared = cleared.len(), "regenerating children");
                let (job, _) = DrawJob::new(trigger, DrawAction::Redraw);
                self.start_job(job.then(FollowUp::GenerateChildren(id.clone())))?;
            }
        }
        self.publish_stats();
        self.pump()
    }

    fn apply_children(
        &mut self,
        parent: NodeId,
        layer: LayerType,
        selected: Vec<NodeId>,
    ) -> Result<()> {
        self.tree.create_empty_child(&parent, &mut self.rng)?;
        self.events.push(SessionEvent::ChildrenReady {
            parent: parent.clone(),
            layer,
            selected: selected.clone(),
        });

        match layer {
            LayerType::Harm => {
                let (job, _) = DrawJob::new(parent.clone(), DrawAction::ShowChildren(parent));
                if self.scheduler.must_wait() {
                    self.scheduler.enqueue(job);
                } else {
                    self.start_job(job)?;
                }
            }
            LayerType::Stakeholder => {
                let (job, _) =
                    DrawJob::new(parent.clone(), DrawAction::ShowChildren(parent.clone()));
                self.start_job(job)?;
                for id in &selected {
                    if self.tree.node(id).is_some_and(|n| !n.is_empty()) {
                        self.generate(id)?;
                    }
                }
            }
            LayerType::UseCase | LayerType::Summary => {
                let (job, _) = DrawJob::new(parent.clone(), DrawAction::ShowChildren(parent));
                self.start_job(job)?;
            }
        }
        self.publish_stats();
        Ok(())
    }

    fn redraw(&mut self, trigger: &NodeId) -> Result<()> {
        let (job, _) = DrawJob::new(trigger.clone(), DrawAction::Redraw);
        self.start_job(job)
    }

    /// Settles whatever is animating, applies the job's state change, lays out, and
    /// begins the job's pass.
    fn start_job(&mut self, job: DrawJob) -> Result<()> {
        if let Some(end) = self.scene.settle() {
            self.complete_pass(end);
        }

        if let DrawAction::ShowChildren(id) = &job.action {
            if let Ok(node) = self.tree.get_mut(id) {
                if !node.deleted && !node.children.is_empty() {
                    node.show_children = true;
                }
            }
        }

        let layout = layout_tree(&mut self.tree, self.measurer.as_ref(), &self.config.layout)?;
        let Some(anchor) = visible_anchor(&self.tree, &layout, &job.trigger) else {
            tracing::debug!(trigger = %job.trigger, "dropping draw without a visible anchor");
            return Ok(());
        };
        self.scene.begin_pass(&mut self.tree, &layout, &anchor)?;
        self.layout = Some(layout);
        self.scheduler.set_running(job);
        Ok(())
    }

    fn complete_pass(&mut self, end: PassEnd) {
        let stale: Vec<NodeId> = self
            .tree
            .deleted()
            .filter(|id| self.scene.node(id).is_none())
            .cloned()
            .collect();
        for id in &stale {
            self.tree.purge(id);
        }
        if let Some(follow_up) = self.scheduler.finish_running(end) {
            self.follow_ups.push_back(follow_up);
        }
    }

    /// Runs ready follow-ups and starts queued draws while nothing is animating.
    fn pump(&mut self) -> Result<()> {
        loop {
            if let Some(follow_up) = self.follow_ups.pop_front() {
                self.run_follow_up(follow_up)?;
                continue;
            }
            if !self.scene.is_animating() {
                if let Some(job) = self.scheduler.next_queued() {
                    self.start_job(job)?;
                    continue;
                }
            }
            break;
        }
        if !self.scene.is_animating() && self.scheduler.is_idle() {
            self.scheduler.notify_idle();
        }
        Ok(())
    }

    fn run_follow_up(&mut self, follow_up: FollowUp) -> Result<()> {
        match follow_up {
            FollowUp::GenerateChildren(id) => {
                let ready = self.tree.node(&id).is_some_and(|n| !n.deleted && !n.is_pending());
                if ready {
                    self.generate(&id)?;
                }
                Ok(())
            }
            FollowUp::SwapContent(id) => self.swap_content(&id),
        }
    }

    /// Second half of a refresh, once the cleared subtree has finished exiting.
    fn swap_content(&mut self, id: &NodeId) -> Result<()> {
        if !self.tree.is_live(id) {
            return Ok(());
        }
        let Some(parent) = self.tree.get(id)?.parent.clone() else {
            return Ok(());
        };

        let pick = {
            let p = self.tree.get(&parent)?;
            let shown: FxHashSet<&str> = p
                .children
                .iter()
                .filter_map(|c| self.tree.node(c))
                .map(|n| n.text.as_str())
                .collect();
            let unused: Vec<_> = p
                .candidates
                .iter()
                .filter(|c| !shown.contains(c.text.as_str()))
                .collect();
            if unused.is_empty() {
                p.candidates.first().cloned()
            } else {
                Some(unused[self.rng.gen_range(0..unused.len())].clone())
            }
        };
        let Some(pick) = pick else {
            return Err(envision_core::Error::NoCandidates { id: parent }.into());
        };

        let node = self.tree.get_mut(id)?;
        let rated = node.harm().map(|h| h.user_rated_severity);
        node.text = pick.text;
        node.kind = pick.kind;
        if let (Some(rated), Some(harm)) = (rated, node.harm_mut()) {
            harm.user_rated_severity = rated;
        }
        let layer = node.layer();
        tracing::info!(node = %id, "node content refreshed");

        self.tree.ensure_placeholder(&parent, &mut self.rng)?;
        self.redraw(&parent)?;
        if layer == LayerType::Stakeholder {
            self.generate(id)?;
        }
        self.publish_stats();
        Ok(())
    }

    fn publish_stats(&mut self) {
        self.stats = compute_stats(&self.tree);
        if let Some(sink) = self.stats_sink.as_mut() {
            sink.update_stats(&self.stats);
        }
    }
}

/// Nearest node on the path from `id` to the root that is part of `layout`.
fn visible_anchor(tree: &Tree, layout: &TreeLayout, id: &NodeId) -> Option<NodeId> {
    let mut cur = Some(id.clone());
    while let Some(c) = cur {
        if layout.position(&c).is_some() {
            return Some(c);
        }
        cur = tree.node(&c).and_then(|n| n.parent.clone());
    }
    None
}
