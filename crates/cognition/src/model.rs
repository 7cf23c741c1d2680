//! Model - the cognitive agent
//!
//! Owns the node arena, one network and one STM per modality, the resource
//! clocks and the learning RNG. Every public operation is either a pure
//! query or runs to completion: gated operations that find their resource
//! busy are refused before touching anything.
//!
//! Effects of an operation are stamped at the completion time of the step
//! that produced them, so a node created by a discrimination starting at
//! `t` exists from `t + discrimination_time` on.
//!
//! Multi-step operations run atomically: if a later step fails, the
//! earlier steps are undone and observers hear nothing.

use chrest_core::{
    ConfigError, DomainSpecifics, GenericDomain, Modality, ModalityMap, ModelConfig, Pattern, Time,
    VersionError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{Resource, ResourceBusy, ResourceClocks};
use crate::events::{AuditRecord, AuditSink, Change, ModelEvent, ModelObserver};
use crate::network::{NetworkError, Network, NodeArena};
use crate::node::{Link, Node, NodeError, NodeId};
use crate::stm::Stm;

/// Model operation errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    ResourceBusy(#[from] ResourceBusy),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    History(#[from] VersionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("nothing left to learn for node {0}")]
    NothingToLearn(NodeId),

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
}

impl ModelError {
    /// Refusals that leave the model untouched and may be retried later
    pub fn is_recoverable(&self) -> bool {
        match self {
            ModelError::ResourceBusy(_) | ModelError::NothingToLearn(_) => true,
            ModelError::Node(e) => e.is_structural(),
            ModelError::Network(_) => true,
            _ => false,
        }
    }

    /// Learning attempts that the network's shape rules out
    pub(crate) fn is_learning_refusal(&self) -> bool {
        match self {
            ModelError::NothingToLearn(_) | ModelError::Network(_) => true,
            ModelError::Node(e) => e.is_structural(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Learning activity of one modality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LearningCounters {
    pub discriminations: u64,
    pub familiarisations: u64,
    pub primitives: u64,
    pub semantic_links: u64,
    pub templates: u64,
}

/// Per-modality state
#[derive(Debug, Clone)]
pub(crate) struct ModalityState {
    pub(crate) network: Network,
    pub(crate) stm: Stm,
    pub(crate) counters: LearningCounters,
}

/// Cross-modal association implied by a pair of modalities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CrossModal {
    Production { visual: NodeId, action: NodeId },
    Naming { visual: NodeId, verbal: NodeId },
}

/// A CHREST-style learning agent
pub struct Model {
    pub(crate) config: ModelConfig,
    pub(crate) domain: Box<dyn DomainSpecifics>,
    pub(crate) created_at: Time,
    pub(crate) arena: NodeArena,
    pub(crate) modalities: ModalityMap<ModalityState>,
    pub(crate) clocks: ResourceClocks,
    pub(crate) rng: StdRng,
    observers: Vec<Box<dyn ModelObserver>>,
    audit: Option<Box<dyn AuditSink>>,
    pending: Vec<ModelEvent>,
    /// Originals of the nodes changed by the running atomic operation
    touched: Option<Vec<Node>>,
}

/// State an atomic operation restores when it fails
struct Checkpoint {
    nodes: usize,
    counters: ModalityMap<LearningCounters>,
    clocks: ResourceClocks,
    rng: StdRng,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("created_at", &self.created_at)
            .field("domain", &self.domain)
            .field("nodes", &self.arena.len())
            .field("clocks", &self.clocks)
            .field("observers", &self.observers.len())
            .field("audited", &self.audit.is_some())
            .finish()
    }
}

fn fresh_memory(
    config: &ModelConfig,
    time: Time,
) -> (NodeArena, ModalityMap<ModalityState>) {
    let mut arena = NodeArena::new();
    let modalities = ModalityMap::from_fn(|modality| ModalityState {
        network: Network::create(&mut arena, modality, time),
        stm: Stm::new(modality, config.stm_capacity.get(modality), time),
        counters: LearningCounters::default(),
    });
    (arena, modalities)
}

impl Model {
    /// Create a model with the generic domain
    pub fn new(config: ModelConfig, time: Time) -> Result<Self> {
        Self::with_domain(config, Box::new(GenericDomain), time)
    }

    pub fn with_domain(
        config: ModelConfig,
        domain: Box<dyn DomainSpecifics>,
        time: Time,
    ) -> Result<Self> {
        config.validate()?;
        let (arena, modalities) = fresh_memory(&config, time);
        let rng = StdRng::seed_from_u64(config.seed);

        info!(
            "Created model at {} ({:?} domain, rho {})",
            time, domain, config.rho
        );

        Ok(Self {
            config,
            domain,
            created_at: time,
            arena,
            modalities,
            clocks: ResourceClocks::new(time),
            rng,
            observers: Vec::new(),
            audit: None,
            pending: Vec::new(),
            touched: None,
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn ModelObserver>) {
        self.observers.push(observer);
    }

    /// Install (or remove, with `None`) the audit sink
    pub fn set_audit_sink(&mut self, sink: Option<Box<dyn AuditSink>>) {
        self.audit = sink;
    }

    /// Forget everything learned; the model behaves as if created at `time`
    pub fn reset(&mut self, time: Time) {
        let (arena, modalities) = fresh_memory(&self.config, time);
        self.arena = arena;
        self.modalities = modalities;
        self.clocks.reset(time);
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.created_at = time;

        info!("Model reset at {}", time);
        self.emit(time, Change::Reset);
        self.commit(AuditRecord::new(time, "reset", "", "cleared all memory", ""));
    }

    // ===== Accessors =====

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn created_at(&self) -> Time {
        self.created_at
    }

    pub fn clocks(&self) -> &ResourceClocks {
        &self.clocks
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn root(&self, modality: Modality) -> NodeId {
        self.modalities[modality].network.root()
    }

    pub fn network(&self, modality: Modality) -> &Network {
        &self.modalities[modality].network
    }

    pub fn stm(&self, modality: Modality) -> &Stm {
        &self.modalities[modality].stm
    }

    pub fn counters(&self, modality: Modality) -> LearningCounters {
        self.modalities[modality].counters
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> Result<&Node> {
        self.arena.get(id).ok_or(ModelError::UnknownNode(id))
    }

    /// Mutable access; inside an atomic operation the node's first
    /// original is kept so the operation can be undone
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        if let (Some(touched), Some(node)) = (self.touched.as_mut(), self.arena.get(id)) {
            if !touched.iter().any(|original| original.id() == id) {
                touched.push(node.clone());
            }
        }
        self.arena.get_mut(id).ok_or(ModelError::UnknownNode(id))
    }

    pub(crate) fn is_root(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(Node::is_root)
    }

    /// Image of `id` at `time`, empty when the node did not exist yet
    pub(crate) fn image_of(&self, id: NodeId, time: Time) -> Result<Pattern> {
        let node = self.node_ref(id)?;
        Ok(node
            .image_at(time)
            .cloned()
            .unwrap_or_else(|| Pattern::new(node.modality())))
    }

    /// Whether `id` is a learned node whose image covers `pattern`
    pub(crate) fn knows(&self, id: NodeId, pattern: &Pattern, time: Time) -> bool {
        match self.arena.get(id) {
            Some(node) if !node.is_root() => node
                .image_at(time)
                .is_some_and(|image| image.matches(pattern)),
            _ => false,
        }
    }

    /// Domain form of an input; stored chunks are only ever compared
    /// against this form
    pub(crate) fn normalise(&self, pattern: &Pattern) -> Pattern {
        self.domain.normalise(pattern)
    }

    // ===== Recognition =====

    /// Node `pattern` sorts to at `time`, without any side effect
    pub fn recognise_at(&self, pattern: &Pattern, time: Time) -> NodeId {
        let (found, _) = self.sort_pattern(&self.normalise(pattern), time);
        self.search_semantic_links(found, self.config.maximum_semantic_link_search_distance, time)
    }

    /// Sort `pattern` through its network and admit the result to STM
    pub fn recognise(&mut self, pattern: &Pattern, time: Time) -> Result<NodeId> {
        self.clocks.ensure_free(Resource::Cognition, time)?;

        let normalised = self.normalise(pattern);
        let outcome = self.atomically(|m| m.recognise_from(&normalised, time));
        if let Ok((_, done)) = outcome {
            self.clocks.advance_to(Resource::Cognition, done);
        }
        self.commit_outcome(time, "recognise", pattern.to_string(), "sorted pattern through LTM", &outcome);
        outcome.map(|(node, _)| node)
    }

    /// Follow the first passing link at each level; returns the deepest
    /// node reached and how many links were traversed.
    pub(crate) fn sort_pattern(&self, pattern: &Pattern, time: Time) -> (NodeId, usize) {
        let mut current = self.root(pattern.modality());
        let mut remaining = pattern.clone();
        let mut traversed = 0;

        while let Some(node) = self.arena.get(current) {
            let next = node
                .children_at(time)
                .iter()
                .find(|link| link.passes(&remaining));
            match next {
                Some(link) => {
                    remaining = remaining.remove(&link.test);
                    current = link.child;
                    traversed += 1;
                }
                None => break,
            }
        }

        (current, traversed)
    }

    /// Best node within `hops` semantic links; the start wins ties
    fn search_semantic_links(&self, start: NodeId, hops: usize, time: Time) -> NodeId {
        let node = match self.arena.get(start) {
            Some(node) => node,
            None => return start,
        };
        if hops == 0 {
            return start;
        }

        let mut best = start;
        let mut best_score = node.information(time);
        for &linked in node.semantic_links_at(time) {
            let candidate = self.search_semantic_links(linked, hops - 1, time);
            let score = self
                .arena
                .get(candidate)
                .map(|n| n.information(time))
                .unwrap_or(0);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }
        best
    }

    /// Recognition with STM admission; returns the node and completion time.
    /// `pattern` must already be normalised.
    pub(crate) fn recognise_from(&mut self, pattern: &Pattern, time: Time) -> Result<(NodeId, Time)> {
        let (found, traversed) = self.sort_pattern(pattern, time);
        let node = self.search_semantic_links(found, self.config.maximum_semantic_link_search_distance, time);
        let reached = time + traversed as Time * self.config.durations.ltm_link_traversal_time;

        debug!(
            "Recognised {} as {} ({} links, semantic {})",
            pattern,
            node,
            traversed,
            if node == found { "no" } else { "yes" }
        );

        let admitted = self.admit_to_stm(node, reached)?;
        Ok((node, admitted))
    }

    /// Put `node` into its STM once attention is free; returns the stamp
    pub(crate) fn admit_to_stm(&mut self, node: NodeId, time: Time) -> Result<Time> {
        let modality = self.node_ref(node)?.modality();
        let start = time.max(self.clocks.free_at(Resource::Attention));
        let stamp = start + self.config.durations.stm_node_addition_time;

        if !self.associate_cross_modal(node, stamp)? {
            self.link_semantically(node, stamp)?;
        }
        if self.node_ref(node)?.has_filled_slots_at(stamp) {
            self.node_mut(node)?.clear_filled_slots(stamp)?;
            self.emit(stamp, Change::SlotsCleared { node });
        }

        let state = &mut self.modalities[modality];
        state.stm.add(node, stamp, &self.arena)?;
        self.clocks.advance_to(Resource::Attention, stamp);
        self.emit(stamp, Change::StmUpdated { modality });
        Ok(stamp)
    }

    // ===== Associations =====

    pub(crate) fn cross_modal(&self, a: NodeId, b: NodeId) -> Result<Option<CrossModal>> {
        let pair = (self.node_ref(a)?.modality(), self.node_ref(b)?.modality());
        Ok(match pair {
            (Modality::Visual, Modality::Action) => Some(CrossModal::Production { visual: a, action: b }),
            (Modality::Action, Modality::Visual) => Some(CrossModal::Production { visual: b, action: a }),
            (Modality::Visual, Modality::Verbal) => Some(CrossModal::Naming { visual: a, verbal: b }),
            (Modality::Verbal, Modality::Visual) => Some(CrossModal::Naming { visual: b, verbal: a }),
            _ => None,
        })
    }

    /// Create the association if missing; `Ok(false)` when it already held
    pub(crate) fn apply_cross_modal(&mut self, association: CrossModal, time: Time) -> Result<bool> {
        match association {
            CrossModal::Production { visual, action } => {
                let added = self.node_mut(visual)?.add_production(action, 0.0, time)?;
                if added {
                    self.emit(time, Change::ProductionAdded { visual, action });
                }
                Ok(added)
            }
            CrossModal::Naming { visual, verbal } => {
                let node = self.node_mut(visual)?;
                if node.named_by_at(time) == Some(verbal) {
                    return Ok(false);
                }
                node.set_named_by(Some(verbal), time)?;
                self.emit(time, Change::NamingAdded { visual, verbal });
                Ok(true)
            }
        }
    }

    /// Pair `node` with the hypotheses of the other STMs
    fn associate_cross_modal(&mut self, node: NodeId, time: Time) -> Result<bool> {
        if self.is_root(node) {
            return Ok(false);
        }
        let modality = self.node_ref(node)?.modality();

        for other in Modality::ALL {
            if other == modality {
                continue;
            }
            let hypothesis = match self.modalities[other].stm.hypothesis_at(time) {
                Some(h) if !self.is_root(h) => h,
                _ => continue,
            };
            if let Some(association) = self.cross_modal(node, hypothesis)? {
                if self.apply_cross_modal(association, time)? {
                    debug!("Associated {} with {} ({:?})", node, hypothesis, association);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Link `node` with its STM hypothesis when their images overlap enough
    fn link_semantically(&mut self, node: NodeId, time: Time) -> Result<bool> {
        let modality = self.node_ref(node)?.modality();
        let hypothesis = match self.modalities[modality].stm.hypothesis_at(time) {
            Some(h) => h,
            None => return Ok(false),
        };
        if hypothesis == node || self.is_root(hypothesis) || self.is_root(node) {
            return Ok(false);
        }

        let shared = self
            .image_of(node, time)?
            .overlap(&self.image_of(hypothesis, time)?);
        if shared < self.config.similarity_threshold {
            return Ok(false);
        }

        let mut created = false;
        for (from, to) in [(node, hypothesis), (hypothesis, node)] {
            if self.node_mut(from)?.add_semantic_link(to, time)? {
                self.modalities[modality].counters.semantic_links += 1;
                self.emit(time, Change::SemanticLinkAdded { from, to });
                created = true;
            }
        }
        if created {
            debug!("Semantic link {} <-> {} ({} shared)", node, hypothesis, shared);
        }
        Ok(created)
    }

    /// Explicitly associate two nodes of different modalities
    pub fn associate(&mut self, a: NodeId, b: NodeId, time: Time) -> Result<bool> {
        self.clocks.ensure_free(Resource::Cognition, time)?;

        if self.node_ref(a)?.is_root() || self.node_ref(b)?.is_root() {
            return Err(ModelError::PreconditionViolation(
                "root nodes cannot be associated".to_string(),
            ));
        }
        let association = self.cross_modal(a, b)?.ok_or_else(|| {
            ModelError::PreconditionViolation(format!(
                "no association rule between {} and {}",
                self.arena.get(a).map(Node::modality).unwrap_or(Modality::Visual),
                self.arena.get(b).map(Node::modality).unwrap_or(Modality::Visual)
            ))
        })?;

        let done = time + self.config.durations.association_time;
        let outcome = self.apply_cross_modal(association, done).map(|created| (created, done));
        if outcome.is_ok() {
            self.clocks.advance_to(Resource::Cognition, done);
        }
        self.commit_outcome(time, "associate", format!("{} {}", a, b), "cross-modal association", &outcome);
        outcome.map(|(created, _)| created)
    }

    // ===== Attention =====

    /// Force `node` to the front of its STM
    pub fn replace_stm_hypothesis(&mut self, node: NodeId, time: Time) -> Result<()> {
        self.clocks.ensure_free(Resource::Attention, time)?;
        let modality = self.node_ref(node)?.modality();
        let stamp = time + self.config.durations.stm_node_addition_time;

        self.modalities[modality].stm.replace_hypothesis(node, stamp)?;
        self.clocks.advance_to(Resource::Attention, stamp);
        self.emit(stamp, Change::StmUpdated { modality });
        self.commit(AuditRecord::new(
            time,
            "replace_stm_hypothesis",
            node.to_string(),
            format!("{} STM hypothesis replaced", modality),
            stamp.to_string(),
        ));
        Ok(())
    }

    pub fn clear_stm(&mut self, modality: Modality, time: Time) -> Result<()> {
        self.clocks.ensure_free(Resource::Attention, time)?;
        let stamp = time + self.config.durations.stm_node_addition_time;

        self.modalities[modality].stm.clear(stamp)?;
        self.clocks.advance_to(Resource::Attention, stamp);
        self.emit(stamp, Change::StmUpdated { modality });
        self.commit(AuditRecord::new(
            time,
            "clear_stm",
            modality.to_string(),
            format!("{} STM cleared", modality),
            stamp.to_string(),
        ));
        Ok(())
    }

    /// Change an STM capacity; takes attention like any other STM update
    pub fn set_stm_capacity(&mut self, modality: Modality, capacity: usize, time: Time) -> Result<()> {
        self.clocks.ensure_free(Resource::Attention, time)?;
        let stamp = time + self.config.durations.stm_node_addition_time;

        self.modalities[modality].stm.set_capacity(capacity, stamp)?;
        self.clocks.advance_to(Resource::Attention, stamp);
        self.emit(stamp, Change::StmUpdated { modality });
        self.commit(AuditRecord::new(
            time,
            "set_stm_capacity",
            format!("{} {}", modality, capacity),
            "STM capacity changed",
            stamp.to_string(),
        ));
        Ok(())
    }

    /// Occupy `resource` for `cost` on behalf of an external collaborator
    pub fn acquire(&mut self, resource: Resource, time: Time, cost: Time) -> Result<Time> {
        Ok(self.clocks.try_acquire(resource, time, cost)?)
    }

    // ===== Growth =====

    /// Create a node under `parent` reached through `test`
    pub(crate) fn grow(
        &mut self,
        parent: NodeId,
        test: Pattern,
        contents: Pattern,
        image: Pattern,
        time: Time,
    ) -> Result<NodeId> {
        let modality = contents.modality();
        let id = self.arena.next_id();
        let child = Node::new(id, contents, image, time);
        self.modalities[modality].network.admit(&child)?;

        self.node_mut(parent)?.add_child(Link::new(test, id, time), time)?;
        self.modalities[modality].network.register(&mut self.arena, child)?;

        info!("Learned {} under {} at {}", id, parent, time);
        self.emit(time, Change::NodeCreated { node: id, modality });
        self.emit(time, Change::LinkAdded { parent, child: id });
        Ok(id)
    }

    // ===== Atomicity =====

    /// Run `step` as one unit. When it fails, nodes it changed are put back,
    /// nodes it created are dropped, STM writes after the starting attention
    /// clock are removed and its pending events are discarded.
    ///
    /// Nested calls join the outermost unit.
    pub(crate) fn atomically<T, F>(&mut self, step: F) -> Result<T>
    where
        F: FnOnce(&mut Model) -> Result<T>,
    {
        if self.touched.is_some() {
            return step(self);
        }

        let checkpoint = Checkpoint {
            nodes: self.arena.len(),
            counters: self.modalities.map(|_, state| state.counters),
            clocks: self.clocks,
            rng: self.rng.clone(),
        };
        self.touched = Some(Vec::new());
        let outcome = step(self);
        let touched = self.touched.take().unwrap_or_default();

        if outcome.is_err() {
            self.rollback(checkpoint, touched);
        }
        outcome
    }

    fn rollback(&mut self, checkpoint: Checkpoint, touched: Vec<Node>) {
        let restored = touched.len();
        for original in touched {
            self.arena.restore(original);
        }
        self.arena.truncate(checkpoint.nodes);

        // STM writes are always stamped after the attention clock they waited for
        let first_new = NodeId(checkpoint.nodes as u64);
        for modality in Modality::ALL {
            let state = &mut self.modalities[modality];
            state.network.forget_from(first_new);
            state.stm.truncate_after(checkpoint.clocks.attention);
            state.counters = checkpoint.counters[modality];
        }

        self.clocks = checkpoint.clocks;
        self.rng = checkpoint.rng;
        self.pending.clear();
        debug!("Rolled back {} changed nodes, kept {} nodes", restored, checkpoint.nodes);
    }

    // ===== Events =====

    pub(crate) fn emit(&mut self, time: Time, change: Change) {
        self.pending.push(ModelEvent { time, change });
    }

    /// Deliver pending events and the audit record
    pub(crate) fn commit(&mut self, record: AuditRecord) {
        for event in self.pending.drain(..) {
            for observer in &self.observers {
                observer.model_changed(&event);
            }
        }
        if let Some(sink) = self.audit.as_mut() {
            sink.record(&record);
        }
    }

    pub(crate) fn commit_outcome<T: fmt::Debug>(
        &mut self,
        time: Time,
        operation: &str,
        input: String,
        description: &str,
        outcome: &Result<(T, Time)>,
    ) {
        let output = match outcome {
            Ok((value, done)) => format!("{:?} at {}", value, done),
            Err(e) => {
                warn!("{} at {} failed: {}", operation, time, e);
                format!("error: {}", e)
            }
        };
        self.commit(AuditRecord::new(time, operation, input, description, output));
    }
}
