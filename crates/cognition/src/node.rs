//! Node / Link - vertices and edges of the discrimination network
//!
//! A node is a learned chunk. Its contents, modality and creation time never
//! change; everything else (children, image, associations, template state)
//! is held in a [`Versioned`] so the node can be inspected at any past time.

use chrest_core::{Modality, Pattern, Symbol, Time, VersionError, Versioned};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Model-wide unique node reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node mutation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("node {0} cannot link to itself")]
    SelfLink(NodeId),

    #[error("node {node} already has a link testing {test}")]
    DuplicateTest { node: NodeId, test: Pattern },

    #[error("node {child} is already a child of {node}")]
    DuplicateChild { node: NodeId, child: NodeId },

    #[error("node {0} is already a template")]
    AlreadyTemplate(NodeId),

    #[error(transparent)]
    History(#[from] VersionError),
}

impl NodeError {
    /// Violations of the network's shape, as opposed to temporal misuse
    pub fn is_structural(&self) -> bool {
        !matches!(self, NodeError::History(_))
    }
}

/// Test-gated edge from a parent to a child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub test: Pattern,
    pub child: NodeId,
    pub created_at: Time,
}

impl Link {
    pub fn new(test: Pattern, child: NodeId, created_at: Time) -> Self {
        Self {
            test,
            child,
            created_at,
        }
    }

    /// Whether the remaining pattern can be sorted through this link
    pub fn passes(&self, pattern: &Pattern) -> bool {
        self.test.matches(pattern)
    }
}

/// Slot structure of a node that became a template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    item_slots: Vec<String>,
    position_slots: Vec<(i32, i32)>,
    created_at: Time,
    filled_item_slots: Versioned<Vec<Symbol>>,
    filled_position_slots: Versioned<Vec<Symbol>>,
}

impl Template {
    pub fn item_slots(&self) -> &[String] {
        &self.item_slots
    }

    pub fn position_slots(&self) -> &[(i32, i32)] {
        &self.position_slots
    }

    pub fn created_at(&self) -> Time {
        self.created_at
    }

    pub fn slot_count(&self) -> usize {
        self.item_slots.len() + self.position_slots.len()
    }

    pub fn filled_item_slots_at(&self, time: Time) -> &[Symbol] {
        self.filled_item_slots.get(time).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn filled_position_slots_at(&self, time: Time) -> &[Symbol] {
        self.filled_position_slots
            .get(time)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A chunk in long-term memory
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    modality: Modality,
    contents: Pattern,
    created_at: Time,
    is_root: bool,

    children: Versioned<Vec<Link>>,
    image: Versioned<Pattern>,
    associated: Versioned<Option<NodeId>>,
    named_by: Versioned<Option<NodeId>>,
    productions: Versioned<BTreeMap<NodeId, f64>>,
    semantic_links: Versioned<Vec<NodeId>>,
    template: Versioned<bool>,
    slots: Option<Template>,
}

impl Node {
    /// Create a learned node
    pub fn new(id: NodeId, contents: Pattern, image: Pattern, created_at: Time) -> Self {
        Self::build(id, contents, image, created_at, false)
    }

    /// Create the information-free root of a modality's network
    pub fn root(id: NodeId, modality: Modality, created_at: Time) -> Self {
        Self::build(
            id,
            Pattern::new(modality),
            Pattern::new(modality),
            created_at,
            true,
        )
    }

    fn build(id: NodeId, contents: Pattern, image: Pattern, created_at: Time, is_root: bool) -> Self {
        Self {
            id,
            modality: contents.modality(),
            contents,
            created_at,
            is_root,
            children: Versioned::new(created_at, Vec::new()),
            image: Versioned::new(created_at, image),
            associated: Versioned::new(created_at, None),
            named_by: Versioned::new(created_at, None),
            productions: Versioned::new(created_at, BTreeMap::new()),
            semantic_links: Versioned::new(created_at, Vec::new()),
            template: Versioned::new(created_at, false),
            slots: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn contents(&self) -> &Pattern {
        &self.contents
    }

    pub fn created_at(&self) -> Time {
        self.created_at
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn exists_at(&self, time: Time) -> bool {
        self.created_at <= time
    }

    pub fn children_at(&self, time: Time) -> &[Link] {
        self.children.get(time).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn image_at(&self, time: Time) -> Option<&Pattern> {
        self.image.get(time)
    }

    pub fn associated_at(&self, time: Time) -> Option<NodeId> {
        self.associated.get(time).copied().flatten()
    }

    pub fn named_by_at(&self, time: Time) -> Option<NodeId> {
        self.named_by.get(time).copied().flatten()
    }

    pub fn productions_at(&self, time: Time) -> Option<&BTreeMap<NodeId, f64>> {
        self.productions.get(time)
    }

    pub fn semantic_links_at(&self, time: Time) -> &[NodeId] {
        self.semantic_links
            .get(time)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_template_at(&self, time: Time) -> bool {
        self.template.get(time).copied().unwrap_or(false)
    }

    /// Slot definitions, present once the node has ever been a template
    pub fn template(&self) -> Option<&Template> {
        self.slots.as_ref()
    }

    /// Image size plus slot count (when a template at `time`)
    pub fn information(&self, time: Time) -> usize {
        if self.is_root {
            return 0;
        }
        let image = self.image_at(time).map(Pattern::len).unwrap_or(0);
        let slots = match (&self.slots, self.is_template_at(time)) {
            (Some(template), true) => template.slot_count(),
            _ => 0,
        };
        image + slots
    }

    /// Append a child link
    pub fn add_child(&mut self, link: Link, time: Time) -> Result<(), NodeError> {
        if link.child == self.id {
            return Err(NodeError::SelfLink(self.id));
        }
        let current = self.children_at(time);
        if current.iter().any(|l| l.test == link.test) {
            return Err(NodeError::DuplicateTest {
                node: self.id,
                test: link.test,
            });
        }
        if current.iter().any(|l| l.child == link.child) {
            return Err(NodeError::DuplicateChild {
                node: self.id,
                child: link.child,
            });
        }

        let mut next = current.to_vec();
        next.push(link);
        self.children.put(time, next)?;
        Ok(())
    }

    pub fn set_image(&mut self, image: Pattern, time: Time) -> Result<(), NodeError> {
        self.image.put(time, image)?;
        Ok(())
    }

    pub fn set_associated(&mut self, node: Option<NodeId>, time: Time) -> Result<(), NodeError> {
        if node == Some(self.id) {
            return Err(NodeError::SelfLink(self.id));
        }
        self.associated.put(time, node)?;
        Ok(())
    }

    pub fn set_named_by(&mut self, node: Option<NodeId>, time: Time) -> Result<(), NodeError> {
        if node == Some(self.id) {
            return Err(NodeError::SelfLink(self.id));
        }
        self.named_by.put(time, node)?;
        Ok(())
    }

    /// Add a production if absent; `Ok(false)` when it already exists
    pub fn add_production(&mut self, action: NodeId, weight: f64, time: Time) -> Result<bool, NodeError> {
        if action == self.id {
            return Err(NodeError::SelfLink(self.id));
        }
        if self.productions_at(time).is_some_and(|p| p.contains_key(&action)) {
            return Ok(false);
        }
        self.productions.update(time, |p| {
            p.insert(action, weight);
        })?;
        Ok(true)
    }

    /// Adjust a production's weight; `None` when there is no such production
    pub fn reinforce_production(
        &mut self,
        action: NodeId,
        delta: f64,
        time: Time,
    ) -> Result<Option<f64>, NodeError> {
        let current = match self.productions_at(time).and_then(|p| p.get(&action)) {
            Some(weight) => *weight,
            None => return Ok(None),
        };
        let weight = current + delta;
        self.productions.update(time, |p| {
            p.insert(action, weight);
        })?;
        Ok(Some(weight))
    }

    /// Add a one-way semantic link if absent; `Ok(false)` when it exists
    pub fn add_semantic_link(&mut self, node: NodeId, time: Time) -> Result<bool, NodeError> {
        if node == self.id {
            return Err(NodeError::SelfLink(self.id));
        }
        if self.semantic_links_at(time).contains(&node) {
            return Ok(false);
        }
        self.semantic_links.update(time, |links| links.push(node))?;
        Ok(true)
    }

    /// Turn this node into a template with fixed slots
    pub fn make_template(
        &mut self,
        item_slots: Vec<String>,
        position_slots: Vec<(i32, i32)>,
        time: Time,
    ) -> Result<(), NodeError> {
        if self.slots.is_some() {
            return Err(NodeError::AlreadyTemplate(self.id));
        }
        self.template.put(time, true)?;
        self.slots = Some(Template {
            item_slots,
            position_slots,
            created_at: time,
            filled_item_slots: Versioned::new(time, Vec::new()),
            filled_position_slots: Versioned::new(time, Vec::new()),
        });
        Ok(())
    }

    /// Fill slots from `pattern`, returning how many symbols were placed.
    ///
    /// A symbol already in the image or in a filled slot is skipped; item
    /// slots are tried before position slots.
    pub fn fill_slots(&mut self, pattern: &Pattern, time: Time) -> Result<usize, NodeError> {
        if !self.is_template_at(time) {
            return Ok(0);
        }
        let image = self.image_at(time).cloned().unwrap_or_else(|| Pattern::new(self.modality));
        let template = match self.slots.as_mut() {
            Some(template) => template,
            None => return Ok(0),
        };

        let mut items = template.filled_item_slots_at(time).to_vec();
        let mut positions = template.filled_position_slots_at(time).to_vec();
        let mut filled = 0;

        for symbol in pattern.symbols() {
            if image.contains(symbol) || items.contains(symbol) || positions.contains(symbol) {
                continue;
            }
            if template.item_slots.iter().any(|item| *item == symbol.item) {
                items.push(symbol.clone());
                filled += 1;
            } else if template.position_slots.contains(&symbol.position()) {
                positions.push(symbol.clone());
                filled += 1;
            }
        }

        if filled > 0 {
            template.filled_item_slots.put(time, items)?;
            template.filled_position_slots.put(time, positions)?;
        }
        Ok(filled)
    }

    pub fn has_filled_slots_at(&self, time: Time) -> bool {
        self.slots.as_ref().is_some_and(|template| {
            !template.filled_item_slots_at(time).is_empty()
                || !template.filled_position_slots_at(time).is_empty()
        })
    }

    /// Forget filled values, keeping slot definitions; `Ok(false)` when
    /// nothing was filled at `time`
    pub fn clear_filled_slots(&mut self, time: Time) -> Result<bool, NodeError> {
        if !self.has_filled_slots_at(time) {
            return Ok(false);
        }
        if let Some(template) = self.slots.as_mut() {
            template.filled_item_slots.put(time, Vec::new())?;
            template.filled_position_slots.put(time, Vec::new())?;
        }
        Ok(true)
    }
}
