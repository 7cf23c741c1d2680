//! Templates - nodes that generalise over recurring items and positions
//!
//! A sufficiently deep node whose own image, children's images and
//! semantically linked images keep showing the same item (or the same
//! position) beyond its contents gets a slot for it.

use chrest_core::{Pattern, Time};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::clock::Resource;
use crate::events::{AuditRecord, Change};
use crate::model::{Model, ModelError, Result};
use crate::node::{Node, NodeId};

/// Slot definitions a node qualifies for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotCandidates {
    pub items: Vec<String>,
    pub positions: Vec<(i32, i32)>,
}

impl SlotCandidates {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.positions.is_empty()
    }
}

impl Model {
    fn slot_candidates(&self, node: &Node, time: Time) -> SlotCandidates {
        let contents = node.contents();
        let mut sources: Vec<&Pattern> = Vec::new();

        if let Some(image) = node.image_at(time) {
            sources.push(image);
        }
        let related = node
            .children_at(time)
            .iter()
            .map(|link| link.child)
            .chain(node.semantic_links_at(time).iter().copied());
        for id in related {
            if let Some(image) = self.arena.get(id).and_then(|n| n.image_at(time)) {
                sources.push(image);
            }
        }

        let mut items: BTreeMap<String, usize> = BTreeMap::new();
        let mut positions: BTreeMap<(i32, i32), usize> = BTreeMap::new();
        for source in sources {
            for symbol in source.remove(contents).symbols() {
                *items.entry(symbol.item.clone()).or_default() += 1;
                *positions.entry(symbol.position()).or_default() += 1;
            }
        }

        let threshold = self.config.minimum_item_or_position_occurrences;
        SlotCandidates {
            items: items
                .into_iter()
                .filter(|(_, count)| *count >= threshold)
                .map(|(item, _)| item)
                .collect(),
            positions: positions
                .into_iter()
                .filter(|(_, count)| *count >= threshold)
                .map(|(position, _)| position)
                .collect(),
        }
    }

    fn eligible_slots(&self, node: &Node, time: Time) -> Option<SlotCandidates> {
        if node.is_root()
            || !node.exists_at(time)
            || node.template().is_some()
            || node.contents().len() < self.config.minimum_template_level
        {
            return None;
        }
        let candidates = self.slot_candidates(node, time);
        (!candidates.is_empty()).then_some(candidates)
    }

    /// Whether `node` qualifies as a template at `time`
    pub fn can_be_template(&self, node: NodeId, time: Time) -> Result<bool> {
        Ok(self.eligible_slots(self.node_ref(node)?, time).is_some())
    }

    fn install_template(&mut self, node: NodeId, slots: SlotCandidates, time: Time) -> Result<()> {
        let slot_count = slots.items.len() + slots.positions.len();
        let target = self.node_mut(node)?;
        let modality = target.modality();
        target.make_template(slots.items, slots.positions, time)?;

        self.modalities[modality].counters.templates += 1;
        self.emit(time, Change::TemplateCreated { node });
        debug!("Template {} with {} slots", node, slot_count);
        Ok(())
    }

    /// Turn a node that qualifies at `time` into a template; the slots
    /// exist once the construction time has passed
    pub fn make_template(&mut self, node: NodeId, time: Time) -> Result<()> {
        self.clocks.ensure_free(Resource::Cognition, time)?;
        let slots = self
            .eligible_slots(self.node_ref(node)?, time)
            .ok_or_else(|| ModelError::PreconditionViolation(format!("{} cannot become a template", node)))?;
        let done = time + self.config.durations.template_construction_time;

        self.install_template(node, slots, done)?;
        self.clocks.advance_to(Resource::Cognition, done);
        self.commit(AuditRecord::new(
            time,
            "make_template",
            node.to_string(),
            "template created",
            done.to_string(),
        ));
        Ok(())
    }

    /// Make every qualifying node a template; returns how many were made
    pub fn construct_templates(&mut self, time: Time) -> Result<usize> {
        self.clocks.ensure_free(Resource::Cognition, time)?;
        let done = time + self.config.durations.template_construction_time;

        let eligible: Vec<(NodeId, SlotCandidates)> = self
            .arena
            .iter()
            .filter_map(|node| self.eligible_slots(node, time).map(|slots| (node.id(), slots)))
            .collect();

        let outcome = self.atomically(|m| {
            let count = eligible.len();
            for (node, slots) in eligible {
                m.install_template(node, slots, done)?;
            }
            Ok((count, done))
        });
        if let Ok((count, _)) = outcome {
            self.clocks.advance_to(Resource::Cognition, done);
            info!("Constructed {} templates at {}", count, done);
        }
        self.commit_outcome(time, "construct_templates", String::new(), "templates constructed", &outcome);
        outcome.map(|(count, _)| count)
    }

    /// Fill the slots of a template node from `pattern`; an attention step
    pub fn fill_slots(&mut self, node: NodeId, pattern: &Pattern, time: Time) -> Result<usize> {
        self.clocks.ensure_free(Resource::Attention, time)?;
        let pattern = self.normalise(pattern);
        let stamp = time + self.config.durations.stm_node_addition_time;

        let filled = self.node_mut(node)?.fill_slots(&pattern, stamp)?;
        if filled > 0 {
            self.emit(stamp, Change::SlotsFilled { node, count: filled });
        }
        self.clocks.advance_to(Resource::Attention, stamp);
        self.commit(AuditRecord::new(
            time,
            "fill_slots",
            format!("{} {}", node, pattern),
            "template slots filled",
            filled.to_string(),
        ));
        Ok(filled)
    }

    /// Empty the filled slots of `node`; `Ok(false)` when none were filled
    pub fn clear_filled_slots(&mut self, node: NodeId, time: Time) -> Result<bool> {
        self.clocks.ensure_free(Resource::Attention, time)?;
        let stamp = time + self.config.durations.stm_node_addition_time;

        let cleared = self.node_mut(node)?.clear_filled_slots(stamp)?;
        if cleared {
            self.emit(stamp, Change::SlotsCleared { node });
        }
        self.clocks.advance_to(Resource::Attention, stamp);
        self.commit(AuditRecord::new(
            time,
            "clear_filled_slots",
            node.to_string(),
            "filled slots cleared",
            cleared.to_string(),
        ));
        Ok(cleared)
    }
}
