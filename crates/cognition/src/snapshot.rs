//! Snapshots and statistics
//!
//! A snapshot is a serialisable view of the whole model at one time,
//! suitable for printing or comparing two runs.

use chrest_core::{Modality, Time};
use serde::Serialize;
use std::collections::VecDeque;

use crate::clock::ResourceClocks;
use crate::model::{LearningCounters, Model};
use crate::node::{Node, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub test: String,
    pub child: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionView {
    pub action: NodeId,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateView {
    pub item_slots: Vec<String>,
    pub position_slots: Vec<(i32, i32)>,
    pub filled_item_slots: Vec<String>,
    pub filled_position_slots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub contents: String,
    pub image: String,
    pub created_at: Time,
    pub children: Vec<LinkView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub semantic_links: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_by: Option<NodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub productions: Vec<ProductionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateView>,
}

impl NodeView {
    fn of(node: &Node, time: Time) -> Self {
        let template = node
            .template()
            .filter(|_| node.is_template_at(time))
            .map(|t| TemplateView {
                item_slots: t.item_slots().to_vec(),
                position_slots: t.position_slots().to_vec(),
                filled_item_slots: t.filled_item_slots_at(time).iter().map(ToString::to_string).collect(),
                filled_position_slots: t
                    .filled_position_slots_at(time)
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });

        Self {
            id: node.id(),
            contents: node.contents().to_string(),
            image: node.image_at(time).map(ToString::to_string).unwrap_or_default(),
            created_at: node.created_at(),
            children: node
                .children_at(time)
                .iter()
                .map(|link| LinkView {
                    test: link.test.to_string(),
                    child: link.child,
                })
                .collect(),
            semantic_links: node.semantic_links_at(time).to_vec(),
            associated: node.associated_at(time),
            named_by: node.named_by_at(time),
            productions: node
                .productions_at(time)
                .map(|p| {
                    p.iter()
                        .map(|(action, weight)| ProductionView {
                            action: *action,
                            weight: *weight,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            template,
        }
    }
}

/// Aggregate measures of one modality's LTM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub ltm_size: usize,
    pub average_depth: f64,
    pub average_image_size: f64,
    pub template_count: usize,
    pub production_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkView {
    pub modality: Modality,
    pub root: NodeId,
    pub statistics: Statistics,
    pub counters: LearningCounters,
    pub nodes: Vec<NodeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StmView {
    pub modality: Modality,
    pub capacity: usize,
    pub items: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSnapshot {
    pub time: Time,
    pub created_at: Time,
    pub clocks: ResourceClocks,
    pub networks: Vec<NetworkView>,
    pub stms: Vec<StmView>,
}

impl ModelSnapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn mean(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

impl Model {
    /// Learned (non-root) nodes of `modality` existing at `time`
    fn learned_nodes(&self, modality: Modality, time: Time) -> impl Iterator<Item = &Node> {
        self.modalities[modality]
            .network
            .members_at(&self.arena, time)
            .filter(|node| !node.is_root())
    }

    pub fn ltm_size(&self, modality: Modality, time: Time) -> usize {
        self.learned_nodes(modality, time).count()
    }

    /// Mean number of links between the root and each learned node
    pub fn average_depth(&self, modality: Modality, time: Time) -> f64 {
        let mut queue = VecDeque::from([(self.root(modality), 0usize)]);
        let (mut total, mut count) = (0, 0);

        while let Some((id, depth)) = queue.pop_front() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            if depth > 0 {
                total += depth;
                count += 1;
            }
            for link in node.children_at(time) {
                queue.push_back((link.child, depth + 1));
            }
        }
        mean(total, count)
    }

    pub fn average_image_size(&self, modality: Modality, time: Time) -> f64 {
        let (total, count) = self
            .learned_nodes(modality, time)
            .fold((0, 0), |(total, count), node| {
                (total + node.image_at(time).map_or(0, |i| i.len()), count + 1)
            });
        mean(total, count)
    }

    pub fn template_count(&self, modality: Modality, time: Time) -> usize {
        self.learned_nodes(modality, time)
            .filter(|node| node.is_template_at(time))
            .count()
    }

    pub fn production_count(&self, modality: Modality, time: Time) -> usize {
        self.learned_nodes(modality, time)
            .map(|node| node.productions_at(time).map_or(0, |p| p.len()))
            .sum()
    }

    pub fn statistics(&self, modality: Modality, time: Time) -> Statistics {
        Statistics {
            ltm_size: self.ltm_size(modality, time),
            average_depth: self.average_depth(modality, time),
            average_image_size: self.average_image_size(modality, time),
            template_count: self.template_count(modality, time),
            production_count: self.production_count(modality, time),
        }
    }

    /// Everything the model holds at `time`
    pub fn snapshot(&self, time: Time) -> ModelSnapshot {
        let networks = Modality::ALL
            .iter()
            .map(|&modality| {
                let state = &self.modalities[modality];
                NetworkView {
                    modality,
                    root: state.network.root(),
                    statistics: self.statistics(modality, time),
                    counters: state.counters,
                    nodes: state
                        .network
                        .members_at(&self.arena, time)
                        .map(|node| NodeView::of(node, time))
                        .collect(),
                }
            })
            .collect();

        let stms = Modality::ALL
            .iter()
            .map(|&modality| {
                let stm = &self.modalities[modality].stm;
                StmView {
                    modality,
                    capacity: stm.capacity_at(time),
                    items: stm.items_at(time).to_vec(),
                }
            })
            .collect();

        ModelSnapshot {
            time,
            created_at: self.created_at,
            clocks: self.clocks,
            networks,
            stms,
        }
    }
}
