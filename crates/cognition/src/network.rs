//! Network - one discrimination tree per modality
//!
//! All nodes of a model live in a single [`NodeArena`] so that cross-modal
//! references (productions, naming links) are plain [`NodeId`]s. A
//! [`Network`] records which of them belong to one modality's tree.

use chrest_core::{Modality, Time};
use thiserror::Error;

use crate::node::{Node, NodeId};

/// Network membership errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("node {node} created at {node_time} predates the {modality} network created at {network_time}")]
    NodeBeforeNetwork {
        node: NodeId,
        modality: Modality,
        node_time: Time,
        network_time: Time,
    },

    #[error("node {node} is {found}, not {expected}")]
    WrongModality {
        node: NodeId,
        expected: Modality,
        found: Modality,
    },
}

/// Owner of every node
#[derive(Debug, Default, Clone)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted node will receive
    pub fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u64)
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        debug_assert_eq!(id, self.next_id());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Put back an earlier copy of a node
    pub(crate) fn restore(&mut self, node: Node) {
        if let Some(slot) = self.nodes.get_mut(node.id().0 as usize) {
            *slot = node;
        }
    }

    /// Forget every node from position `len` on
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}

/// Discrimination tree of one modality
#[derive(Debug, Clone)]
pub struct Network {
    modality: Modality,
    root: NodeId,
    created_at: Time,
    members: Vec<NodeId>,
}

impl Network {
    /// Create the network and its root inside `arena`
    pub fn create(arena: &mut NodeArena, modality: Modality, time: Time) -> Self {
        let root = arena.insert(Node::root(arena.next_id(), modality, time));
        Self {
            modality,
            root,
            created_at: time,
            members: vec![root],
        }
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn created_at(&self) -> Time {
        self.created_at
    }

    /// Every node ever registered, root first, in creation order
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    /// Check that `node` may join this network
    pub fn admit(&self, node: &Node) -> Result<(), NetworkError> {
        if node.modality() != self.modality {
            return Err(NetworkError::WrongModality {
                node: node.id(),
                expected: self.modality,
                found: node.modality(),
            });
        }
        if node.created_at() < self.created_at {
            return Err(NetworkError::NodeBeforeNetwork {
                node: node.id(),
                modality: self.modality,
                node_time: node.created_at(),
                network_time: self.created_at,
            });
        }
        Ok(())
    }

    /// Move `node` into the arena as a member of this network
    pub fn register(&mut self, arena: &mut NodeArena, node: Node) -> Result<NodeId, NetworkError> {
        self.admit(&node)?;
        let id = arena.insert(node);
        self.members.push(id);
        Ok(id)
    }

    /// Drop members with an id of `first` or above
    pub(crate) fn forget_from(&mut self, first: NodeId) {
        self.members.retain(|id| *id < first);
    }

    /// Members that exist at `time`
    pub fn members_at<'a>(&'a self, arena: &'a NodeArena, time: Time) -> impl Iterator<Item = &'a Node> + 'a {
        self.members
            .iter()
            .filter_map(move |id| arena.get(*id))
            .filter(move |node| node.exists_at(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrest_core::Pattern;

    fn pat(s: &str) -> Pattern {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_network_with_root() {
        let mut arena = NodeArena::new();
        let visual = Network::create(&mut arena, Modality::Visual, 0);
        let verbal = Network::create(&mut arena, Modality::Verbal, 0);

        assert_eq!(visual.root(), NodeId(0));
        assert_eq!(verbal.root(), NodeId(1));
        assert!(arena.get(visual.root()).unwrap().is_root());
        assert_eq!(arena.get(verbal.root()).unwrap().modality(), Modality::Verbal);
    }

    #[test]
    fn test_register_node() {
        let mut arena = NodeArena::new();
        let mut net = Network::create(&mut arena, Modality::Visual, 10);

        let contents = pat("visual: <A 1 1>");
        let node = Node::new(arena.next_id(), contents.clone(), contents, 20);
        let id = net.register(&mut arena, node).unwrap();

        assert_eq!(net.members(), &[NodeId(0), id]);
        assert_eq!(net.members_at(&arena, 15).count(), 1);
        assert_eq!(net.members_at(&arena, 20).count(), 2);
    }

    #[test]
    fn test_register_rejects_early_node() {
        let mut arena = NodeArena::new();
        let mut net = Network::create(&mut arena, Modality::Visual, 10);

        let contents = pat("visual: <A 1 1>");
        let node = Node::new(arena.next_id(), contents.clone(), contents, 5);
        let err = net.register(&mut arena, node).unwrap_err();
        assert!(matches!(err, NetworkError::NodeBeforeNetwork { .. }));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_register_rejects_other_modality() {
        let mut arena = NodeArena::new();
        let mut net = Network::create(&mut arena, Modality::Visual, 0);

        let contents = pat("verbal: <dog 0 0>");
        let node = Node::new(arena.next_id(), contents.clone(), contents, 5);
        assert!(matches!(
            net.register(&mut arena, node),
            Err(NetworkError::WrongModality { .. })
        ));
    }
}
