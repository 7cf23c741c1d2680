//! Short-Term Memory - bounded, hypothesis-preserving recency buffer
//!
//! Position 0 holds the hypothesis: the most informative node among the
//! compatible candidates seen by the last `add`. Everything is versioned,
//! so the buffer can be read at any past time.

use chrest_core::{Modality, Time, VersionError, Versioned};
use tracing::debug;

use crate::network::NodeArena;
use crate::node::{Node, NodeId};

/// STM of one modality
#[derive(Debug, Clone)]
pub struct Stm {
    modality: Modality,
    capacity: Versioned<usize>,
    items: Versioned<Vec<NodeId>>,
}

impl Stm {
    pub fn new(modality: Modality, capacity: usize, time: Time) -> Self {
        Self {
            modality,
            capacity: Versioned::new(time, capacity),
            items: Versioned::new(time, Vec::new()),
        }
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn capacity_at(&self, time: Time) -> usize {
        self.capacity.get(time).copied().unwrap_or(0)
    }

    pub fn items_at(&self, time: Time) -> &[NodeId] {
        self.items.get(time).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn hypothesis_at(&self, time: Time) -> Option<NodeId> {
        self.items_at(time).first().copied()
    }

    pub fn len_at(&self, time: Time) -> usize {
        self.items_at(time).len()
    }

    pub fn contains_at(&self, node: NodeId, time: Time) -> bool {
        self.items_at(time).contains(&node)
    }

    /// Add `node` to the front, keeping the hypothesis at position 0.
    pub fn add(&mut self, node: NodeId, time: Time, arena: &NodeArena) -> Result<(), VersionError> {
        let capacity = self.capacity_at(time);
        let current = self.items_at(time);

        // First-found wins ties, starting from the added node
        let mut hypothesis = node;
        let mut best = information(arena, node, time);
        for &member in current {
            if member == node || !compatible(arena, member, node) {
                continue;
            }
            let score = information(arena, member, time);
            if score > best {
                hypothesis = member;
                best = score;
            }
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.push(node);
        next.extend(current.iter().copied().filter(|&m| m != node));
        next.truncate(capacity);

        if hypothesis != node && capacity > 0 {
            if let Some(index) = next.iter().position(|&m| m == hypothesis) {
                next.remove(index);
            } else {
                next.pop();
            }
            next.insert(0, hypothesis);
        }

        debug!(
            "STM {} add {} at {}: hypothesis {} ({} items)",
            self.modality,
            node,
            time,
            hypothesis,
            next.len()
        );
        self.items.put(time, next)
    }

    /// Force `node` to the front; the rest keeps its order
    pub fn replace_hypothesis(&mut self, node: NodeId, time: Time) -> Result<(), VersionError> {
        let capacity = self.capacity_at(time);
        let mut next = Vec::with_capacity(capacity);
        next.push(node);
        next.extend(self.items_at(time).iter().copied().filter(|&m| m != node));
        next.truncate(capacity);
        self.items.put(time, next)
    }

    pub fn clear(&mut self, time: Time) -> Result<(), VersionError> {
        self.items.put(time, Vec::new())
    }

    /// Change the capacity, dropping items from the back if needed
    pub fn set_capacity(&mut self, capacity: usize, time: Time) -> Result<(), VersionError> {
        let current = self.items_at(time);
        if current.len() > capacity {
            let kept = current[..capacity].to_vec();
            self.items.put(time, kept)?;
        }
        self.capacity.put(time, capacity)
    }

    /// Undo every write stamped after `time`
    pub(crate) fn truncate_after(&mut self, time: Time) {
        self.items.truncate_after(time);
        self.capacity.truncate_after(time);
    }
}

fn information(arena: &NodeArena, id: NodeId, time: Time) -> usize {
    arena.get(id).map(|n| n.information(time)).unwrap_or(0)
}

/// Two non-root nodes whose contents are prefixes of one another
fn compatible(arena: &NodeArena, a: NodeId, b: NodeId) -> bool {
    match (arena.get(a), arena.get(b)) {
        (Some(a), Some(b)) => contents_compatible(a, b),
        _ => false,
    }
}

fn contents_compatible(a: &Node, b: &Node) -> bool {
    !a.is_root() && !b.is_root() && (a.contents().matches(b.contents()) || b.contents().matches(a.contents()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use chrest_core::Pattern;

    fn pat(s: &str) -> Pattern {
        s.parse().unwrap()
    }

    /// Registers a node whose image has `image_size` copies of filler symbols
    fn learned(arena: &mut NodeArena, net: &mut Network, contents: &str, image_size: usize) -> NodeId {
        let contents = pat(contents);
        let mut image = Pattern::new(contents.modality());
        for i in 0..image_size {
            image.push(chrest_core::Symbol::new("I", i as i32, 0));
        }
        let node = Node::new(arena.next_id(), contents, image, 0);
        net.register(arena, node).unwrap()
    }

    fn setup() -> (NodeArena, Network) {
        let mut arena = NodeArena::new();
        let net = Network::create(&mut arena, Modality::Visual, 0);
        (arena, net)
    }

    #[test]
    fn test_add_moves_to_front_and_dedups() {
        let (mut arena, mut net) = setup();
        let a = learned(&mut arena, &mut net, "visual: <A 1 1>", 1);
        let b = learned(&mut arena, &mut net, "visual: <B 1 1>", 1);

        let mut stm = Stm::new(Modality::Visual, 4, 0);
        stm.add(a, 10, &arena).unwrap();
        stm.add(b, 20, &arena).unwrap();
        stm.add(a, 30, &arena).unwrap();

        assert_eq!(stm.items_at(20), &[b, a]);
        assert_eq!(stm.items_at(30), &[a, b]);
        assert_eq!(stm.items_at(5), &[] as &[NodeId]);
    }

    #[test]
    fn test_capacity_truncates_oldest() {
        let (mut arena, mut net) = setup();
        let nodes: Vec<_> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|item| learned(&mut arena, &mut net, &format!("visual: <{} 1 1>", item), 1))
            .collect();

        let mut stm = Stm::new(Modality::Visual, 4, 0);
        for (i, node) in nodes.iter().enumerate() {
            stm.add(*node, 10 * (i as Time + 1), &arena).unwrap();
        }

        assert_eq!(stm.len_at(50), 4);
        assert_eq!(stm.items_at(50), &[nodes[4], nodes[3], nodes[2], nodes[1]]);
    }

    #[test]
    fn test_hypothesis_kept_at_front() {
        let (mut arena, mut net) = setup();
        let rich = learned(&mut arena, &mut net, "visual: <A 1 1>", 5);
        let plain = learned(&mut arena, &mut net, "visual: <A 1 1> <B 2 1>", 1);
        let other = learned(&mut arena, &mut net, "visual: <C 1 1>", 1);

        let mut stm = Stm::new(Modality::Visual, 4, 0);
        stm.add(rich, 10, &arena).unwrap();
        stm.add(other, 20, &arena).unwrap();
        stm.add(plain, 30, &arena).unwrap();

        // `rich` is compatible with and more informative than `plain`
        assert_eq!(stm.items_at(30), &[rich, plain, other]);
    }

    #[test]
    fn test_dropped_hypothesis_reinserted() {
        let (mut arena, mut net) = setup();
        let rich = learned(&mut arena, &mut net, "visual: <A 1 1>", 5);
        let b = learned(&mut arena, &mut net, "visual: <B 1 1>", 1);
        let plain = learned(&mut arena, &mut net, "visual: <A 1 1> <C 2 1>", 1);

        let mut stm = Stm::new(Modality::Visual, 2, 0);
        stm.add(rich, 10, &arena).unwrap();
        stm.add(b, 20, &arena).unwrap();
        // [plain, b] after truncation drops `rich`, which comes back at the front
        stm.add(plain, 30, &arena).unwrap();

        assert_eq!(stm.items_at(30), &[rich, plain]);
    }

    #[test]
    fn test_root_never_compatible() {
        let (mut arena, mut net) = setup();
        let rich = learned(&mut arena, &mut net, "visual: <A 1 1>", 5);

        let mut stm = Stm::new(Modality::Visual, 4, 0);
        stm.add(rich, 10, &arena).unwrap();
        stm.add(net.root(), 20, &arena).unwrap();

        assert_eq!(stm.hypothesis_at(20), Some(net.root()));
    }

    #[test]
    fn test_replace_hypothesis_and_clear() {
        let (mut arena, mut net) = setup();
        let a = learned(&mut arena, &mut net, "visual: <A 1 1>", 1);
        let b = learned(&mut arena, &mut net, "visual: <B 1 1>", 1);
        let c = learned(&mut arena, &mut net, "visual: <C 1 1>", 1);

        let mut stm = Stm::new(Modality::Visual, 3, 0);
        stm.add(a, 10, &arena).unwrap();
        stm.add(b, 20, &arena).unwrap();
        stm.add(c, 30, &arena).unwrap();

        stm.replace_hypothesis(a, 40).unwrap();
        assert_eq!(stm.items_at(40), &[a, c, b]);

        stm.clear(50).unwrap();
        assert_eq!(stm.len_at(50), 0);
        assert_eq!(stm.len_at(49), 3);
    }

    #[test]
    fn test_set_capacity_truncates() {
        let (mut arena, mut net) = setup();
        let a = learned(&mut arena, &mut net, "visual: <A 1 1>", 1);
        let b = learned(&mut arena, &mut net, "visual: <B 1 1>", 1);

        let mut stm = Stm::new(Modality::Visual, 3, 0);
        stm.add(a, 10, &arena).unwrap();
        stm.add(b, 20, &arena).unwrap();
        stm.set_capacity(1, 30).unwrap();

        assert_eq!(stm.capacity_at(30), 1);
        assert_eq!(stm.capacity_at(29), 3);
        assert_eq!(stm.items_at(30), &[b]);
    }

    #[test]
    fn test_write_in_past_rejected() {
        let (mut arena, mut net) = setup();
        let a = learned(&mut arena, &mut net, "visual: <A 1 1>", 1);
        let b = learned(&mut arena, &mut net, "visual: <B 1 1>", 1);

        let mut stm = Stm::new(Modality::Visual, 3, 0);
        stm.add(a, 10, &arena).unwrap();
        assert!(stm.add(b, 5, &arena).is_err());
        assert_eq!(stm.items_at(10), &[a]);
    }
}
