//! CHREST Cognition - long-term and short-term memory of a learning agent
//!
//! Responsibilities:
//! - Discrimination networks (one per modality) sharing a node arena
//! - Recognition, discrimination and familiarisation
//! - Bounded STMs with a preserved hypothesis
//! - Cross-modal associations, semantic links and templates
//! - Resource clocks gating every cognitive operation
//!
//! Architecture:
//! - Model: owns everything and exposes the operations
//! - Network / NodeArena: tree membership and node storage
//! - Stm: per-modality recency buffer
//! - ResourceClocks: attention, cognition and perception
//! - ModelObserver / AuditSink: passive change reporting

pub mod clock;
pub mod events;
pub mod learning;
pub mod model;
pub mod network;
pub mod node;
pub mod snapshot;
pub mod stm;
pub mod template;

pub use clock::{Resource, ResourceBusy, ResourceClocks};
pub use events::{
    AuditRecord, AuditSink, Change, EventLog, MemoryAuditSink, ModelEvent, ModelObserver,
    TracingAuditSink,
};
pub use learning::{Reinforcement, ScaledReward};
pub use model::{LearningCounters, Model, ModelError};
pub use network::{Network, NetworkError, NodeArena};
pub use node::{Link, Node, NodeError, NodeId, Template};
pub use snapshot::{ModelSnapshot, NodeView, Statistics};
pub use stm::Stm;
pub use template::SlotCandidates;
