//! CHREST Core - primitives of the memory engine
//!
//! Contains:
//! - Versioned: time-indexed, append-only attribute history
//! - Modality / ModalityMap: channels and per-channel storage
//! - Pattern / Symbol: the input language
//! - DomainSpecifics: pattern normalisation supplied by the task domain
//! - ModelConfig: learning parameters and durations

pub mod config;
pub mod domain;
pub mod modality;
pub mod pattern;
pub mod versioned;

pub use config::{ConfigError, Durations, ModelConfig, StmCapacities};
pub use domain::{DomainSpecifics, GenericDomain, SortedDomain};
pub use modality::{Modality, ModalityMap};
pub use pattern::{Pattern, PatternParseError, Symbol};
pub use versioned::{VersionError, Versioned};

/// Logical simulation time
pub type Time = i64;
