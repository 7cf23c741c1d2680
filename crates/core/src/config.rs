//! Model configuration
//!
//! Loaded from YAML; every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::modality::{Modality, ModalityMap};
use crate::Time;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Learning parameters and durations of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Probability that a learning opportunity is taken
    #[serde(default = "default_rho")]
    pub rho: f64,

    /// Shared image symbols needed before two nodes are semantically linked
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: usize,

    /// Minimum contents length of a template
    #[serde(default = "default_minimum_template_level")]
    pub minimum_template_level: usize,

    /// Occurrences an item or position needs to become a slot
    #[serde(default = "default_minimum_occurrences")]
    pub minimum_item_or_position_occurrences: usize,

    /// Hops followed when looking for a more informative node
    #[serde(default = "default_semantic_distance")]
    pub maximum_semantic_link_search_distance: usize,

    /// STM capacity per modality
    #[serde(default)]
    pub stm_capacity: StmCapacities,

    /// Operation durations
    #[serde(default)]
    pub durations: Durations,

    /// Seed for the learning-probability draws
    #[serde(default)]
    pub seed: u64,
}

fn default_rho() -> f64 {
    1.0
}

fn default_similarity_threshold() -> usize {
    4
}

fn default_minimum_template_level() -> usize {
    3
}

fn default_minimum_occurrences() -> usize {
    2
}

fn default_semantic_distance() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            rho: default_rho(),
            similarity_threshold: default_similarity_threshold(),
            minimum_template_level: default_minimum_template_level(),
            minimum_item_or_position_occurrences: default_minimum_occurrences(),
            maximum_semantic_link_search_distance: default_semantic_distance(),
            stm_capacity: StmCapacities::default(),
            durations: Durations::default(),
            seed: 0,
        }
    }
}

impl ModelConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!("Loaded model config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.rho) {
            return Err(ConfigError::Invalid(format!(
                "rho must be within [0, 1], got {}",
                self.rho
            )));
        }

        // Stamps inside one operation must advance, or writes collide
        let d = &self.durations;
        for (name, value) in [
            ("discrimination_time", d.discrimination_time),
            ("familiarisation_time", d.familiarisation_time),
            ("stm_node_addition_time", d.stm_node_addition_time),
            ("reinforcement_time", d.reinforcement_time),
            ("association_time", d.association_time),
            ("template_construction_time", d.template_construction_time),
        ] {
            if value < 1 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        if d.ltm_link_traversal_time < 0 {
            return Err(ConfigError::Invalid(
                "ltm_link_traversal_time cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// STM capacity per modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StmCapacities {
    #[serde(default = "default_visual_stm")]
    pub visual: usize,

    #[serde(default = "default_verbal_stm")]
    pub verbal: usize,

    #[serde(default = "default_action_stm")]
    pub action: usize,
}

fn default_visual_stm() -> usize {
    4
}

fn default_verbal_stm() -> usize {
    2
}

fn default_action_stm() -> usize {
    4
}

impl Default for StmCapacities {
    fn default() -> Self {
        Self {
            visual: default_visual_stm(),
            verbal: default_verbal_stm(),
            action: default_action_stm(),
        }
    }
}

impl StmCapacities {
    pub fn get(&self, modality: Modality) -> usize {
        match modality {
            Modality::Visual => self.visual,
            Modality::Verbal => self.verbal,
            Modality::Action => self.action,
        }
    }

    pub fn as_map(&self) -> ModalityMap<usize> {
        ModalityMap::from_fn(|m| self.get(m))
    }
}

/// Durations of the timed operations, in logical time units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Durations {
    #[serde(default = "default_link_traversal")]
    pub ltm_link_traversal_time: Time,

    #[serde(default = "default_stm_addition")]
    pub stm_node_addition_time: Time,

    #[serde(default = "default_discrimination")]
    pub discrimination_time: Time,

    #[serde(default = "default_familiarisation")]
    pub familiarisation_time: Time,

    #[serde(default = "default_reinforcement")]
    pub reinforcement_time: Time,

    #[serde(default = "default_association")]
    pub association_time: Time,

    #[serde(default = "default_template_construction")]
    pub template_construction_time: Time,
}

fn default_link_traversal() -> Time {
    10
}

fn default_stm_addition() -> Time {
    50
}

fn default_discrimination() -> Time {
    10_000
}

fn default_familiarisation() -> Time {
    2_000
}

fn default_reinforcement() -> Time {
    100
}

fn default_association() -> Time {
    100
}

fn default_template_construction() -> Time {
    100
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            ltm_link_traversal_time: default_link_traversal(),
            stm_node_addition_time: default_stm_addition(),
            discrimination_time: default_discrimination(),
            familiarisation_time: default_familiarisation(),
            reinforcement_time: default_reinforcement(),
            association_time: default_association(),
            template_construction_time: default_template_construction(),
        }
    }
}
