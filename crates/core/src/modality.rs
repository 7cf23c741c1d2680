//! Modalities and per-modality storage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Sensory/motor channel a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Visual,
    Verbal,
    Action,
}

impl Modality {
    /// Every modality, in network order
    pub const ALL: [Modality; 3] = [Modality::Visual, Modality::Verbal, Modality::Action];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Visual => "visual",
            Modality::Verbal => "verbal",
            Modality::Action => "action",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visual" | "v" => Ok(Modality::Visual),
            "verbal" | "w" => Ok(Modality::Verbal),
            "action" | "a" => Ok(Modality::Action),
            other => Err(format!("unknown modality: {}", other)),
        }
    }
}

/// One value per modality
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModalityMap<T> {
    pub visual: T,
    pub verbal: T,
    pub action: T,
}

impl<T> ModalityMap<T> {
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Modality) -> T,
    {
        Self {
            visual: f(Modality::Visual),
            verbal: f(Modality::Verbal),
            action: f(Modality::Action),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Modality, &T)> {
        Modality::ALL.into_iter().map(move |m| (m, &self[m]))
    }

    pub fn map<U, F>(&self, mut f: F) -> ModalityMap<U>
    where
        F: FnMut(Modality, &T) -> U,
    {
        ModalityMap::from_fn(|m| f(m, &self[m]))
    }
}

impl<T> Index<Modality> for ModalityMap<T> {
    type Output = T;

    fn index(&self, modality: Modality) -> &T {
        match modality {
            Modality::Visual => &self.visual,
            Modality::Verbal => &self.verbal,
            Modality::Action => &self.action,
        }
    }
}

impl<T> IndexMut<Modality> for ModalityMap<T> {
    fn index_mut(&mut self, modality: Modality) -> &mut T {
        match modality {
            Modality::Visual => &mut self.visual,
            Modality::Verbal => &mut self.verbal,
            Modality::Action => &mut self.action,
        }
    }
}
