//! Versioned attribute - time-indexed, append-only state
//!
//! Every mutable field of a node, an STM or a network is held in a
//! [`Versioned`] so that "what did it look like at time T" is answerable
//! for the whole model without per-field bookkeeping.
//!
//! Rules:
//! - `put` appends a new state at a logical time
//! - `get` is a floor lookup (greatest recorded time <= query)
//! - recorded history is never rewritten

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::Time;

/// Versioned attribute errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("write at {attempted} would rewrite history recorded up to {recorded}")]
    HistoryRewrite { attempted: Time, recorded: Time },
}

/// Append-only history of a value
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    states: BTreeMap<Time, T>,
}

impl<T> Default for Versioned<T> {
    fn default() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Versioned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.states.iter()).finish()
    }
}

impl<T> Versioned<T> {
    /// Empty history; every `get` returns `None` until the first `put`
    pub fn empty() -> Self {
        Self::default()
    }

    /// History starting with `value` at `time`
    pub fn new(time: Time, value: T) -> Self {
        let mut states = BTreeMap::new();
        states.insert(time, value);
        Self { states }
    }

    /// Value effective at `time`
    pub fn get(&self, time: Time) -> Option<&T> {
        self.states.range(..=time).next_back().map(|(_, value)| value)
    }

    /// Most recent value
    pub fn latest(&self) -> Option<&T> {
        self.states.values().next_back()
    }

    pub fn first_time(&self) -> Option<Time> {
        self.states.keys().next().copied()
    }

    pub fn last_time(&self) -> Option<Time> {
        self.states.keys().next_back().copied()
    }

    /// Number of recorded states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Recorded states in time order
    pub fn history(&self) -> impl Iterator<Item = (Time, &T)> + '_ {
        self.states.iter().map(|(time, value)| (*time, value))
    }

    /// Drop every state recorded after `time`.
    ///
    /// Only for undoing writes that never became visible to anyone.
    pub fn truncate_after(&mut self, time: Time) {
        self.states.retain(|recorded, _| *recorded <= time);
    }
}

impl<T: PartialEq> Versioned<T> {
    /// Record `value` as the state from `time` onwards.
    ///
    /// A write at or before the last recorded time is only accepted when it
    /// changes nothing, i.e. `value` already is the state at `time`.
    pub fn put(&mut self, time: Time, value: T) -> Result<(), VersionError> {
        if let Some(last) = self.last_time() {
            if time <= last {
                return if self.get(time) == Some(&value) {
                    Ok(())
                } else {
                    Err(VersionError::HistoryRewrite {
                        attempted: time,
                        recorded: last,
                    })
                };
            }

            // Same as the current state: nothing new to record
            if self.latest() == Some(&value) {
                return Ok(());
            }
        }

        self.states.insert(time, value);
        Ok(())
    }
}

impl<T: Clone + PartialEq> Versioned<T> {
    /// Derive the next state from the one effective at `time` and record it.
    ///
    /// Returns `Ok(false)` when there is no state at `time` to update.
    pub fn update<F>(&mut self, time: Time, f: F) -> Result<bool, VersionError>
    where
        F: FnOnce(&mut T),
    {
        let mut next = match self.get(time) {
            Some(current) => current.clone(),
            None => return Ok(false),
        };
        f(&mut next);
        self.put(time, next)?;
        Ok(true)
    }
}
