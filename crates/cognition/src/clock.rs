//! Resource clocks - simulated competition between cognitive resources
//!
//! Each resource records the earliest logical time at which it is free
//! again. A gated operation runs only if its resource is free at the call
//! time; otherwise it is refused without any effect.

use chrest_core::Time;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A serialised cognitive resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Attention,
    Cognition,
    Perception,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Attention, Resource::Cognition, Resource::Perception];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Attention => "attention",
            Resource::Cognition => "cognition",
            Resource::Perception => "perception",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refusal because a resource is still busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{resource} is busy until {free_at} (requested at {requested})")]
pub struct ResourceBusy {
    pub resource: Resource,
    pub free_at: Time,
    pub requested: Time,
}

/// Earliest free time of every resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceClocks {
    pub attention: Time,
    pub cognition: Time,
    pub perception: Time,
}

impl ResourceClocks {
    /// All resources free from `time`
    pub fn new(time: Time) -> Self {
        Self {
            attention: time,
            cognition: time,
            perception: time,
        }
    }

    pub fn free_at(&self, resource: Resource) -> Time {
        match resource {
            Resource::Attention => self.attention,
            Resource::Cognition => self.cognition,
            Resource::Perception => self.perception,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut Time {
        match resource {
            Resource::Attention => &mut self.attention,
            Resource::Cognition => &mut self.cognition,
            Resource::Perception => &mut self.perception,
        }
    }

    pub fn is_free(&self, resource: Resource, time: Time) -> bool {
        self.free_at(resource) <= time
    }

    pub fn ensure_free(&self, resource: Resource, time: Time) -> Result<(), ResourceBusy> {
        if self.is_free(resource, time) {
            Ok(())
        } else {
            Err(ResourceBusy {
                resource,
                free_at: self.free_at(resource),
                requested: time,
            })
        }
    }

    /// Mark the resource busy until `time`; clocks never move backwards
    pub fn advance_to(&mut self, resource: Resource, time: Time) {
        let slot = self.slot(resource);
        if time > *slot {
            *slot = time;
        }
    }

    /// Check and occupy the resource for `cost` starting at `time`
    pub fn try_acquire(&mut self, resource: Resource, time: Time, cost: Time) -> Result<Time, ResourceBusy> {
        self.ensure_free(resource, time)?;
        let until = time + cost;
        self.advance_to(resource, until);
        Ok(until)
    }

    pub fn reset(&mut self, time: Time) {
        *self = Self::new(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_and_busy() {
        let mut clocks = ResourceClocks::new(0);
        assert!(clocks.is_free(Resource::Cognition, 0));

        assert_eq!(clocks.try_acquire(Resource::Cognition, 10, 100), Ok(110));
        assert!(!clocks.is_free(Resource::Cognition, 109));
        assert!(clocks.is_free(Resource::Cognition, 110));
        // other clocks untouched
        assert!(clocks.is_free(Resource::Attention, 0));
    }

    #[test]
    fn test_busy_acquire_is_noop() {
        let mut clocks = ResourceClocks::new(0);
        clocks.try_acquire(Resource::Perception, 0, 50).unwrap();

        let err = clocks.try_acquire(Resource::Perception, 20, 5).unwrap_err();
        assert_eq!(
            err,
            ResourceBusy {
                resource: Resource::Perception,
                free_at: 50,
                requested: 20
            }
        );
        assert_eq!(clocks.free_at(Resource::Perception), 50);
    }

    #[test]
    fn test_advance_never_goes_back() {
        let mut clocks = ResourceClocks::new(0);
        clocks.advance_to(Resource::Attention, 30);
        clocks.advance_to(Resource::Attention, 10);
        assert_eq!(clocks.free_at(Resource::Attention), 30);

        clocks.reset(100);
        for resource in Resource::ALL {
            assert_eq!(clocks.free_at(resource), 100);
        }
    }
}
