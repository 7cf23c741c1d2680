//! Domain specifics - how a task domain normalises patterns
//!
//! The memory engine never decides what a "normal" pattern looks like; it
//! asks the domain before storing contents or images.

use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::pattern::{Pattern, Symbol};

/// Domain hook applied to every pattern before storage
pub trait DomainSpecifics: Debug {
    fn normalise(&self, pattern: &Pattern) -> Pattern;
}

/// Leaves patterns untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDomain;

impl DomainSpecifics for GenericDomain {
    fn normalise(&self, pattern: &Pattern) -> Pattern {
        pattern.clone()
    }
}

/// Spatial domains where symbol order carries no meaning: symbols are
/// ordered by (row, column, item) and duplicates dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct SortedDomain;

impl DomainSpecifics for SortedDomain {
    fn normalise(&self, pattern: &Pattern) -> Pattern {
        let unique: BTreeSet<_> = pattern
            .symbols()
            .iter()
            .map(|s| (s.row, s.column, s.item.clone()))
            .collect();

        let mut normalised = Pattern::new(pattern.modality());
        for (row, column, item) in unique {
            normalised.push(Symbol::new(item, column, row));
        }
        normalised.set_finished(pattern.is_finished());
        normalised
    }
}
