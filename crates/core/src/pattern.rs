//! Patterns - ordered item/position symbols tagged with a modality
//!
//! Text form: `visual: <A 1 1> <B 2 1> $`
//! - each symbol is `<item column row>`
//! - a trailing `$` marks the pattern as finished (end delimiter)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::modality::Modality;

/// Pattern parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternParseError {
    #[error("missing modality prefix (expected `visual: ...`)")]
    MissingModality,

    #[error("unknown modality: {0}")]
    UnknownModality(String),

    #[error("malformed symbol: {0}")]
    MalformedSymbol(String),

    #[error("unexpected input after `$`: {0}")]
    TrailingInput(String),
}

/// An item at a position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub item: String,
    pub column: i32,
    pub row: i32,
}

impl Symbol {
    pub fn new(item: impl Into<String>, column: i32, row: i32) -> Self {
        Self {
            item: item.into(),
            column,
            row,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.column, self.row)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {} {}>", self.item, self.column, self.row)
    }
}

impl FromStr for Symbol {
    type Err = PatternParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PatternParseError::MalformedSymbol(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(malformed)?;

        let parts: Vec<&str> = inner.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(malformed());
        }
        let column = parts[1].parse().map_err(|_| malformed())?;
        let row = parts[2].parse().map_err(|_| malformed())?;
        Ok(Symbol::new(parts[0], column, row))
    }
}

/// Ordered list of symbols in one modality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    modality: Modality,
    symbols: Vec<Symbol>,
    finished: bool,
}

impl Pattern {
    /// Empty, unfinished pattern
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            symbols: Vec::new(),
            finished: false,
        }
    }

    pub fn with_symbols(modality: Modality, symbols: Vec<Symbol>) -> Self {
        Self {
            modality,
            symbols,
            finished: false,
        }
    }

    /// The end-of-pattern delimiter `<$>`: no symbols, finished
    pub fn delimiter(modality: Modality) -> Self {
        Self::new(modality).finished()
    }

    /// Builder form of `set_finished(true)`
    pub fn finished(mut self) -> Self {
        self.finished = true;
        self
    }

    /// Builder form of `set_finished(false)`
    pub fn unfinished(mut self) -> Self {
        self.finished = false;
        self
    }

    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    pub fn push(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of symbols (the delimiter does not count)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when there are no symbols, finished or not
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// True when `self` is a prefix of `other`.
    ///
    /// A finished pattern only matches a finished pattern of the same length.
    pub fn matches(&self, other: &Pattern) -> bool {
        if self.modality != other.modality {
            return false;
        }
        if self.finished {
            if !other.finished || self.len() != other.len() {
                return false;
            }
        } else if self.len() > other.len() {
            return false;
        }
        self.symbols
            .iter()
            .zip(other.symbols.iter())
            .all(|(mine, theirs)| mine == theirs)
    }

    /// Symbols of `self` not present in `other`, in order.
    ///
    /// Each symbol of `other` cancels at most one occurrence. The result is
    /// finished when `self` is finished and `other` is not.
    pub fn remove(&self, other: &Pattern) -> Pattern {
        let mut pending: Vec<&Symbol> = other.symbols.iter().collect();
        let mut symbols = Vec::with_capacity(self.symbols.len());

        for symbol in &self.symbols {
            if let Some(index) = pending.iter().position(|p| *p == symbol) {
                pending.swap_remove(index);
            } else {
                symbols.push(symbol.clone());
            }
        }

        Pattern {
            modality: self.modality,
            symbols,
            finished: self.finished && !other.finished,
        }
    }

    /// `self ++ other`; finished when `other` is
    pub fn append(&self, other: &Pattern) -> Pattern {
        let mut symbols = self.symbols.clone();
        symbols.extend(other.symbols.iter().cloned());
        Pattern {
            modality: self.modality,
            symbols,
            finished: other.finished,
        }
    }

    /// Unfinished pattern holding only the first symbol (empty if none)
    pub fn first_symbol(&self) -> Pattern {
        Pattern {
            modality: self.modality,
            symbols: self.symbols.iter().take(1).cloned().collect(),
            finished: false,
        }
    }

    /// Number of symbols shared with `other`
    pub fn overlap(&self, other: &Pattern) -> usize {
        let common = self.remove(other);
        self.len() - common.len()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.modality)?;
        for symbol in &self.symbols {
            write!(f, " {}", symbol)?;
        }
        if self.finished {
            write!(f, " $")?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = PatternParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, body) = s.split_once(':').ok_or(PatternParseError::MissingModality)?;
        let modality: Modality = prefix
            .parse()
            .map_err(|_| PatternParseError::UnknownModality(prefix.trim().to_string()))?;

        let mut pattern = Pattern::new(modality);
        let mut rest = body.trim();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('$') {
                if !after.trim().is_empty() {
                    return Err(PatternParseError::TrailingInput(after.trim().to_string()));
                }
                pattern.finished = true;
                break;
            }

            let end = rest
                .find('>')
                .ok_or_else(|| PatternParseError::MalformedSymbol(rest.to_string()))?;
            pattern.push(rest[..=end].parse()?);
            rest = rest[end + 1..].trim_start();
        }

        Ok(pattern)
    }
}
