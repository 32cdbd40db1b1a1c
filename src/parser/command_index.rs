//! Hierarchical command positions.
//!
//! A command index such as `[2, 0, 5]` names child 5 of child 0 of command 2.
//! Indices are ordered lexicographically, so a parent always sorts before its
//! children, and they can be used directly as map keys.

use crate::utils::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a node in the command tree
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandIndex(Vec<u64>);

impl CommandIndex {
    pub fn new(indices: Vec<u64>) -> Self {
        Self(indices)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Depth of the node in the command tree (roots are at depth 1)
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Last component, i.e. the position among its siblings
    pub fn last(&self) -> Option<u64> {
        self.0.last().copied()
    }

    /// All non-empty prefixes, from the full index down to the root
    ///
    /// **Public** - drives the ancestor expansion of the merger
    pub fn prefixes(&self) -> impl Iterator<Item = CommandIndex> + '_ {
        (1..=self.0.len())
            .rev()
            .map(move |end| Self(self.0[..end].to_vec()))
    }
}

impl From<Vec<u64>> for CommandIndex {
    fn from(indices: Vec<u64>) -> Self {
        Self(indices)
    }
}

impl From<&[u64]> for CommandIndex {
    fn from(indices: &[u64]) -> Self {
        Self(indices.to_vec())
    }
}

/// Canonical text form: comma-joined integers, e.g. `2,0,5`
impl fmt::Display for CommandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}

impl FromStr for CommandIndex {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }

        s.split(',')
            .map(|part| {
                part.trim().parse::<u64>().map_err(|e| {
                    ParseError::InvalidFormat(format!("Invalid command index '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}
