use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::statement::Action;

/// A match line within a route-map clause.
///
/// `PrefixList` and `AddressList` are the list-style matches: multiple
/// list-style lines in one clause are alternatives (OR), mirroring the
/// source vendor's semantics. Every other line is a requirement (AND).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchLine {
    PrefixList(String),
    AddressList(String),
    Tag(u32),
    Metric(u64),
    Community(String),
    AsPath(String),
}

impl MatchLine {
    #[must_use]
    pub fn is_list_style(&self) -> bool {
        matches!(self, MatchLine::PrefixList(_) | MatchLine::AddressList(_))
    }
}

/// A set line within a route-map clause, applied in declaration order on
/// a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetLine {
    Metric(u64),
    LocalPreference(u64),
    Tag(u32),
    Weight(u32),
    NextHop(Ipv4Addr),
    Community {
        communities: BTreeSet<u32>,
        additive: bool,
    },
}

/// A continue directive: jump to the next clause in sequence, or to an
/// explicitly numbered later clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continue {
    Next,
    To(u32),
}

/// One numbered entry of a route-map. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub seq: u32,
    pub action: Action,
    pub matches: Vec<MatchLine>,
    pub sets: Vec<SetLine>,
    pub continue_to: Option<Continue>,
}

impl Clause {
    #[must_use]
    pub fn new(seq: u32, action: Action) -> Self {
        Self {
            seq,
            action,
            matches: Vec::new(),
            sets: Vec::new(),
            continue_to: None,
        }
    }

    #[must_use]
    pub fn matching(mut self, line: MatchLine) -> Self {
        self.matches.push(line);
        self
    }

    #[must_use]
    pub fn setting(mut self, line: SetLine) -> Self {
        self.sets.push(line);
        self
    }

    #[must_use]
    pub fn continues(mut self, c: Continue) -> Self {
        self.continue_to = Some(c);
        self
    }
}

/// A named route-map: ordered clauses keyed by sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMap {
    pub name: String,
    pub clauses: BTreeMap<u32, Clause>,
}

impl RouteMap {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clauses: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.insert(clause.seq, clause);
        self
    }

    /// Whether any clause carries a continue directive. Decides the
    /// compilation strategy.
    #[must_use]
    pub fn has_continue(&self) -> bool {
        self.clauses.values().any(|c| c.continue_to.is_some())
    }
}
