use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Not, RangeInclusive};

use ipnet::Ipv4Net;

use super::route::RoutingProtocol;

/// A prefix and an allowed prefix-length window.
///
/// A route's prefix falls inside the range when it is contained in
/// `prefix` and its length lies within `lengths`. The window makes both
/// exact matches and "strictly more specific" matches expressible with
/// one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRange {
    pub prefix: Ipv4Net,
    pub lengths: RangeInclusive<u8>,
}

impl PrefixRange {
    /// Match exactly this prefix.
    #[must_use]
    pub fn exact(prefix: Ipv4Net) -> Self {
        let len = prefix.prefix_len();
        Self {
            prefix,
            lengths: len..=len,
        }
    }

    /// Match routes strictly more specific than this prefix.
    /// Empty for a /32, which has no more-specific routes.
    #[must_use]
    pub fn more_specific(prefix: Ipv4Net) -> Self {
        Self {
            lengths: prefix.prefix_len() + 1..=32,
            prefix,
        }
    }

    /// Match within an explicit length window.
    #[must_use]
    pub fn with_lengths(prefix: Ipv4Net, lengths: RangeInclusive<u8>) -> Self {
        Self { prefix, lengths }
    }

    #[must_use]
    pub fn matches(&self, candidate: Ipv4Net) -> bool {
        self.prefix.contains(&candidate) && self.lengths.contains(&candidate.prefix_len())
    }
}

impl fmt::Display for PrefixRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}",
            self.prefix,
            self.lengths.start(),
            self.lengths.end()
        )
    }
}

/// Boolean guard expression over route attributes.
///
/// Leaves either inspect the route directly or reference a named object
/// (prefix list, community list, AS-path set, another policy) by string
/// key. Named references are late-bound: they are resolved against the
/// registry or object table at evaluation time, and an undefined name
/// evaluates permissively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Constant(bool),
    /// Membership in a named prefix list.
    MatchPrefixList(String),
    /// Membership in a named access list applied as a route filter.
    /// Same resolution and permissive-default rules as a prefix list.
    MatchAddressList(String),
    /// Structural prefix match against inline ranges.
    MatchPrefixSpace(Vec<PrefixRange>),
    MatchTag(u32),
    MatchMetric(u64),
    MatchProtocol(BTreeSet<RoutingProtocol>),
    MatchCommunityList(String),
    MatchAsPathSet(String),
    /// Invoke a named policy as a boolean: true on accept, false on
    /// reject; side effects (attribute rewrites) apply to the output.
    Policy(String),
    /// Evaluate the inner guard reading the partially rewritten
    /// attributes instead of the original input. Scopes the
    /// read-rewrites view to exactly this subtree.
    WithIntermediateAttrs(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
    Not(Box<Guard>),
}

impl Guard {
    /// Conjunction, flattening when the receiver is already an `All`.
    #[must_use]
    pub fn and(self, other: Guard) -> Guard {
        match self {
            Guard::All(mut parts) => {
                parts.push(other);
                Guard::All(parts)
            }
            leaf => Guard::All(vec![leaf, other]),
        }
    }

    /// Disjunction, flattening when the receiver is already an `Any`.
    #[must_use]
    pub fn or(self, other: Guard) -> Guard {
        match self {
            Guard::Any(mut parts) => {
                parts.push(other);
                Guard::Any(parts)
            }
            leaf => Guard::Any(vec![leaf, other]),
        }
    }

    /// Collapse a conjunct list: empty means always-true, a single
    /// element needs no `All` wrapper.
    #[must_use]
    pub fn all(mut parts: Vec<Guard>) -> Guard {
        match parts.len() {
            0 => Guard::Constant(true),
            1 => parts.remove(0),
            _ => Guard::All(parts),
        }
    }

    #[must_use]
    pub fn any(mut parts: Vec<Guard>) -> Guard {
        match parts.len() {
            0 => Guard::Constant(false),
            1 => parts.remove(0),
            _ => Guard::Any(parts),
        }
    }
}

impl Not for Guard {
    type Output = Guard;

    fn not(self) -> Guard {
        Guard::Not(Box::new(self))
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Constant(b) => write!(f, "{b}"),
            Guard::MatchPrefixList(name) => write!(f, "prefix-list {name}"),
            Guard::MatchAddressList(name) => write!(f, "address-list {name}"),
            Guard::MatchPrefixSpace(ranges) => {
                write!(f, "prefix in [")?;
                for (i, r) in ranges.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{r}")?;
                }
                write!(f, "]")
            }
            Guard::MatchTag(tag) => write!(f, "tag == {tag}"),
            Guard::MatchMetric(metric) => write!(f, "metric == {metric}"),
            Guard::MatchProtocol(protocols) => {
                write!(f, "protocol in {{")?;
                for (i, p) in protocols.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "}}")
            }
            Guard::MatchCommunityList(name) => write!(f, "community-list {name}"),
            Guard::MatchAsPathSet(name) => write!(f, "as-path {name}"),
            Guard::Policy(name) => write!(f, "policy {name}"),
            Guard::WithIntermediateAttrs(inner) => write!(f, "intermediate({inner})"),
            Guard::All(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Guard::Any(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Guard::Not(inner) => write!(f, "(NOT {inner})"),
        }
    }
}
