use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use super::expr::Guard;

/// Terminal disposition of a policy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Accept,
    Reject,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Accept => write!(f, "accept"),
            Action::Reject => write!(f, "reject"),
        }
    }
}

/// An attribute mutation applied to the output route record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrRewrite {
    Metric(u64),
    LocalPreference(u64),
    Tag(u32),
    Weight(u32),
    NextHop(Ipv4Addr),
    /// Add to the existing community set.
    AddCommunities(BTreeSet<u32>),
    /// Replace the community set.
    SetCommunities(BTreeSet<u32>),
    /// Strip private ASNs (64512-65534) from the AS path.
    RemovePrivateAs,
}

/// One step of a compiled policy, consumed in order.
///
/// `Accept`/`Reject` terminate the whole evaluation. `FallThrough`
/// terminates with whatever default action is currently in effect
/// (`SetDefault` changes it, and the default is shared across `Call`
/// boundaries so an earlier clause's accept intent survives a jump).
/// A `Call` whose callee falls through lets the caller continue past the
/// call; a terminal in the callee propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    If {
        guard: Guard,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    /// Invoke another named policy from the registry.
    Call(String),
    Set(AttrRewrite),
    SetDefault(Action),
    Accept,
    Reject,
    FallThrough,
}

impl Statement {
    /// Shorthand for a guarded branch with no else part.
    #[must_use]
    pub fn when(guard: Guard, then_branch: Vec<Statement>) -> Self {
        Statement::If {
            guard,
            then_branch,
            else_branch: Vec::new(),
        }
    }
}
