use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use super::statement::Action;

/// Protocols a route can originate from, as seen by policy guards.
///
/// `Bgp`/`Ibgp` form the BGP family checked by transit-export guards;
/// `Aggregate` marks routes synthesized by aggregation rather than learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoutingProtocol {
    Connected,
    Static,
    Rip,
    Ospf,
    Bgp,
    Ibgp,
    Aggregate,
}

impl RoutingProtocol {
    /// The eBGP/iBGP pair, used by export policies to match transit routes.
    #[must_use]
    pub fn bgp_family() -> BTreeSet<RoutingProtocol> {
        [RoutingProtocol::Bgp, RoutingProtocol::Ibgp]
            .into_iter()
            .collect()
    }
}

impl fmt::Display for RoutingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoutingProtocol::Connected => "connected",
            RoutingProtocol::Static => "static",
            RoutingProtocol::Rip => "rip",
            RoutingProtocol::Ospf => "ospf",
            RoutingProtocol::Bgp => "bgp",
            RoutingProtocol::Ibgp => "ibgp",
            RoutingProtocol::Aggregate => "aggregate",
        };
        write!(f, "{s}")
    }
}

/// The route attribute record policies are evaluated against.
///
/// This is the external interface to the simulation engine: guards read
/// these attributes, rewrites produce a modified copy. Communities are
/// plain 32-bit values; the AS path is the ordered ASN sequence with the
/// nearest hop first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub prefix: Ipv4Net,
    pub protocol: RoutingProtocol,
    pub metric: u64,
    pub tag: u32,
    pub local_preference: u64,
    pub weight: u32,
    pub next_hop: Option<Ipv4Addr>,
    pub communities: BTreeSet<u32>,
    pub as_path: Vec<u32>,
}

impl Route {
    /// A route with neutral attributes, convenient as a test/builder base.
    #[must_use]
    pub fn new(prefix: Ipv4Net, protocol: RoutingProtocol) -> Self {
        Self {
            prefix,
            protocol,
            metric: 0,
            tag: 0,
            local_preference: 100,
            weight: 0,
            next_hop: None,
            communities: BTreeSet::new(),
            as_path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: u64) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_communities(mut self, communities: impl IntoIterator<Item = u32>) -> Self {
        self.communities = communities.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_as_path(mut self, as_path: impl IntoIterator<Item = u32>) -> Self {
        self.as_path = as_path.into_iter().collect();
        self
    }
}

/// Result of evaluating a named policy against a route: the terminal
/// action plus the rewritten attribute record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Outcome {
    pub action: Action,
    pub route: Route,
}

impl Outcome {
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.action == Action::Accept
    }
}
