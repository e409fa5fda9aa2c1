//! The protocol policy assembler.
//!
//! For each routing process instance (a BGP VRF context, an OSPF process,
//! a RIP process) the assembler synthesizes the named policies the
//! simulation engine will use as that process's export/import/distribute
//! filters, registers them, and reports where each belongs via
//! [`Attachment`] records.

pub mod bgp;
pub mod ospf;
pub mod rip;

use std::fmt;
use std::net::Ipv4Addr;

use crate::types::RoutingProtocol;

/// Where a generated policy belongs on the caller's own records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPoint {
    BgpVrfExport {
        vrf: String,
    },
    BgpNeighborExport {
        vrf: String,
        neighbor: Ipv4Addr,
    },
    BgpNeighborImport {
        vrf: String,
        neighbor: Ipv4Addr,
    },
    OspfExport {
        vrf: String,
        process: String,
        source: RoutingProtocol,
    },
    OspfDefaultRoute {
        vrf: String,
        process: String,
    },
    OspfDistributeList {
        vrf: String,
        process: String,
        interface: String,
    },
    RipExport {
        vrf: String,
    },
}

/// A `(attachment point, policy name)` pair returned to the caller so it
/// can record the policy name on the owning process/neighbor/interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub point: AttachmentPoint,
    pub policy: String,
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.point {
            AttachmentPoint::BgpVrfExport { vrf } => {
                write!(f, "bgp vrf {vrf} export -> {}", self.policy)
            }
            AttachmentPoint::BgpNeighborExport { vrf, neighbor } => {
                write!(f, "bgp vrf {vrf} neighbor {neighbor} export -> {}", self.policy)
            }
            AttachmentPoint::BgpNeighborImport { vrf, neighbor } => {
                write!(f, "bgp vrf {vrf} neighbor {neighbor} import -> {}", self.policy)
            }
            AttachmentPoint::OspfExport {
                vrf,
                process,
                source,
            } => write!(
                f,
                "ospf {process} vrf {vrf} export {source} -> {}",
                self.policy
            ),
            AttachmentPoint::OspfDefaultRoute { vrf, process } => {
                write!(f, "ospf {process} vrf {vrf} default-route -> {}", self.policy)
            }
            AttachmentPoint::OspfDistributeList {
                vrf,
                process,
                interface,
            } => write!(
                f,
                "ospf {process} vrf {vrf} distribute-list {interface} -> {}",
                self.policy
            ),
            AttachmentPoint::RipExport { vrf } => {
                write!(f, "rip vrf {vrf} export -> {}", self.policy)
            }
        }
    }
}
