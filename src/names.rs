//! Deterministic registry-name construction.
//!
//! Every generated policy name is a pure function of its scope and
//! qualifiers, so repeated conversion of the same input yields identical
//! names and registry snapshots diff cleanly across runs. The `~`-fenced
//! forms cannot collide with user-written route-map names, which become
//! registry keys verbatim.

use std::net::Ipv4Addr;

use crate::types::RoutingProtocol;

/// Internal sub-policy for one route-map clause.
#[must_use]
pub fn route_map_clause(map: &str, seq: u32) -> String {
    format!("~RM-CLAUSE~{map}~{seq}~")
}

/// VRF-level BGP export policy.
#[must_use]
pub fn bgp_vrf_export(vrf: &str) -> String {
    format!("~BGP-EXPORT~{vrf}~")
}

/// Per-neighbor BGP export overlay.
#[must_use]
pub fn bgp_neighbor_export(vrf: &str, neighbor: Ipv4Addr) -> String {
    format!("~BGP-NEIGHBOR-EXPORT~{vrf}~{neighbor}~")
}

/// Per-neighbor BGP import policy.
#[must_use]
pub fn bgp_neighbor_import(vrf: &str, neighbor: Ipv4Addr) -> String {
    format!("~BGP-NEIGHBOR-IMPORT~{vrf}~{neighbor}~")
}

/// OSPF redistribution policy for one source protocol.
#[must_use]
pub fn ospf_export(vrf: &str, process: &str, source: RoutingProtocol) -> String {
    format!("~OSPF-EXPORT~{vrf}~{process}~{source}~")
}

/// OSPF default-route origination policy.
#[must_use]
pub fn ospf_default_route(vrf: &str, process: &str) -> String {
    format!("~OSPF-DEFAULT-ROUTE~{vrf}~{process}~")
}

/// OSPF distribute-list policy attached to one interface.
#[must_use]
pub fn ospf_distribute_list(vrf: &str, process: &str, interface: &str) -> String {
    format!("~OSPF-DIST-LIST~{vrf}~{process}~{interface}~")
}

/// RIP process export policy.
#[must_use]
pub fn rip_export(vrf: &str) -> String {
    format!("~RIP-EXPORT~{vrf}~")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clause_names_unique_per_map_and_seq() {
        assert_ne!(route_map_clause("M", 10), route_map_clause("M", 20));
        assert_ne!(route_map_clause("M", 10), route_map_clause("N", 10));
    }

    #[test]
    fn names_are_pure_functions() {
        assert_eq!(bgp_vrf_export("default"), bgp_vrf_export("default"));
        assert_eq!(
            ospf_export("v1", "1", RoutingProtocol::Static),
            "~OSPF-EXPORT~v1~1~static~"
        );
    }

    #[test]
    fn neighbor_names_carry_address() {
        let name = bgp_neighbor_export("default", "10.0.0.1".parse().unwrap());
        assert_eq!(name, "~BGP-NEIGHBOR-EXPORT~default~10.0.0.1~");
    }
}
