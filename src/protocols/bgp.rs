//! BGP policy assembly: one export policy per VRF context, plus
//! per-neighbor export/import overlays.
//!
//! The VRF export policy is a single top-level
//! `If(Any(export reasons), accept, reject)`, optionally preceded by a
//! summary-only suppression statement and by per-reason attribute
//! rewrites. Each export reason is built independently; their order in
//! the OR is stable (aggregates, redistributions, networks, transit) so
//! identical input compiles to identical policies.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::debug;

use super::{Attachment, AttachmentPoint};
use crate::inherit::{first_of, first_of_or};
use crate::names;
use crate::types::{
    AttrRewrite, ConvertError, Guard, ObjectTable, Policy, PolicyRegistry, PrefixRange,
    RoutingProtocol, Statement, Warnings,
};

/// A configured route aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub prefix: Ipv4Net,
    /// Suppress routes more specific than the aggregate.
    pub summary_only: bool,
    /// Route-map rewriting the synthesized aggregate's attributes.
    pub attribute_map: Option<String>,
}

/// One enabled redistribution source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redistribution {
    pub route_map: Option<String>,
    pub metric: Option<u64>,
}

/// An explicitly configured network statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkStatement {
    pub prefix: Ipv4Net,
    pub route_map: Option<String>,
}

/// Neighbor-scoped settings; every field is optional so the same shape
/// serves as a peer-group template layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSettings {
    pub export_route_map: Option<String>,
    pub export_prefix_list: Option<String>,
    pub import_route_map: Option<String>,
    pub import_prefix_list: Option<String>,
    pub next_hop_self: Option<bool>,
    pub remove_private_as: Option<bool>,
    /// Source address used when rewriting next-hop to self.
    pub update_source: Option<Ipv4Addr>,
}

/// One configured neighbor, possibly inheriting from a peer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub address: Ipv4Addr,
    pub peer_group: Option<String>,
    pub settings: PeerSettings,
}

/// One BGP VRF context as produced by the parsing layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BgpVrfConfig {
    pub vrf: String,
    pub aggregates: Vec<Aggregate>,
    pub redistribution: BTreeMap<RoutingProtocol, Redistribution>,
    pub networks: Vec<NetworkStatement>,
    pub neighbors: Vec<Neighbor>,
    pub peer_groups: BTreeMap<String, PeerSettings>,
}

impl BgpVrfConfig {
    #[must_use]
    pub fn new(vrf: impl Into<String>) -> Self {
        Self {
            vrf: vrf.into(),
            ..Self::default()
        }
    }

    /// Resolve a neighbor's effective settings through the override
    /// layers: neighbor first, then its peer group.
    fn resolve(&self, neighbor: &Neighbor, warnings: &mut Warnings) -> PeerSettings {
        let group = match &neighbor.peer_group {
            None => None,
            Some(name) => {
                let group = self.peer_groups.get(name);
                if group.is_none() {
                    warnings.warn(format!(
                        "bgp vrf '{}': neighbor {} references undefined peer group '{name}'",
                        self.vrf, neighbor.address
                    ));
                }
                group
            }
        };
        let own = &neighbor.settings;
        PeerSettings {
            export_route_map: first_of([
                own.export_route_map.clone(),
                group.and_then(|g| g.export_route_map.clone()),
            ]),
            export_prefix_list: first_of([
                own.export_prefix_list.clone(),
                group.and_then(|g| g.export_prefix_list.clone()),
            ]),
            import_route_map: first_of([
                own.import_route_map.clone(),
                group.and_then(|g| g.import_route_map.clone()),
            ]),
            import_prefix_list: first_of([
                own.import_prefix_list.clone(),
                group.and_then(|g| g.import_prefix_list.clone()),
            ]),
            next_hop_self: first_of([own.next_hop_self, group.and_then(|g| g.next_hop_self)]),
            remove_private_as: first_of([
                own.remove_private_as,
                group.and_then(|g| g.remove_private_as),
            ]),
            update_source: first_of([own.update_source, group.and_then(|g| g.update_source)]),
        }
    }
}

/// Assemble and register all policies for one BGP VRF context.
///
/// # Errors
///
/// Only internal invariant violations; configuration defects degrade
/// with warnings.
pub fn convert_bgp(
    config: &BgpVrfConfig,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<Vec<Attachment>, ConvertError> {
    let mut attachments = Vec::new();

    let export_name = vrf_export_policy(config, registry, warnings)?;
    attachments.push(Attachment {
        point: AttachmentPoint::BgpVrfExport {
            vrf: config.vrf.clone(),
        },
        policy: export_name.clone(),
    });

    for neighbor in &config.neighbors {
        let settings = config.resolve(neighbor, warnings);

        let name = neighbor_export_policy(
            config,
            neighbor.address,
            &settings,
            &export_name,
            objects,
            registry,
            warnings,
        )?;
        attachments.push(Attachment {
            point: AttachmentPoint::BgpNeighborExport {
                vrf: config.vrf.clone(),
                neighbor: neighbor.address,
            },
            policy: name,
        });

        if let Some(name) =
            neighbor_import_policy(config, neighbor.address, &settings, objects, registry, warnings)?
        {
            attachments.push(Attachment {
                point: AttachmentPoint::BgpNeighborImport {
                    vrf: config.vrf.clone(),
                    neighbor: neighbor.address,
                },
                policy: name,
            });
        }
    }

    Ok(attachments)
}

fn vrf_export_policy(
    config: &BgpVrfConfig,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<String, ConvertError> {
    let name = names::bgp_vrf_export(&config.vrf);
    let mut statements = Vec::new();

    // Suppression must short-circuit before any export reason runs.
    let suppressed: Vec<PrefixRange> = config
        .aggregates
        .iter()
        .filter(|a| a.summary_only)
        .map(|a| PrefixRange::more_specific(a.prefix))
        .collect();
    if !suppressed.is_empty() {
        statements.push(Statement::when(
            Guard::MatchPrefixSpace(suppressed)
                .and(!Guard::MatchProtocol([RoutingProtocol::Aggregate].into_iter().collect())),
            vec![Statement::Reject],
        ));
    }

    let mut reasons = Vec::new();

    for aggregate in &config.aggregates {
        let mut parts = vec![
            Guard::MatchPrefixSpace(vec![PrefixRange::exact(aggregate.prefix)]),
            Guard::MatchProtocol([RoutingProtocol::Aggregate].into_iter().collect()),
        ];
        if let Some(map) = &aggregate.attribute_map {
            if registry.contains(map) {
                parts.push(Guard::Policy(map.clone()));
            } else {
                // Keep the reason, drop the rewrite.
                warnings.warn(format!(
                    "bgp vrf '{}': aggregate {} references undefined attribute-map '{map}'; \
                     exporting the aggregate without it",
                    config.vrf, aggregate.prefix
                ));
            }
        }
        reasons.push(Guard::all(parts));
    }

    for (protocol, redistribution) in &config.redistribution {
        let protocol_guard = Guard::MatchProtocol([*protocol].into_iter().collect());
        let mut parts = vec![protocol_guard.clone()];
        match &redistribution.route_map {
            Some(map) if !registry.contains(map) => {
                // A wholly undefined redistribution map must not export
                // routes with unintended attributes; skip the reason.
                warnings.warn(format!(
                    "bgp vrf '{}': redistribute {protocol} references undefined route-map '{map}'; \
                     skipping this redistribution",
                    config.vrf
                ));
                continue;
            }
            Some(map) => {
                parts.push(Guard::WithIntermediateAttrs(Box::new(Guard::Policy(
                    map.clone(),
                ))));
            }
            None => {}
        }
        if let Some(metric) = redistribution.metric {
            // Rewrite scoped to this one reason, ahead of the OR so the
            // bracketed route-map call sees it.
            statements.push(Statement::when(
                protocol_guard,
                vec![Statement::Set(AttrRewrite::Metric(metric))],
            ));
        }
        reasons.push(Guard::all(parts));
    }

    for network in &config.networks {
        let mut parts = vec![
            Guard::MatchPrefixSpace(vec![PrefixRange::exact(network.prefix)]),
            !Guard::MatchProtocol(RoutingProtocol::bgp_family()),
        ];
        if let Some(map) = &network.route_map {
            if registry.contains(map) {
                parts.push(Guard::Policy(map.clone()));
            } else {
                warnings.warn(format!(
                    "bgp vrf '{}': network {} references undefined route-map '{map}'; \
                     exporting the network without it",
                    config.vrf, network.prefix
                ));
            }
        }
        reasons.push(Guard::all(parts));
    }

    // Transit: routes already in BGP are always re-exported.
    reasons.push(Guard::MatchProtocol(RoutingProtocol::bgp_family()));

    statements.push(Statement::If {
        guard: Guard::any(reasons),
        then_branch: vec![Statement::Accept],
        else_branch: vec![Statement::Reject],
    });

    debug!(vrf = %config.vrf, policy = %name, "assembled bgp vrf export policy");
    registry.define(Policy::new(name.clone(), statements))?;
    Ok(name)
}

#[allow(clippy::too_many_arguments)]
fn neighbor_export_policy(
    config: &BgpVrfConfig,
    address: Ipv4Addr,
    settings: &PeerSettings,
    export_name: &str,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<String, ConvertError> {
    if !registry.contains(export_name) {
        return Err(ConvertError::MissingReservedPolicy {
            name: export_name.to_owned(),
        });
    }

    let name = names::bgp_neighbor_export(&config.vrf, address);
    // The resolved settings are the last override layer; the ultimate
    // default for both toggles is off.
    let next_hop_self = first_of_or([settings.next_hop_self], false);
    let remove_private_as = first_of_or([settings.remove_private_as], false);
    let has_outbound_filter =
        settings.export_route_map.is_some() || settings.export_prefix_list.is_some();

    if !next_hop_self && !remove_private_as && !has_outbound_filter {
        // Nothing neighbor-specific: the overlay is exactly the VRF
        // policy.
        registry.define(Policy::new(
            name.clone(),
            vec![Statement::Call(export_name.to_owned())],
        ))?;
        return Ok(name);
    }

    let mut then_branch = Vec::new();
    if next_hop_self {
        match settings.update_source {
            Some(source) => then_branch.push(Statement::Set(AttrRewrite::NextHop(source))),
            None => warnings.warn(format!(
                "bgp vrf '{}': neighbor {address} sets next-hop-self without an update source; \
                 leaving next-hop unchanged",
                config.vrf
            )),
        }
    }
    if remove_private_as {
        then_branch.push(Statement::Set(AttrRewrite::RemovePrivateAs));
    }

    match (&settings.export_route_map, &settings.export_prefix_list) {
        (Some(map), prefix_list) => {
            if prefix_list.is_some() {
                warnings.warn(format!(
                    "bgp vrf '{}': neighbor {address} configures both an outbound route-map and \
                     an outbound prefix-list; the route-map takes precedence",
                    config.vrf
                ));
            }
            if registry.contains(map) {
                then_branch.push(Statement::If {
                    guard: Guard::Policy(map.clone()),
                    then_branch: vec![Statement::Accept],
                    else_branch: vec![Statement::Reject],
                });
            } else {
                warnings.warn(format!(
                    "bgp vrf '{}': neighbor {address} references undefined outbound route-map \
                     '{map}'; permitting all routes",
                    config.vrf
                ));
                then_branch.push(Statement::Accept);
            }
        }
        (None, Some(prefix_list)) => {
            if objects.prefix_list(prefix_list).is_none() {
                warnings.warn(format!(
                    "bgp vrf '{}': neighbor {address} references undefined outbound prefix-list \
                     '{prefix_list}'; permitting all routes",
                    config.vrf
                ));
            }
            then_branch.push(Statement::If {
                guard: Guard::MatchPrefixList(prefix_list.clone()),
                then_branch: vec![Statement::Accept],
                else_branch: vec![Statement::Reject],
            });
        }
        (None, None) => then_branch.push(Statement::Accept),
    }

    registry.define(Policy::new(
        name.clone(),
        vec![Statement::If {
            guard: Guard::Policy(export_name.to_owned()),
            then_branch,
            else_branch: vec![Statement::Reject],
        }],
    ))?;
    Ok(name)
}

fn neighbor_import_policy(
    config: &BgpVrfConfig,
    address: Ipv4Addr,
    settings: &PeerSettings,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<Option<String>, ConvertError> {
    let guard = match (&settings.import_route_map, &settings.import_prefix_list) {
        (None, None) => return Ok(None),
        (Some(map), prefix_list) => {
            if prefix_list.is_some() {
                warnings.warn(format!(
                    "bgp vrf '{}': neighbor {address} configures both an inbound route-map and \
                     an inbound prefix-list; the route-map takes precedence",
                    config.vrf
                ));
            }
            if registry.contains(map) {
                Guard::Policy(map.clone())
            } else {
                warnings.warn(format!(
                    "bgp vrf '{}': neighbor {address} references undefined inbound route-map \
                     '{map}'; permitting all routes",
                    config.vrf
                ));
                Guard::Constant(true)
            }
        }
        (None, Some(prefix_list)) => {
            if objects.prefix_list(prefix_list).is_none() {
                warnings.warn(format!(
                    "bgp vrf '{}': neighbor {address} references undefined inbound prefix-list \
                     '{prefix_list}'; permitting all routes",
                    config.vrf
                ));
            }
            Guard::MatchPrefixList(prefix_list.clone())
        }
    };

    let name = names::bgp_neighbor_import(&config.vrf, address);
    registry.define(Policy::new(
        name.clone(),
        vec![Statement::If {
            guard,
            then_branch: vec![Statement::Accept],
            else_branch: vec![Statement::Reject],
        }],
    ))?;
    Ok(Some(name))
}
