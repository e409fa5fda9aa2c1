//! OSPF policy assembly.
//!
//! Unlike BGP, OSPF export is not one big OR: each redistributed source
//! protocol gets its own named policy, attached independently, so the
//! simulation layer can report per-source behavior. Distribute lists are
//! compiled per interface by AND-ing the process-global and the
//! interface-specific prefix lists.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{Attachment, AttachmentPoint};
use crate::names;
use crate::types::{
    AttrRewrite, ConvertError, Guard, ObjectTable, Policy, PolicyRegistry, RoutingProtocol,
    Statement, Warnings,
};

/// One enabled redistribution source into OSPF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfRedistribution {
    pub route_map: Option<String>,
    pub metric: Option<u64>,
    pub tag: Option<u32>,
}

/// One OSPF process inside a VRF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfProcessConfig {
    pub vrf: String,
    pub process: String,
    pub redistribution: BTreeMap<RoutingProtocol, OspfRedistribution>,
    /// `default-information originate`.
    pub default_originate: bool,
    /// Process-global inbound distribute-list prefix-list name.
    pub distribute_list: Option<String>,
    /// Interface-specific distribute-list prefix-list names.
    pub interface_distribute_lists: BTreeMap<String, String>,
    /// Interfaces participating in the process.
    pub interfaces: BTreeSet<String>,
}

impl OspfProcessConfig {
    #[must_use]
    pub fn new(vrf: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            vrf: vrf.into(),
            process: process.into(),
            ..Self::default()
        }
    }
}

/// Assemble and register all policies for one OSPF process.
///
/// # Errors
///
/// Only internal invariant violations; configuration defects degrade
/// with warnings.
pub fn convert_ospf(
    config: &OspfProcessConfig,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<Vec<Attachment>, ConvertError> {
    let mut attachments = Vec::new();

    for (protocol, redistribution) in &config.redistribution {
        let mut parts = vec![Guard::MatchProtocol([*protocol].into_iter().collect())];
        match &redistribution.route_map {
            Some(map) if !registry.contains(map) => {
                warnings.warn(format!(
                    "ospf process '{}' vrf '{}': redistribute {protocol} references undefined \
                     route-map '{map}'; skipping this redistribution",
                    config.process, config.vrf
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

        let mut then_branch = Vec::new();
        if let Some(metric) = redistribution.metric {
            then_branch.push(Statement::Set(AttrRewrite::Metric(metric)));
        }
        if let Some(tag) = redistribution.tag {
            then_branch.push(Statement::Set(AttrRewrite::Tag(tag)));
        }
        then_branch.push(Statement::Accept);

        let name = names::ospf_export(&config.vrf, &config.process, *protocol);
        registry.define(Policy::new(
            name.clone(),
            vec![Statement::If {
                guard: Guard::all(parts),
                then_branch,
                else_branch: vec![Statement::Reject],
            }],
        ))?;
        debug!(vrf = %config.vrf, process = %config.process, source = %protocol,
               "assembled ospf export policy");
        attachments.push(Attachment {
            point: AttachmentPoint::OspfExport {
                vrf: config.vrf.clone(),
                process: config.process.clone(),
                source: *protocol,
            },
            policy: name,
        });
    }

    if config.default_originate {
        let name = names::ospf_default_route(&config.vrf, &config.process);
        registry.define(Policy::new(
            name.clone(),
            vec![Statement::If {
                guard: Guard::MatchPrefixSpace(vec![crate::types::PrefixRange::exact(
                    "0.0.0.0/0".parse().expect("default route prefix"),
                )]),
                then_branch: vec![Statement::Accept],
                else_branch: vec![Statement::Reject],
            }],
        ))?;
        attachments.push(Attachment {
            point: AttachmentPoint::OspfDefaultRoute {
                vrf: config.vrf.clone(),
                process: config.process.clone(),
            },
            policy: name,
        });
    }

    for interface in &config.interfaces {
        let specific = config.interface_distribute_lists.get(interface);
        if config.distribute_list.is_none() && specific.is_none() {
            continue;
        }

        let mut parts = Vec::new();
        if let Some(global) = &config.distribute_list {
            parts.push(distribute_guard(config, global, objects, warnings));
        }
        if let Some(specific) = specific {
            parts.push(distribute_guard(config, specific, objects, warnings));
        }

        let name = names::ospf_distribute_list(&config.vrf, &config.process, interface);
        registry.define(Policy::new(
            name.clone(),
            vec![Statement::If {
                guard: Guard::all(parts),
                then_branch: vec![Statement::Accept],
                else_branch: vec![Statement::Reject],
            }],
        ))?;
        attachments.push(Attachment {
            point: AttachmentPoint::OspfDistributeList {
                vrf: config.vrf.clone(),
                process: config.process.clone(),
                interface: interface.clone(),
            },
            policy: name,
        });
    }

    Ok(attachments)
}

/// One side of the distribute-list AND. An undefined prefix-list name
/// degrades to always-true so the other side still applies.
fn distribute_guard(
    config: &OspfProcessConfig,
    prefix_list: &str,
    objects: &ObjectTable,
    warnings: &mut Warnings,
) -> Guard {
    if objects.prefix_list(prefix_list).is_some() {
        Guard::MatchPrefixList(prefix_list.to_owned())
    } else {
        warnings.warn(format!(
            "ospf process '{}' vrf '{}': distribute-list references undefined prefix-list \
             '{prefix_list}'; treating it as permit-all",
            config.process, config.vrf
        ));
        Guard::Constant(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate;
    use crate::types::{Action, PrefixList, PrefixListLine, PrefixRange, Route};
    use ipnet::Ipv4Net;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    fn convert(
        config: &OspfProcessConfig,
        objects: &ObjectTable,
    ) -> (PolicyRegistry, Vec<Attachment>, Warnings) {
        let mut registry = PolicyRegistry::new();
        let mut warnings = Warnings::new();
        let attachments = convert_ospf(config, objects, &mut registry, &mut warnings).unwrap();
        (registry, attachments, warnings)
    }

    #[test]
    fn one_export_policy_per_source() {
        let mut config = OspfProcessConfig::new("default", "1");
        config
            .redistribution
            .insert(RoutingProtocol::Connected, OspfRedistribution::default());
        config
            .redistribution
            .insert(RoutingProtocol::Static, OspfRedistribution::default());
        let objects = ObjectTable::new();
        let (registry, attachments, _) = convert(&config, &objects);
        assert_eq!(attachments.len(), 2);
        assert_eq!(registry.len(), 2);

        let name = names::ospf_export("default", "1", RoutingProtocol::Static);
        let stat = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static);
        let conn = Route::new(net("10.0.0.0/8"), RoutingProtocol::Connected);
        assert_eq!(evaluate(&registry, &objects, &name, &stat).action, Action::Accept);
        assert_eq!(evaluate(&registry, &objects, &name, &conn).action, Action::Reject);
    }

    #[test]
    fn export_rewrites_metric_and_tag() {
        let mut config = OspfProcessConfig::new("default", "1");
        config.redistribution.insert(
            RoutingProtocol::Static,
            OspfRedistribution {
                route_map: None,
                metric: Some(20),
                tag: Some(77),
            },
        );
        let objects = ObjectTable::new();
        let (registry, _, _) = convert(&config, &objects);
        let name = names::ospf_export("default", "1", RoutingProtocol::Static);
        let outcome = evaluate(
            &registry,
            &objects,
            &name,
            &Route::new(net("10.0.0.0/8"), RoutingProtocol::Static),
        );
        assert_eq!(outcome.action, Action::Accept);
        assert_eq!(outcome.route.metric, 20);
        assert_eq!(outcome.route.tag, 77);
    }

    #[test]
    fn undefined_redistribution_map_skips_the_policy() {
        let mut config = OspfProcessConfig::new("default", "1");
        config.redistribution.insert(
            RoutingProtocol::Bgp,
            OspfRedistribution {
                route_map: Some("ghost".into()),
                metric: None,
                tag: None,
            },
        );
        let (registry, attachments, warnings) = convert(&config, &ObjectTable::new());
        assert!(registry.is_empty());
        assert!(attachments.is_empty());
        assert_eq!(warnings.count_matching("undefined route-map 'ghost'"), 1);
    }

    #[test]
    fn default_originate_matches_default_route_only() {
        let mut config = OspfProcessConfig::new("default", "1");
        config.default_originate = true;
        let objects = ObjectTable::new();
        let (registry, _, _) = convert(&config, &objects);
        let name = names::ospf_default_route("default", "1");
        let default = Route::new(net("0.0.0.0/0"), RoutingProtocol::Static);
        let other = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static);
        assert_eq!(evaluate(&registry, &objects, &name, &default).action, Action::Accept);
        assert_eq!(evaluate(&registry, &objects, &name, &other).action, Action::Reject);
    }

    #[test]
    fn global_only_distribute_list_applies_on_every_interface() {
        let mut objects = ObjectTable::new();
        objects.add_prefix_list(PrefixList::new(
            "P",
            vec![PrefixListLine {
                action: Action::Accept,
                range: PrefixRange::exact(net("192.0.2.0/24")),
            }],
        ));

        let mut config = OspfProcessConfig::new("default", "1");
        config.distribute_list = Some("P".into());
        config.interfaces.insert("E1".into());
        let (registry, attachments, warnings) = convert(&config, &objects);
        assert!(warnings.is_empty());
        assert_eq!(attachments.len(), 1);

        let name = names::ospf_distribute_list("default", "1", "E1");
        let permitted = Route::new(net("192.0.2.0/24"), RoutingProtocol::Ospf);
        let denied = Route::new(net("198.51.100.0/24"), RoutingProtocol::Ospf);
        assert_eq!(evaluate(&registry, &objects, &name, &permitted).action, Action::Accept);
        assert_eq!(evaluate(&registry, &objects, &name, &denied).action, Action::Reject);
    }

    #[test]
    fn interface_list_ands_with_global() {
        let mut objects = ObjectTable::new();
        objects.add_prefix_list(PrefixList::permitting(
            "G",
            PrefixRange::with_lengths(net("10.0.0.0/8"), 8..=32),
        ));
        objects.add_prefix_list(PrefixList::permitting("I", PrefixRange::exact(net("10.1.0.0/16"))));

        let mut config = OspfProcessConfig::new("default", "1");
        config.distribute_list = Some("G".into());
        config.interfaces.insert("E1".into());
        config
            .interface_distribute_lists
            .insert("E1".into(), "I".into());
        let (registry, _, _) = convert(&config, &objects);

        let name = names::ospf_distribute_list("default", "1", "E1");
        // Permitted by both sides.
        let both = Route::new(net("10.1.0.0/16"), RoutingProtocol::Ospf);
        // Permitted only by the global side.
        let global_only = Route::new(net("10.2.0.0/16"), RoutingProtocol::Ospf);
        assert_eq!(evaluate(&registry, &objects, &name, &both).action, Action::Accept);
        assert_eq!(evaluate(&registry, &objects, &name, &global_only).action, Action::Reject);
    }

    #[test]
    fn undefined_distribute_list_degrades_to_permit_all() {
        let mut objects = ObjectTable::new();
        objects.add_prefix_list(PrefixList::permitting("I", PrefixRange::exact(net("10.1.0.0/16"))));

        let mut config = OspfProcessConfig::new("default", "1");
        config.distribute_list = Some("ghost".into());
        config.interfaces.insert("E1".into());
        config
            .interface_distribute_lists
            .insert("E1".into(), "I".into());
        let (registry, _, warnings) = convert(&config, &objects);
        assert_eq!(warnings.count_matching("undefined prefix-list 'ghost'"), 1);

        // The interface side still filters.
        let name = names::ospf_distribute_list("default", "1", "E1");
        let inside = Route::new(net("10.1.0.0/16"), RoutingProtocol::Ospf);
        let outside = Route::new(net("10.2.0.0/16"), RoutingProtocol::Ospf);
        assert_eq!(evaluate(&registry, &objects, &name, &inside).action, Action::Accept);
        assert_eq!(evaluate(&registry, &objects, &name, &outside).action, Action::Reject);
    }

    #[test]
    fn no_distribute_lists_no_policy() {
        let mut config = OspfProcessConfig::new("default", "1");
        config.interfaces.insert("E1".into());
        let (registry, attachments, _) = convert(&config, &ObjectTable::new());
        assert!(registry.is_empty());
        assert!(attachments.is_empty());
    }
}
