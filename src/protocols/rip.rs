//! RIP policy assembly: one export policy per VRF process, shaped like
//! the BGP VRF export (per-reason rewrites, then one top-level OR) but
//! with RIP itself as the leading reason.

use std::collections::BTreeMap;

use tracing::debug;

use super::{Attachment, AttachmentPoint};
use crate::names;
use crate::types::{
    AttrRewrite, ConvertError, Guard, ObjectTable, Policy, PolicyRegistry, RoutingProtocol,
    Statement, Warnings,
};

/// One enabled redistribution source into RIP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RipRedistribution {
    pub route_map: Option<String>,
    pub metric: Option<u64>,
}

/// One RIP process inside a VRF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RipProcessConfig {
    pub vrf: String,
    pub redistribution: BTreeMap<RoutingProtocol, RipRedistribution>,
}

impl RipProcessConfig {
    #[must_use]
    pub fn new(vrf: impl Into<String>) -> Self {
        Self {
            vrf: vrf.into(),
            redistribution: BTreeMap::new(),
        }
    }
}

/// Assemble and register the export policy for one RIP process.
///
/// # Errors
///
/// Only internal invariant violations; configuration defects degrade
/// with warnings.
pub fn convert_rip(
    config: &RipProcessConfig,
    _objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<Vec<Attachment>, ConvertError> {
    let mut statements = Vec::new();
    let mut reasons = vec![Guard::MatchProtocol(
        [RoutingProtocol::Rip].into_iter().collect(),
    )];

    for (protocol, redistribution) in &config.redistribution {
        let protocol_guard = Guard::MatchProtocol([*protocol].into_iter().collect());
        let mut parts = vec![protocol_guard.clone()];
        match &redistribution.route_map {
            Some(map) if !registry.contains(map) => {
                warnings.warn(format!(
                    "rip vrf '{}': redistribute {protocol} references undefined route-map \
                     '{map}'; skipping this redistribution",
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
            statements.push(Statement::when(
                protocol_guard,
                vec![Statement::Set(AttrRewrite::Metric(metric))],
            ));
        }
        reasons.push(Guard::all(parts));
    }

    statements.push(Statement::If {
        guard: Guard::any(reasons),
        then_branch: vec![Statement::Accept],
        else_branch: vec![Statement::Reject],
    });

    let name = names::rip_export(&config.vrf);
    debug!(vrf = %config.vrf, policy = %name, "assembled rip export policy");
    registry.define(Policy::new(name.clone(), statements))?;
    Ok(vec![Attachment {
        point: AttachmentPoint::RipExport {
            vrf: config.vrf.clone(),
        },
        policy: name,
    }])
}
