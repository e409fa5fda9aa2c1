//! Per-device conversion facade.
//!
//! One `DeviceConversion` per device: route-maps compile first so the
//! protocol assemblers can resolve their names, then `finish()` freezes
//! everything into a `DeviceModel`. No state is shared between devices.

use tracing::debug;

use crate::compile::compile_route_map;
use crate::protocols::bgp::{convert_bgp, BgpVrfConfig};
use crate::protocols::ospf::{convert_ospf, OspfProcessConfig};
use crate::protocols::rip::{convert_rip, RipProcessConfig};
use crate::protocols::Attachment;
use crate::types::{
    Action, ConvertError, ObjectTable, Outcome, PolicyRegistry, Route, RouteMap, Warnings,
};

/// Accumulates one device's compiled policies.
#[derive(Debug, Default)]
pub struct DeviceConversion {
    objects: ObjectTable,
    registry: PolicyRegistry,
    attachments: Vec<Attachment>,
    warnings: Warnings,
}

impl DeviceConversion {
    #[must_use]
    pub fn new(objects: ObjectTable) -> Self {
        Self {
            objects,
            registry: PolicyRegistry::new(),
            attachments: Vec::new(),
            warnings: Warnings::new(),
        }
    }

    /// Compile a route-map into the device registry. Route-maps used as
    /// filters deny what no clause matches, so the no-match default is
    /// `Reject`.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError` on a duplicate policy name.
    pub fn route_map(&mut self, map: &RouteMap) -> Result<String, ConvertError> {
        compile_route_map(
            map,
            Action::Reject,
            &self.objects,
            &mut self.registry,
            &mut self.warnings,
        )
    }

    /// Assemble one BGP VRF context's policies.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError` on a duplicate policy name.
    pub fn bgp(&mut self, config: &BgpVrfConfig) -> Result<(), ConvertError> {
        let attachments = convert_bgp(
            config,
            &self.objects,
            &mut self.registry,
            &mut self.warnings,
        )?;
        self.attachments.extend(attachments);
        Ok(())
    }

    /// Assemble one OSPF process's policies.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError` on a duplicate policy name.
    pub fn ospf(&mut self, config: &OspfProcessConfig) -> Result<(), ConvertError> {
        let attachments = convert_ospf(
            config,
            &self.objects,
            &mut self.registry,
            &mut self.warnings,
        )?;
        self.attachments.extend(attachments);
        Ok(())
    }

    /// Assemble one RIP process's policies.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError` on a duplicate policy name.
    pub fn rip(&mut self, config: &RipProcessConfig) -> Result<(), ConvertError> {
        let attachments = convert_rip(
            config,
            &self.objects,
            &mut self.registry,
            &mut self.warnings,
        )?;
        self.attachments.extend(attachments);
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> DeviceModel {
        debug!(
            policies = self.registry.len(),
            attachments = self.attachments.len(),
            warnings = self.warnings.len(),
            "device conversion finished"
        );
        DeviceModel {
            objects: self.objects,
            registry: self.registry,
            attachments: self.attachments,
            warnings: self.warnings,
        }
    }
}

/// A device's frozen policy model.
#[derive(Debug)]
pub struct DeviceModel {
    pub objects: ObjectTable,
    pub registry: PolicyRegistry,
    pub attachments: Vec<Attachment>,
    pub warnings: Warnings,
}

impl DeviceModel {
    /// Run a named policy against a route.
    #[must_use]
    pub fn evaluate(&self, policy: &str, route: &Route) -> Outcome {
        crate::evaluate::evaluate(&self.registry, &self.objects, policy, route)
    }
}
