//! Compilation of vendor route-maps and routing-process configuration
//! into vendor-independent named policies, plus a reference evaluator
//! for the compiled form.

mod compile;
mod device;
mod evaluate;
pub mod inherit;
pub mod names;
pub mod protocols;
#[cfg(feature = "digest")]
pub mod serial;
mod types;

pub use compile::compile_route_map;
pub use device::{DeviceConversion, DeviceModel};
pub use evaluate::evaluate;
pub use types::{
    Action, AsPathMatch, AsPathSet, AttrRewrite, Clause, CommunityList, Continue, ConvertError,
    Guard, MatchLine, ObjectTable, Outcome, Policy, PolicyRegistry, PrefixList, PrefixListLine,
    PrefixRange, Route, RouteMap, RoutingProtocol, SetLine, Statement, Warnings,
};
