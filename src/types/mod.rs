mod error;
mod expr;
mod objects;
mod policy;
mod registry;
mod route;
mod route_map;
mod statement;
mod warning;

pub use error::ConvertError;
pub use expr::{Guard, PrefixRange};
pub use objects::{AsPathMatch, AsPathSet, CommunityList, ObjectTable, PrefixList, PrefixListLine};
pub use policy::Policy;
pub use registry::PolicyRegistry;
pub use route::{Outcome, Route, RoutingProtocol};
pub use route_map::{Clause, Continue, MatchLine, RouteMap, SetLine};
pub use statement::{Action, AttrRewrite, Statement};
pub use warning::Warnings;
