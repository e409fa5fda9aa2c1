//! Reference evaluator for compiled policies.
//!
//! The production route-computation engine lives outside this crate;
//! this evaluator exists so compiled output is verifiable in isolation.
//! It implements the exact statement and guard semantics the compiler
//! targets: shared default action across call boundaries, permissive
//! resolution of undefined names, and the intermediate-attributes read
//! view for bracketed route-map calls.

use crate::types::{
    Action, AttrRewrite, Guard, ObjectTable, Outcome, Policy, PolicyRegistry, Route, Statement,
};

const PRIVATE_AS_RANGE: std::ops::RangeInclusive<u32> = 64512..=65534;

/// Evaluate the named policy against a route.
///
/// Returns the terminal action and the rewritten route record. An
/// undefined policy name evaluates as a no-op fallthrough to the default
/// action (reject at top level); this never panics.
#[must_use]
pub fn evaluate(
    registry: &PolicyRegistry,
    objects: &ObjectTable,
    policy: &str,
    route: &Route,
) -> Outcome {
    let mut env = Env {
        registry,
        objects,
        input: route.clone(),
        output: route.clone(),
        default_action: Action::Reject,
        read_intermediate: false,
    };
    let action = match env.call(policy) {
        Flow::Exit(action) => action,
        Flow::Fall => env.default_action,
    };
    Outcome {
        action,
        route: env.output,
    }
}

/// Statement-list control flow. `Continue` means the list ran out
/// without a terminal; at a call boundary that folds into `Fall`.
enum StatementFlow {
    Continue,
    Exit(Action),
    Fall,
}

/// Whole-policy control flow as seen by a caller.
enum Flow {
    Exit(Action),
    Fall,
}

struct Env<'a> {
    registry: &'a PolicyRegistry,
    objects: &'a ObjectTable,
    input: Route,
    output: Route,
    default_action: Action,
    read_intermediate: bool,
}

impl<'a> Env<'a> {
    fn call(&mut self, name: &str) -> Flow {
        let registry = self.registry;
        let Some(policy) = registry.get(name) else {
            // Undefined cross-policy reference: tolerated as a no-op.
            return Flow::Fall;
        };
        self.run_policy(policy)
    }

    fn run_policy(&mut self, policy: &Policy) -> Flow {
        match self.run_statements(&policy.statements) {
            StatementFlow::Exit(action) => Flow::Exit(action),
            StatementFlow::Continue | StatementFlow::Fall => Flow::Fall,
        }
    }

    fn run_statements(&mut self, statements: &[Statement]) -> StatementFlow {
        for statement in statements {
            match statement {
                Statement::Accept => return StatementFlow::Exit(Action::Accept),
                Statement::Reject => return StatementFlow::Exit(Action::Reject),
                Statement::FallThrough => return StatementFlow::Fall,
                Statement::SetDefault(action) => self.default_action = *action,
                Statement::Set(rewrite) => self.apply(rewrite),
                Statement::If {
                    guard,
                    then_branch,
                    else_branch,
                } => {
                    let branch = if self.eval_guard(guard) {
                        then_branch
                    } else {
                        else_branch
                    };
                    match self.run_statements(branch) {
                        StatementFlow::Continue => {}
                        flow => return flow,
                    }
                }
                Statement::Call(name) => match self.call(name) {
                    // A callee that only fell through lets the caller
                    // continue past the call.
                    Flow::Fall => {}
                    Flow::Exit(action) => return StatementFlow::Exit(action),
                },
            }
        }
        StatementFlow::Continue
    }

    fn eval_guard(&mut self, guard: &Guard) -> bool {
        match guard {
            Guard::Constant(b) => *b,
            Guard::MatchPrefixList(name) | Guard::MatchAddressList(name) => {
                match self.objects.prefix_list(name) {
                    Some(list) => list.permits(self.view().prefix),
                    // Undefined filter permits everything.
                    None => true,
                }
            }
            Guard::MatchPrefixSpace(ranges) => {
                let prefix = self.view().prefix;
                ranges.iter().any(|r| r.matches(prefix))
            }
            Guard::MatchTag(tag) => self.view().tag == *tag,
            Guard::MatchMetric(metric) => self.view().metric == *metric,
            Guard::MatchProtocol(protocols) => protocols.contains(&self.view().protocol),
            Guard::MatchCommunityList(name) => match self.objects.community_list(name) {
                Some(list) => list.matches(&self.view().communities),
                None => true,
            },
            Guard::MatchAsPathSet(name) => match self.objects.as_path_set(name) {
                Some(set) => set.matches(&self.view().as_path),
                None => true,
            },
            Guard::Policy(name) => match self.call(name) {
                Flow::Exit(Action::Accept) => true,
                Flow::Exit(Action::Reject) => false,
                // The callee's own SetDefault decided its fallthrough.
                Flow::Fall => self.default_action == Action::Accept,
            },
            Guard::WithIntermediateAttrs(inner) => {
                let previous = self.read_intermediate;
                self.read_intermediate = true;
                let result = self.eval_guard(inner);
                self.read_intermediate = previous;
                result
            }
            Guard::All(parts) => {
                for part in parts {
                    if !self.eval_guard(part) {
                        return false;
                    }
                }
                true
            }
            Guard::Any(parts) => {
                for part in parts {
                    if self.eval_guard(part) {
                        return true;
                    }
                }
                false
            }
            Guard::Not(inner) => !self.eval_guard(inner),
        }
    }

    /// Guards normally read the original input; inside a
    /// `WithIntermediateAttrs` bracket they read the rewritten output.
    fn view(&self) -> &Route {
        if self.read_intermediate {
            &self.output
        } else {
            &self.input
        }
    }

    fn apply(&mut self, rewrite: &AttrRewrite) {
        match rewrite {
            AttrRewrite::Metric(v) => self.output.metric = *v,
            AttrRewrite::LocalPreference(v) => self.output.local_preference = *v,
            AttrRewrite::Tag(v) => self.output.tag = *v,
            AttrRewrite::Weight(v) => self.output.weight = *v,
            AttrRewrite::NextHop(v) => self.output.next_hop = Some(*v),
            AttrRewrite::AddCommunities(set) => {
                self.output.communities.extend(set.iter().copied());
            }
            AttrRewrite::SetCommunities(set) => {
                self.output.communities = set.clone();
            }
            AttrRewrite::RemovePrivateAs => {
                self.output
                    .as_path
                    .retain(|asn| !PRIVATE_AS_RANGE.contains(asn));
            }
        }
    }
}
