//! The route-map compiler.
//!
//! Lowers an ordered, jump-capable clause list into registry policies.
//! Two strategies:
//!
//! - **simple**: no clause carries a continue directive, so control flow
//!   is strictly top-to-bottom fallthrough and the whole map folds into
//!   one structured `If` chain under the map's own name.
//! - **call-graph**: at least one clause can jump past its successor, so
//!   each clause becomes its own named sub-policy and the map's entry
//!   policy is a single call to the first clause.
//!
//! Clauses are visited in descending sequence order at build time (a
//! forward continue target is always registered before the clause that
//! references it) but execute in ascending order at evaluation time.

use std::collections::BTreeSet;

use tracing::debug;

use crate::names;
use crate::types::{
    Action, AttrRewrite, Clause, Continue, ConvertError, Guard, MatchLine, ObjectTable, Policy,
    PolicyRegistry, RouteMap, SetLine, Statement, Warnings,
};

/// Compile one route-map into the registry and return the name of its
/// externally visible policy (the map's own name).
///
/// `default_action` is the terminal action for a route that matches no
/// clause; it is baked into the entry policy as a leading `SetDefault`
/// so the compiled output is self-contained.
///
/// # Errors
///
/// Only internal invariant violations ([`ConvertError`]); malformed
/// continue directives and undefined list references degrade locally
/// with a warning.
pub fn compile_route_map(
    map: &RouteMap,
    default_action: Action,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<String, ConvertError> {
    if map.has_continue() {
        debug!(map = %map.name, "compiling route-map with call-graph strategy");
        compile_call_graph(map, default_action, objects, registry, warnings)
    } else {
        debug!(map = %map.name, "compiling route-map with simple strategy");
        compile_simple(map, default_action, objects, registry, warnings)
    }
}

fn compile_simple(
    map: &RouteMap,
    default_action: Action,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<String, ConvertError> {
    // Fold in descending order: each clause's If becomes the else-branch
    // of the next lower-numbered clause.
    let mut chain: Vec<Statement> = Vec::new();
    for clause in map.clauses.values().rev() {
        let mut then_branch = set_statements(&clause.sets);
        then_branch.push(terminal(clause.action));
        chain = vec![Statement::If {
            guard: clause_guard(map, clause, objects, warnings),
            then_branch,
            else_branch: chain,
        }];
    }

    let mut statements = vec![Statement::SetDefault(default_action)];
    statements.extend(chain);
    registry.define(Policy::new(map.name.clone(), statements))?;
    Ok(map.name.clone())
}

fn compile_call_graph(
    map: &RouteMap,
    default_action: Action,
    objects: &ObjectTable,
    registry: &mut PolicyRegistry,
    warnings: &mut Warnings,
) -> Result<String, ConvertError> {
    let seqs: Vec<u32> = map.clauses.keys().copied().collect();

    for (i, clause) in map.clauses.values().enumerate().rev() {
        let next_seq = seqs.get(i + 1).copied();
        let target = resolve_continue(map, clause, next_seq, warnings);

        let mut then_branch = set_statements(&clause.sets);
        match (clause.action, target) {
            (Action::Reject, _) => then_branch.push(Statement::Reject),
            (Action::Accept, None) => then_branch.push(Statement::Accept),
            (Action::Accept, Some(t)) => {
                // Mark accept intent, then jump: a later explicit deny
                // still wins, while fallthrough to the end of the chain
                // keeps the accept.
                then_branch.push(Statement::SetDefault(Action::Accept));
                then_branch.push(Statement::Call(names::route_map_clause(&map.name, t)));
            }
        }

        // On no match, fall to the next clause in sequence (not the
        // continue target), or out of the map entirely.
        let else_branch = match next_seq {
            Some(n) => vec![Statement::Call(names::route_map_clause(&map.name, n))],
            None => vec![Statement::FallThrough],
        };

        registry.define(Policy::new(
            names::route_map_clause(&map.name, clause.seq),
            vec![Statement::If {
                guard: clause_guard(map, clause, objects, warnings),
                then_branch,
                else_branch,
            }],
        ))?;
    }

    let mut statements = vec![Statement::SetDefault(default_action)];
    if let Some(first) = seqs.first() {
        statements.push(Statement::Call(names::route_map_clause(&map.name, *first)));
    }
    registry.define(Policy::new(map.name.clone(), statements))?;
    Ok(map.name.clone())
}

/// Validate a clause's continue directive, returning the effective
/// target sequence number or `None` when the continue is dropped.
fn resolve_continue(
    map: &RouteMap,
    clause: &Clause,
    next_seq: Option<u32>,
    warnings: &mut Warnings,
) -> Option<u32> {
    match clause.continue_to {
        None => None,
        // Implicit target past the last clause is normal termination.
        Some(Continue::Next) => next_seq,
        Some(Continue::To(target)) => {
            if target <= clause.seq {
                warnings.warn(format!(
                    "route-map '{}' clause {}: continue {} targets a non-later clause (loop); \
                     ignoring the continue",
                    map.name, clause.seq, target
                ));
                None
            } else if !map.clauses.contains_key(&target) {
                warnings.warn(format!(
                    "route-map '{}' clause {}: continue {} targets a clause that does not exist; \
                     ignoring the continue",
                    map.name, clause.seq, target
                ));
                None
            } else {
                Some(target)
            }
        }
    }
}

/// Build a clause's guard: the AND of all requirement matches, plus the
/// OR of list-style matches when any are present. An empty clause
/// matches everything.
///
/// Undefined named lists stay in the guard (late-bound, permissive at
/// evaluation) and produce exactly one warning per undefined name per
/// clause.
fn clause_guard(
    map: &RouteMap,
    clause: &Clause,
    objects: &ObjectTable,
    warnings: &mut Warnings,
) -> Guard {
    let mut warned: BTreeSet<String> = BTreeSet::new();
    let mut warn_undefined = |kind: &str, name: &str, warnings: &mut Warnings| {
        if warned.insert(name.to_owned()) {
            warnings.warn(format!(
                "route-map '{}' clause {}: {kind} '{name}' is not defined; \
                 treating the match as always true",
                map.name, clause.seq
            ));
        }
    };

    let mut requirements = Vec::new();
    let mut alternatives = Vec::new();
    for line in &clause.matches {
        match line {
            MatchLine::PrefixList(name) => {
                if objects.prefix_list(name).is_none() {
                    warn_undefined("prefix-list", name, warnings);
                }
                alternatives.push(Guard::MatchPrefixList(name.clone()));
            }
            MatchLine::AddressList(name) => {
                if objects.prefix_list(name).is_none() {
                    warn_undefined("access-list", name, warnings);
                }
                alternatives.push(Guard::MatchAddressList(name.clone()));
            }
            MatchLine::Tag(tag) => requirements.push(Guard::MatchTag(*tag)),
            MatchLine::Metric(metric) => requirements.push(Guard::MatchMetric(*metric)),
            MatchLine::Community(name) => {
                if objects.community_list(name).is_none() {
                    warn_undefined("community-list", name, warnings);
                }
                requirements.push(Guard::MatchCommunityList(name.clone()));
            }
            MatchLine::AsPath(name) => {
                if objects.as_path_set(name).is_none() {
                    warn_undefined("as-path set", name, warnings);
                }
                requirements.push(Guard::MatchAsPathSet(name.clone()));
            }
        }
    }
    if !alternatives.is_empty() {
        requirements.push(Guard::any(alternatives));
    }
    Guard::all(requirements)
}

fn set_statements(sets: &[SetLine]) -> Vec<Statement> {
    sets.iter()
        .map(|line| {
            Statement::Set(match line {
                SetLine::Metric(v) => AttrRewrite::Metric(*v),
                SetLine::LocalPreference(v) => AttrRewrite::LocalPreference(*v),
                SetLine::Tag(v) => AttrRewrite::Tag(*v),
                SetLine::Weight(v) => AttrRewrite::Weight(*v),
                SetLine::NextHop(v) => AttrRewrite::NextHop(*v),
                SetLine::Community {
                    communities,
                    additive,
                } => {
                    if *additive {
                        AttrRewrite::AddCommunities(communities.clone())
                    } else {
                        AttrRewrite::SetCommunities(communities.clone())
                    }
                }
            })
        })
        .collect()
}

fn terminal(action: Action) -> Statement {
    match action {
        Action::Accept => Statement::Accept,
        Action::Reject => Statement::Reject,
    }
}
