//! Awkward-but-legal configurations and the recovery paths around them.

use routelow::protocols::bgp::{BgpVrfConfig, Redistribution};
use routelow::{
    names, Action, AsPathMatch, AsPathSet, Clause, Continue, DeviceConversion, MatchLine,
    ObjectTable, Route, RouteMap, RoutingProtocol, SetLine,
};

fn net(s: &str) -> ipnet::Ipv4Net {
    s.parse().unwrap()
}

#[test]
fn later_deny_wins_over_earlier_accept_intent() {
    // Clause 10 marks accept intent and jumps to 30, which denies.
    let map = RouteMap::new("M")
        .clause(Clause::new(10, Action::Accept).continues(Continue::To(30)))
        .clause(Clause::new(30, Action::Reject));

    let mut conversion = DeviceConversion::new(ObjectTable::new());
    conversion.route_map(&map).unwrap();
    let model = conversion.finish();

    let route = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static);
    assert_eq!(model.evaluate("M", &route).action, Action::Reject);
}

#[test]
fn accept_intent_survives_a_non_matching_jump_target() {
    // Clause 10 jumps to 30; 30 does not match; the accept intent from
    // 10 decides the fallthrough.
    let map = RouteMap::new("M")
        .clause(Clause::new(10, Action::Accept).continues(Continue::To(30)))
        .clause(Clause::new(30, Action::Reject).matching(MatchLine::Tag(9)));

    let mut conversion = DeviceConversion::new(ObjectTable::new());
    conversion.route_map(&map).unwrap();
    let model = conversion.finish();

    let route = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static).with_tag(5);
    assert_eq!(model.evaluate("M", &route).action, Action::Accept);
}

#[test]
fn sets_accumulate_across_a_continue_chain() {
    let map = RouteMap::new("M")
        .clause(
            Clause::new(10, Action::Accept)
                .setting(SetLine::Metric(11))
                .continues(Continue::To(30)),
        )
        .clause(Clause::new(30, Action::Accept).setting(SetLine::Tag(7)));

    let mut conversion = DeviceConversion::new(ObjectTable::new());
    conversion.route_map(&map).unwrap();
    let model = conversion.finish();

    let outcome = model.evaluate("M", &Route::new(net("10.0.0.0/8"), RoutingProtocol::Static));
    assert_eq!(outcome.action, Action::Accept);
    assert_eq!(outcome.route.metric, 11);
    assert_eq!(outcome.route.tag, 7);
}

#[test]
fn evaluating_an_undefined_policy_rejects_without_panicking() {
    let conversion = DeviceConversion::new(ObjectTable::new());
    let model = conversion.finish();
    let route = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static);
    let outcome = model.evaluate("no-such-policy", &route);
    assert_eq!(outcome.action, Action::Reject);
    assert_eq!(outcome.route, route);
}

#[test]
fn as_path_patterns_distinguish_position() {
    let mut objects = ObjectTable::new();
    objects.add_as_path_set(AsPathSet::new(
        "FROM-65001",
        vec![AsPathMatch::parse("_65001$").unwrap()],
    ));

    let map = RouteMap::new("M").clause(
        Clause::new(10, Action::Accept).matching(MatchLine::AsPath("FROM-65001".into())),
    );
    let mut conversion = DeviceConversion::new(objects);
    conversion.route_map(&map).unwrap();
    let model = conversion.finish();

    let originated = Route::new(net("10.0.0.0/8"), RoutingProtocol::Bgp).with_as_path([65002, 65001]);
    let transited = Route::new(net("10.0.0.0/8"), RoutingProtocol::Bgp).with_as_path([65001, 65002]);
    assert_eq!(model.evaluate("M", &originated).action, Action::Accept);
    assert_eq!(model.evaluate("M", &transited).action, Action::Reject);
}

#[test]
fn redistribution_map_reads_its_own_rewrites() {
    // The route-map sets tag 7 and its only other clause matches tag 7:
    // within the bracketed call the second read sees the rewrite.
    let map = RouteMap::new("TAG-THEN-MATCH")
        .clause(
            Clause::new(10, Action::Accept)
                .matching(MatchLine::Metric(0))
                .setting(SetLine::Tag(7))
                .continues(Continue::To(20)),
        )
        .clause(Clause::new(20, Action::Accept).matching(MatchLine::Tag(7)));

    let mut conversion = DeviceConversion::new(ObjectTable::new());
    conversion.route_map(&map).unwrap();

    let mut config = BgpVrfConfig::new("default");
    config.redistribution.insert(
        RoutingProtocol::Static,
        Redistribution {
            route_map: Some("TAG-THEN-MATCH".into()),
            metric: None,
        },
    );
    conversion.bgp(&config).unwrap();
    let model = conversion.finish();

    let route = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static);
    let outcome = model.evaluate(&names::bgp_vrf_export("default"), &route);
    assert_eq!(outcome.action, Action::Accept);
    assert_eq!(outcome.route.tag, 7);
}

#[test]
fn one_device_carries_all_three_protocols() {
    let mut conversion = DeviceConversion::new(ObjectTable::new());

    let mut bgp = BgpVrfConfig::new("default");
    bgp.redistribution
        .insert(RoutingProtocol::Connected, Redistribution::default());
    conversion.bgp(&bgp).unwrap();

    let mut ospf = routelow::protocols::ospf::OspfProcessConfig::new("default", "1");
    ospf.redistribution.insert(
        RoutingProtocol::Bgp,
        routelow::protocols::ospf::OspfRedistribution::default(),
    );
    conversion.ospf(&ospf).unwrap();

    conversion
        .rip(&routelow::protocols::rip::RipProcessConfig::new("default"))
        .unwrap();

    let model = conversion.finish();
    assert!(model.warnings.is_empty());
    assert!(model.registry.contains(&names::bgp_vrf_export("default")));
    assert!(model
        .registry
        .contains(&names::ospf_export("default", "1", RoutingProtocol::Bgp)));
    assert!(model.registry.contains(&names::rip_export("default")));
    assert_eq!(model.attachments.len(), 3);
}

#[test]
fn clause_order_is_sequence_order_not_insertion_order() {
    let map = RouteMap::new("M")
        .clause(Clause::new(20, Action::Reject).matching(MatchLine::Tag(5)))
        .clause(Clause::new(10, Action::Accept).matching(MatchLine::Tag(5)));

    let mut conversion = DeviceConversion::new(ObjectTable::new());
    conversion.route_map(&map).unwrap();
    let model = conversion.finish();

    // Clause 10 runs first regardless of declaration order.
    let route = Route::new(net("10.0.0.0/8"), RoutingProtocol::Static).with_tag(5);
    assert_eq!(model.evaluate("M", &route).action, Action::Accept);
}
