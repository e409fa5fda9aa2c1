#![cfg(feature = "digest")]

use routelow::protocols::bgp::{Aggregate, BgpVrfConfig, Redistribution};
use routelow::serial::{decode, digest, encode, DeserializeError};
use routelow::{
    names, Action, Clause, Continue, DeviceConversion, MatchLine, ObjectTable, PolicyRegistry,
    Route, RouteMap, RoutingProtocol, SetLine,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn device_registry() -> PolicyRegistry {
    let mut conversion = DeviceConversion::new(ObjectTable::new());

    let map = RouteMap::new("OUT")
        .clause(
            Clause::new(10, Action::Accept)
                .matching(MatchLine::Tag(5))
                .setting(SetLine::LocalPreference(200))
                .continues(Continue::To(30)),
        )
        .clause(Clause::new(20, Action::Reject))
        .clause(Clause::new(30, Action::Accept));
    conversion.route_map(&map).unwrap();

    let mut config = BgpVrfConfig::new("default");
    config.aggregates.push(Aggregate {
        prefix: "10.0.0.0/8".parse().unwrap(),
        summary_only: true,
        attribute_map: None,
    });
    config
        .redistribution
        .insert(RoutingProtocol::Static, Redistribution::default());
    conversion.bgp(&config).unwrap();

    conversion.finish().registry
}

// ---------------------------------------------------------------------------
// Round-trips
// ---------------------------------------------------------------------------

#[test]
fn round_trip_preserves_the_registry() {
    let original = device_registry();
    let bytes = encode(&original).unwrap();
    let restored = decode(&bytes).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn restored_registry_evaluates_identically() {
    let original = device_registry();
    let restored = decode(&encode(&original).unwrap()).unwrap();

    let objects = ObjectTable::new();
    let export = names::bgp_vrf_export("default");
    for (prefix, protocol, tag) in [
        ("10.1.0.0/16", RoutingProtocol::Static, 0),
        ("10.0.0.0/8", RoutingProtocol::Aggregate, 0),
        ("192.0.2.0/24", RoutingProtocol::Bgp, 5),
    ] {
        let route = Route::new(prefix.parse().unwrap(), protocol).with_tag(tag);
        assert_eq!(
            routelow::evaluate(&original, &objects, &export, &route),
            routelow::evaluate(&restored, &objects, &export, &route),
        );
        assert_eq!(
            routelow::evaluate(&original, &objects, "OUT", &route),
            routelow::evaluate(&restored, &objects, "OUT", &route),
        );
    }
}

// ---------------------------------------------------------------------------
// Digest stability
// ---------------------------------------------------------------------------

#[test]
fn same_configuration_same_digest() {
    assert_eq!(
        digest(&device_registry()).unwrap(),
        digest(&device_registry()).unwrap()
    );
}

#[test]
fn different_configuration_different_digest() {
    let base = device_registry();
    let mut other = DeviceConversion::new(ObjectTable::new());
    other
        .rip(&routelow::protocols::rip::RipProcessConfig::new("default"))
        .unwrap();
    assert_ne!(
        digest(&base).unwrap(),
        digest(&other.finish().registry).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Corruption handling
// ---------------------------------------------------------------------------

#[test]
fn truncated_blob_is_rejected() {
    let bytes = encode(&device_registry()).unwrap();
    assert!(matches!(
        decode(&bytes[..bytes.len() - 4]),
        Err(DeserializeError::LengthMismatch { .. })
    ));
}

#[test]
fn bit_flip_is_rejected() {
    let mut bytes = encode(&device_registry()).unwrap();
    let mid = 32 + (bytes.len() - 32) / 2;
    bytes[mid] ^= 0x01;
    assert!(matches!(
        decode(&bytes),
        Err(DeserializeError::ChecksumMismatch)
    ));
}
