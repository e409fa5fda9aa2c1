//! Binary serialization and deserialization of compiled policy
//! registries.
//!
//! This module provides a stable binary format for persisting a
//! [`PolicyRegistry`](crate::PolicyRegistry). The format consists of a
//! 32-byte fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RTLW"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with
//! [`DeserializeError::IncompatibleVersion`]. The engine version is
//! informational only.
//!
//! Because registry iteration order is name-sorted and policy
//! construction is deterministic, converting the same configuration
//! twice yields byte-identical blobs; [`digest`] exposes that property
//! for cheap cross-run diffing.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    Action, AttrRewrite, Guard, Policy, PolicyRegistry, PrefixRange, RoutingProtocol, Statement,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RTLW";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a registry to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode registry: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a registry from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a policy registry binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRegistry {
    metadata: RegistryMetadata,
    policies: Vec<SerializedPolicy>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryMetadata {
    policy_count: usize,
    statement_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedPolicy {
    name: String,
    statements: Vec<SerializedStatement>,
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedStatement {
    If {
        guard: SerializedGuard,
        then_branch: Vec<SerializedStatement>,
        else_branch: Vec<SerializedStatement>,
    },
    Call(String),
    Set(SerializedRewrite),
    SetDefault(SerializedAction),
    Accept,
    Reject,
    FallThrough,
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedGuard {
    Constant(bool),
    PrefixList(String),
    AddressList(String),
    /// `(addr, prefix_len, low, high)` per range.
    PrefixSpace(Vec<(u32, u8, u8, u8)>),
    Tag(u32),
    Metric(u64),
    Protocol(Vec<SerializedProtocol>),
    CommunityList(String),
    AsPathSet(String),
    Policy(String),
    WithIntermediateAttrs(Box<SerializedGuard>),
    All(Vec<SerializedGuard>),
    Any(Vec<SerializedGuard>),
    Not(Box<SerializedGuard>),
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedRewrite {
    Metric(u64),
    LocalPreference(u64),
    Tag(u32),
    Weight(u32),
    NextHop(u32),
    AddCommunities(Vec<u32>),
    SetCommunities(Vec<u32>),
    RemovePrivateAs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedProtocol {
    Connected,
    Static,
    Rip,
    Ospf,
    Bgp,
    Ibgp,
    Aggregate,
}

// ---------------------------------------------------------------------------
// Leaf conversions
// ---------------------------------------------------------------------------

fn serialize_action(action: Action) -> SerializedAction {
    match action {
        Action::Accept => SerializedAction::Accept,
        Action::Reject => SerializedAction::Reject,
    }
}

fn deserialize_action(action: SerializedAction) -> Action {
    match action {
        SerializedAction::Accept => Action::Accept,
        SerializedAction::Reject => Action::Reject,
    }
}

fn serialize_protocol(protocol: RoutingProtocol) -> SerializedProtocol {
    match protocol {
        RoutingProtocol::Connected => SerializedProtocol::Connected,
        RoutingProtocol::Static => SerializedProtocol::Static,
        RoutingProtocol::Rip => SerializedProtocol::Rip,
        RoutingProtocol::Ospf => SerializedProtocol::Ospf,
        RoutingProtocol::Bgp => SerializedProtocol::Bgp,
        RoutingProtocol::Ibgp => SerializedProtocol::Ibgp,
        RoutingProtocol::Aggregate => SerializedProtocol::Aggregate,
    }
}

fn deserialize_protocol(protocol: SerializedProtocol) -> RoutingProtocol {
    match protocol {
        SerializedProtocol::Connected => RoutingProtocol::Connected,
        SerializedProtocol::Static => RoutingProtocol::Static,
        SerializedProtocol::Rip => RoutingProtocol::Rip,
        SerializedProtocol::Ospf => RoutingProtocol::Ospf,
        SerializedProtocol::Bgp => RoutingProtocol::Bgp,
        SerializedProtocol::Ibgp => RoutingProtocol::Ibgp,
        SerializedProtocol::Aggregate => RoutingProtocol::Aggregate,
    }
}

fn serialize_range(range: &PrefixRange) -> (u32, u8, u8, u8) {
    (
        range.prefix.addr().into(),
        range.prefix.prefix_len(),
        *range.lengths.start(),
        *range.lengths.end(),
    )
}

fn deserialize_range(raw: (u32, u8, u8, u8)) -> Result<PrefixRange, DeserializeError> {
    let (addr, len, low, high) = raw;
    let prefix = Ipv4Net::new(Ipv4Addr::from(addr), len)
        .map_err(|_| DeserializeError::Validation(format!("prefix length {len} out of bounds")))?;
    Ok(PrefixRange::with_lengths(prefix, low..=high))
}

fn serialize_rewrite(rewrite: &AttrRewrite) -> SerializedRewrite {
    match rewrite {
        AttrRewrite::Metric(v) => SerializedRewrite::Metric(*v),
        AttrRewrite::LocalPreference(v) => SerializedRewrite::LocalPreference(*v),
        AttrRewrite::Tag(v) => SerializedRewrite::Tag(*v),
        AttrRewrite::Weight(v) => SerializedRewrite::Weight(*v),
        AttrRewrite::NextHop(v) => SerializedRewrite::NextHop((*v).into()),
        AttrRewrite::AddCommunities(cs) => {
            SerializedRewrite::AddCommunities(cs.iter().copied().collect())
        }
        AttrRewrite::SetCommunities(cs) => {
            SerializedRewrite::SetCommunities(cs.iter().copied().collect())
        }
        AttrRewrite::RemovePrivateAs => SerializedRewrite::RemovePrivateAs,
    }
}

fn deserialize_rewrite(rewrite: SerializedRewrite) -> AttrRewrite {
    match rewrite {
        SerializedRewrite::Metric(v) => AttrRewrite::Metric(v),
        SerializedRewrite::LocalPreference(v) => AttrRewrite::LocalPreference(v),
        SerializedRewrite::Tag(v) => AttrRewrite::Tag(v),
        SerializedRewrite::Weight(v) => AttrRewrite::Weight(v),
        SerializedRewrite::NextHop(v) => AttrRewrite::NextHop(Ipv4Addr::from(v)),
        SerializedRewrite::AddCommunities(cs) => {
            AttrRewrite::AddCommunities(cs.into_iter().collect())
        }
        SerializedRewrite::SetCommunities(cs) => {
            AttrRewrite::SetCommunities(cs.into_iter().collect())
        }
        SerializedRewrite::RemovePrivateAs => AttrRewrite::RemovePrivateAs,
    }
}

// ---------------------------------------------------------------------------
// Guard / statement conversion
// ---------------------------------------------------------------------------

fn serialize_guard(guard: &Guard) -> SerializedGuard {
    match guard {
        Guard::Constant(b) => SerializedGuard::Constant(*b),
        Guard::MatchPrefixList(name) => SerializedGuard::PrefixList(name.clone()),
        Guard::MatchAddressList(name) => SerializedGuard::AddressList(name.clone()),
        Guard::MatchPrefixSpace(ranges) => {
            SerializedGuard::PrefixSpace(ranges.iter().map(serialize_range).collect())
        }
        Guard::MatchTag(tag) => SerializedGuard::Tag(*tag),
        Guard::MatchMetric(metric) => SerializedGuard::Metric(*metric),
        Guard::MatchProtocol(protocols) => SerializedGuard::Protocol(
            protocols.iter().copied().map(serialize_protocol).collect(),
        ),
        Guard::MatchCommunityList(name) => SerializedGuard::CommunityList(name.clone()),
        Guard::MatchAsPathSet(name) => SerializedGuard::AsPathSet(name.clone()),
        Guard::Policy(name) => SerializedGuard::Policy(name.clone()),
        Guard::WithIntermediateAttrs(inner) => {
            SerializedGuard::WithIntermediateAttrs(Box::new(serialize_guard(inner)))
        }
        Guard::All(parts) => SerializedGuard::All(parts.iter().map(serialize_guard).collect()),
        Guard::Any(parts) => SerializedGuard::Any(parts.iter().map(serialize_guard).collect()),
        Guard::Not(inner) => SerializedGuard::Not(Box::new(serialize_guard(inner))),
    }
}

fn deserialize_guard(guard: SerializedGuard) -> Result<Guard, DeserializeError> {
    Ok(match guard {
        SerializedGuard::Constant(b) => Guard::Constant(b),
        SerializedGuard::PrefixList(name) => Guard::MatchPrefixList(name),
        SerializedGuard::AddressList(name) => Guard::MatchAddressList(name),
        SerializedGuard::PrefixSpace(ranges) => Guard::MatchPrefixSpace(
            ranges
                .into_iter()
                .map(deserialize_range)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        SerializedGuard::Tag(tag) => Guard::MatchTag(tag),
        SerializedGuard::Metric(metric) => Guard::MatchMetric(metric),
        SerializedGuard::Protocol(protocols) => Guard::MatchProtocol(
            protocols.into_iter().map(deserialize_protocol).collect(),
        ),
        SerializedGuard::CommunityList(name) => Guard::MatchCommunityList(name),
        SerializedGuard::AsPathSet(name) => Guard::MatchAsPathSet(name),
        SerializedGuard::Policy(name) => Guard::Policy(name),
        SerializedGuard::WithIntermediateAttrs(inner) => {
            Guard::WithIntermediateAttrs(Box::new(deserialize_guard(*inner)?))
        }
        SerializedGuard::All(parts) => Guard::All(
            parts
                .into_iter()
                .map(deserialize_guard)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        SerializedGuard::Any(parts) => Guard::Any(
            parts
                .into_iter()
                .map(deserialize_guard)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        SerializedGuard::Not(inner) => Guard::Not(Box::new(deserialize_guard(*inner)?)),
    })
}

fn serialize_statement(statement: &Statement) -> SerializedStatement {
    match statement {
        Statement::If {
            guard,
            then_branch,
            else_branch,
        } => SerializedStatement::If {
            guard: serialize_guard(guard),
            then_branch: then_branch.iter().map(serialize_statement).collect(),
            else_branch: else_branch.iter().map(serialize_statement).collect(),
        },
        Statement::Call(name) => SerializedStatement::Call(name.clone()),
        Statement::Set(rewrite) => SerializedStatement::Set(serialize_rewrite(rewrite)),
        Statement::SetDefault(action) => SerializedStatement::SetDefault(serialize_action(*action)),
        Statement::Accept => SerializedStatement::Accept,
        Statement::Reject => SerializedStatement::Reject,
        Statement::FallThrough => SerializedStatement::FallThrough,
    }
}

fn deserialize_statement(statement: SerializedStatement) -> Result<Statement, DeserializeError> {
    Ok(match statement {
        SerializedStatement::If {
            guard,
            then_branch,
            else_branch,
        } => Statement::If {
            guard: deserialize_guard(guard)?,
            then_branch: then_branch
                .into_iter()
                .map(deserialize_statement)
                .collect::<Result<Vec<_>, _>>()?,
            else_branch: else_branch
                .into_iter()
                .map(deserialize_statement)
                .collect::<Result<Vec<_>, _>>()?,
        },
        SerializedStatement::Call(name) => Statement::Call(name),
        SerializedStatement::Set(rewrite) => Statement::Set(deserialize_rewrite(rewrite)),
        SerializedStatement::SetDefault(action) => {
            Statement::SetDefault(deserialize_action(action))
        }
        SerializedStatement::Accept => Statement::Accept,
        SerializedStatement::Reject => Statement::Reject,
        SerializedStatement::FallThrough => Statement::FallThrough,
    })
}

// ---------------------------------------------------------------------------
// Registry conversion
// ---------------------------------------------------------------------------

fn registry_to_serialized(registry: &PolicyRegistry) -> SerializedRegistry {
    // Registry iteration is name-sorted, so the payload is already
    // deterministic.
    let policies: Vec<SerializedPolicy> = registry
        .iter()
        .map(|p| SerializedPolicy {
            name: p.name.clone(),
            statements: p.statements.iter().map(serialize_statement).collect(),
        })
        .collect();

    let statement_count = policies.iter().map(|p| p.statements.len()).sum();
    SerializedRegistry {
        metadata: RegistryMetadata {
            policy_count: policies.len(),
            statement_count,
        },
        policies,
    }
}

fn serialized_to_registry(ser: SerializedRegistry) -> Result<PolicyRegistry, DeserializeError> {
    validate(&ser)?;

    let mut registry = PolicyRegistry::new();
    for policy in ser.policies {
        let statements = policy
            .statements
            .into_iter()
            .map(deserialize_statement)
            .collect::<Result<Vec<_>, _>>()?;
        registry
            .define(Policy::new(policy.name.clone(), statements))
            .map_err(|_| {
                DeserializeError::Validation(format!("duplicate policy name '{}'", policy.name))
            })?;
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedRegistry) -> Result<(), DeserializeError> {
    if ser.metadata.policy_count != ser.policies.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} policies but payload has {}",
            ser.metadata.policy_count,
            ser.policies.len()
        )));
    }
    let statement_count: usize = ser.policies.iter().map(|p| p.statements.len()).sum();
    if ser.metadata.statement_count != statement_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} statements but payload has {}",
            ser.metadata.statement_count, statement_count
        )));
    }

    for policy in &ser.policies {
        for statement in &policy.statements {
            validate_statement(statement)?;
        }
    }
    Ok(())
}

fn validate_statement(statement: &SerializedStatement) -> Result<(), DeserializeError> {
    if let SerializedStatement::If {
        guard,
        then_branch,
        else_branch,
    } = statement
    {
        validate_guard(guard)?;
        for child in then_branch.iter().chain(else_branch) {
            validate_statement(child)?;
        }
    }
    Ok(())
}

fn validate_guard(guard: &SerializedGuard) -> Result<(), DeserializeError> {
    match guard {
        SerializedGuard::PrefixSpace(ranges) => {
            for (_, len, low, high) in ranges {
                if *len > 32 || *high > 32 || low > high {
                    return Err(DeserializeError::Validation(format!(
                        "malformed prefix range (/{len}, lengths {low}-{high})"
                    )));
                }
            }
            Ok(())
        }
        SerializedGuard::All(parts) | SerializedGuard::Any(parts) => {
            if parts.is_empty() {
                return Err(DeserializeError::Validation(
                    "empty All/Any guard".to_owned(),
                ));
            }
            for part in parts {
                validate_guard(part)?;
            }
            Ok(())
        }
        SerializedGuard::WithIntermediateAttrs(inner) | SerializedGuard::Not(inner) => {
            validate_guard(inner)
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    // bytes[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

/// Serialize a registry to the stable binary format.
///
/// # Errors
///
/// Returns [`SerializeError`] if the payload cannot be encoded.
pub fn encode(registry: &PolicyRegistry) -> Result<Vec<u8>, SerializeError> {
    let serialized = registry_to_serialized(registry);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Deserialize a registry from the stable binary format.
///
/// # Errors
///
/// Returns [`DeserializeError`] on a malformed, corrupted, or
/// incompatible blob.
pub fn decode(bytes: &[u8]) -> Result<PolicyRegistry, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    // Integrity check
    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedRegistry, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_registry(serialized)
}

/// Full BLAKE3 digest of a registry's encoded payload. Two registries
/// have equal digests exactly when their encoded forms are
/// byte-identical.
///
/// # Errors
///
/// Returns [`SerializeError`] if the payload cannot be encoded.
pub fn digest(registry: &PolicyRegistry) -> Result<[u8; 32], SerializeError> {
    let serialized = registry_to_serialized(registry);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;
    Ok(*blake3::hash(&payload).as_bytes())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
