//! Typed lease records.
//!
//! A parsed block becomes either a [`Lease4`] (from a `lease` block) or a
//! [`Lease6`] (one per `iaaddr`/`iaprefix` inside an `ia-*` block). Both
//! are immutable values; validity and activity are derived on demand
//! against a caller-supplied reference time, never the system clock.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::block::{IaKind, V6Address};
use crate::error::{Error, Result};
use crate::escape::{decode_escaped, decode_hex_identifier, hex_encode};
use crate::properties::PropertyTable;
use crate::time::{parse_expiry, parse_timestamp};

/// Number of leading host identifier bytes holding the IAID.
const IAID_SIZE: usize = 4;

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_encode(bytes))
}

/// Server-assigned lifecycle state of a lease.
///
/// Unknown tokens are kept in [`BindingState::Other`] so that files from
/// newer servers still parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingState {
    Active,
    Free,
    Abandoned,
    Backup,
    Released,
    Expired,
    Reset,
    Other(String),
}

impl BindingState {
    /// The token dhcpd writes after `binding state`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Free => "free",
            Self::Abandoned => "abandoned",
            Self::Backup => "backup",
            Self::Released => "released",
            Self::Expired => "expired",
            Self::Reset => "reset",
            Self::Other(token) => token,
        }
    }
}

impl From<&str> for BindingState {
    fn from(token: &str) -> Self {
        match token {
            "active" => Self::Active,
            "free" => Self::Free,
            "abandoned" => Self::Abandoned,
            "backup" => Self::Backup,
            "released" => Self::Released,
            "expired" => Self::Expired,
            "reset" => Self::Reset,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BindingState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parses a `binding` value such as `state active`.
fn parse_binding(value: &str) -> Result<BindingState> {
    let (_, state) = value.split_once(' ').ok_or_else(|| Error::InvalidProperty {
        field: "binding",
        value: value.to_string(),
    })?;
    Ok(BindingState::from(state))
}

fn required<'a>(table: &'a PropertyTable, name: &'static str) -> Result<&'a str> {
    table.get(name).ok_or(Error::MissingProperty(name))
}

/// An `ends` value; an absent property means the lease never ends.
fn parse_ends(table: &PropertyTable) -> Result<Option<DateTime<Utc>>> {
    table.get("ends").map_or(Ok(None), parse_expiry)
}

fn parse_lifetime(table: &PropertyTable, field: &'static str) -> Result<u32> {
    let value = required(table, field)?;
    value.parse().map_err(|_| Error::InvalidLifetime {
        field,
        value: value.to_string(),
    })
}

/// An IPv4 lease from a `lease <address> { ... }` block.
#[derive(Debug, Clone, Serialize)]
pub struct Lease4 {
    pub address: Ipv4Addr,

    /// Link-layer type, usually `ethernet`.
    pub hardware_type: String,

    /// Colon-separated hex MAC address as written in the file.
    pub hardware_address: String,

    /// Start of the lease; `None` when the block has no `starts` line.
    pub starts_at: Option<DateTime<Utc>>,

    /// End of the lease; `None` means it never ends.
    pub ends_at: Option<DateTime<Utc>>,

    /// Client-supplied hostname without quotes, or empty.
    pub hostname: String,

    pub binding_state: BindingState,

    /// Every general statement of the block (`uid`, `cltt`, `tstp`, ...).
    pub properties: HashMap<String, String>,
    pub options: HashMap<String, String>,
    pub sets: HashMap<String, String>,
}

impl Lease4 {
    /// Builds a lease from the statements of a `lease` block.
    ///
    /// Returns `Ok(None)` for blocks without a `hardware` statement; those
    /// are bookkeeping entries (for example abandoned or backup pool
    /// addresses), not leases held by a host.
    ///
    /// # Errors
    ///
    /// Returns an error if `hardware` or `binding` is malformed, `binding`
    /// is missing, or a timestamp cannot be parsed.
    pub fn from_properties(address: Ipv4Addr, table: PropertyTable) -> Result<Option<Self>> {
        let Some(hardware) = table.get("hardware") else {
            debug!("Skipping lease block {} without hardware address", address);
            return Ok(None);
        };

        let (hardware_type, hardware_address) = match hardware.split_once(' ') {
            Some((kind, mac)) => (kind.to_string(), mac.to_string()),
            None => {
                return Err(Error::InvalidProperty {
                    field: "hardware",
                    value: hardware.to_string(),
                });
            }
        };

        let starts_at = table.get("starts").map(parse_timestamp).transpose()?;
        let ends_at = parse_ends(&table)?;
        let binding_state = parse_binding(required(&table, "binding")?)?;
        let hostname = table
            .get("client-hostname")
            .map(|name| name.replace('"', ""))
            .unwrap_or_default();

        Ok(Some(Self {
            address,
            hardware_type,
            hardware_address,
            starts_at,
            ends_at,
            hostname,
            binding_state,
            properties: table.general,
            options: table.options,
            sets: table.sets,
        }))
    }

    /// Returns true if `now` lies within the lease's start and end.
    ///
    /// A missing start or a `never` end leaves that side unchecked.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at.is_none_or(|start| start <= now);
        let not_ended = self.ends_at.is_none_or(|end| now <= end);
        started && not_ended
    }

    /// Returns true if the binding state is `active`.
    pub fn is_active(&self) -> bool {
        self.binding_state == BindingState::Active
    }

    /// The state the lease moves to when it expires (`next binding state`).
    pub fn next_binding_state(&self) -> Option<BindingState> {
        self.properties
            .get("next")
            .and_then(|value| value.strip_prefix("binding state "))
            .map(BindingState::from)
    }

    /// The client identifier from the `uid` statement, if any.
    ///
    /// Accepts both the quoted escaped form and colon-separated hex.
    pub fn client_identifier(&self) -> Result<Option<Vec<u8>>> {
        let Some(uid) = self.properties.get("uid") else {
            return Ok(None);
        };
        if uid.starts_with('"') {
            decode_escaped(uid).map(Some)
        } else {
            decode_hex_identifier(uid).map(Some)
        }
    }
}

impl PartialEq for Lease4 {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.hardware_address == other.hardware_address
            && self.starts_at == other.starts_at
    }
}

impl fmt::Display for Lease4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {} ({})",
            self.address, self.hardware_address, self.hostname
        )
    }
}

/// An IPv6 address or prefix from an `iaaddr`/`iaprefix` block.
#[derive(Debug, Clone, Serialize)]
pub struct Lease6 {
    pub address: V6Address,

    pub kind: IaKind,

    /// Decoded identity of the enclosing `ia-*` block: IAID followed by DUID.
    #[serde(serialize_with = "serialize_hex")]
    pub host_identifier: Vec<u8>,

    /// Interface association identifier (first 4 identifier bytes, little-endian).
    pub iaid: u32,

    /// DHCP unique identifier (identifier bytes after the IAID).
    #[serde(serialize_with = "serialize_hex")]
    pub duid: Vec<u8>,

    /// Last client contact (`cltt` of the enclosing block).
    pub last_communication_at: DateTime<Utc>,

    /// End of the lease; `None` means it never ends.
    pub ends_at: Option<DateTime<Utc>>,

    pub binding_state: BindingState,

    /// Preferred lifetime in seconds.
    pub preferred_lifetime: u32,

    /// Valid lifetime in seconds.
    pub max_lifetime: u32,

    pub properties: HashMap<String, String>,
    pub options: HashMap<String, String>,
    pub sets: HashMap<String, String>,
}

impl Lease6 {
    /// Builds a lease from the statements of an `iaaddr`/`iaprefix` block.
    ///
    /// `host_identifier` is the escaped identity string of the enclosing
    /// block, `kind` its association type and `last_communication_at` its
    /// `cltt` time.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier decodes to fewer than 4 bytes, a
    /// lifetime is not a non-negative integer, a required statement is
    /// missing, or a timestamp cannot be parsed.
    pub fn from_properties(
        address: V6Address,
        table: PropertyTable,
        host_identifier: &str,
        kind: IaKind,
        last_communication_at: DateTime<Utc>,
    ) -> Result<Self> {
        let host_identifier = decode_escaped(host_identifier)?;
        if host_identifier.len() < IAID_SIZE {
            return Err(Error::HostIdentifierTooShort(host_identifier.len()));
        }
        let mut iaid_bytes = [0u8; IAID_SIZE];
        iaid_bytes.copy_from_slice(&host_identifier[..IAID_SIZE]);
        let iaid = u32::from_le_bytes(iaid_bytes);
        let duid = host_identifier[IAID_SIZE..].to_vec();

        let binding_state = parse_binding(required(&table, "binding")?)?;
        let ends_at = parse_ends(&table)?;
        let preferred_lifetime = parse_lifetime(&table, "preferred-life")?;
        let max_lifetime = parse_lifetime(&table, "max-life")?;

        Ok(Self {
            address,
            kind,
            host_identifier,
            iaid,
            duid,
            last_communication_at,
            ends_at,
            binding_state,
            preferred_lifetime,
            max_lifetime,
            properties: table.general,
            options: table.options,
            sets: table.sets,
        })
    }

    /// Returns true if the lease has not ended at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_none_or(|end| now <= end)
    }

    /// Returns true if the binding state is `active`.
    pub fn is_active(&self) -> bool {
        self.binding_state == BindingState::Active
    }

    /// The host identifier as lowercase hex.
    pub fn host_identifier_hex(&self) -> String {
        hex_encode(&self.host_identifier)
    }
}

impl PartialEq for Lease6 {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.host_identifier == other.host_identifier
    }
}

impl fmt::Display for Lease6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} iaid {})", self.address, self.kind, self.iaid)
    }
}

/// A lease of either address family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Lease {
    V4(Lease4),
    V6(Lease6),
}

impl Lease {
    /// Key under which this lease competes for "current" status.
    ///
    /// The MAC address for IPv4; `<ta|na|pd>-<hex host identifier>` for IPv6.
    pub fn identity_key(&self) -> String {
        match self {
            Self::V4(lease) => lease.hardware_address.clone(),
            Self::V6(lease) => format!("{}-{}", lease.kind.as_str(), lease.host_identifier_hex()),
        }
    }

    /// The leased address (network address for a delegated prefix).
    pub fn ip(&self) -> IpAddr {
        match self {
            Self::V4(lease) => IpAddr::V4(lease.address),
            Self::V6(lease) => IpAddr::V6(lease.address.ip()),
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::V4(lease) => lease.is_valid(now),
            Self::V6(lease) => lease.is_valid(now),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::V4(lease) => lease.is_active(),
            Self::V6(lease) => lease.is_active(),
        }
    }

    /// Returns true if the lease is both valid at `now` and active.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_valid(now) && self.is_active()
    }

    pub fn binding_state(&self) -> &BindingState {
        match self {
            Self::V4(lease) => &lease.binding_state,
            Self::V6(lease) => &lease.binding_state,
        }
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::V4(lease) => lease.ends_at,
            Self::V6(lease) => lease.ends_at,
        }
    }

    pub fn options(&self) -> &HashMap<String, String> {
        match self {
            Self::V4(lease) => &lease.options,
            Self::V6(lease) => &lease.options,
        }
    }

    pub fn sets(&self) -> &HashMap<String, String> {
        match self {
            Self::V4(lease) => &lease.sets,
            Self::V6(lease) => &lease.sets,
        }
    }

    pub fn as_v4(&self) -> Option<&Lease4> {
        match self {
            Self::V4(lease) => Some(lease),
            Self::V6(_) => None,
        }
    }

    pub fn as_v6(&self) -> Option<&Lease6> {
        match self {
            Self::V4(_) => None,
            Self::V6(lease) => Some(lease),
        }
    }
}

impl From<Lease4> for Lease {
    fn from(lease: Lease4) -> Self {
        Self::V4(lease)
    }
}

impl From<Lease6> for Lease {
    fn from(lease: Lease6) -> Self {
        Self::V6(lease)
    }
}

impl fmt::Display for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(lease) => lease.fmt(f),
            Self::V6(lease) => lease.fmt(f),
        }
    }
}
