//! Whole-file parsing and the "current leases" view.
//!
//! dhcpd never rewrites a lease in place: every state change appends a new
//! block, and the file is compacted only occasionally. The same address or
//! client therefore shows up several times, and the block nearest the end
//! of the file is the most recent one. [`Leases::current`] relies on that
//! ordering to pick one lease per client.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use dhcpd_leases::Leases;
//!
//! # fn example() -> dhcpd_leases::Result<()> {
//! let text = "\
//! lease 10.0.10.72 {
//!   starts 1 2015/07/06 07:50:42;
//!   ends 1 2015/07/06 08:20:42;
//!   binding state active;
//!   hardware ethernet 64:5a:04:6a:07:a2;
//! }
//! ";
//! let leases = Leases::parse(text)?;
//! let now = Utc.with_ymd_and_hms(2015, 7, 6, 8, 15, 0).unwrap();
//! let current = leases.current(now);
//! assert_eq!(current["64:5a:04:6a:07:a2"].ip().to_string(), "10.0.10.72");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use tracing::{debug, trace};

use crate::block::{IaAddrBlocks, IaBlocks, LeaseBlocks, without_nested_blocks};
use crate::error::{Error, Result};
use crate::lease::{Lease, Lease4, Lease6};
use crate::properties::PropertyTable;
use crate::time::parse_timestamp;

/// All leases parsed from one lease file, in file order.
///
/// IPv4 leases come first, followed by the IPv6 leases of every identity
/// association in the order the associations and their addresses appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leases {
    leases: Vec<Lease>,
}

impl Leases {
    /// Parses the full text of a lease file.
    ///
    /// Blocks that are not leases (a `lease` block without `hardware`, an
    /// identity association without addresses, unterminated blocks) are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any lease field is present but malformed. The
    /// whole parse fails in that case; no partial result is returned.
    pub fn parse(text: &str) -> Result<Self> {
        let mut leases = Vec::new();
        let mut skipped = 0usize;

        for (address, inner) in LeaseBlocks::new(text) {
            match Lease4::from_properties(address, PropertyTable::parse(inner))? {
                Some(lease) => {
                    trace!("Parsed lease {}", lease);
                    leases.push(Lease::V4(lease));
                }
                None => skipped += 1,
            }
        }

        for ia in IaBlocks::new(text) {
            let mut addresses = IaAddrBlocks::new(ia.inner).peekable();
            if addresses.peek().is_none() {
                debug!("Skipping ia-{} block without addresses", ia.kind);
                skipped += 1;
                continue;
            }

            let ia_properties = PropertyTable::parse(&without_nested_blocks(ia.inner));
            let cltt = ia_properties
                .get("cltt")
                .ok_or(Error::MissingProperty("cltt"))?;
            let last_communication_at = parse_timestamp(cltt)?;

            for (address, inner) in addresses {
                let lease = Lease6::from_properties(
                    address,
                    PropertyTable::parse(inner),
                    ia.id,
                    ia.kind,
                    last_communication_at,
                )?;
                trace!("Parsed lease {}", lease);
                leases.push(Lease::V6(lease));
            }
        }

        debug!(
            "Parsed {} lease(s), skipped {} block(s)",
            leases.len(),
            skipped
        );

        Ok(Self { leases })
    }

    /// Parses a lease file given as raw bytes.
    ///
    /// Bytes are mapped one-to-one to characters (Latin-1), so identifiers
    /// holding arbitrary bytes survive decoding unchanged.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let text: String = bytes.iter().map(|&byte| char::from(byte)).collect();
        Self::parse(&text)
    }

    /// Parses a gzip-compressed lease file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the data is not valid gzip, otherwise the
    /// same errors as [`Leases::parse`].
    pub fn parse_gzip(bytes: &[u8]) -> Result<Self> {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut decoded)?;
        Self::parse_bytes(&decoded)
    }

    /// Returns the leases that are valid at `now` and active, keyed by
    /// [`Lease::identity_key`].
    ///
    /// When several leases share a key, the one appearing last in the file
    /// wins.
    pub fn current(&self, now: DateTime<Utc>) -> HashMap<String, &Lease> {
        current_leases(&self.leases, now)
    }

    pub fn leases(&self) -> &[Lease] {
        &self.leases
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lease> {
        self.leases.iter()
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    pub fn into_vec(self) -> Vec<Lease> {
        self.leases
    }
}

impl IntoIterator for Leases {
    type Item = Lease;
    type IntoIter = std::vec::IntoIter<Lease>;

    fn into_iter(self) -> Self::IntoIter {
        self.leases.into_iter()
    }
}

impl<'a> IntoIterator for &'a Leases {
    type Item = &'a Lease;
    type IntoIter = std::slice::Iter<'a, Lease>;

    fn into_iter(self) -> Self::IntoIter {
        self.leases.iter()
    }
}

/// Parses the full text of a lease file into a list of leases.
///
/// Equivalent to [`Leases::parse`] followed by [`Leases::into_vec`].
pub fn parse(text: &str) -> Result<Vec<Lease>> {
    Leases::parse(text).map(Leases::into_vec)
}

/// Selects the current lease per identity key from leases in file order.
pub fn current_leases(leases: &[Lease], now: DateTime<Utc>) -> HashMap<String, &Lease> {
    let mut current = HashMap::new();
    for lease in leases.iter().filter(|lease| lease.is_current(now)) {
        current.insert(lease.identity_key(), lease);
    }
    current
}
