//! # dhcpd-leases
//!
//! A parser for the lease databases written by ISC dhcpd (`dhcpd.leases`
//! for IPv4, `dhcpd6.leases` for IPv6).
//!
//! ## Features
//!
//! - IPv4 `lease` blocks and IPv6 `ia-na`/`ia-ta`/`ia-pd` associations with
//!   nested `iaaddr`/`iaprefix` blocks
//! - `option` and `set` statements kept apart from ordinary properties
//! - Octal-escaped host identifiers decoded into IAID and DUID
//! - Both timestamp styles (`2 2013/12/10 12:57:04` and `epoch 1386680224`)
//! - Deterministic validity checks against a caller-supplied time
//! - gzip-compressed lease files through [`Leases::parse_gzip`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use dhcpd_leases::Leases;
//!
//! fn main() -> dhcpd_leases::Result<()> {
//!     let text = std::fs::read_to_string("/var/lib/dhcp/dhcpd.leases")?;
//!     let leases = Leases::parse(&text)?;
//!     for (key, lease) in leases.current(chrono::Utc::now()) {
//!         println!("{key} -> {}", lease.ip());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`block`] - Finds lease blocks in the file text
//! - [`PropertyTable`] - Splits a block body into properties, options and sets
//! - [`time`] - Timestamp and reference time parsing
//! - [`escape`] - Escaped identifier decoding
//! - [`Lease4`], [`Lease6`], [`Lease`] - Typed lease records
//! - [`Leases`] - Whole-file parsing and current lease selection
//! - [`Config`] - Settings for the command-line tool

pub mod block;
pub mod config;
pub mod error;
pub mod escape;
pub mod lease;
pub mod leases;
pub mod properties;
pub mod time;

pub use block::{IaKind, V6Address};
pub use config::Config;
pub use error::{Error, Result};
pub use lease::{BindingState, Lease, Lease4, Lease6};
pub use leases::{Leases, current_leases, parse};
pub use properties::PropertyTable;
