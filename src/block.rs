//! Lease block extraction.
//!
//! A lease file is an append-only log of brace-delimited blocks:
//!
//! ```text
//! lease 10.0.0.10 {
//!   starts 2 2013/12/10 12:57:04;
//!   hardware ethernet 60:a4:4c:b5:6a:dd;
//! }
//! ia-na "4dv\352\000\001\000\001\035f\037\342\012\000'\000\000\000" {
//!   cltt 2 2015/08/18 16:55:37;
//!   iaaddr 2001:610:600:891d::60 {
//!     binding state active;
//!   }
//! }
//! ```
//!
//! Each iterator in this module scans for one block header and yields the
//! subject plus the text between the opening brace and its matching closing
//! brace. Braces inside quoted strings and `#` comments are ignored. A
//! header that is malformed or never closed yields nothing; scanning resumes
//! right after its keyword.
//!
//! The iterators borrow the text and are [`Clone`], so a scan can be
//! restarted or run twice without re-reading the file.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

const LEASE_KEYWORD: &str = "lease";
const IA_KEYWORD: &str = "ia-";
const IAADDR_KEYWORDS: [&str; 2] = ["iaaddr", "iaprefix"];

/// Longest valid IPv6 prefix length.
const MAX_PREFIX_LENGTH: u8 = 128;

/// IPv6 identity association type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IaKind {
    /// `ia-ta`: temporary addresses.
    Temporary,
    /// `ia-na`: non-temporary addresses.
    NonTemporary,
    /// `ia-pd`: delegated prefixes.
    PrefixDelegation,
}

impl IaKind {
    /// The token dhcpd writes after `ia-`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temporary => "ta",
            Self::NonTemporary => "na",
            Self::PrefixDelegation => "pd",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ta" => Some(Self::Temporary),
            "na" => Some(Self::NonTemporary),
            "pd" => Some(Self::PrefixDelegation),
            _ => None,
        }
    }
}

impl fmt::Display for IaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IaKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Subject of an `iaaddr` or `iaprefix` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum V6Address {
    /// A single address from `iaaddr`.
    Address(Ipv6Addr),
    /// A delegated prefix from `iaprefix`.
    Prefix { network: Ipv6Addr, length: u8 },
}

impl V6Address {
    /// The address, or the network address of a prefix.
    pub fn ip(&self) -> Ipv6Addr {
        match self {
            Self::Address(address) => *address,
            Self::Prefix { network, .. } => *network,
        }
    }
}

impl FromStr for V6Address {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidProperty {
            field: "address",
            value: text.to_string(),
        };

        match text.split_once('/') {
            Some((network, length)) => {
                if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let network = network.parse().map_err(|_| invalid())?;
                let length: u8 = length.parse().map_err(|_| invalid())?;
                if length > MAX_PREFIX_LENGTH {
                    return Err(invalid());
                }
                Ok(Self::Prefix { network, length })
            }
            None => text.parse().map(Self::Address).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for V6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{}", address),
            Self::Prefix { network, length } => write!(f, "{}/{}", network, length),
        }
    }
}

impl Serialize for V6Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An `ia-ta`, `ia-na` or `ia-pd` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IaBlock<'a> {
    pub kind: IaKind,
    /// The identity string exactly as written between the quotes (still escaped).
    pub id: &'a str,
    /// Everything between the braces, nested address blocks included.
    pub inner: &'a str,
}

/// Returns true if a keyword found at `index` starts a token.
fn at_token_start(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .is_none_or(|c| !(c.is_alphanumeric() || c == '-' || c == '_' || c == '.'))
}

fn skip_whitespace(text: &str, mut index: usize) -> usize {
    let bytes = text.as_bytes();
    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }
    index
}

/// Reads a bare token (up to whitespace or `{`) and returns it with its end.
fn take_token(text: &str, start: usize) -> (&str, usize) {
    let end = text[start..]
        .find(|c: char| c.is_ascii_whitespace() || c == '{')
        .map_or(text.len(), |offset| start + offset);
    (&text[start..end], end)
}

/// Reads the contents of a quoted string starting at its opening quote.
///
/// Returns the raw contents and the index just past the closing quote.
fn take_quoted(text: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'"') {
        return None;
    }
    let mut index = open + 1;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'"' => return Some((&text[open + 1..index], index + 1)),
            _ => index += 1,
        }
    }
    None
}

/// Expects `{` after optional whitespace and returns the brace body.
///
/// Returns the inner text and the index just past the matching `}`.
fn take_body(text: &str, start: usize) -> Option<(&str, usize)> {
    let open = skip_whitespace(text, start);
    if text.as_bytes().get(open) != Some(&b'{') {
        return None;
    }

    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut index = open + 1;
    while index < bytes.len() {
        match bytes[index] {
            b'"' => {
                let (_, end) = take_quoted(text, index)?;
                index = end;
                continue;
            }
            b'#' => {
                index = text[index..]
                    .find('\n')
                    .map_or(bytes.len(), |offset| index + offset);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[open + 1..index], index + 1));
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}

/// Finds the earliest occurrence of any keyword at or after `from`.
fn find_keyword<'k>(text: &str, from: usize, keywords: &[&'k str]) -> Option<(usize, &'k str)> {
    keywords
        .iter()
        .filter_map(|keyword| {
            text[from..]
                .find(keyword)
                .map(|offset| (from + offset, *keyword))
        })
        .min_by_key(|(index, _)| *index)
}

/// Returns `inner` with every nested `{ ... }` block removed.
///
/// Statements that belong to the enclosing block are left in place; the
/// header words of a nested block remain but never end in `;`.
pub fn without_nested_blocks(inner: &str) -> String {
    let bytes = inner.as_bytes();
    let mut output = String::with_capacity(inner.len());
    let mut copied = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'"' => match take_quoted(inner, index) {
                Some((_, end)) => index = end,
                None => break,
            },
            b'#' => {
                index = inner[index..]
                    .find('\n')
                    .map_or(bytes.len(), |offset| index + offset);
            }
            b'{' => {
                output.push_str(&inner[copied..index]);
                let end = take_body(inner, index).map_or(bytes.len(), |(_, end)| end);
                copied = end;
                index = end;
            }
            _ => index += 1,
        }
    }

    output.push_str(&inner[copied..]);
    output
}

/// Iterator over `lease <ipv4> { ... }` blocks.
#[derive(Debug, Clone)]
pub struct LeaseBlocks<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> LeaseBlocks<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn header_at(&self, start: usize) -> Option<((Ipv4Addr, &'a str), usize)> {
        let text = self.text;
        let subject_start = skip_whitespace(text, start);
        if subject_start == start {
            return None;
        }
        let (subject, subject_end) = take_token(text, subject_start);
        if subject.split('.').count() != 4 {
            return None;
        }
        let address: Ipv4Addr = subject.parse().ok()?;
        let (inner, end) = take_body(text, subject_end)?;
        Some(((address, inner), end))
    }
}

impl<'a> Iterator for LeaseBlocks<'a> {
    type Item = (Ipv4Addr, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (found, keyword) = find_keyword(self.text, self.position, &[LEASE_KEYWORD])?;
            self.position = found + keyword.len();
            if !at_token_start(self.text, found) {
                continue;
            }
            if let Some((item, end)) = self.header_at(self.position) {
                self.position = end;
                return Some(item);
            }
        }
    }
}

/// Iterator over `ia-<ta|na|pd> "<id>" { ... }` blocks.
#[derive(Debug, Clone)]
pub struct IaBlocks<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> IaBlocks<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn header_at(&self, start: usize) -> Option<(IaBlock<'a>, usize)> {
        let text = self.text;
        let kind = IaKind::from_token(text.get(start..start + 2)?)?;
        let quote = skip_whitespace(text, start + 2);
        if quote == start + 2 {
            return None;
        }
        let (id, id_end) = take_quoted(text, quote)?;
        let (inner, end) = take_body(text, id_end)?;
        Some((IaBlock { kind, id, inner }, end))
    }
}

impl<'a> Iterator for IaBlocks<'a> {
    type Item = IaBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (found, keyword) = find_keyword(self.text, self.position, &[IA_KEYWORD])?;
            self.position = found + keyword.len();
            if !at_token_start(self.text, found) {
                continue;
            }
            if let Some((block, end)) = self.header_at(self.position) {
                self.position = end;
                return Some(block);
            }
        }
    }
}

/// Iterator over `iaaddr <addr> { ... }` and `iaprefix <prefix> { ... }`
/// blocks nested inside an [`IaBlock`].
#[derive(Debug, Clone)]
pub struct IaAddrBlocks<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> IaAddrBlocks<'a> {
    pub fn new(ia_inner: &'a str) -> Self {
        Self {
            text: ia_inner,
            position: 0,
        }
    }

    fn header_at(&self, start: usize) -> Option<((V6Address, &'a str), usize)> {
        let text = self.text;
        let subject_start = skip_whitespace(text, start);
        if subject_start == start {
            return None;
        }
        let (subject, subject_end) = take_token(text, subject_start);
        let address: V6Address = subject.parse().ok()?;
        let (inner, end) = take_body(text, subject_end)?;
        Some(((address, inner), end))
    }
}

impl<'a> Iterator for IaAddrBlocks<'a> {
    type Item = (V6Address, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (found, keyword) = find_keyword(self.text, self.position, &IAADDR_KEYWORDS)?;
            self.position = found + keyword.len();
            if !at_token_start(self.text, found) {
                continue;
            }
            if let Some((item, end)) = self.header_at(self.position) {
                self.position = end;
                return Some(item);
            }
        }
    }
}
