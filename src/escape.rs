//! Decoding of escaped string literals.
//!
//! dhcpd writes binary identifiers (IPv6 IAID+DUID blobs, client `uid`
//! values) as quoted strings where printable bytes appear literally and
//! everything else is written as a three-digit octal escape:
//!
//! ```text
//! ia-na "4dv\352\000\001\000\001\035f\037\342\012\000'\000\000\000" {
//! ```
//!
//! Older servers and some tools write `uid` as colon-separated hex instead,
//! which [`decode_hex_identifier`] handles.

use crate::error::{Error, Result};

/// Largest number of octal digits consumed by a single `\NNN` escape.
const MAX_OCTAL_DIGITS: usize = 3;

fn invalid(input: &str, reason: impl Into<String>) -> Error {
    Error::InvalidEscape {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Converts a decoded character to its byte value.
///
/// Lease files are read byte-preservingly (Latin-1), so every character
/// of interest fits in one byte.
fn latin1_byte(input: &str, c: char) -> Result<u8> {
    u8::try_from(u32::from(c))
        .map_err(|_| invalid(input, format!("character {c:?} does not fit in one byte")))
}

/// Decodes a C-style escaped string literal into raw bytes.
///
/// Surrounding double quotes are removed when both are present. Supported
/// escapes are `\NNN` (one to three octal digits), `\xHH`, and the usual
/// single-character escapes (`\\`, `\"`, `\'`, `\n`, `\r`, `\t`, `\a`, `\b`,
/// `\f`, `\v`). An unrecognized escape is kept as the backslash followed by
/// the character. Text without backslashes passes through unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidEscape`] if the string ends with a lone
/// backslash, an escape denotes a value above 255, or a character is
/// outside the Latin-1 range.
pub fn decode_escaped(input: &str) -> Result<Vec<u8>> {
    let body = input
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(input);

    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            bytes.push(latin1_byte(input, c)?);
            continue;
        }

        let Some(escape) = chars.next() else {
            return Err(invalid(input, "trailing backslash"));
        };

        match escape {
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or_default();
                for _ in 1..MAX_OCTAL_DIGITS {
                    match chars.peek().and_then(|next| next.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                let byte = u8::try_from(value)
                    .map_err(|_| invalid(input, format!("octal escape {value:o} exceeds 255")))?;
                bytes.push(byte);
            }
            'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|next| next.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return Err(invalid(input, "\\x escape without hex digits"));
                }
                let byte = u8::try_from(value)
                    .map_err(|_| invalid(input, "\\x escape out of range"))?;
                bytes.push(byte);
            }
            '\\' => bytes.push(b'\\'),
            '"' => bytes.push(b'"'),
            '\'' => bytes.push(b'\''),
            'n' => bytes.push(b'\n'),
            'r' => bytes.push(b'\r'),
            't' => bytes.push(b'\t'),
            'a' => bytes.push(0x07),
            'b' => bytes.push(0x08),
            'f' => bytes.push(0x0c),
            'v' => bytes.push(0x0b),
            other => {
                bytes.push(b'\\');
                bytes.push(latin1_byte(input, other)?);
            }
        }
    }

    Ok(bytes)
}

/// Decodes a colon-separated hex identifier such as `1:60:a4:4c:b5:6a:dd`.
///
/// Each group is one byte written with one or two hex digits, the way
/// dhcpd prints hardware addresses and unquoted `uid` values.
///
/// # Errors
///
/// Returns [`Error::InvalidEscape`] if any group is empty, longer than two
/// digits, or not hexadecimal.
pub fn decode_hex_identifier(input: &str) -> Result<Vec<u8>> {
    input
        .split(':')
        .map(|group| {
            if group.is_empty() || group.len() > 2 {
                return Err(invalid(input, format!("bad hex group {group:?}")));
            }
            u8::from_str_radix(group, 16)
                .map_err(|_| invalid(input, format!("bad hex group {group:?}")))
        })
        .collect()
}

/// Encodes bytes as lowercase hex without separators.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
