//! Property statements inside a lease block.
//!
//! Every statement in a block body sits on its own line and ends with `;`.
//! Three statement shapes exist and are told apart by their first word:
//!
//! ```text
//! hardware ethernet 60:a4:4c:b5:6a:dd;     general:  "hardware" -> "ethernet 60:a4:..."
//! option agent.circuit-id 0:1:3:e9;        options:  "agent.circuit-id" -> "0:1:3:e9"
//! set vendor-class-identifier = "MSFT 5.0"; sets:    "vendor-class-identifier" -> "MSFT 5.0"
//! ```
//!
//! Servers configured with `db-time-format local` append a comment after
//! the terminator (`ends epoch 1436170842; # Mon Jul 06 08:20:42 2015`);
//! the comment is dropped. A line that already ends in `;` has no such
//! comment, so `; #` inside a quoted value is kept.

use std::collections::HashMap;

use serde::Serialize;

const OPTION_PREFIX: &str = "option ";
const SET_PREFIX: &str = "set ";
const SET_SEPARATOR: &str = " = \"";
const TRAILING_COMMENT: &str = "; #";

/// The statements of one block, split by kind.
///
/// Keys have their `option`/`set` prefix removed. When a key repeats within
/// a block the later statement wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropertyTable {
    pub general: HashMap<String, String>,
    pub options: HashMap<String, String>,
    pub sets: HashMap<String, String>,
}

/// Splits on the first space; a statement without one gets an empty value.
fn split_first_space(text: &str) -> (&str, &str) {
    text.split_once(' ').unwrap_or((text, ""))
}

/// Returns the statement on a line without its terminator, if the line
/// holds one.
fn statement(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let body = match line.strip_suffix(';') {
        Some(body) => body,
        None => &line[..line.rfind(TRAILING_COMMENT)?],
    };
    let body = body.trim_start();
    (!body.is_empty()).then_some(body)
}

impl PropertyTable {
    /// Parses the body of a block.
    ///
    /// Lines that do not end in `;` (block headers, closing braces, blank
    /// lines) are ignored, as are `set` statements without ` = "`.
    pub fn parse(inner: &str) -> Self {
        let mut table = Self::default();

        for line in inner.lines() {
            let Some(statement) = statement(line) else {
                continue;
            };

            if let Some(rest) = statement.strip_prefix(OPTION_PREFIX) {
                let (name, value) = split_first_space(rest);
                table.options.insert(name.to_string(), value.to_string());
            } else if let Some(rest) = statement.strip_prefix(SET_PREFIX) {
                let Some((name, value)) = rest.split_once(SET_SEPARATOR) else {
                    continue;
                };
                let value = value.strip_suffix('"').unwrap_or(value);
                table.sets.insert(name.to_string(), value.to_string());
            } else {
                let (name, value) = split_first_space(statement);
                table.general.insert(name.to_string(), value.to_string());
            }
        }

        table
    }

    /// Looks up a general property.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.general.get(name).map(String::as_str)
    }

    /// Looks up an `option` property.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// Looks up a `set` property.
    pub fn set(&self, name: &str) -> Option<&str> {
        self.sets.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PFSENSE_BLOCK: &str = r#"
	starts 1 2015/07/06 07:50:42;
	ends 1 2015/07/06 08:20:42;
	cltt 1 2015/07/06 07:50:42;
	binding state active;
	next binding state free;
	hardware ethernet 64:5a:04:6a:07:a2;
	uid "\001dZ\004j\007\242";
	option agent.circuit-id 0:1:3:e9;
	option agent.remote-id a4:4c:11:9c:2e:0b;
	set vendor-class-identifier = "MSFT 5.0";
	client-hostname "Satellite-C700";
"#;

    #[test]
    fn test_parse_general_properties() {
        let table = PropertyTable::parse(PFSENSE_BLOCK);
        assert_eq!(table.get("starts"), Some("1 2015/07/06 07:50:42"));
        assert_eq!(table.get("binding"), Some("state active"));
        assert_eq!(table.get("next"), Some("binding state free"));
        assert_eq!(table.get("hardware"), Some("ethernet 64:5a:04:6a:07:a2"));
        assert_eq!(table.get("uid"), Some(r#""\001dZ\004j\007\242""#));
        assert_eq!(table.get("client-hostname"), Some("\"Satellite-C700\""));
        assert_eq!(table.general.len(), 8);
    }

    #[test]
    fn test_parse_options() {
        let table = PropertyTable::parse(PFSENSE_BLOCK);
        assert_eq!(table.option("agent.circuit-id"), Some("0:1:3:e9"));
        assert_eq!(table.option("agent.remote-id"), Some("a4:4c:11:9c:2e:0b"));
        assert_eq!(table.options.len(), 2);
        assert!(!table.general.contains_key("agent.circuit-id"));
        assert!(!table.general.contains_key("option"));
    }

    #[test]
    fn test_parse_sets() {
        let table = PropertyTable::parse(PFSENSE_BLOCK);
        assert_eq!(table.set("vendor-class-identifier"), Some("MSFT 5.0"));
        assert_eq!(table.sets.len(), 1);
    }

    #[test]
    fn test_later_statement_wins() {
        let table = PropertyTable::parse("  binding state free;\n  binding state active;\n");
        assert_eq!(table.get("binding"), Some("state active"));
    }

    #[test]
    fn test_skips_non_statements() {
        let table = PropertyTable::parse(
            "\n  cltt 2 2015/08/18 16:55:37;\n  iaaddr 2001:db8::1 {\n    ends never;\n  }\n   ;\n",
        );
        assert_eq!(table.get("cltt"), Some("2 2015/08/18 16:55:37"));
        assert_eq!(table.get("ends"), Some("never"));
        assert_eq!(table.general.len(), 2);
    }

    #[test]
    fn test_trailing_comment_and_crlf() {
        let table = PropertyTable::parse(
            "  ends epoch 1436170842; # Mon Jul 06 08:20:42 2015\r\n  binding state active;\r\n",
        );
        assert_eq!(table.get("ends"), Some("epoch 1436170842"));
        assert_eq!(table.get("binding"), Some("state active"));
    }

    #[test]
    fn test_comment_marker_inside_quoted_values() {
        let table = PropertyTable::parse(
            "  client-hostname \"lab; #3\";\n  set vendor-class-identifier = \"acme; #1 box\";\n  ends epoch 1436170842; # Mon Jul 06 08:20:42 2015\n",
        );
        assert_eq!(table.get("client-hostname"), Some("\"lab; #3\""));
        assert_eq!(table.set("vendor-class-identifier"), Some("acme; #1 box"));
        assert_eq!(table.get("ends"), Some("epoch 1436170842"));
    }

    #[test]
    fn test_statement_without_value() {
        let table = PropertyTable::parse("  abandoned;\n");
        assert_eq!(table.get("abandoned"), Some(""));
    }

    #[test]
    fn test_malformed_set_is_skipped() {
        let table = PropertyTable::parse("  set ddns-fwd-name;\n  set a = b;\n");
        assert!(table.sets.is_empty());
        assert!(table.general.is_empty());
    }

    #[test]
    fn test_prefix_requires_whole_word() {
        let table = PropertyTable::parse("  settings on;\n  optional yes;\n");
        assert_eq!(table.get("settings"), Some("on"));
        assert_eq!(table.get("optional"), Some("yes"));
        assert!(table.options.is_empty());
        assert!(table.sets.is_empty());
    }
}
