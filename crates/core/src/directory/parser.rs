//! Parser for the text output of directory query tools.
//!
//! Accepts the LDIF-style output `ldapsearch` prints: `name: value` lines,
//! `name:: base64` lines, continuation lines starting with one space, and
//! `#` comments. Anything else is ignored.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex_lite::Regex;
use tracing::{debug, warn};

use super::DirectoryRecord;

fn attribute_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9;\-]*)(::?)\s?(.*)$").expect("static regex is valid")
    })
}

/// Parse tool output into a [`DirectoryRecord`].
pub fn parse_attribute_text(text: &str) -> DirectoryRecord {
    debug!("parsing directory text output ({} bytes)", text.len());
    let mut record = DirectoryRecord::new();

    for line in unfold(text) {
        if line.starts_with('#') {
            continue;
        }
        let Some(caps) = attribute_line().captures(&line) else {
            continue;
        };
        let name = &caps[1];
        let value = &caps[3];
        if &caps[2] == "::" {
            record.insert(name, decode_base64(name, value));
        } else {
            record.insert(name, value);
        }
    }

    debug!(attributes = record.len(), "parsed directory record");
    record
}

/// Join LDIF continuation lines onto the line they continue.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        if let Some(rest) = raw.strip_prefix(' ') {
            if let Some(last) = lines.last_mut().filter(|l| !l.is_empty()) {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

fn decode_base64(name: &str, value: &str) -> String {
    match STANDARD.decode(value.trim()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(attribute = name, error = %e, "undecodable base64 value, keeping raw text");
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# extended LDIF
#
# LDAPv3
# base <ou=people,ou=intranet,dc=motorola,dc=com> with scope subtree
# filter: uid=jdoe123
#

# jdoe123, people, intranet, motorola.com
dn: motguid=XYZ789,ou=people,ou=intranet,dc=motorola,dc=com
uid: jdoe123
motFriendlyMail: jdoe@example.com
motDisplayFirstName: John
motDisplayLastName: Doe
description: a very long description that the server folded across
  two lines

# search result
search: 2
result: 0 Success
";

    #[test]
    fn test_parse_ldapsearch_output() {
        let record = parse_attribute_text(SAMPLE);
        assert_eq!(record.first("motFriendlyMail"), Some("jdoe@example.com"));
        assert_eq!(record.first("motDisplayFirstName"), Some("John"));
        assert_eq!(record.first("motDisplayLastName"), Some("Doe"));
        assert_eq!(record.first("motNickName"), None);
        assert_eq!(record.first("result"), Some("0 Success"));
        assert_eq!(
            record.first("description"),
            Some("a very long description that the server folded across two lines")
        );
        // "# filter: uid=jdoe123" is a comment, not an attribute.
        assert_eq!(record.first("filter"), None);
    }

    #[test]
    fn test_base64_values_are_decoded() {
        // "Zoë" in UTF-8
        let record = parse_attribute_text("motNickName:: Wm/Dqw==\n");
        assert_eq!(record.first("motNickName"), Some("Zoë"));
    }

    #[test]
    fn test_bad_base64_kept_raw() {
        let record = parse_attribute_text("motNickName:: !!!\n");
        assert_eq!(record.first("motNickName"), Some("!!!"));
    }

    #[test]
    fn test_crlf_and_garbage_lines() {
        let record = parse_attribute_text(
            "ldap_sasl_bind: warning\r\nnot an attribute line\r\nmotDisplayLastName: Doe\r\n",
        );
        assert_eq!(record.first("motDisplayLastName"), Some("Doe"));
        assert_eq!(record.first("not an attribute line"), None);
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_attribute_text("").is_empty());
    }

    #[test]
    fn test_first_value_wins() {
        let record = parse_attribute_text("mail: a@example.com\nmail: b@example.com\n");
        assert_eq!(record.first("mail"), Some("a@example.com"));
        assert_eq!(record.get("mail").len(), 2);
    }
}
