//! The property line codec shared by layout files, clipboard payloads and undo
//! snapshots.
//!
//! A component is one line of `key=value` pairs joined by `,`. Keys and values
//! are percent-escaped so that the separators, `%` itself and any byte outside
//! printable ASCII never appear raw. All three transports use exactly these
//! functions, so text produced by one can always be read by the others.

use std::{
    collections::{BTreeMap, btree_map},
    fmt,
};

use geom::Rect;
use serde::{Deserialize, Serialize};

/// Reserved property keys with fixed meaning in every transport.
pub mod keys {
    /// Owning group name.
    pub const LAYOUT: &str = "layout";
    /// Factory (component type) name.
    pub const FACTORY: &str = "factory";
    /// Component name.
    pub const NAME: &str = "name";
    /// Left edge.
    pub const X: &str = "x";
    /// Top edge.
    pub const Y: &str = "y";
    /// Width.
    pub const W: &str = "w";
    /// Height.
    pub const H: &str = "h";
    /// Label text.
    pub const LABEL: &str = "label";
    /// Name of the managed parent container.
    pub const PARENT: &str = "parent";

    /// Keys consumed by creation itself rather than applied through
    /// `set_property` when a component line is built.
    pub const CREATION: &[&str] = &[LAYOUT, FACTORY, NAME, X, Y, W, H, LABEL];

    /// Creation keys plus `parent`, for build paths that attach parents
    /// themselves.
    pub const STRUCTURAL: &[&str] = &[LAYOUT, FACTORY, NAME, X, Y, W, H, LABEL, PARENT];
}

/// Uppercase hex digits used by the escape table.
const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Return true if the byte is written literally by [`escape`].
fn is_literal(b: u8) -> bool {
    (b' '..=b'~').contains(&b) && b != b'%' && b != b',' && b != b'='
}

/// Decode one uppercase hex digit.
fn hex_value(b: u8) -> Option<u8> {
    HEX.iter().position(|&h| h == b).map(|p| p as u8)
}

/// Percent-encode every byte outside printable ASCII, plus `%`, `,` and `=`,
/// as `%XX` with uppercase hex.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if is_literal(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0xf) as usize] as char);
        }
    }
    out
}

/// Reverse [`escape`]. A `%` not followed by two uppercase hex digits is kept
/// literally. Decoded bytes that do not form valid UTF-8 are replaced.
pub fn unescape(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Parse a leading integer the way C's `atoi` does: optional leading
/// whitespace and sign, then digits; anything unparseable yields 0. Values out
/// of range saturate.
pub fn leading_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut v: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        v = (v * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    let v = if negative { -v } else { v };
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A string-keyed property set. Keys are unique and kept sorted, which makes
/// serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap {
    /// Property entries.
    entries: BTreeMap<String, String>,
}

impl PropertyMap {
    /// Construct an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one serialized line. Parsing stops at the first control byte;
    /// entries without `=` are skipped.
    pub fn deserialize(line: &str) -> Self {
        let end = line.bytes().position(|b| b < b' ').unwrap_or(line.len());
        let mut map = Self::new();
        for entry in line[..end].split(',') {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            map.insert(unescape(key), unescape(value));
        }
        map
    }

    /// Serialize to a single line.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.entries {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(&escape(k));
            out.push('=');
            out.push_str(&escape(v));
        }
        out
    }

    /// Return the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Return the value for a key, or the empty string.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Return the value for a key parsed with [`leading_int`]; missing keys
    /// yield 0.
    pub fn int(&self, key: &str) -> i32 {
        leading_int(self.value(key))
    }

    /// The rectangle described by the `x`, `y`, `w` and `h` keys.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.int(keys::X),
            self.int(keys::Y),
            self.int(keys::W),
            self.int(keys::H),
        )
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Return true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for PropertyMap {
    fn from(entries: [(&str, &str); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One component line read from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Parsed properties.
    pub props: PropertyMap,
    /// The line as written (trimmed), kept for error messages.
    pub text: String,
}

/// Component lines of a document, grouped by their `layout` value in line
/// order. Groups iterate in name order.
pub type Layouts = BTreeMap<String, Vec<SourceLine>>;

/// Split text into component lines in order. Leading spaces and tabs and
/// trailing control bytes are trimmed; blank lines and lines starting with `#`
/// are ignored.
pub fn parse_lines(text: &str) -> Vec<SourceLine> {
    text.split('\n')
        .map(|raw| {
            raw.trim_start_matches([' ', '\t'])
                .trim_end_matches(|c: char| c < ' ')
        })
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| SourceLine {
            props: PropertyMap::deserialize(line),
            text: line.to_string(),
        })
        .collect()
}

/// Split a multi-line document into component lines grouped by layout.
pub fn parse_document(text: &str) -> Layouts {
    let mut layouts = Layouts::new();
    for line in parse_lines(text) {
        layouts
            .entry(line.props.value(keys::LAYOUT).to_string())
            .or_default()
            .push(line);
    }
    layouts
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn escape_table() {
        assert_eq!(escape("plain text"), "plain text");
        assert_eq!(escape("a,b=c%d"), "a%2Cb%3Dc%25d");
        assert_eq!(escape("tab\there\n"), "tab%09here%0A");
        assert_eq!(escape("é"), "%C3%A9");
        assert_eq!(escape("~\x7f"), "~%7F");
    }

    #[test]
    fn unescape_lenient() {
        assert_eq!(unescape("a%2Cb"), "a,b");
        assert_eq!(unescape("%C3%A9"), "é");
        // Only uppercase hex is decoded, and truncated escapes stay literal.
        assert_eq!(unescape("%2c"), "%2c");
        assert_eq!(unescape("100%"), "100%");
        assert_eq!(unescape("%4"), "%4");
        assert_eq!(unescape("%ZZ"), "%ZZ");
    }

    #[test]
    fn serialize_scenario() {
        let m = PropertyMap::from([("x", "10"), ("y", "5,5")]);
        assert_eq!(m.serialize(), "x=10,y=5%2C5");
        assert_eq!(PropertyMap::deserialize("x=10,y=5%2C5"), m);
    }

    #[test]
    fn deserialize_skips_entries_without_separator() {
        let m = PropertyMap::deserialize("junk,a=1,,b=2,also junk");
        assert_eq!(m, PropertyMap::from([("a", "1"), ("b", "2")]));
        assert!(PropertyMap::deserialize("").is_empty());
    }

    #[test]
    fn deserialize_stops_at_control_bytes() {
        let m = PropertyMap::deserialize("a=1,b=2\r\nc=3");
        assert_eq!(m, PropertyMap::from([("a", "1"), ("b", "2")]));
    }

    #[test]
    fn leading_int_matches_atoi() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int("  -7px"), -7);
        assert_eq!(leading_int("+3"), 3);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int("99999999999"), i32::MAX);
        assert_eq!(leading_int("-99999999999"), i32::MIN);
    }

    #[test]
    fn document_grouping() {
        let doc = "# comment\n\
                   \tlayout=A,factory=Box,name=a\r\n\
                   \n\
                   layout=B,factory=Box,name=b\n\
                   layout=A,factory=Button,name=c\n\
                   factory=Box,name=loose\n";
        let layouts = parse_document(doc);
        assert_eq!(layouts.keys().collect::<Vec<_>>(), vec!["", "A", "B"]);
        let a = &layouts["A"];
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].text, "layout=A,factory=Box,name=a");
        assert_eq!(a[1].props.value("name"), "c");
    }

    #[test]
    fn rect_from_keys() {
        let m = PropertyMap::from([("x", "1"), ("y", "2"), ("w", "30"), ("h", "")]);
        assert_eq!(m.rect(), Rect::new(1, 2, 30, 0));
    }
}
