//! Typed property descriptors.
//!
//! Every factory publishes an ordered [`Schema`]. Each entry pairs a key with a
//! [`PropertyKind`], which has a textual tag form (`int`, `enum{A=0,B=1}`, ...)
//! understood by external property editors.

use std::{fmt, str::FromStr};

use crate::error::{Error, ParseError, Result};

/// One named value of an enum or bitmask property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Symbolic name.
    pub name: String,
    /// Integer value.
    pub value: i64,
}

impl Choice {
    /// Construct a choice.
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Number a list of names consecutively from 0.
    pub fn sequence(names: &[&str]) -> Vec<Self> {
        names
            .iter()
            .zip(0..)
            .map(|(name, value)| Self::new(*name, value))
            .collect()
    }

    /// Build choices from explicit name/value pairs.
    pub fn pairs(pairs: &[(&str, i64)]) -> Vec<Self> {
        pairs.iter().map(|(n, v)| Self::new(*n, *v)).collect()
    }
}

/// The type of a property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Free text.
    String,
    /// Integer.
    Int,
    /// Integer treated as a flag.
    Bool,
    /// Integer colour index.
    Color,
    /// Can be read but never set.
    ReadOnly,
    /// One of a set of named values.
    Enum(Vec<Choice>),
    /// A combination of named bit values.
    Bitmask(Vec<Choice>),
}

impl PropertyKind {
    /// Does this kind carry an integer value?
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String | Self::ReadOnly)
    }

    /// The named values of an enum or bitmask kind.
    pub fn choices(&self) -> &[Choice] {
        match self {
            Self::Enum(c) | Self::Bitmask(c) => c,
            _ => &[],
        }
    }

    /// Check that `value` may be assigned to property `key` of this kind.
    pub fn validate(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::ReadOnly => Err(Error::ReadOnly(key.to_string())),
            k if k.is_numeric() && value.trim().parse::<i32>().is_err() => {
                Err(Error::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Render an integer value symbolically: the choice name for enums, the
    /// `|`-joined flag names for bitmasks, and the number itself otherwise.
    pub fn describe(&self, value: i64) -> String {
        match self {
            Self::Enum(choices) => choices
                .iter()
                .find(|c| c.value == value)
                .map_or_else(|| value.to_string(), |c| c.name.clone()),
            Self::Bitmask(choices) => {
                let names: Vec<&str> = choices
                    .iter()
                    .filter(|c| c.value != 0 && value & c.value == c.value)
                    .map(|c| c.name.as_str())
                    .collect();
                if names.is_empty() {
                    value.to_string()
                } else {
                    names.join("|")
                }
            }
            _ => value.to_string(),
        }
    }
}

/// Parse the body of an `enum{...}` or `bitmask{...}` tag. Entries without a
/// value continue from the previous one.
fn parse_choices(body: &str, bitmask: bool) -> std::result::Result<Vec<Choice>, ParseError> {
    let mut out = Vec::new();
    let mut prev: i64 = if bitmask { 0 } else { -1 };
    for entry in body.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, value) = match entry.split_once('=') {
            Some((name, v)) => {
                let value = v
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ParseError::new(format!("invalid choice value: {entry}")))?;
                (name.trim(), value)
            }
            None if bitmask => {
                let bits = 64 - prev.max(0).leading_zeros();
                if bits >= 63 {
                    return Err(ParseError::new(format!("bitmask overflow at {entry}")));
                }
                (entry, 1i64 << bits)
            }
            None => (entry, prev + 1),
        };
        if name.is_empty() {
            return Err(ParseError::new(format!("empty choice name: {entry}")));
        }
        prev = value;
        out.push(Choice::new(name, value));
    }
    Ok(out)
}

impl FromStr for PropertyKind {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "string" => Self::String,
            "int" => Self::Int,
            "bool" => Self::Bool,
            "color" => Self::Color,
            "readonly" => Self::ReadOnly,
            _ => {
                if let Some(body) = s.strip_prefix("enum{").and_then(|b| b.strip_suffix('}')) {
                    Self::Enum(parse_choices(body, false)?)
                } else if let Some(body) =
                    s.strip_prefix("bitmask{").and_then(|b| b.strip_suffix('}'))
                {
                    Self::Bitmask(parse_choices(body, true)?)
                } else {
                    return Err(ParseError::new(format!("unknown property type: {s}")));
                }
            }
        })
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, choices) = match self {
            Self::String => return f.write_str("string"),
            Self::Int => return f.write_str("int"),
            Self::Bool => return f.write_str("bool"),
            Self::Color => return f.write_str("color"),
            Self::ReadOnly => return f.write_str("readonly"),
            Self::Enum(c) => ("enum", c),
            Self::Bitmask(c) => ("bitmask", c),
        };
        write!(f, "{prefix}{{")?;
        for (i, c) in choices.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", c.name, c.value)?;
        }
        f.write_str("}")
    }
}

/// A property key and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property key.
    pub key: String,
    /// Property type.
    pub kind: PropertyKind,
}

/// An ordered list of property descriptors with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Descriptors in display order.
    entries: Vec<PropertyInfo>,
}

impl Schema {
    /// Construct an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema from `(key, tag)` pairs.
    pub fn parse(pairs: &[(&str, &str)]) -> std::result::Result<Self, ParseError> {
        let mut schema = Self::new();
        for (key, tag) in pairs {
            schema.push(*key, tag.parse()?);
        }
        Ok(schema)
    }

    /// Add a descriptor. A key that is already present has its kind replaced
    /// in place.
    pub fn push(&mut self, key: impl Into<String>, kind: PropertyKind) {
        let key = key.into();
        if let Some(e) = self.entries.iter_mut().find(|e| e.key == key) {
            e.kind = kind;
        } else {
            self.entries.push(PropertyInfo { key, kind });
        }
    }

    /// Append every descriptor of `other`.
    pub fn extend(&mut self, other: &Self) {
        for e in &other.entries {
            self.push(e.key.clone(), e.kind.clone());
        }
    }

    /// Look up a descriptor by key.
    pub fn get(&self, key: &str) -> Option<&PropertyInfo> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Descriptors in order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyInfo> {
        self.entries.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn simple_tags() {
        for tag in ["string", "int", "bool", "color", "readonly"] {
            let k: PropertyKind = tag.parse().unwrap();
            assert_eq!(k.to_string(), tag);
        }
        assert!("float".parse::<PropertyKind>().is_err());
        assert!("enum{A=x}".parse::<PropertyKind>().is_err());
    }

    #[test]
    fn enum_implicit_values() {
        let k: PropertyKind = "enum{NO,FLAT,UP=5,DOWN}".parse().unwrap();
        assert_eq!(
            k.choices(),
            &Choice::pairs(&[("NO", 0), ("FLAT", 1), ("UP", 5), ("DOWN", 6)])[..]
        );
        assert_eq!(k.to_string(), "enum{NO=0,FLAT=1,UP=5,DOWN=6}");
        assert_eq!(k.describe(5), "UP");
        assert_eq!(k.describe(9), "9");
    }

    #[test]
    fn bitmask_implicit_values() {
        let k: PropertyKind = "bitmask{TOP,BOTTOM,LEFT=8,RIGHT}".parse().unwrap();
        assert_eq!(
            k.choices(),
            &Choice::pairs(&[("TOP", 1), ("BOTTOM", 2), ("LEFT", 8), ("RIGHT", 16)])[..]
        );
        assert_eq!(k.describe(9), "TOP|LEFT");
        assert_eq!(k.describe(0), "0");
    }

    #[test]
    fn validation() {
        assert_eq!(PropertyKind::String.validate("label", "anything"), Ok(()));
        assert_eq!(PropertyKind::Int.validate("x", " 12 "), Ok(()));
        assert_eq!(
            PropertyKind::Int.validate("x", "12px"),
            Err(Error::InvalidValue {
                key: "x".into(),
                value: "12px".into()
            })
        );
        assert_eq!(
            PropertyKind::ReadOnly.validate("factory", "Box"),
            Err(Error::ReadOnly("factory".into()))
        );
    }

    #[test]
    fn schema_order_and_replace() {
        let mut s = Schema::parse(&[("a", "int"), ("b", "string")]).unwrap();
        s.push("a", PropertyKind::Bool);
        s.push("c", PropertyKind::Color);
        assert_eq!(s.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(s.get("a").unwrap().kind, PropertyKind::Bool);
        assert!(s.get("z").is_none());
    }
}
