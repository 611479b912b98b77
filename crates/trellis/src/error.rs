//! Error types for trellis.

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Result type for trellis operations.
pub type Result<T> = StdResult<T, Error>;

/// Parse error for schema tags and other structured strings.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
#[error("{message}")]
pub struct ParseError {
    /// Parse error message.
    message: String,
}

impl ParseError {
    /// Construct a parse error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Core error type. The `Display` output is the descriptive string an editor
/// shows to the user as-is.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    #[error("name already in use: {0}")]
    /// A create or rename targets a name that is already taken.
    NameConflict(String),
    #[error("invalid name: {0:?}")]
    /// A component or group name is empty.
    InvalidName(String),
    #[error("unknown factory ({0})")]
    /// A type name or override name does not resolve to a factory.
    UnknownFactory(String),
    #[error("unknown component: {0}")]
    /// A component handle or name is not (or no longer) registered.
    UnknownComponent(String),
    #[error("unknown group: {0}")]
    /// No group with this name exists.
    UnknownGroup(String),
    #[error("unknown property: {0}")]
    /// The factory's schema has no such key.
    UnknownProperty(String),
    #[error("property is read-only: {0}")]
    /// The property cannot be set.
    ReadOnly(String),
    #[error("invalid value for {key}: {value:?}")]
    /// The value does not fit the property's type.
    InvalidValue {
        /// Property key.
        key: String,
        /// Rejected value.
        value: String,
    },
    #[error("malformed line (missing factory=)")]
    /// A component line has no `factory` entry.
    MalformedLine,
    #[error("parent={0} not found")]
    /// A named parent does not exist in the registry.
    MissingParent(String),
    #[error("parent={0} is not a container")]
    /// A named parent exists but cannot hold children.
    NotAContainer(String),
    #[error("{factory} cannot be placed inside {target}: it would contain itself")]
    /// An edit would embed a template inside itself or a descendant.
    CycleRejected {
        /// The factory being placed.
        factory: String,
        /// The template (group) that would receive it.
        target: String,
    },
    #[error("no layouts found")]
    /// A document contained no component lines.
    EmptyDocument,
    #[error("parse error: {0}")]
    /// Parsing failure.
    Parse(#[source] ParseError),
    #[error("io: {0}")]
    /// File access failure.
    Io(String),
    #[error("internal: {0}")]
    /// Internal error.
    Internal(String),
    #[error("{source}: {line}")]
    /// An error attributed to a specific source line of a document.
    AtLine {
        /// The offending line, as written.
        line: String,
        /// The underlying failure.
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the source line that caused this error.
    pub fn at_line(self, line: impl Into<String>) -> Self {
        Self::AtLine {
            line: line.into(),
            source: Box::new(self),
        }
    }

    /// Strip any line attribution and return the underlying error.
    pub fn root(&self) -> &Self {
        match self {
            Self::AtLine { source, .. } => source.root(),
            e => e,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
