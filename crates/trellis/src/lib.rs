//! Trellis: property-driven component trees.
//!
//! Trellis is the document core of a UI layout editor. Components of any type
//! are created by named factories and manipulated entirely through
//! string-keyed properties. Groups of components double as reusable templates
//! that nest inside one another, and every edit can be undone.
//!
//! # Quick Start
//!
//! The main entry points are:
//! - [`Session`] - One editable document: groups, registries and undo history
//! - [`Factory`] - The trait implemented by every component type
//! - [`PropertyMap`] - The line format shared by files, clipboard and undo
//!
//! # Module Organization
//!
//! - [`codec`] - Escaping, property lines and document parsing
//! - [`schema`] - Typed property descriptors
//! - [`tree`] - The component arena
//! - [`factory`] - Factories, primitives and the factory registry
//! - [`registry`] - Component names and callbacks
//! - [`template`] - Recipe-driven composite factories
//! - [`deps`] - Template containment and ordering
//! - [`history`] - Snapshots and the undo stack

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod deps;
pub mod dump;
pub mod error;
pub mod factory;
pub mod history;
pub mod registry;
pub mod schema;
pub mod session;
pub mod template;
pub mod tree;

pub use codec::PropertyMap;
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use factory::{Factory, FactoryId, FactoryRegistry};
pub use geom::{Point, Rect};
pub use registry::{Callback, ComponentRegistry};
pub use session::{Action, Group, Session};
pub use template::Template;
pub use tree::{ComponentId, Tree};
