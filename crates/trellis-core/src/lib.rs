//! # Trellis Core
//!
//! Core types for the Trellis object-graph builder.
//!
//! This crate provides the data the engine works on:
//!
//! - [`ScriptNode`] - The read-only script tree
//! - [`Value`], [`Object`], [`Typed`] - Runtime values and object handles
//! - [`TypeCatalog`] - Per-type constructors, methods and map capability
//! - [`TypeRegistry`] - Script-visible type names
//! - [`PropertySource`] - External properties for `SystemProperty`
//! - [`ConfigureError`] - Standard error type

#![doc(html_root_url = "https://docs.rs/trellis-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod catalog;
mod error;
pub mod fixtures;
pub mod property;
pub mod registry;
pub mod script;
pub mod value;

pub use catalog::{
    Constructor, InvokeError, MapInsert, Method, Param, ParamType, TypeCatalog,
};
pub use error::{ConfigureError, ConfigureResult};
pub use property::{EnvProperties, LayeredProperties, MapProperties, PropertySource};
pub use registry::TypeRegistry;
pub use script::{Item, ScriptNode, Tag};
pub use value::{HostPort, Object, TypeKey, Typed, Value, ValueKind};
