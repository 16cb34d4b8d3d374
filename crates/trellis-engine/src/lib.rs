//! The Trellis configuration engine.
//!
//! Applies a script tree to an object graph: each `Set`, `Put`, `Call` and
//! `New` directive is evaluated in document order against a target object,
//! using the member catalogs of a [`TypeRegistry`](trellis_core::TypeRegistry).
//!
//! - [`coerce`] - Declared types and value conversion
//! - [`resolve`] - Accessor, method and constructor selection
//! - [`engine`] - [`Engine`] and per-run [`Session`]s
//! - [`evaluate`] - Node value computation
//!
//! # Example
//!
//! ```
//! use trellis_core::fixtures::{self, Registry};
//! use trellis_core::{ScriptNode, Typed};
//! use trellis_engine::Engine;
//!
//! let engine = Engine::new(fixtures::registry());
//! let registry = Typed::new(Registry::default());
//! let script = ScriptNode::new("Configure")
//!     .with_attribute("class", "Registry")
//!     .with_child(ScriptNode::new("Put").with_attribute("name", "key1").with_text("value1"));
//!
//! engine.configure(registry.object(), &script)?;
//! assert_eq!(registry.with(|r| r.text("key1").map(str::to_string)), Some("value1".to_string()));
//! # Ok::<(), trellis_core::ConfigureError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-engine/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod coerce;
pub mod engine;
pub mod evaluate;
pub mod resolve;

pub use coerce::{coerce, coerce_named, DeclaredType};
pub use engine::{Diagnostic, Engine, EngineBuilder, Session};
pub use resolve::{Resolved, Resolver, Tier};
