//! # Trellis
//!
//! **Script-driven construction and configuration of object graphs**
//!
//! Trellis reads a small tree of directives (`Set`, `Put`, `Call`, `New`)
//! and applies it to Rust objects through explicitly registered member
//! catalogs. Arguments are coerced from text to the declared type, and
//! overloaded members are picked by an ordered fallback search.
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis::prelude::*;
//!
//! #[derive(Default)]
//! struct Connector {
//!     port: i32,
//!     host: Option<String>,
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(
//!     TypeCatalog::builder::<Connector>("Connector")
//!         .default_constructor()
//!         .setter("Port", |c: &mut Connector, port: i32| c.port = port)
//!         .setter("Host", |c: &mut Connector, host: String| c.host = Some(host))
//!         .build(),
//! );
//!
//! let script = ScriptNode::new("Configure")
//!     .with_attribute("class", "Connector")
//!     .with_child(ScriptNode::new("Set").with_attribute("name", "Port").with_attribute("type", "int").with_text("8080"))
//!     .with_child(ScriptNode::new("Set").with_attribute("name", "Host").with_text(" localhost "));
//!
//! let engine = Engine::new(registry);
//! let connector = engine.instantiate(&script)?;
//!
//! assert_eq!(connector.with(|c: &Connector| c.port), Some(8080));
//! assert_eq!(connector.with(|c: &Connector| c.host.clone()), Some(Some("localhost".to_string())));
//! # Ok::<(), ConfigureError>(())
//! ```
//!
//! ## Crates
//!
//! - [`core`] - Script tree, values, catalogs and the type registry
//! - [`engine`] - The configuration engine
//! - [`config`] - Engine configuration loading
//! - [`telemetry`] - Logging setup

#![doc(html_root_url = "https://docs.rs/trellis/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use trellis_core as core;

// Re-export the engine
pub use trellis_engine as engine;

// Re-export configuration
pub use trellis_config as config;

// Re-export logging setup
pub use trellis_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    pub use trellis_core::{
        ConfigureError, ConfigureResult, HostPort, Item, Object, PropertySource, ScriptNode, Tag, TypeCatalog,
        TypeRegistry, Typed, Value, ValueKind,
    };

    // Property sources
    pub use trellis_core::{EnvProperties, LayeredProperties, MapProperties};

    // Engine
    pub use trellis_engine::{DeclaredType, Diagnostic, Engine, EngineBuilder, Session};

    // Configuration and logging
    pub use trellis_config::{ConfigLoader, EngineConfig};
    pub use trellis_telemetry::init_logging;
}
