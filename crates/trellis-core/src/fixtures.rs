//! Test fixtures for Trellis development and testing.
//!
//! This module provides a handful of plain Rust types with ready-made
//! catalogs, used by the tests and examples across the workspace.
//!
//! # Example
//!
//! ```
//! use trellis_core::fixtures;
//!
//! let registry = fixtures::registry();
//! assert!(registry.resolve("Point").is_ok());
//! assert!(registry.resolve("Server").is_ok());
//! ```

use std::collections::BTreeMap;
use std::net::IpAddr;

use http::Uri;
use thiserror::Error;

use crate::catalog::TypeCatalog;
use crate::registry::TypeRegistry;
use crate::value::{HostPort, Typed, Value};

/// A labelled point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// Optional label.
    pub label: Option<String>,
}

impl Point {
    /// Creates an unlabelled point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, label: None }
    }
}

/// Catalog for [`Point`]: constructors `()` and `(int, int)`, setters
/// `X`, `Y`, `Label`, and the method `translate(int, int)`.
pub fn point_catalog() -> TypeCatalog {
    TypeCatalog::builder::<Point>("Point")
        .default_constructor()
        .constructor(Point::new)
        .setter("X", |p: &mut Point, x: i32| p.x = x)
        .setter("Y", |p: &mut Point, y: i32| p.y = y)
        .setter("Label", |p: &mut Point, label: String| p.label = Some(label))
        .method("translate", |p: &mut Point, dx: i32, dy: i32| {
            Typed::new(Point::new(p.x + dx, p.y + dy))
        })
        .build()
}

/// A string-keyed map of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    /// The stored entries.
    pub entries: BTreeMap<String, Option<Value>>,
}

impl Registry {
    /// Looks up the text stored under `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.as_ref()?.as_text()
    }
}

/// Catalog for [`Registry`]: map-capable, plus `size()`.
pub fn registry_catalog() -> TypeCatalog {
    TypeCatalog::builder::<Registry>("Registry")
        .default_constructor()
        .map_insert(|r: &mut Registry, key, value| {
            r.entries.insert(key, value);
        })
        .method("size", |r: &mut Registry| {
            i64::try_from(r.entries.len()).unwrap_or(i64::MAX)
        })
        .build()
}

/// A request handler attached to a [`Server`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handler {
    /// Handler name.
    pub name: String,
    /// Mount path.
    pub path: Option<String>,
}

/// Catalog for [`Handler`]: constructor `(String)` and setter `Path`.
pub fn handler_catalog() -> TypeCatalog {
    TypeCatalog::builder::<Handler>("Handler")
        .constructor(|name: String| Handler { name, path: None })
        .setter("Path", |h: &mut Handler, path: String| h.path = Some(path))
        .build()
}

/// Failure raised by [`Server`] members.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server was started without a port.
    #[error("no port configured")]
    NoPort,
}

/// A server-like object with setters of every supported parameter kind.
#[derive(Debug, Clone, Default)]
pub struct Server {
    /// Listening port.
    pub port: i32,
    /// Idle timeout in milliseconds.
    pub timeout: i64,
    /// Bind address.
    pub host: Option<IpAddr>,
    /// Bind address plus port.
    pub listen: Option<HostPort>,
    /// Public URL.
    pub url: Option<Uri>,
    /// Debug flag.
    pub debug: bool,
    /// Free-form attributes.
    pub attributes: Vec<(String, Option<Value>)>,
    /// Attached handlers.
    pub handlers: Vec<Typed<Handler>>,
    /// Whether `start` succeeded.
    pub started: bool,
}

/// Catalog for [`Server`].
pub fn server_catalog() -> TypeCatalog {
    TypeCatalog::builder::<Server>("Server")
        .default_constructor()
        .constructor(|port: i32| Server {
            port,
            ..Server::default()
        })
        .setter("Port", |s: &mut Server, port: i32| s.port = port)
        .setter("Timeout", |s: &mut Server, ms: i64| s.timeout = ms)
        .setter("Host", |s: &mut Server, host: IpAddr| s.host = Some(host))
        .setter("Listen", |s: &mut Server, listen: HostPort| {
            s.listen = Some(listen);
        })
        .setter("Url", |s: &mut Server, url: Uri| s.url = Some(url))
        .setter("Debug", |s: &mut Server, debug: bool| s.debug = debug)
        .setter("Handler", |s: &mut Server, h: Typed<Handler>| s.handlers.push(h))
        .method("setAttribute", |s: &mut Server, name: String, value: Option<Value>| {
            s.attributes.push((name, value));
        })
        .method("addHandler", |s: &mut Server, name: String| {
            let handler = Typed::new(Handler { name, path: None });
            s.handlers.push(handler.clone());
            handler
        })
        .method("start", |s: &mut Server| {
            if s.port == 0 {
                return Err(ServerError::NoPort);
            }
            s.started = true;
            Ok(())
        })
        .build()
}

/// Records which of several same-arity overloads ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overloaded {
    /// Name of the last overload invoked.
    pub last: Option<&'static str>,
    /// Every value set through `setFlag`.
    pub flags: Vec<bool>,
}

/// Catalog for [`Overloaded`].
///
/// `describe(int)` and `describe(String)` accept disjoint arguments;
/// `pick(Value)` is declared before `pick(String)` and accepts anything.
pub fn overloaded_catalog() -> TypeCatalog {
    TypeCatalog::builder::<Overloaded>("Overloaded")
        .default_constructor()
        .method("describe", |o: &mut Overloaded, _: i32| o.last = Some("describe(int)"))
        .method("describe", |o: &mut Overloaded, _: String| {
            o.last = Some("describe(String)");
        })
        .method("pick", |o: &mut Overloaded, _: Value| o.last = Some("pick(Value)"))
        .method("pick", |o: &mut Overloaded, _: String| o.last = Some("pick(String)"))
        .setter("Flag", |o: &mut Overloaded, flag: bool| o.flags.push(flag))
        .build()
}

/// A registry with every fixture type registered.
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(point_catalog());
    registry.register(registry_catalog());
    registry.register(handler_catalog());
    registry.register_with::<Server>("Server", server_catalog);
    registry.register(overloaded_catalog());
    registry
}
