//! Type-name registry.
//!
//! The registry maps the type names used in scripts to [`TypeCatalog`]s.
//! Catalogs are registered once at startup, either eagerly or as a builder
//! that runs on first lookup, and then shared read-only by every run.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::catalog::TypeCatalog;
//! use trellis_core::registry::TypeRegistry;
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: i32,
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_with::<Counter>("Counter", || {
//!     TypeCatalog::builder::<Counter>("Counter")
//!         .default_constructor()
//!         .setter("Count", |c: &mut Counter, n: i32| c.count = n)
//!         .build()
//! });
//! registry.alias("app.Counter", "Counter");
//!
//! let catalog = registry.resolve("app.Counter").unwrap();
//! assert_eq!(catalog.name(), "Counter");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::catalog::TypeCatalog;
use crate::error::{ConfigureError, ConfigureResult};
use crate::value::TypeKey;

type CatalogFactory = Box<dyn Fn() -> TypeCatalog + Send + Sync>;

struct Entry {
    key: TypeKey,
    catalog: OnceLock<Arc<TypeCatalog>>,
    factory: Option<CatalogFactory>,
}

impl Entry {
    /// The catalog, built on first use. A factory that produced a catalog
    /// for some other type is reported on every lookup.
    fn get(&self, name: &str) -> ConfigureResult<Arc<TypeCatalog>> {
        let catalog = match &self.factory {
            Some(factory) => self.catalog.get_or_init(|| Arc::new(factory())),
            None => self
                .catalog
                .get()
                .ok_or_else(|| ConfigureError::unknown_type(name))?,
        };
        if catalog.key() != self.key {
            return Err(ConfigureError::catalog_mismatch(
                catalog.name(),
                self.key.name(),
                catalog.key().name(),
            ));
        }
        Ok(Arc::clone(catalog))
    }
}

/// Registry of type catalogs, keyed by script-visible name.
///
/// # Thread Safety
///
/// The registry is `Send + Sync`. Lazy catalogs are built at most once, under
/// `OnceLock`; later lookups take no lock.
#[derive(Default)]
pub struct TypeRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a built catalog under its own name.
    ///
    /// Registering a name twice replaces the earlier catalog.
    pub fn register(&mut self, catalog: TypeCatalog) {
        let name = catalog.name().to_string();
        let key = catalog.key();
        self.insert(
            name,
            key,
            Entry {
                key,
                catalog: OnceLock::from(Arc::new(catalog)),
                factory: None,
            },
        );
    }

    /// Registers a catalog for `T` that is built on first lookup.
    ///
    /// The factory must build a catalog for `T`; lookups of a catalog for
    /// any other type fail with [`ConfigureError::CatalogMismatch`].
    pub fn register_with<T: Any>(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> TypeCatalog + Send + Sync + 'static,
    ) {
        let key = TypeKey::of::<T>();
        self.insert(
            name.into(),
            key,
            Entry {
                key,
                catalog: OnceLock::new(),
                factory: Some(Box::new(factory)),
            },
        );
    }

    fn insert(&mut self, name: String, key: TypeKey, entry: Entry) {
        let index = self.entries.len();
        self.entries.push(entry);
        self.by_name.insert(name, index);
        self.by_type.insert(key.id(), index);
    }

    /// Makes `alias` resolve to the catalog registered as `name`.
    ///
    /// Returns `false` if `name` is not registered.
    pub fn alias(&mut self, alias: impl Into<String>, name: &str) -> bool {
        match self.by_name.get(name).copied() {
            Some(index) => {
                self.by_name.insert(alias.into(), index);
                true
            }
            None => false,
        }
    }

    /// Looks up a catalog by script-visible name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigureError::UnknownType`] if nothing is registered under
    /// `name`, or [`ConfigureError::CatalogMismatch`] for a misregistered
    /// lazy catalog.
    pub fn resolve(&self, name: &str) -> ConfigureResult<Arc<TypeCatalog>> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| ConfigureError::unknown_type(name))?;
        self.entries[index].get(name)
    }

    /// Looks up the catalog describing a Rust type.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve), with the type's name in `UnknownType`.
    pub fn catalog_of(&self, key: TypeKey) -> ConfigureResult<Arc<TypeCatalog>> {
        let index = *self
            .by_type
            .get(&key.id())
            .ok_or_else(|| ConfigureError::unknown_type(key.name()))?;
        self.entries[index].get(key.name())
    }

    /// Checks if a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns the number of registered names, aliases included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("type_count", &self.entries.len())
            .field("names", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct Widget;

    fn widget_catalog() -> TypeCatalog {
        TypeCatalog::builder::<Widget>("Widget")
            .default_constructor()
            .build()
    }

    #[test]
    fn test_registry_new() {
        let registry = TypeRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = TypeRegistry::new();
        registry.register(widget_catalog());

        let catalog = registry.resolve("Widget").unwrap();
        assert_eq!(catalog.key(), TypeKey::of::<Widget>());
        assert!(registry.contains("Widget"));
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = TypeRegistry::new();
        let err = registry.resolve("Gadget").unwrap_err();
        assert!(matches!(err, ConfigureError::UnknownType { ref name } if name == "Gadget"));
    }

    #[test]
    fn test_lazy_catalog_built_once() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);

        let mut registry = TypeRegistry::new();
        registry.register_with::<Widget>("Widget", || {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            widget_catalog()
        });
        assert_eq!(BUILDS.load(Ordering::SeqCst), 0);

        let first = registry.resolve("Widget").unwrap();
        let second = registry.catalog_of(TypeKey::of::<Widget>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alias() {
        let mut registry = TypeRegistry::new();
        registry.register(widget_catalog());

        assert!(registry.alias("ui.Widget", "Widget"));
        assert!(!registry.alias("ui.Gadget", "Gadget"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("ui.Widget").unwrap().name(), "Widget");
    }

    #[test]
    fn test_catalog_of_unregistered_type() {
        let registry = TypeRegistry::new();
        let err = registry.catalog_of(TypeKey::of::<Widget>()).unwrap_err();
        assert!(matches!(err, ConfigureError::UnknownType { ref name } if name == "Widget"));
    }

    #[test]
    fn test_lazy_catalog_for_wrong_type() {
        #[derive(Debug, Default)]
        struct Gadget;

        let mut registry = TypeRegistry::new();
        registry.register_with::<Gadget>("Gadget", widget_catalog);

        let err = registry.resolve("Gadget").unwrap_err();
        assert!(matches!(
            err,
            ConfigureError::CatalogMismatch { expected: "Gadget", found: "Widget", .. }
        ));
        let err = registry.catalog_of(TypeKey::of::<Gadget>()).unwrap_err();
        assert!(matches!(err, ConfigureError::CatalogMismatch { .. }));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
    }

    #[test]
    fn test_registry_debug() {
        let mut registry = TypeRegistry::new();
        registry.register(widget_catalog());

        let debug = format!("{:?}", registry);
        assert!(debug.contains("TypeRegistry"));
        assert!(debug.contains("Widget"));
    }
}
