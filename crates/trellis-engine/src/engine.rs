//! The configuration engine.
//!
//! An [`Engine`] owns the shared, read-only parts of a run: the type
//! registry, the property source and the resolution settings. Each run
//! happens in a [`Session`], which carries the per-run state (nesting depth
//! and soft-failure diagnostics). Engines are `Send + Sync`; any number of
//! sessions may run concurrently against independent targets.
//!
//! # Example
//!
//! ```
//! use trellis_core::fixtures::{self, Point};
//! use trellis_core::ScriptNode;
//! use trellis_engine::Engine;
//!
//! let engine = Engine::new(fixtures::registry());
//! let script = ScriptNode::new("Configure")
//!     .with_attribute("class", "Point")
//!     .with_child(ScriptNode::new("Set").with_attribute("name", "X").with_attribute("type", "int").with_text("3"));
//!
//! let point = engine.instantiate(&script)?;
//! assert_eq!(point.with(|p: &Point| p.x), Some(3));
//! # Ok::<(), trellis_core::ConfigureError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info_span, warn};
use trellis_config::{EngineConfig, ResolutionConfig};
use trellis_core::script::DEFAULT;
use trellis_core::{
    ConfigureError, ConfigureResult, EnvProperties, Item, LayeredProperties, MapProperties, Object, PropertySource,
    ScriptNode, Tag, TypeCatalog, TypeRegistry, Value,
};

use crate::resolve::Resolver;

/// Builds object graphs from scripts.
pub struct Engine {
    registry: Arc<TypeRegistry>,
    properties: Arc<dyn PropertySource>,
    resolution: ResolutionConfig,
}

impl Engine {
    /// Creates an engine with default resolution settings that reads
    /// `SystemProperty` values from the process environment.
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        Self::builder(registry).build()
    }

    /// Starts building an engine around `registry`.
    pub fn builder(registry: impl Into<Arc<TypeRegistry>>) -> EngineBuilder {
        EngineBuilder::new(registry)
    }

    /// Creates an engine from loaded configuration.
    ///
    /// Property overrides shadow the environment. A `.env` file is loaded
    /// first when `properties.dotenv` is set; a missing file is not an error.
    pub fn from_config(registry: impl Into<Arc<TypeRegistry>>, config: &EngineConfig) -> Self {
        let properties = &config.properties;

        if properties.dotenv {
            match dotenvy::dotenv() {
                Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
                Err(e) if e.not_found() => {}
                Err(e) => warn!(error = %e, "Failed to load .env file"),
            }
        }

        let mut layers = LayeredProperties::new();
        if !properties.overrides.is_empty() {
            layers = layers.with_layer(properties.overrides.iter().collect::<MapProperties>());
        }
        if properties.use_env {
            let env = match &properties.env_prefix {
                Some(prefix) => EnvProperties::with_prefix(prefix.clone()),
                None => EnvProperties::new(),
            };
            layers = layers.with_layer(env);
        }

        Self::builder(registry)
            .properties(layers)
            .resolution(config.resolution.clone())
            .build()
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The resolution settings.
    pub fn resolution(&self) -> &ResolutionConfig {
        &self.resolution
    }

    /// The source of `SystemProperty` values.
    pub fn properties(&self) -> &dyn PropertySource {
        self.properties.as_ref()
    }

    /// Opens a session for one run.
    pub fn session(&self) -> Session<'_> {
        Session {
            engine: self,
            depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Applies `root`'s directives to an existing `target`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if `target` is not of the type named by `root`'s
    /// `class` attribute, otherwise the first failing directive's error.
    pub fn configure(&self, target: &Object, root: &ScriptNode) -> ConfigureResult<()> {
        self.session().configure(target, root)
    }

    /// Constructs the type named by `root`'s `class` attribute with its
    /// zero-argument constructor, then applies `root`'s directives.
    ///
    /// # Errors
    ///
    /// `UnknownType` if the class is not registered, otherwise the first
    /// failing directive's error.
    pub fn instantiate(&self, root: &ScriptNode) -> ConfigureResult<Object> {
        self.session().instantiate(root)
    }

    /// Evaluates `node` as a value, with `owner` as the target of any `Call`.
    pub fn evaluate(&self, owner: &Object, node: &ScriptNode) -> ConfigureResult<Option<Value>> {
        self.session().evaluate(owner, node)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    registry: Arc<TypeRegistry>,
    properties: Option<Arc<dyn PropertySource>>,
    resolution: ResolutionConfig,
}

impl EngineBuilder {
    /// Creates a builder with default settings.
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            properties: None,
            resolution: ResolutionConfig::default(),
        }
    }

    /// Sets the `SystemProperty` source.
    #[must_use]
    pub fn properties(mut self, properties: impl PropertySource + 'static) -> Self {
        self.properties = Some(Arc::new(properties));
        self
    }

    /// Replaces the resolution settings.
    #[must_use]
    pub fn resolution(mut self, resolution: ResolutionConfig) -> Self {
        self.resolution = resolution;
        self
    }

    /// Enables or disables constructive coercion of setter arguments.
    #[must_use]
    pub fn constructive_coercion(mut self, enabled: bool) -> Self {
        self.resolution.constructive_coercion = enabled;
        self
    }

    /// Makes unknown value tags fatal.
    #[must_use]
    pub fn strict_value_tags(mut self, strict: bool) -> Self {
        self.resolution.strict_value_tags = strict;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.resolution.max_depth = depth;
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Engine {
        Engine {
            registry: self.registry,
            properties: self
                .properties
                .unwrap_or_else(|| Arc::new(EnvProperties::new())),
            resolution: self.resolution,
        }
    }
}

/// A soft failure recorded during a run.
#[derive(Debug)]
pub struct Diagnostic {
    /// The node that failed, rendered as its opening tag.
    pub node: String,
    /// What went wrong.
    pub error: ConfigureError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node, self.error)
    }
}

/// State of a single run.
#[derive(Debug)]
pub struct Session<'e> {
    engine: &'e Engine,
    depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'e> Session<'e> {
    /// See [`Engine::configure`].
    pub fn configure(&mut self, target: &Object, root: &ScriptNode) -> ConfigureResult<()> {
        let _span = info_span!("configure", type_name = %target.type_name()).entered();

        if let Some(class) = root.class() {
            let catalog = self.engine.registry.resolve(class)?;
            if catalog.key() != target.type_key() {
                return Err(ConfigureError::type_mismatch(catalog.name(), target.type_name()));
            }
        }
        self.apply_directives(target, root, 0)
    }

    /// See [`Engine::instantiate`].
    pub fn instantiate(&mut self, root: &ScriptNode) -> ConfigureResult<Object> {
        let class = root
            .class()
            .ok_or_else(|| ConfigureError::missing_attribute(root.tag(), "class"))?;
        let _span = info_span!("configure", type_name = %class).entered();

        let catalog = self.engine.registry.resolve(class)?;
        let target = self.resolver().construct(&catalog, Vec::new())?;
        self.apply_directives(&target, root, 0)?;
        Ok(target)
    }

    /// Applies every directive of `node` from content index `start` onward
    /// to `target`, in document order. Text content is skipped.
    ///
    /// Stops at the first failure; earlier directives stay applied.
    pub fn apply_directives(&mut self, target: &Object, node: &ScriptNode, start: usize) -> ConfigureResult<()> {
        if !node.has_nodes_from(start) {
            return Ok(());
        }
        let catalog = self.catalog_for(target)?;

        self.nested(|session| {
            for item in node.content().iter().skip(start) {
                let Item::Node(directive) = item else { continue };
                session
                    .apply(target, &catalog, directive)
                    .map_err(|e| e.at(directive))?;
            }
            Ok(())
        })
    }

    /// Soft failures recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Ends the session, returning its diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn apply(&mut self, target: &Object, catalog: &TypeCatalog, directive: &ScriptNode) -> ConfigureResult<()> {
        match directive.kind() {
            Some(Tag::Set) => self.set(target, catalog, directive),
            Some(Tag::Put) => self.put(target, catalog, directive),
            Some(Tag::Call) => self.call(target, catalog, directive).map(drop),
            Some(Tag::New) => self.new_object(target, directive).map(drop),
            _ => Err(ConfigureError::unknown_directive(directive.tag())),
        }
    }

    fn set(&mut self, target: &Object, catalog: &TypeCatalog, node: &ScriptNode) -> ConfigureResult<()> {
        let name = required_name(node)?;
        let value = self.evaluate(target, node)?;
        let kind = describe_kind(value.as_ref());

        let resolved = self.resolver().set(catalog, target, name, value)?;
        debug!(
            type_name = %catalog.name(),
            member = %resolved.method.name(),
            tier = %resolved.tier,
            value_kind = %kind,
            depth = self.depth,
            "Applied Set"
        );
        Ok(())
    }

    fn put(&mut self, target: &Object, catalog: &TypeCatalog, node: &ScriptNode) -> ConfigureResult<()> {
        let key = required_name(node)?;
        if catalog.map_insert().is_none() {
            return Err(ConfigureError::not_a_map(catalog.name()));
        }
        let value = self.evaluate(target, node)?;
        let kind = describe_kind(value.as_ref());

        self.resolver().put(catalog, target, key.to_string(), value)?;
        debug!(type_name = %catalog.name(), member = %key, value_kind = %kind, "Applied Put");
        Ok(())
    }

    /// Invokes the method named by `node` on `owner`, then applies any
    /// trailing directives to the returned object.
    pub(crate) fn call(&mut self, owner: &Object, catalog: &TypeCatalog, node: &ScriptNode) -> ConfigureResult<Option<Value>> {
        let name = required_name(node)?;
        let split = node.args();
        let args = split
            .args
            .iter()
            .map(|arg| self.evaluate(owner, arg))
            .collect::<ConfigureResult<Vec<_>>>()?;

        let result = self.resolver().call(catalog, owner, name, args)?;
        debug!(type_name = %catalog.name(), member = %name, depth = self.depth, "Applied Call");

        if node.has_nodes_from(split.rest) {
            let Some(Value::Object(object)) = &result else {
                return Err(ConfigureError::not_an_object(describe_kind(result.as_ref())));
            };
            self.apply_directives(object, node, split.rest)?;
        }
        Ok(result)
    }

    /// Constructs the type named by `node`, then applies any trailing
    /// directives to the new object before returning it.
    pub(crate) fn new_object(&mut self, owner: &Object, node: &ScriptNode) -> ConfigureResult<Object> {
        let class = node
            .class()
            .ok_or_else(|| ConfigureError::missing_attribute(node.tag(), "class"))?;
        let catalog = self.engine.registry.resolve(class)?;
        let split = node.args();
        let args = split
            .args
            .iter()
            .map(|arg| self.evaluate(owner, arg))
            .collect::<ConfigureResult<Vec<_>>>()?;

        let object = self.resolver().construct(&catalog, args)?;
        debug!(type_name = %catalog.name(), depth = self.depth, "Constructed object");

        self.apply_directives(&object, node, split.rest)?;
        Ok(object)
    }

    /// Looks up a property by the node's `name`, falling back to its
    /// `default` attribute.
    pub(crate) fn system_property(&self, node: &ScriptNode) -> ConfigureResult<Option<Value>> {
        let name = node
            .name()
            .ok_or_else(|| ConfigureError::missing_attribute(node.tag(), "name"))?;
        Ok(self
            .engine
            .properties
            .property(name)
            .or_else(|| node.attribute(DEFAULT).map(str::to_string))
            .map(Value::Text))
    }

    /// Records a soft failure, or returns it when value tags are strict.
    pub(crate) fn soft_failure(&mut self, node: &ScriptNode, error: ConfigureError) -> ConfigureResult<()> {
        if self.engine.resolution.strict_value_tags {
            return Err(error);
        }
        warn!(node = %node, error = %error, "Ignoring value");
        self.diagnostics.push(Diagnostic {
            node: node.to_string(),
            error,
        });
        Ok(())
    }

    pub(crate) fn catalog_for(&self, target: &Object) -> ConfigureResult<Arc<TypeCatalog>> {
        self.engine.registry.catalog_of(target.type_key())
    }

    /// Runs `f` one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ConfigureResult<T>) -> ConfigureResult<T> {
        let limit = self.engine.resolution.max_depth;
        if self.depth >= limit {
            return Err(ConfigureError::depth_exceeded(limit));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn resolver(&self) -> Resolver<'e> {
        let engine = self.engine;
        Resolver::new(&engine.registry, engine.resolution.constructive_coercion)
    }
}

fn required_name(node: &ScriptNode) -> ConfigureResult<&str> {
    node.name()
        .ok_or_else(|| ConfigureError::missing_attribute(node.tag(), "name"))
}

fn describe_kind(value: Option<&Value>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.kind().to_string())
}

#[cfg(test)]
mod tests {
    use trellis_core::fixtures::{self, Point, Registry};
    use trellis_core::Typed;

    use super::*;

    fn set(name: &str, ty: &str, text: &str) -> ScriptNode {
        ScriptNode::new("Set")
            .with_attribute("name", name)
            .with_attribute("type", ty)
            .with_text(text)
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_builder_settings() {
        let engine = Engine::builder(fixtures::registry())
            .constructive_coercion(false)
            .strict_value_tags(true)
            .max_depth(8)
            .build();

        assert!(!engine.resolution().constructive_coercion);
        assert!(engine.resolution().strict_value_tags);
        assert_eq!(engine.resolution().max_depth, 8);
        assert!(engine.registry().contains("Point"));
    }

    #[test]
    fn test_from_config_overrides() {
        let mut config = EngineConfig::default();
        config.properties.use_env = false;
        config
            .properties
            .overrides
            .insert("jetty.home".to_string(), "/opt/jetty".to_string());

        let engine = Engine::from_config(fixtures::registry(), &config);

        assert_eq!(engine.properties().property("jetty.home").as_deref(), Some("/opt/jetty"));
        assert_eq!(engine.properties().property("PATH"), None);
    }

    #[test]
    fn test_from_config_env_layer() {
        let config = EngineConfig::default();
        let engine = Engine::from_config(fixtures::registry(), &config);

        assert_eq!(
            engine.properties().property("PATH"),
            std::env::var("PATH").ok()
        );
    }

    #[test]
    fn test_configure_type_mismatch() {
        let engine = Engine::new(fixtures::registry());
        let registry = Typed::new(Registry::default());
        let root = ScriptNode::new("Configure").with_attribute("class", "Point");

        let err = engine.configure(registry.object(), &root).unwrap_err();

        assert!(matches!(
            err,
            ConfigureError::TypeMismatch { ref expected, .. } if expected == "Point"
        ));
    }

    #[test]
    fn test_configure_without_class() {
        let engine = Engine::new(fixtures::registry());
        let point = Typed::new(Point::default());
        let root = ScriptNode::new("Configure").with_child(set("Y", "int", "9"));

        engine.configure(point.object(), &root).unwrap();

        assert_eq!(point.with(|p| p.y), 9);
    }

    #[test]
    fn test_instantiate_requires_class() {
        let engine = Engine::new(fixtures::registry());
        let err = engine.instantiate(&ScriptNode::new("Configure")).unwrap_err();

        assert!(matches!(
            err,
            ConfigureError::MissingAttribute { attribute: "class", .. }
        ));
    }

    #[test]
    fn test_set_requires_name() {
        let engine = Engine::new(fixtures::registry());
        let root = ScriptNode::new("Configure")
            .with_attribute("class", "Point")
            .with_child(ScriptNode::new("Set").with_text("1"));

        let err = engine.instantiate(&root).unwrap_err();

        assert_eq!(err.node(), Some("<Set>"));
        assert!(matches!(
            err.kind(),
            ConfigureError::MissingAttribute { attribute: "name", .. }
        ));
    }

    #[test]
    fn test_unregistered_target() {
        struct Opaque;

        let engine = Engine::new(fixtures::registry());
        let target = Object::new(Opaque);
        let root = ScriptNode::new("Configure").with_child(set("X", "int", "1"));

        let err = engine.configure(&target, &root).unwrap_err();
        assert!(matches!(err, ConfigureError::UnknownType { .. }));

        let empty = ScriptNode::new("Configure").with_text("  ");
        assert!(engine.configure(&target, &empty).is_ok());
    }

    #[test]
    fn test_depth_guard() {
        let engine = Engine::builder(fixtures::registry()).max_depth(1).build();
        let root = ScriptNode::new("Configure")
            .with_attribute("class", "Point")
            .with_child(set("X", "int", "1"));
        assert!(engine.instantiate(&root).is_ok());

        let chained = ScriptNode::new("Configure").with_attribute("class", "Server").with_child(
            ScriptNode::new("Call")
                .with_attribute("name", "addHandler")
                .with_child(ScriptNode::new("Arg").with_text("web"))
                .with_child(set("Path", "String", "/")),
        );
        let err = engine.instantiate(&chained).unwrap_err();
        assert!(matches!(err.kind(), ConfigureError::DepthExceeded { limit: 1 }));
    }
}
