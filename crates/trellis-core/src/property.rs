//! External property lookup for `SystemProperty` values.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::Arc;

/// A source of named text properties.
pub trait PropertySource: Send + Sync {
    /// Looks up a property by name.
    fn property(&self, name: &str) -> Option<String>;
}

impl<P: PropertySource + ?Sized> PropertySource for Arc<P> {
    fn property(&self, name: &str) -> Option<String> {
        (**self).property(name)
    }
}

/// Properties read from the process environment.
///
/// With a prefix, `server.http-port` is looked up as `PREFIX_SERVER_HTTP_PORT`.
/// Without one, the name is tried verbatim first, then in its normalised form.
#[derive(Debug, Clone, Default)]
pub struct EnvProperties {
    prefix: Option<String>,
}

impl EnvProperties {
    /// Reads unprefixed environment variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads variables under `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into().to_uppercase()),
        }
    }

    /// The variable a property name maps to.
    pub fn env_key(&self, name: &str) -> String {
        let normalised: String = name
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{normalised}"),
            None => normalised,
        }
    }
}

impl PropertySource for EnvProperties {
    fn property(&self, name: &str) -> Option<String> {
        if self.prefix.is_none() {
            if let Ok(value) = env::var(name) {
                return Some(value);
            }
        }
        env::var(self.env_key(name)).ok()
    }
}

/// Properties held in an explicit map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapProperties {
    values: BTreeMap<String, String>,
}

impl MapProperties {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl PropertySource for MapProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Several sources consulted in order; the first hit wins.
#[derive(Default)]
pub struct LayeredProperties {
    layers: Vec<Arc<dyn PropertySource>>,
}

impl LayeredProperties {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer, consulted after the existing ones.
    #[must_use]
    pub fn with_layer(mut self, layer: impl PropertySource + 'static) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether there are no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl PropertySource for LayeredProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.property(name))
    }
}

impl fmt::Debug for LayeredProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredProperties")
            .field("layer_count", &self.layers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_normalisation() {
        let props = EnvProperties::with_prefix("trellis");
        assert_eq!(props.env_key("server.http-port"), "TRELLIS_SERVER_HTTP_PORT");
        assert_eq!(EnvProperties::new().env_key("jetty.home"), "JETTY_HOME");
    }

    #[test]
    fn test_env_properties_reads_process_env() {
        // PATH is present in every test environment we run in.
        let props = EnvProperties::new();
        assert_eq!(props.property("PATH"), env::var("PATH").ok());
        assert_eq!(props.property("trellis.surely.unset.property"), None);
    }

    #[test]
    fn test_map_properties() {
        let props = MapProperties::new().with("a", "1").with("b", "2");
        assert_eq!(props.property("a").as_deref(), Some("1"));
        assert_eq!(props.property("c"), None);
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_map_properties_from_iter() {
        let props: MapProperties = [("x", "y")].into_iter().collect();
        assert_eq!(props.property("x").as_deref(), Some("y"));
    }

    #[test]
    fn test_layered_first_hit_wins() {
        let props = LayeredProperties::new()
            .with_layer(MapProperties::new().with("port", "8080"))
            .with_layer(MapProperties::new().with("port", "9090").with("host", "example.com"));

        assert_eq!(props.property("port").as_deref(), Some("8080"));
        assert_eq!(props.property("host").as_deref(), Some("example.com"));
        assert_eq!(props.property("missing"), None);
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_shared_source() {
        let shared: Arc<dyn PropertySource> = Arc::new(MapProperties::new().with("k", "v"));
        let layered = LayeredProperties::new().with_layer(Arc::clone(&shared));
        assert_eq!(layered.property("k").as_deref(), Some("v"));
    }
}
