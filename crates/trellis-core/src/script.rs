//! The script tree consumed by the engine.
//!
//! A script is a read-only hierarchy of [`ScriptNode`]s. Each node has a tag,
//! a set of uniquely keyed attributes, and an ordered list of content
//! [`Item`]s (text fragments and nested nodes). Trees are produced by an
//! external markup parser or assembled directly with the builder methods:
//!
//! ```
//! use trellis_core::script::ScriptNode;
//!
//! let script = ScriptNode::new("Configure")
//!     .with_attribute("class", "Point")
//!     .with_child(
//!         ScriptNode::new("Set")
//!             .with_attribute("name", "X")
//!             .with_attribute("type", "int")
//!             .with_text("3"),
//!     );
//!
//! assert_eq!(script.class(), Some("Point"));
//! assert_eq!(script.children().count(), 1);
//! ```

use std::fmt;

use indexmap::IndexMap;

/// Attribute naming the member or key a directive targets.
pub const NAME: &str = "name";
/// Attribute declaring the coercion applied to a node's value.
pub const TYPE: &str = "type";
/// Attribute naming the type of a root or `New` node.
pub const CLASS: &str = "class";
/// Attribute carrying the fallback of a `SystemProperty` lookup.
pub const DEFAULT: &str = "default";

/// The closed tag vocabulary understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Invoke a single-argument `set<Name>` accessor.
    Set,
    /// Insert a key/value pair into a map-capable target.
    Put,
    /// Invoke a named method.
    Call,
    /// Construct a new object.
    New,
    /// A positional argument of `Call` or `New`.
    Arg,
    /// Look up an external property value.
    SystemProperty,
}

impl Tag {
    /// Parses a tag name. Unknown names yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "Set" => Some(Self::Set),
            "Put" => Some(Self::Put),
            "Call" => Some(Self::Call),
            "New" => Some(Self::New),
            "Arg" => Some(Self::Arg),
            "SystemProperty" => Some(Self::SystemProperty),
            _ => None,
        }
    }

    /// The tag name as it appears in scripts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "Set",
            Self::Put => "Put",
            Self::Call => "Call",
            Self::New => "New",
            Self::Arg => "Arg",
            Self::SystemProperty => "SystemProperty",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a node's ordered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A raw text fragment.
    Text(String),
    /// A nested node.
    Node(ScriptNode),
}

impl Item {
    /// Returns the text of a text fragment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Node(_) => None,
        }
    }

    /// Returns the nested node, if this item is one.
    pub fn as_node(&self) -> Option<&ScriptNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Text(_) => None,
        }
    }

    /// Whether this is a text fragment made only of whitespace.
    pub fn is_blank(&self) -> bool {
        self.as_text().is_some_and(|text| text.trim().is_empty())
    }
}

impl From<ScriptNode> for Item {
    fn from(node: ScriptNode) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A node of the script tree.
///
/// Nodes are immutable once built: the builder methods consume `self`, and
/// the engine only ever reads through shared references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNode {
    tag: String,
    attributes: IndexMap<String, String>,
    content: Vec<Item>,
}

/// The argument run of a `Call` or `New` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSplit<'a> {
    /// The contiguous leading `Arg` children, in order.
    pub args: Vec<&'a ScriptNode>,
    /// Content index of the first directive after the argument run.
    pub rest: usize,
}

impl ScriptNode {
    /// Creates an empty node with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            content: Vec::new(),
        }
    }

    /// Sets an attribute. A repeated key replaces the earlier value.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Appends a text fragment.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_item(Item::Text(text.into()))
    }

    /// Appends a nested node.
    #[must_use]
    pub fn with_child(self, child: ScriptNode) -> Self {
        self.with_item(Item::Node(child))
    }

    /// Appends a content item.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<Item>) -> Self {
        self.content.push(item.into());
        self
    }

    /// The tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The tag, if it belongs to the engine vocabulary.
    pub fn kind(&self) -> Option<Tag> {
        Tag::parse(&self.tag)
    }

    /// Looks up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `name` attribute.
    pub fn name(&self) -> Option<&str> {
        self.attribute(NAME)
    }

    /// The `type` attribute.
    pub fn declared_type(&self) -> Option<&str> {
        self.attribute(TYPE)
    }

    /// The `class` attribute.
    pub fn class(&self) -> Option<&str> {
        self.attribute(CLASS)
    }

    /// The ordered content.
    pub fn content(&self) -> &[Item] {
        &self.content
    }

    /// Number of content items.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the node has no content at all.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Nested nodes, skipping text.
    pub fn children(&self) -> impl Iterator<Item = &ScriptNode> {
        self.content.iter().filter_map(Item::as_node)
    }

    /// Splits the content into the leading `Arg` run and the trailing
    /// directives. Text between arguments is ignored.
    pub fn args(&self) -> ArgSplit<'_> {
        let mut args = Vec::new();
        let mut rest = self.content.len();
        for (index, item) in self.content.iter().enumerate() {
            let Item::Node(node) = item else { continue };
            if node.kind() != Some(Tag::Arg) {
                rest = index;
                break;
            }
            args.push(node);
        }
        ArgSplit { args, rest }
    }

    /// Whether any nested node appears at or after `start`.
    pub fn has_nodes_from(&self, start: usize) -> bool {
        self.content
            .iter()
            .skip(start)
            .any(|item| matches!(item, Item::Node(_)))
    }
}

/// Renders the opening tag, e.g. `<Set name="Port" type="int">`.
impl fmt::Display for ScriptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{value}\"")?;
        }
        f.write_str(">")
    }
}
