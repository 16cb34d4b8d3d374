//! Value evaluation.
//!
//! A node's value is computed from its content: blank text at either end is
//! dropped (unless the node is declared `String`), a single remaining item is
//! taken as is, and several items are concatenated as text. Nested `Call`,
//! `New` and `SystemProperty` nodes are evaluated recursively. The result is
//! then coerced to the node's declared type, if it has one.

use trellis_core::{ConfigureError, ConfigureResult, Item, Object, ScriptNode, Tag, Value};

use crate::coerce::{coerce, DeclaredType};
use crate::engine::Session;

impl Session<'_> {
    /// Computes the value `node` represents.
    ///
    /// `owner` is the object any nested `Call` is invoked on. Absence of a
    /// value is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// `UnknownType` for an unknown declared type on a node that has a
    /// value, coercion errors, and any failure of a nested `Call` or `New`.
    pub fn evaluate(&mut self, owner: &Object, node: &ScriptNode) -> ConfigureResult<Option<Value>> {
        let declared = node.declared_type();
        let items = match declared {
            Some("String" | "text") => node.content(),
            _ => trim_blank(node.content()),
        };

        let raw = match items {
            [] => None,
            [item] => self.item_value(owner, item)?,
            many => {
                let mut text = String::new();
                for item in many {
                    if let Some(value) = self.item_value(owner, item)? {
                        text.push_str(&value.to_string());
                    }
                }
                Some(Value::Text(text))
            }
        };

        // The type name is only checked once there is a value to coerce.
        match (raw, declared) {
            (Some(value), Some(name)) => coerce(value, DeclaredType::parse(name)?).map(Some),
            (None, Some(name)) => Ok(DeclaredType::parse(name)
                .ok()
                .and_then(DeclaredType::empty_value)),
            (Some(Value::Text(text)), None) => Ok(Some(Value::Text(text.trim().to_string()))),
            (raw, None) => Ok(raw),
        }
    }

    /// Computes the value of one content item.
    ///
    /// Unknown tags are soft failures: they evaluate to nothing and are
    /// recorded as diagnostics, unless value tags are strict.
    pub fn item_value(&mut self, owner: &Object, item: &Item) -> ConfigureResult<Option<Value>> {
        let node = match item {
            Item::Text(text) => return Ok(Some(Value::Text(text.clone()))),
            Item::Node(node) => node,
        };

        self.nested(|session| match node.kind() {
            Some(Tag::Call) => {
                let catalog = session.catalog_for(owner).map_err(|e| e.at(node))?;
                session.call(owner, &catalog, node).map_err(|e| e.at(node))
            }
            Some(Tag::New) => session
                .new_object(owner, node)
                .map(|object| Some(Value::Object(object)))
                .map_err(|e| e.at(node)),
            Some(Tag::SystemProperty) => session.system_property(node),
            _ => {
                session.soft_failure(node, ConfigureError::unknown_value_tag(node.tag()))?;
                Ok(None)
            }
        })
    }
}

/// Drops whitespace-only text items from both ends, stopping at the first
/// node or non-blank text on each side.
fn trim_blank(content: &[Item]) -> &[Item] {
    let start = content
        .iter()
        .position(|item| !item.is_blank())
        .unwrap_or(content.len());
    let end = content
        .iter()
        .rposition(|item| !item.is_blank())
        .map_or(start, |last| last + 1);
    &content[start..end]
}
