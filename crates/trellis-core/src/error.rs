//! Error types for configuration runs.
//!
//! Every failure of a run is a [`ConfigureError`]. Failures raised while a
//! directive is being applied are wrapped once in [`ConfigureError::AtNode`],
//! which names the innermost directive that failed.

use std::error::Error as StdError;
use std::num::ParseIntError;

use thiserror::Error;

use crate::catalog::InvokeError;
use crate::script::ScriptNode;

/// Result type alias using [`ConfigureError`].
pub type ConfigureResult<T> = Result<T, ConfigureError>;

/// Errors raised while building or configuring an object graph.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// The target is not of the type the script declares.
    #[error("object of type {actual} is not of type {expected}")]
    TypeMismatch {
        /// The declared type name.
        expected: String,
        /// The target's type name.
        actual: String,
    },

    /// A type name or declared coercion type is not known.
    #[error("unknown type: {name}")]
    UnknownType {
        /// The unresolved name.
        name: String,
    },

    /// No accessor, method or constructor fits the arguments.
    #[error("no {member} on {type_name} accepts ({arg_types})")]
    NoMatchingMember {
        /// The type that was searched.
        type_name: String,
        /// The member that was searched for.
        member: String,
        /// The argument types, comma separated.
        arg_types: String,
    },

    /// A `Put` target has no map capability.
    #[error("object of type {type_name} is not a map")]
    NotAMap {
        /// The target's type name.
        type_name: String,
    },

    /// Text is not a valid integer.
    #[error("invalid number {text:?}: {source}")]
    NumberFormat {
        /// The offending text.
        text: String,
        /// The parse failure.
        #[source]
        source: ParseIntError,
    },

    /// Text is not an absolute URL.
    #[error("invalid URL {text:?}: {reason}")]
    InvalidUrl {
        /// The offending text.
        text: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A host name could not be resolved to an address.
    #[error("cannot resolve host {host:?}: {reason}")]
    UnresolvableHost {
        /// The host name.
        host: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A directive tag is outside the vocabulary.
    #[error("unknown directive <{tag}>")]
    UnknownDirective {
        /// The tag name.
        tag: String,
    },

    /// A value tag is outside the vocabulary. Soft unless strict mode is on.
    #[error("unknown value tag <{tag}>")]
    UnknownValueTag {
        /// The tag name.
        tag: String,
    },

    /// A required attribute is missing.
    #[error("<{tag}> requires a {attribute:?} attribute")]
    MissingAttribute {
        /// The tag name.
        tag: String,
        /// The attribute name.
        attribute: &'static str,
    },

    /// Chained directives need an object to apply to.
    #[error("cannot apply directives to {value}")]
    NotAnObject {
        /// Description of the produced value.
        value: String,
    },

    /// A member body failed.
    #[error("{member} failed: {source}")]
    Invocation {
        /// The member that failed.
        member: String,
        /// The failure raised by the member.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A lazily built catalog describes a different Rust type than the one
    /// it was registered for.
    #[error("catalog {name} describes {found}, but was registered for {expected}")]
    CatalogMismatch {
        /// The catalog's name.
        name: String,
        /// The type named at registration.
        expected: &'static str,
        /// The type the catalog actually describes.
        found: &'static str,
    },

    /// The script nests deeper than allowed.
    #[error("script nesting exceeds {limit} levels")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// A failure located at a directive.
    #[error("at {node}: {source}")]
    AtNode {
        /// The rendered opening tag of the failing directive.
        node: String,
        /// The underlying failure.
        #[source]
        source: Box<ConfigureError>,
    },
}

impl ConfigureError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Creates a no matching member error.
    pub fn no_matching_member(
        type_name: impl Into<String>,
        member: impl Into<String>,
        arg_types: impl Into<String>,
    ) -> Self {
        Self::NoMatchingMember {
            type_name: type_name.into(),
            member: member.into(),
            arg_types: arg_types.into(),
        }
    }

    /// Creates a not-a-map error.
    pub fn not_a_map(type_name: impl Into<String>) -> Self {
        Self::NotAMap {
            type_name: type_name.into(),
        }
    }

    /// Creates a number format error.
    pub fn number_format(text: impl Into<String>, source: ParseIntError) -> Self {
        Self::NumberFormat {
            text: text.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(text: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an unresolvable host error.
    pub fn unresolvable_host(host: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnresolvableHost {
            host: host.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an unknown directive error.
    pub fn unknown_directive(tag: impl Into<String>) -> Self {
        Self::UnknownDirective { tag: tag.into() }
    }

    /// Creates an unknown value tag error.
    pub fn unknown_value_tag(tag: impl Into<String>) -> Self {
        Self::UnknownValueTag { tag: tag.into() }
    }

    /// Creates a missing attribute error.
    pub fn missing_attribute(tag: impl Into<String>, attribute: &'static str) -> Self {
        Self::MissingAttribute {
            tag: tag.into(),
            attribute,
        }
    }

    /// Creates a not-an-object error.
    pub fn not_an_object(value: impl Into<String>) -> Self {
        Self::NotAnObject {
            value: value.into(),
        }
    }

    /// Creates a catalog mismatch error.
    pub fn catalog_mismatch(name: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::CatalogMismatch {
            name: name.into(),
            expected,
            found,
        }
    }

    /// Creates a depth-exceeded error.
    pub fn depth_exceeded(limit: usize) -> Self {
        Self::DepthExceeded { limit }
    }

    /// Converts a member failure. Resolution noise should never get here.
    pub fn invocation(member: impl Into<String>, error: InvokeError) -> Self {
        let source: Box<dyn StdError + Send + Sync> = match error {
            InvokeError::Target(source) => source,
            other => Box::new(other),
        };
        Self::Invocation {
            member: member.into(),
            source,
        }
    }

    /// Locates the error at `node`, unless an inner directive already did.
    #[must_use]
    pub fn at(self, node: &ScriptNode) -> Self {
        match self {
            located @ Self::AtNode { .. } => located,
            other => Self::AtNode {
                node: node.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error without its location.
    pub fn kind(&self) -> &Self {
        match self {
            Self::AtNode { source, .. } => source.kind(),
            other => other,
        }
    }

    /// The failing directive, if located.
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::AtNode { node, .. } => Some(node),
            _ => None,
        }
    }

    /// Whether the failure is soft (diagnosed, not fatal) by default.
    pub fn is_soft(&self) -> bool {
        matches!(self.kind(), Self::UnknownValueTag { .. })
    }
}
