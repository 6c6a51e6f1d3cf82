//! Error types for attribute resolution

use thiserror::Error;

/// Errors that can occur while resolving attributes on an instance
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlueprintError {
    /// A resolver asked for an attribute that is already being resolved
    #[error("cyclic attribute dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    /// Resolution nested deeper than the configured limit
    #[error("resolving '{name}' exceeded the maximum depth of {limit}")]
    DepthExceeded { name: String, limit: usize },

    /// A resolver called `Blueprint::get` on the blueprint whose default
    /// instance is already resolving
    #[error("re-entrant blueprint get of '{name}' from inside a resolver")]
    ReentrantGet { name: String },

    /// A required attribute has no definition
    #[error("missing attribute '{name}'")]
    MissingAttribute { name: String },

    /// A typed accessor found a value of the wrong kind
    #[error("attribute '{name}' is {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A resolver reported its own failure
    #[error("resolver for '{name}' failed: {message}")]
    Resolver { name: String, message: String },
}

impl BlueprintError {
    /// Create a resolver failure for the given attribute
    pub fn resolver(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolver {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The attribute chain of a cyclic dependency, if this is one
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            Self::CyclicDependency { chain } => Some(chain),
            _ => None,
        }
    }
}
