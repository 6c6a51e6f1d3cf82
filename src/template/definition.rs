//! Attribute definitions supplied when extending a blueprint

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BlueprintError;
use crate::value::Value;

use super::instance::Instance;

/// A lazily evaluated attribute body
///
/// Resolvers receive the instance they are resolving on, so they can read
/// sibling attributes through [`Instance::get`].
pub type ResolverFn = dyn Fn(&mut Instance) -> Result<Value, BlueprintError> + Send + Sync;

/// A single attribute definition
#[derive(Clone)]
pub enum Attribute {
    /// A fixed value, returned as-is
    Literal(Value),
    /// Computed on first access and cached per instance
    Resolver(Arc<ResolverFn>),
}

impl Attribute {
    /// Create a literal attribute
    pub fn literal(value: impl Into<Value>) -> Self {
        Attribute::Literal(value.into())
    }

    /// Create a resolver attribute from a closure
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&mut Instance) -> Result<Value, BlueprintError> + Send + Sync + 'static,
    {
        Attribute::Resolver(Arc::new(f))
    }

    /// The literal value, if this is not a resolver
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Attribute::Literal(value) => Some(value),
            Attribute::Resolver(_) => None,
        }
    }

    /// Check if this attribute is computed
    pub fn is_resolver(&self) -> bool {
        matches!(self, Attribute::Resolver(_))
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Attribute::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// A set of attribute definitions plus an optional export list
///
/// ```rust
/// use blueprint::{Definitions, Value};
///
/// let defs = Definitions::new()
///     .export_attributes(["total"])
///     .literal("price", 20)
///     .literal("qty", 3)
///     .resolver("total", |bp| {
///         let price: i64 = bp.require("price")?;
///         let qty: i64 = bp.require("qty")?;
///         Ok(Value::Int(price * qty))
///     });
///
/// assert_eq!(defs.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub(crate) attributes: HashMap<String, Attribute>,
    pub(crate) export_attributes: Option<Vec<String>>,
}

impl Definitions {
    /// Create an empty definition set
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a literal attribute
    pub fn literal(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Attribute::Literal(value.into()));
        self
    }

    /// Define a computed attribute
    pub fn resolver<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Instance) -> Result<Value, BlueprintError> + Send + Sync + 'static,
    {
        self.insert(name, Attribute::resolver(f));
        self
    }

    /// Define an attribute from an existing definition
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.insert(name, attribute);
        self
    }

    /// Set the names surfaced by `generate`, in output order
    pub fn export_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.export_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Insert a definition, replacing any earlier one with the same name
    pub fn insert(&mut self, name: impl Into<String>, attribute: Attribute) {
        self.attributes.insert(name.into(), attribute);
    }

    /// Get a definition by name
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Number of attribute definitions
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when there are no attributes and no export list
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.export_attributes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_definition_wins() {
        let defs = Definitions::new().literal("a", 1).literal("a", "two");
        assert_eq!(defs.len(), 1);
        assert_eq!(
            defs.get("a").and_then(Attribute::as_literal),
            Some(&Value::Str("two".into()))
        );
    }

    #[test]
    fn test_resolver_has_no_literal() {
        let defs = Definitions::new().resolver("a", |_| Ok(Value::Null));
        let attr = defs.get("a").expect("defined");
        assert!(attr.is_resolver());
        assert!(attr.as_literal().is_none());
        assert_eq!(format!("{:?}", attr), "Resolver(..)");
    }

    #[test]
    fn test_empty_definitions() {
        assert!(Definitions::new().is_empty());
        assert!(!Definitions::new().export_attributes(Vec::<String>::new()).is_empty());
    }
}
