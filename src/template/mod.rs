//! Template system for prototypal blueprints
//!
//! This module provides the infrastructure for defining, extending and
//! resolving blueprints. A blueprint is an immutable set of named attributes,
//! each either a literal value or a resolver computed from the instance it is
//! resolved on.
//!
//! # Example
//!
//! ```rust
//! use blueprint::{Blueprint, Definitions, Overrides, Value};
//!
//! let counter = Blueprint::base().extend(
//!     Definitions::new()
//!         .export_attributes(["start", "next"])
//!         .literal("start", 1)
//!         .literal("step", 2)
//!         .resolver("next", |bp| {
//!             let start: i64 = bp.require("start")?;
//!             let step: i64 = bp.require("step")?;
//!             Ok(Value::Int(start + step))
//!         }),
//! );
//!
//! let generated = counter.generate_with(Overrides::new().set("start", 10)).unwrap();
//! assert_eq!(generated.get("next"), Some(&Value::Int(12)));
//! assert!(!generated.contains_key("step"));
//! ```

mod blueprint;
mod catalog;
mod definition;
mod generated;
mod instance;

pub use blueprint::Blueprint;
pub use catalog::{Catalog, CatalogError};
pub use definition::{Attribute, Definitions, ResolverFn};
pub use generated::{Generated, Overrides};
pub use instance::Instance;
