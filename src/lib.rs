//! Blueprint - prototypal attribute templates
//!
//! A [`Blueprint`] declares named attributes. Literal attributes are returned
//! as-is; resolver attributes are computed from the instance on first access
//! and cached for the life of that instance. Blueprints are extended into
//! derived blueprints without touching the original, instantiated with
//! [`Blueprint::create`], and turned into plain objects with
//! [`Blueprint::generate`].
//!
//! # Example
//!
//! ```rust
//! use blueprint::{Blueprint, Definitions, Value};
//!
//! let user = Blueprint::base().extend(
//!     Definitions::new()
//!         .export_attributes(["name", "email"])
//!         .literal("name", "ada")
//!         .literal("domain", "example.com")
//!         .resolver("email", |bp| {
//!             let name: String = bp.require("name")?;
//!             let domain: String = bp.require("domain")?;
//!             Ok(Value::from(format!("{}@{}", name, domain)))
//!         }),
//! );
//!
//! let generated = user.generate().unwrap();
//! assert_eq!(generated.get("email"), Some(&Value::from("ada@example.com")));
//! assert!(!generated.contains_key("domain"));
//! ```

pub mod config;
pub mod error;
pub mod template;
pub mod value;

pub use config::ResolveConfig;
pub use error::BlueprintError;
pub use template::{
    Attribute, Blueprint, Catalog, CatalogError, Definitions, Generated, Instance, Overrides,
    ResolverFn,
};
pub use value::{FromValue, Value};

/// The same blueprint type under its second name
pub type Scrimshaw = Blueprint;
