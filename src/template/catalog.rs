//! Blueprint catalog - named blueprints loaded from TOML
//!
//! A catalog file declares literal attributes, export lists and `extends`
//! relationships. Resolvers are attached in code with [`Catalog::extend`].
//!
//! ```toml
//! [settings]
//! max_depth = 32
//!
//! [blueprints.user]
//! export_attributes = ["name", "age"]
//! [blueprints.user.attributes]
//! name = "anonymous"
//! age = 30
//!
//! [blueprints.admin]
//! extends = "user"
//! [blueprints.admin.attributes]
//! role = "admin"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::config::ResolveConfig;
use crate::value::Value;

use super::blueprint::Blueprint;
use super::definition::Definitions;

/// Errors that can occur when loading or querying a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Blueprint not found in catalog
    #[error("blueprint not found: {name}")]
    NotFound { name: String },

    /// Duplicate blueprint name
    #[error("duplicate blueprint definition: {name}")]
    Duplicate { name: String },

    /// `extends` names a blueprint the catalog does not define
    #[error("blueprint '{name}' extends unknown blueprint '{parent}'")]
    UnknownParent { name: String, parent: String },

    /// `extends` relationships loop back on themselves
    #[error("circular extends chain detected: {}", chain.join(" -> "))]
    CircularExtends { chain: Vec<String> },

    /// A TOML value with no attribute counterpart
    #[error("unsupported value for attribute '{attribute}' in blueprint '{blueprint}': {reason}")]
    Unsupported {
        blueprint: String,
        attribute: String,
        reason: String,
    },
}

/// TOML structure for deserializing catalogs
#[derive(Deserialize)]
struct TomlCatalog {
    settings: Option<TomlSettings>,
    #[serde(default)]
    blueprints: BTreeMap<String, TomlBlueprint>,
}

#[derive(Deserialize)]
struct TomlSettings {
    max_depth: Option<usize>,
    detect_cycles: Option<bool>,
}

#[derive(Deserialize)]
struct TomlBlueprint {
    extends: Option<String>,
    export_attributes: Option<Vec<String>>,
    #[serde(default)]
    attributes: BTreeMap<String, toml::Value>,
}

/// Registry of named blueprints
#[derive(Debug, Default)]
pub struct Catalog {
    blueprints: HashMap<String, Blueprint>,
    config: ResolveConfig,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty catalog whose blueprints resolve with `config`
    pub fn with_config(config: ResolveConfig) -> Self {
        Self {
            blueprints: HashMap::new(),
            config,
        }
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a catalog from a TOML string
    pub fn from_str(content: &str) -> Result<Self, CatalogError> {
        let parsed: TomlCatalog = toml::from_str(content)?;

        let mut config = ResolveConfig::default();
        if let Some(settings) = &parsed.settings {
            if let Some(max_depth) = settings.max_depth {
                config = config.with_max_depth(max_depth);
            }
            if let Some(detect) = settings.detect_cycles {
                config = config.with_cycle_detection(detect);
            }
        }

        let mut catalog = Catalog::with_config(config);
        let mut visiting = Vec::new();
        for name in parsed.blueprints.keys() {
            catalog.build(name, &parsed.blueprints, &mut visiting)?;
        }

        tracing::debug!(blueprints = catalog.len(), "loaded blueprint catalog");
        Ok(catalog)
    }

    /// Build `name` after its parents, depth first
    fn build(
        &mut self,
        name: &str,
        declared: &BTreeMap<String, TomlBlueprint>,
        visiting: &mut Vec<String>,
    ) -> Result<Blueprint, CatalogError> {
        if let Some(existing) = self.blueprints.get(name) {
            return Ok(existing.clone());
        }

        if let Some(start) = visiting.iter().position(|entry| entry == name) {
            let mut chain = visiting[start..].to_vec();
            chain.push(name.to_string());
            return Err(CatalogError::CircularExtends { chain });
        }

        let decl = declared.get(name).ok_or_else(|| CatalogError::NotFound {
            name: name.to_string(),
        })?;

        visiting.push(name.to_string());
        let parent = match &decl.extends {
            Some(parent) if !declared.contains_key(parent) => {
                return Err(CatalogError::UnknownParent {
                    name: name.to_string(),
                    parent: parent.clone(),
                });
            }
            Some(parent) => self.build(parent, declared, visiting)?,
            None => Blueprint::base().with_config(self.config),
        };
        visiting.pop();

        let mut definitions = Definitions::new();
        for (attribute, value) in &decl.attributes {
            let literal = literal_from_toml(value).map_err(|reason| CatalogError::Unsupported {
                blueprint: name.to_string(),
                attribute: attribute.clone(),
                reason,
            })?;
            definitions = definitions.literal(attribute.clone(), literal);
        }
        if let Some(exports) = &decl.export_attributes {
            definitions = definitions.export_attributes(exports.iter().cloned());
        }

        let blueprint = parent.extend(definitions);
        self.blueprints.insert(name.to_string(), blueprint.clone());
        Ok(blueprint)
    }

    /// Add a blueprint built in code
    pub fn register(
        &mut self,
        name: impl Into<String>,
        blueprint: Blueprint,
    ) -> Result<(), CatalogError> {
        let name = name.into();
        if self.blueprints.contains_key(&name) {
            return Err(CatalogError::Duplicate { name });
        }
        self.blueprints.insert(name, blueprint);
        Ok(())
    }

    /// Get a blueprint by name
    pub fn get(&self, name: &str) -> Option<&Blueprint> {
        self.blueprints.get(name)
    }

    /// Get a blueprint by name, failing if it is absent
    pub fn require(&self, name: &str) -> Result<&Blueprint, CatalogError> {
        self.get(name).ok_or_else(|| CatalogError::NotFound {
            name: name.to_string(),
        })
    }

    /// Derive a new blueprint from a catalog entry
    ///
    /// The catalog itself is not modified.
    pub fn extend(&self, name: &str, definitions: Definitions) -> Result<Blueprint, CatalogError> {
        Ok(self.require(name)?.extend(definitions))
    }

    /// Check if a blueprint exists
    pub fn contains(&self, name: &str) -> bool {
        self.blueprints.contains_key(name)
    }

    /// All blueprint names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blueprints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Configuration shared by blueprints loaded from the file
    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// Number of blueprints
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    /// True when no blueprints are registered
    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

/// Convert a TOML value into a literal attribute value
fn literal_from_toml(value: &toml::Value) -> Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => {
            return Err(format!("datetime {} has no attribute representation", dt));
        }
        toml::Value::Array(items) => Value::List(
            items
                .iter()
                .map(literal_from_toml)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Table(
            table
                .iter()
                .map(|(key, value)| Ok((key.clone(), literal_from_toml(value)?)))
                .collect::<Result<_, String>>()?,
        ),
    })
}
