//! Blueprint definitions and the extension chain

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::config::ResolveConfig;
use crate::error::BlueprintError;
use crate::value::Value;

use super::definition::{Attribute, Definitions};
use super::generated::{Generated, Overrides};
use super::instance::{Cache, Instance};

/// An immutable template of named attributes
///
/// Blueprints form a tree: [`extend`](Blueprint::extend) creates a child that
/// stores only its own definitions and a link to its parent. Lookups walk from
/// the child towards the root and the first definition found wins.
///
/// Cloning a blueprint is cheap and yields a handle to the same template.
#[derive(Clone, Default)]
pub struct Blueprint {
    node: Arc<Node>,
}

#[derive(Default)]
struct Node {
    attributes: HashMap<String, Attribute>,
    export_attributes: Option<Vec<String>>,
    parent: Option<Blueprint>,
    config: ResolveConfig,
    /// Cache of the template's own default instance, used by `Blueprint::get`
    shared: Mutex<Cache>,
    /// Thread currently resolving on the default instance
    holder: Mutex<Option<ThreadId>>,
}

/// Borrowed default instance; puts its cache back even if a resolver panics
struct DefaultInstance<'a> {
    cache: MutexGuard<'a, Cache>,
    holder: &'a Mutex<Option<ThreadId>>,
    instance: Instance,
}

impl Drop for DefaultInstance<'_> {
    fn drop(&mut self) {
        *self.cache = self.instance.take_cache();
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Blueprint {
    /// The empty root blueprint
    pub fn base() -> Self {
        Self::default()
    }

    /// Create a derived blueprint; `self` is left untouched
    pub fn extend(&self, definitions: Definitions) -> Blueprint {
        tracing::debug!(
            attributes = definitions.attributes.len(),
            depth = self.depth() + 1,
            "extending blueprint"
        );
        Blueprint {
            node: Arc::new(Node {
                attributes: definitions.attributes,
                export_attributes: definitions.export_attributes,
                parent: Some(self.clone()),
                config: self.node.config,
                shared: Mutex::new(Cache::new()),
                holder: Mutex::new(None),
            }),
        }
    }

    /// A copy of this blueprint that resolves with a different configuration
    ///
    /// Blueprints derived from the copy inherit the new configuration.
    pub fn with_config(&self, config: ResolveConfig) -> Blueprint {
        Blueprint {
            node: Arc::new(Node {
                attributes: self.node.attributes.clone(),
                export_attributes: self.node.export_attributes.clone(),
                parent: self.node.parent.clone(),
                config,
                shared: Mutex::new(Cache::new()),
                holder: Mutex::new(None),
            }),
        }
    }

    /// The configuration used when resolving on this blueprint
    pub fn config(&self) -> &ResolveConfig {
        &self.node.config
    }

    /// Create a new instance with an empty cache
    pub fn create(&self) -> Instance {
        Instance::new(self.clone())
    }

    /// Create an instance with some attributes already resolved
    ///
    /// Overridden attributes are never looked up in the blueprint.
    pub fn create_with(&self, overrides: Overrides) -> Instance {
        let mut instance = self.create();
        for (name, value) in overrides {
            instance.seed(name, value);
        }
        instance
    }

    /// Resolve an attribute on this blueprint's default instance
    ///
    /// Every blueprint owns one lazily populated default instance, so repeated
    /// calls return the same cached values. Derived blueprints have their own.
    /// Resolvers should read siblings through the instance they are given;
    /// calling `get` on the same blueprint from inside one of its resolvers
    /// fails with `BlueprintError::ReentrantGet`.
    pub fn get(&self, name: &str) -> Result<Option<Value>, BlueprintError> {
        let current = thread::current().id();
        if *self.node.holder.lock().unwrap_or_else(PoisonError::into_inner) == Some(current) {
            tracing::warn!(attribute = name, "re-entrant blueprint get");
            return Err(BlueprintError::ReentrantGet {
                name: name.to_string(),
            });
        }

        let mut cache = self
            .node
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let instance = Instance::with_cache(self.clone(), std::mem::take(&mut *cache));
        *self.node.holder.lock().unwrap_or_else(PoisonError::into_inner) = Some(current);

        let mut default = DefaultInstance {
            cache,
            holder: &self.node.holder,
            instance,
        };
        default.instance.get(name)
    }

    /// Generate a plain object holding the exported attributes of a fresh instance
    pub fn generate(&self) -> Result<Generated, BlueprintError> {
        self.generate_with(Overrides::new())
    }

    /// Generate with some attributes replaced by literal values
    ///
    /// Exported names with no definition and no override map to `Value::Null`.
    pub fn generate_with(&self, overrides: Overrides) -> Result<Generated, BlueprintError> {
        let exports = self.export_attributes();
        tracing::debug!(
            exports = exports.len(),
            overrides = overrides.len(),
            "generating object"
        );

        let mut instance = self.create_with(overrides);
        let mut generated = Generated::with_capacity(exports.len());
        for name in exports {
            let value = instance.get(name)?.unwrap_or(Value::Null);
            generated.insert(name.clone(), value);
        }
        Ok(generated)
    }

    /// Find the definition of `name`, most derived first
    pub fn definition(&self, name: &str) -> Option<&Attribute> {
        let mut current = Some(self);
        while let Some(blueprint) = current {
            if let Some(attribute) = blueprint.node.attributes.get(name) {
                return Some(attribute);
            }
            current = blueprint.parent();
        }
        None
    }

    /// The definition of `name` on this blueprint only, ignoring ancestors
    pub fn own_definition(&self, name: &str) -> Option<&Attribute> {
        self.node.attributes.get(name)
    }

    /// The literal value of `name`, if its nearest definition is a literal
    pub fn literal(&self, name: &str) -> Option<&Value> {
        self.definition(name).and_then(Attribute::as_literal)
    }

    /// Check if any blueprint in the chain defines `name`
    pub fn has_attribute(&self, name: &str) -> bool {
        self.definition(name).is_some()
    }

    /// Every attribute name defined anywhere in the chain, sorted
    pub fn attribute_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        let mut current = Some(self);
        while let Some(blueprint) = current {
            names.extend(blueprint.node.attributes.keys().map(String::as_str));
            current = blueprint.parent();
        }
        names
    }

    /// The export list of the nearest blueprint that declares one
    pub fn export_attributes(&self) -> &[String] {
        let mut current = Some(self);
        while let Some(blueprint) = current {
            if let Some(exports) = &blueprint.node.export_attributes {
                return exports;
            }
            current = blueprint.parent();
        }
        &[]
    }

    /// The blueprint this one was extended from
    pub fn parent(&self) -> Option<&Blueprint> {
        self.node.parent.as_ref()
    }

    /// Number of ancestors; the root has depth 0
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(blueprint) = current {
            depth += 1;
            current = blueprint.parent();
        }
        depth
    }

    /// Whether both handles refer to the same template
    pub fn ptr_eq(&self, other: &Blueprint) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut own: Vec<&str> = self.node.attributes.keys().map(String::as_str).collect();
        own.sort_unstable();
        f.debug_struct("Blueprint")
            .field("attributes", &own)
            .field("export_attributes", &self.node.export_attributes)
            .field("depth", &self.depth())
            .finish()
    }
}
