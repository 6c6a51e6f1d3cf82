//! Instance resolution - resolves attributes against a blueprint with a private cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::BlueprintError;
use crate::value::{FromValue, Value};

use super::blueprint::Blueprint;
use super::definition::{Attribute, ResolverFn};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Cache state of one attribute on an instance
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    /// Its resolver is currently running (cycle detection)
    Resolving,
    Resolved(Value),
}

pub(crate) type Cache = HashMap<String, Slot>;

/// A live realization of a blueprint
///
/// Each instance owns its cache. An attribute is resolved at most once per
/// instance; later reads return the cached value even when the resolver is
/// non-deterministic.
#[derive(Debug)]
pub struct Instance {
    id: u64,
    blueprint: Blueprint,
    cache: Cache,
    /// Attributes whose resolvers are on the call stack, outermost first
    stack: Vec<String>,
}

impl Instance {
    pub(crate) fn new(blueprint: Blueprint) -> Self {
        Self::with_cache(blueprint, Cache::new())
    }

    pub(crate) fn with_cache(blueprint: Blueprint, cache: Cache) -> Self {
        Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            blueprint,
            cache,
            stack: Vec::new(),
        }
    }

    /// Move the resolved part of the cache out; markers of interrupted resolvers are dropped
    pub(crate) fn take_cache(&mut self) -> Cache {
        self.stack.clear();
        self.cache.retain(|_, slot| matches!(slot, Slot::Resolved(_)));
        std::mem::take(&mut self.cache)
    }

    /// Process-unique identifier of this instance
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The blueprint this instance was created from
    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Pre-resolve an attribute so its definition is never consulted
    pub(crate) fn seed(&mut self, name: impl Into<String>, value: Value) {
        self.cache.insert(name.into(), Slot::Resolved(value));
    }

    /// Whether `name` has already been resolved on this instance
    pub fn is_resolved(&self, name: &str) -> bool {
        matches!(self.cache.get(name), Some(Slot::Resolved(_)))
    }

    /// Names resolved so far, in no particular order
    pub fn resolved_names(&self) -> impl Iterator<Item = &str> {
        self.cache.iter().filter_map(|(name, slot)| match slot {
            Slot::Resolved(_) => Some(name.as_str()),
            Slot::Resolving => None,
        })
    }

    /// Resolve an attribute, caching the result
    ///
    /// Returns `Ok(None)` when no blueprint in the chain defines `name`.
    pub fn get(&mut self, name: &str) -> Result<Option<Value>, BlueprintError> {
        match self.cache.get(name) {
            Some(Slot::Resolved(value)) => {
                tracing::trace!(instance = self.id, attribute = name, "cache hit");
                return Ok(Some(value.clone()));
            }
            Some(Slot::Resolving) => return Err(self.cycle_error(name)),
            None => {}
        }

        let attribute = match self.blueprint.definition(name) {
            Some(attribute) => attribute.clone(),
            None => {
                tracing::trace!(instance = self.id, attribute = name, "undefined attribute");
                return Ok(None);
            }
        };

        let value = match attribute {
            Attribute::Literal(value) => {
                tracing::debug!(instance = self.id, attribute = name, "resolved literal");
                value
            }
            Attribute::Resolver(resolver) => self.run_resolver(name, resolver.as_ref())?,
        };

        self.cache.insert(name.to_string(), Slot::Resolved(value.clone()));
        Ok(Some(value))
    }

    /// Resolve an attribute and convert it to `T`
    pub fn get_as<T: FromValue>(&mut self, name: &str) -> Result<Option<T>, BlueprintError> {
        match self.get(name)? {
            None => Ok(None),
            Some(value) => T::from_value(&value)
                .map(Some)
                .ok_or_else(|| BlueprintError::TypeMismatch {
                    name: name.to_string(),
                    expected: T::KIND,
                    found: value.kind(),
                }),
        }
    }

    /// Like [`get_as`](Self::get_as), but an undefined attribute is an error
    pub fn require<T: FromValue>(&mut self, name: &str) -> Result<T, BlueprintError> {
        self.get_as(name)?
            .ok_or_else(|| BlueprintError::MissingAttribute {
                name: name.to_string(),
            })
    }

    fn run_resolver(
        &mut self,
        name: &str,
        resolver: &ResolverFn,
    ) -> Result<Value, BlueprintError> {
        let config = *self.blueprint.config();
        // the limit only backs up resolution when cycle detection is off
        if !config.detect_cycles && self.stack.len() >= config.max_depth {
            tracing::warn!(
                instance = self.id,
                attribute = name,
                limit = config.max_depth,
                "resolution depth exceeded"
            );
            return Err(BlueprintError::DepthExceeded {
                name: name.to_string(),
                limit: config.max_depth,
            });
        }

        tracing::debug!(instance = self.id, attribute = name, "running resolver");
        if config.detect_cycles {
            self.cache.insert(name.to_string(), Slot::Resolving);
        }
        self.stack.push(name.to_string());

        let result = resolver(self);

        self.stack.pop();
        // cleared on success and failure alike
        if matches!(self.cache.get(name), Some(Slot::Resolving)) {
            self.cache.remove(name);
        }
        result
    }

    fn cycle_error(&self, name: &str) -> BlueprintError {
        let start = self
            .stack
            .iter()
            .position(|entry| entry == name)
            .unwrap_or(0);
        let mut chain: Vec<String> = self.stack[start..].to_vec();
        chain.push(name.to_string());
        tracing::warn!(instance = self.id, chain = %chain.join(" -> "), "cyclic attribute dependency");
        BlueprintError::CyclicDependency { chain }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;
    use crate::config::ResolveConfig;
    use crate::template::Definitions;

    fn counting(counter: &Arc<AtomicUsize>) -> Definitions {
        let calls = Arc::clone(counter);
        Definitions::new().resolver("n", move |_| {
            let seen = calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(seen as i64))
        })
    }

    #[test]
    fn test_resolver_runs_once_per_instance() {
        let counter = Arc::new(AtomicUsize::new(0));
        let bp = Blueprint::base().extend(counting(&counter));

        let mut instance = bp.create();
        assert_eq!(instance.get("n").unwrap(), Some(Value::Int(0)));
        assert_eq!(instance.get("n").unwrap(), Some(Value::Int(0)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let mut other = bp.create();
        assert_eq!(other.get("n").unwrap(), Some(Value::Int(1)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_undefined_is_none_and_not_cached() {
        let mut instance = Blueprint::base().create();
        assert_eq!(instance.get("missing").unwrap(), None);
        assert!(!instance.is_resolved("missing"));
        assert_eq!(instance.resolved_names().count(), 0);
    }

    #[test]
    fn test_dependencies_are_cached_as_side_effect() {
        let bp = Blueprint::base().extend(
            Definitions::new()
                .literal("a", 2)
                .resolver("b", |bp| Ok(Value::Int(bp.require::<i64>("a")? * 10))),
        );
        let mut instance = bp.create();
        assert_eq!(instance.get("b").unwrap(), Some(Value::Int(20)));
        assert!(instance.is_resolved("a"));
        assert!(instance.is_resolved("b"));
    }

    #[test]
    fn test_direct_cycle_is_rejected() {
        let bp = Blueprint::base().extend(
            Definitions::new().resolver("a", |bp| bp.require::<Value>("a")),
        );
        let err = bp.create().get("a").unwrap_err();
        assert_eq!(err.cycle(), Some(&["a".to_string(), "a".to_string()][..]));
    }

    #[test]
    fn test_cycle_chain_starts_at_repeated_attribute() {
        let bp = Blueprint::base().extend(
            Definitions::new()
                .resolver("x", |bp| bp.require::<Value>("a"))
                .resolver("a", |bp| bp.require::<Value>("b"))
                .resolver("b", |bp| bp.require::<Value>("a")),
        );
        let mut instance = bp.create();
        let err = instance.get("x").unwrap_err();
        assert_eq!(
            err,
            BlueprintError::CyclicDependency {
                chain: vec!["a".into(), "b".into(), "a".into()],
            }
        );
        // nothing half-resolved is left behind
        assert_eq!(instance.resolved_names().count(), 0);
        assert!(instance.stack.is_empty());
    }

    #[test]
    fn test_cycle_without_detection_hits_depth_limit() {
        let bp = Blueprint::base()
            .with_config(ResolveConfig::new().with_max_depth(5).with_cycle_detection(false))
            .extend(
                Definitions::new()
                    .resolver("a", |bp| bp.require::<Value>("b"))
                    .resolver("b", |bp| bp.require::<Value>("a")),
            );
        let err = bp.create().get("a").unwrap_err();
        assert!(matches!(err, BlueprintError::DepthExceeded { limit: 5, .. }));
    }

    fn counting_chain(len: usize) -> Blueprint {
        let mut defs = Definitions::new().literal("n0", 0);
        for i in 1..=len {
            let prev = format!("n{}", i - 1);
            defs = defs.resolver(format!("n{}", i), move |bp| {
                Ok(Value::Int(bp.require::<i64>(&prev)? + 1))
            });
        }
        Blueprint::base().extend(defs)
    }

    #[test]
    fn test_deep_acyclic_chain_resolves_with_default_config() {
        let bp = counting_chain(70);
        assert_eq!(*bp.config(), ResolveConfig::default());
        assert_eq!(bp.create().get("n70").unwrap(), Some(Value::Int(70)));
    }

    #[test]
    fn test_depth_limit_ignored_while_detecting_cycles() {
        let bp = counting_chain(20).with_config(ResolveConfig::new().with_max_depth(5));
        assert_eq!(bp.create().get("n20").unwrap(), Some(Value::Int(20)));

        let unchecked = bp.with_config(
            ResolveConfig::new()
                .with_max_depth(5)
                .with_cycle_detection(false),
        );
        assert!(matches!(
            unchecked.create().get("n20"),
            Err(BlueprintError::DepthExceeded { limit: 5, .. })
        ));
    }

    #[test]
    fn test_take_cache_keeps_only_resolved() {
        let bp = Blueprint::base().extend(Definitions::new().literal("a", 1));
        let mut instance = bp.create();
        instance.get("a").unwrap();
        instance.cache.insert("b".into(), Slot::Resolving);
        instance.stack.push("b".into());

        let cache = instance.take_cache();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(&Slot::Resolved(Value::Int(1))));
        assert!(instance.stack.is_empty());
        assert_eq!(instance.resolved_names().count(), 0);
    }

    #[test]
    fn test_failed_resolver_can_be_retried() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&counter);
        let bp = Blueprint::base().extend(Definitions::new().resolver("flaky", move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(BlueprintError::resolver("flaky", "first call fails"))
            } else {
                Ok(Value::Bool(true))
            }
        }));
        let mut instance = bp.create();
        assert!(matches!(
            instance.get("flaky"),
            Err(BlueprintError::Resolver { .. })
        ));
        assert_eq!(instance.get("flaky").unwrap(), Some(Value::Bool(true)));
    }

    #[test]
    fn test_typed_access() {
        let bp = Blueprint::base().extend(Definitions::new().literal("name", "box"));
        let mut instance = bp.create();
        assert_eq!(instance.get_as::<String>("name").unwrap(), Some("box".into()));
        assert_eq!(
            instance.get_as::<i64>("name").unwrap_err(),
            BlueprintError::TypeMismatch {
                name: "name".into(),
                expected: "integer",
                found: "string",
            }
        );
        assert!(matches!(
            instance.require::<i64>("absent"),
            Err(BlueprintError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let bp = Blueprint::base();
        let a = bp.create();
        let b = bp.create();
        assert_ne!(a.id(), b.id());
        assert!(a.blueprint().ptr_eq(&bp));
    }
}
