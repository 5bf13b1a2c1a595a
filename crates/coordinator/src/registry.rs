//! Context-scoped resource bindings.
//!
//! A [`ResourceRegistry`] maps a resource-factory key to the holder
//! currently bound for the active logical unit of work. Exactly one binding
//! may exist per key; double-binding and unbinding an absent key are
//! programming errors and fail hard rather than silently overwriting.
//!
//! The registry is owned by one logical execution context and is passed
//! `&mut` into the coordinator's hooks, so it needs no interior locking.
//! Cross-context sharing is explicitly disallowed.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use txweave_core::{Error, ResourceKey, Result};

/// Bindings from factory key to resource holder for one execution context.
///
/// Values are stored type-erased so registries can hold holders for
/// unrelated resource technologies side by side; accessors are typed and a
/// lookup under the wrong type simply misses.
#[derive(Default)]
pub struct ResourceRegistry {
    bindings: HashMap<ResourceKey, Box<dyn Any>>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a resource for the given key.
    ///
    /// Fails with [`Error::IllegalState`] if a binding already exists;
    /// an existing binding is never overwritten.
    pub fn bind<T: 'static>(&mut self, key: ResourceKey, resource: T) -> Result<()> {
        match self.bindings.entry(key) {
            Entry::Occupied(_) => Err(Error::IllegalState(format!(
                "a resource is already bound for key {key}"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(resource));
                Ok(())
            }
        }
    }

    /// Look up the binding for a key.
    ///
    /// Returns `None` when nothing is bound or the binding has a different
    /// type.
    pub fn lookup<T: 'static>(&self, key: &ResourceKey) -> Option<&T> {
        self.bindings.get(key).and_then(|boxed| boxed.downcast_ref())
    }

    /// Look up the binding for a key, mutably.
    pub fn lookup_mut<T: 'static>(&mut self, key: &ResourceKey) -> Option<&mut T> {
        self.bindings
            .get_mut(key)
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Remove and return the binding for a key.
    ///
    /// Fails with [`Error::IllegalState`] if nothing is bound. A binding of
    /// an unexpected type also fails and is left in place.
    pub fn unbind<T: 'static>(&mut self, key: &ResourceKey) -> Result<T> {
        match self.bindings.remove(key) {
            None => Err(Error::IllegalState(format!(
                "no resource bound for key {key}"
            ))),
            Some(boxed) => match boxed.downcast::<T>() {
                Ok(resource) => Ok(*resource),
                Err(boxed) => {
                    self.bindings.insert(*key, boxed);
                    Err(Error::IllegalState(format!(
                        "resource bound for key {key} has an unexpected type"
                    )))
                }
            },
        }
    }

    /// Whether any resource is bound for the key.
    pub fn is_bound(&self, key: &ResourceKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// Keys with active bindings, in no particular order.
    pub fn bound_keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.bindings.keys()
    }

    /// Number of active bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the registry has no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("bound_keys", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}
