/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Registry of per-type converters.
//!
//! Converters are keyed either by an exact runtime type or by a
//! [`Capability`]: a named behavioral contract checked against the value
//! being converted. Lookup tries the exact table first and then scans
//! capabilities in registration order.
//!
//! A registry is an explicit instance, usually shared through an `Arc`. All
//! methods take `&self`; readers proceed concurrently and writers are
//! exclusive.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::builtin::register_builtins;
use crate::error::ConversionError;
use crate::options::ConverterOptions;
use crate::reflect::Reflect;
use crate::variable::Variable;

/// Converts one kind of value to a [`Variable`].
pub trait Converter: Send + Sync {
    fn convert(&self, value: &dyn Reflect) -> Result<Variable, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(&dyn Reflect) -> Result<Variable, ConversionError> + Send + Sync,
{
    fn convert(&self, value: &dyn Reflect) -> Result<Variable, ConversionError> {
        self(value)
    }
}

type Predicate = dyn Fn(&dyn Reflect) -> bool + Send + Sync;

/// A named contract a value may satisfy.
#[derive(Clone)]
pub struct Capability {
    name: Cow<'static, str>,
    predicate: Arc<Predicate>,
}

impl Capability {
    /// A capability satisfied by values whose [`Reflect::implements`]
    /// answers `true` for `name`.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        let key = name.clone();
        Self {
            name,
            predicate: Arc::new(move |value: &dyn Reflect| value.implements(&key)),
        }
    }

    /// A capability decided by an arbitrary predicate.
    pub fn with_predicate<F>(name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&dyn Reflect) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_satisfied_by(&self, value: &dyn Reflect) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.name).finish()
    }
}

/// What a converter is registered for.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    /// Exactly one runtime type.
    Exact { id: TypeId, name: &'static str },

    /// Every value satisfying a capability.
    Capability(Capability),
}

impl TypeDescriptor {
    pub fn of<T: Any>() -> Self {
        TypeDescriptor::Exact {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn capability(capability: Capability) -> Self {
        TypeDescriptor::Capability(capability)
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Exact { name, .. } => name,
            TypeDescriptor::Capability(capability) => capability.name(),
        }
    }

    fn key(&self) -> RegistryKey {
        match self {
            TypeDescriptor::Exact { id, .. } => RegistryKey::Exact(*id),
            TypeDescriptor::Capability(capability) => {
                RegistryKey::Capability(capability.name.to_string())
            }
        }
    }
}

impl PartialEq for TypeDescriptor {
    /// Exact descriptors compare by type, capabilities by name.
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl From<Capability> for TypeDescriptor {
    fn from(capability: Capability) -> Self {
        TypeDescriptor::Capability(capability)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RegistryKey {
    Exact(TypeId),
    Capability(String),
}

struct Registration {
    descriptor: TypeDescriptor,
    converter: Arc<dyn Converter>,
}

/// A thread-safe table of converters.
#[derive(Default)]
pub struct ConverterRegistry {
    entries: RwLock<IndexMap<RegistryKey, Registration>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("descriptors", &self.list())
            .finish()
    }
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in timestamp, duration and
    /// URL converters, rendering according to `options`.
    pub fn with_builtins(options: &ConverterOptions) -> Self {
        let registry = Self::new();
        register_builtins(&registry, options);
        registry
    }

    // The table has no invariants that a panicking writer could break, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<RegistryKey, Registration>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<RegistryKey, Registration>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `converter` for `descriptor`, replacing any converter
    /// already registered for it. A replaced entry keeps its position in
    /// the capability scan order.
    pub fn register(
        &self,
        descriptor: impl Into<TypeDescriptor>,
        converter: impl Converter + 'static,
    ) {
        self.register_arc(descriptor, Arc::new(converter));
    }

    /// Register an already shared converter.
    pub fn register_arc(&self, descriptor: impl Into<TypeDescriptor>, converter: Arc<dyn Converter>) {
        let descriptor = descriptor.into();
        tracing::debug!(descriptor = descriptor.name(), "registering converter");
        self.write().insert(
            descriptor.key(),
            Registration {
                descriptor,
                converter,
            },
        );
    }

    /// Convenience for `register(TypeDescriptor::of::<T>(), converter)`.
    pub fn register_type<T: Any>(&self, converter: impl Converter + 'static) {
        self.register(TypeDescriptor::of::<T>(), converter);
    }

    /// Remove the converter registered for `descriptor`, reporting whether
    /// there was one.
    pub fn unregister(&self, descriptor: &TypeDescriptor) -> bool {
        tracing::debug!(descriptor = descriptor.name(), "unregistering converter");
        self.write().shift_remove(&descriptor.key()).is_some()
    }

    /// Find the converter for `value`: an exact type match first, then the
    /// first capability (in registration order) that `value` satisfies.
    pub fn get(&self, value: &dyn Reflect) -> Option<Arc<dyn Converter>> {
        let entries = self.read();
        let exact = RegistryKey::Exact(Any::type_id(value.as_any()));
        if let Some(registration) = entries.get(&exact) {
            return Some(registration.converter.clone());
        }
        entries
            .values()
            .find(|registration| match &registration.descriptor {
                TypeDescriptor::Capability(capability) => capability.is_satisfied_by(value),
                TypeDescriptor::Exact { .. } => false,
            })
            .map(|registration| registration.converter.clone())
    }

    /// Exact-type lookup only.
    pub fn get_exact(&self, id: TypeId) -> Option<Arc<dyn Converter>> {
        self.read()
            .get(&RegistryKey::Exact(id))
            .map(|registration| registration.converter.clone())
    }

    pub fn has(&self, descriptor: &TypeDescriptor) -> bool {
        self.read().contains_key(&descriptor.key())
    }

    /// Every registered descriptor, in registration order.
    pub fn list(&self) -> Vec<TypeDescriptor> {
        self.read()
            .values()
            .map(|registration| registration.descriptor.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn clear(&self) {
        tracing::debug!("clearing converter registry");
        self.write().clear();
    }
}
