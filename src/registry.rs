//! Service registry holding providers, multi-bindings, and aliases.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{ServiceKey, ServiceType};
use crate::provider::Provider;

/// Provider storage the resolver consults during activation.
///
/// The registry is immutable once the container is built; mutation happens
/// only through [`ContainerBuilder`](crate::ContainerBuilder). It guarantees
/// at most one provider per exact key. Multi-bound implementations live in a
/// separate append-only store and are returned in registration order.
pub(crate) struct Registry {
    /// Exact-key registrations, last write wins when overrides are allowed.
    one: HashMap<ServiceType, Arc<Provider>>,
    /// Append-only multi-binding registrations.
    many: HashMap<ServiceType, Vec<Arc<Provider>>>,
    /// Alias name to bound type.
    aliases: HashMap<Arc<str>, ServiceType>,
    strict: bool,
    allow_overrides: bool,
    scoping: bool,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            one: HashMap::new(),
            many: HashMap::new(),
            aliases: HashMap::new(),
            strict: false,
            allow_overrides: false,
            scoping: true,
        }
    }

    pub(crate) fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub(crate) fn set_allow_overrides(&mut self, allow: bool) {
        self.allow_overrides = allow;
    }

    pub(crate) fn set_scoping(&mut self, scoping: bool) {
        self.scoping = scoping;
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.strict
    }

    pub(crate) fn supports_scoping(&self) -> bool {
        self.scoping
    }

    /// Inserts an exact-key registration.
    pub(crate) fn insert(&mut self, provider: Provider) -> DiResult<()> {
        let ty = provider.service();
        if !self.allow_overrides && self.one.contains_key(&ty) {
            let key = ServiceKey::Type(ty);
            return Err(DiError::DuplicateRegistration(key.to_string()));
        }
        self.one.insert(ty, Arc::new(provider));
        Ok(())
    }

    /// Appends a multi-binding registration; duplicates are allowed here by
    /// design, since collection-typed resolution returns all of them.
    pub(crate) fn append(&mut self, provider: Provider) {
        let ty = provider.service();
        let entry = self.many.entry(ty).or_default();
        // Binding index keeps the scoped caches of same-typed bindings apart.
        let provider = provider.with_binding_index(entry.len() as u32);
        entry.push(Arc::new(provider));
    }

    /// Binds `name` to `target`. The target must already be registered.
    pub(crate) fn define_alias(&mut self, name: &str, target: ServiceType) -> DiResult<()> {
        if self.aliases.contains_key(name) {
            let key = ServiceKey::Alias(Arc::from(name));
            return Err(DiError::DuplicateAlias(key.to_string()));
        }
        if !self.contains(&target) {
            return Err(DiError::DanglingAlias {
                name: name.to_string(),
                target: target.name(),
            });
        }
        self.aliases.insert(Arc::from(name), target);
        Ok(())
    }

    pub(crate) fn get(&self, ty: &ServiceType) -> Option<&Arc<Provider>> {
        self.one.get(ty)
    }

    pub(crate) fn get_many(&self, ty: &ServiceType) -> &[Arc<Provider>] {
        self.many.get(ty).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn alias_target(&self, name: &str) -> Option<ServiceType> {
        self.aliases.get(name).copied()
    }

    pub(crate) fn contains(&self, ty: &ServiceType) -> bool {
        self.one.contains_key(ty) || self.many.contains_key(ty)
    }

    pub(crate) fn registration_count(&self) -> usize {
        self.one.len() + self.many.values().map(Vec::len).sum::<usize>()
    }
}
