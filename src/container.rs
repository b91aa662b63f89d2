//! Container construction and the public resolution surface.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::descriptors::Signature;
use crate::error::{DiError, DiResult};
use crate::key::{ServiceKey, ServiceType};
use crate::lifetime::Lifetime;
use crate::provider::scope::{downcast_concrete, ActivationScope};
use crate::provider::{AsyncAssembler, AsyncFactory, Factory, Provider, ResolvedArgs};
use crate::registry::Registry;

/// Mutable registration phase of a container.
///
/// Registrations are validated eagerly: duplicate keys, dangling aliases,
/// and malformed factory shapes fail at registration time, not at first
/// resolution.
///
/// # Examples
///
/// ```rust
/// use weld_di::ContainerBuilder;
///
/// #[derive(Clone)]
/// struct Config { url: String }
/// struct Repo { config: std::sync::Arc<Config> }
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_instance(Config { url: "localhost".into() })?;
/// builder.add_singleton_factory::<Repo, _>(|scope| {
///     Ok(Repo { config: scope.get::<Config>()? })
/// })?;
/// let container = builder.build();
///
/// let repo = container.resolve::<Repo>()?;
/// assert_eq!(repo.config.url, "localhost");
/// # Ok::<(), weld_di::DiError>(())
/// ```
pub struct ContainerBuilder {
    registry: Registry,
}

impl ContainerBuilder {
    /// An empty builder with default flags.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// In strict mode, unregistered types are never auto-constructed;
    /// [`Container::resolve_or_construct`] fails with
    /// [`DiError::StrictModeViolation`] instead.
    pub fn strict(&mut self) -> &mut Self {
        self.registry.set_strict(true);
        self
    }

    /// Permits re-registering an already registered key; the last
    /// registration wins.
    pub fn allow_overrides(&mut self) -> &mut Self {
        self.registry.set_allow_overrides(true);
        self
    }

    /// Disables scoped caching entirely. Scopes created from the container
    /// then reject scoped providers with
    /// [`DiError::ScopedServicesUnavailable`].
    pub fn without_scoping(&mut self) -> &mut Self {
        self.registry.set_scoping(false);
        self
    }

    /// Registers a pre-built value; every resolution returns it.
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, value: T) -> DiResult<&mut Self> {
        let provider = Provider::instance(ServiceType::of::<T>(), Arc::new(value));
        self.registry.insert(provider)?;
        Ok(self)
    }

    /// Registers a synchronous factory under the given lifetime.
    pub fn add_factory<T: Send + Sync + 'static>(
        &mut self,
        lifetime: Lifetime,
        factory: Factory<T>,
    ) -> DiResult<&mut Self> {
        let provider = Provider::from_factory(lifetime, factory)?;
        self.registry.insert(provider)?;
        Ok(self)
    }

    /// Registers a transient context factory: a new instance per resolution.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, Factory::Context(Box::new(factory)))
    }

    /// Registers a scoped context factory: one instance per activation
    /// scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, Factory::Context(Box::new(factory)))
    }

    /// Registers a singleton context factory: one instance per container.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, Factory::Context(Box::new(factory)))
    }

    /// Registers an asynchronous factory under the given lifetime. The
    /// service is then only resolvable through the async entry points.
    pub fn add_async_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<T> + 'static,
    {
        self.registry.insert(Provider::from_async(lifetime, factory))?;
        Ok(self)
    }

    /// Registers an async singleton factory.
    pub fn add_singleton_async<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<T> + 'static,
    {
        self.add_async_factory(Lifetime::Singleton, factory)
    }

    /// Registers an async scoped factory.
    pub fn add_scoped_async<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<T> + 'static,
    {
        self.add_async_factory(Lifetime::Scoped, factory)
    }

    /// Registers an async transient factory.
    pub fn add_transient_async<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<T> + 'static,
    {
        self.add_async_factory(Lifetime::Transient, factory)
    }

    /// Registers a planned provider: the engine resolves `signature` and
    /// passes the values to `build`.
    pub fn add_with<T, F>(
        &mut self,
        lifetime: Lifetime,
        signature: Signature,
        build: F,
    ) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope, ResolvedArgs) -> DiResult<T> + Send + Sync + 'static,
    {
        self.registry
            .insert(Provider::planned(lifetime, signature, build))?;
        Ok(self)
    }

    /// Registers a planned provider with an asynchronous constructor.
    pub fn add_async_with<T, F>(
        &mut self,
        lifetime: Lifetime,
        signature: Signature,
        build: F,
    ) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: AsyncAssembler<T> + 'static,
    {
        self.registry
            .insert(Provider::planned_async(lifetime, signature, build))?;
        Ok(self)
    }

    /// Registers a pre-built trait object under the trait's own key.
    pub fn add_singleton_trait<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        value: Arc<T>,
    ) -> DiResult<&mut Self> {
        let provider = Provider::instance(ServiceType::of::<T>(), Arc::new(value));
        self.registry.insert(provider)?;
        Ok(self)
    }

    /// Registers a factory producing a trait object under the trait's key.
    pub fn add_trait_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> DiResult<&mut Self>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationScope) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let provider = Provider::from_factory_for(
            ServiceType::of::<T>(),
            lifetime,
            Factory::Context(Box::new(factory)),
        )?;
        self.registry.insert(provider)?;
        Ok(self)
    }

    /// Appends one implementation of trait `T` to its multi-binding set.
    /// Unlike the exact-key entry points this never conflicts; resolution
    /// with [`ActivationScope::get_all`] returns all of them in
    /// registration order.
    pub fn add_trait_implementation<T, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
    ) -> DiResult<&mut Self>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationScope) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let provider = Provider::from_factory_for(
            ServiceType::of::<T>(),
            lifetime,
            Factory::Context(Box::new(factory)),
        )?;
        self.registry.append(provider);
        Ok(self)
    }

    /// Binds a string alias to the already registered type `T`.
    pub fn alias<T: ?Sized + 'static>(&mut self, name: &str) -> DiResult<&mut Self> {
        self.registry.define_alias(name, ServiceType::of::<T>())?;
        Ok(self)
    }

    /// Freezes the registrations into an immutable container.
    pub fn build(self) -> Container {
        tracing::debug!(
            registrations = self.registry.registration_count(),
            "container built"
        );
        Container {
            inner: Arc::new(ContainerInner {
                registry: self.registry,
                auto: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct ContainerInner {
    pub(crate) registry: Registry,
    /// Providers synthesized by [`Container::resolve_or_construct`], keyed
    /// by type id. Consulted after explicit registrations.
    auto: Mutex<HashMap<TypeId, Arc<Provider>>>,
}

impl ContainerInner {
    pub(crate) fn lookup_provider(&self, ty: &ServiceType) -> Option<Arc<Provider>> {
        if let Some(provider) = self.registry.get(ty) {
            return Some(provider.clone());
        }
        self.auto.lock().unwrap().get(&ty.id()).cloned()
    }

    pub(crate) fn providers_for_all(&self, ty: &ServiceType) -> Vec<Arc<Provider>> {
        self.registry.get_many(ty).to_vec()
    }
}

/// An immutable, thread-safe service container.
///
/// Cloning is cheap and clones share all state, including singleton slots.
///
/// # Examples
///
/// ```rust
/// use weld_di::ContainerBuilder;
///
/// struct Clock;
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_singleton_factory::<Clock, _>(|_| Ok(Clock))?;
/// let container = builder.build();
///
/// assert!(container.can_resolve::<Clock>());
/// let a = container.resolve::<Clock>()?;
/// let b = container.resolve::<Clock>()?;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # Ok::<(), weld_di::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Creates an activation scope for one unit of work.
    pub fn create_scope(&self) -> ActivationScope {
        ActivationScope::new(self.inner.clone(), self.inner.registry.supports_scoping())
    }

    /// A fresh scope for one top-level call. Its scoped cache follows the
    /// container's scoping support and lives only for that call.
    fn root_scope(&self) -> ActivationScope {
        self.create_scope()
    }

    /// Resolves `T` in a fresh scope created for this call. Scoped
    /// providers yield an instance shared within the call's dependency
    /// graph and discarded afterwards; use [`resolve_in`](Self::resolve_in)
    /// to share scoped instances across calls.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.root_scope().get::<T>()
    }

    /// Async counterpart of [`resolve`](Self::resolve); required whenever an
    /// async provider sits anywhere on the dependency path.
    pub async fn aresolve<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.root_scope().aget::<T>().await
    }

    /// Resolves `T` within the given scope.
    pub fn resolve_in<T: Send + Sync + 'static>(&self, scope: &ActivationScope) -> DiResult<Arc<T>> {
        scope.get::<T>()
    }

    /// Async counterpart of [`resolve_in`](Self::resolve_in).
    pub async fn aresolve_in<T: Send + Sync + 'static>(
        &self,
        scope: &ActivationScope,
    ) -> DiResult<Arc<T>> {
        scope.aget::<T>().await
    }

    /// Resolves a trait object registered under trait `T`'s key.
    pub fn resolve_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.root_scope().get_trait::<T>()
    }

    /// Resolves all multi-bound implementations of trait `T`.
    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.root_scope().get_all::<T>()
    }

    /// Resolves the type bound to a string alias.
    pub fn resolve_alias<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let target = self.alias_target(name)?;
        let value = self.root_scope().resolve_type(target)?;
        downcast_concrete(value)
    }

    /// Async counterpart of [`resolve_alias`](Self::resolve_alias).
    pub async fn aresolve_alias<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let target = self.alias_target(name)?;
        let scope = self.root_scope();
        let value = scope.resolve_type_async(target).await?;
        downcast_concrete(value)
    }

    fn alias_target(&self, name: &str) -> DiResult<ServiceType> {
        self.inner
            .registry
            .alias_target(name)
            .ok_or_else(|| DiError::TypeUnresolvable(name.to_string()))
    }

    /// Whether `T` is registered, either exactly or as a multi-binding.
    /// Synthesized providers count; the answer never requires running a
    /// factory.
    pub fn can_resolve<T: ?Sized + 'static>(&self) -> bool {
        self.can_resolve_key(&ServiceKey::Type(ServiceType::of::<T>()))
    }

    /// Whether a string alias is bound.
    pub fn can_resolve_alias(&self, name: &str) -> bool {
        self.can_resolve_key(&ServiceKey::Alias(name.into()))
    }

    /// Whether a key, exact type or alias, is resolvable.
    pub fn can_resolve_key(&self, key: &ServiceKey) -> bool {
        match key {
            ServiceKey::Type(ty) => {
                self.inner.registry.contains(ty)
                    || self.inner.auto.lock().unwrap().contains_key(&ty.id())
            }
            ServiceKey::Alias(name) => self.inner.registry.alias_target(name).is_some(),
        }
    }

    /// Resolves `T`, synthesizing a transient registration from
    /// `T::default` when the type is unregistered.
    ///
    /// The synthesized provider is remembered; subsequent resolutions of
    /// `T`, through any entry point, reuse it. In strict mode this fails
    /// with [`DiError::StrictModeViolation`] instead of synthesizing.
    pub fn resolve_or_construct<T: Default + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let ty = ServiceType::of::<T>();
        if self.inner.lookup_provider(&ty).is_none() {
            if self.inner.registry.is_strict() {
                return Err(DiError::StrictModeViolation(ty.name()));
            }
            let provider = Provider::from_factory::<T>(
                Lifetime::Transient,
                Factory::NoArgs(Box::new(|| Ok(T::default()))),
            )?;
            tracing::debug!(service = ty.name(), "synthesized transient registration");
            self.inner
                .auto
                .lock()
                .unwrap()
                .entry(ty.id())
                .or_insert_with(|| Arc::new(provider));
        }
        self.resolve::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Widget {
        label: String,
    }

    #[test]
    fn auto_registration_is_remembered() {
        let container = ContainerBuilder::new().build();
        assert!(!container.can_resolve::<Widget>());

        let widget = container.resolve_or_construct::<Widget>().unwrap();
        assert_eq!(widget.label, "");
        assert!(container.can_resolve::<Widget>());
        // The synthesized provider now serves the plain entry point too.
        assert!(container.resolve::<Widget>().is_ok());
    }

    #[test]
    fn strict_mode_refuses_to_construct() {
        let mut builder = ContainerBuilder::new();
        builder.strict();
        let container = builder.build();
        match container.resolve_or_construct::<Widget>() {
            Err(DiError::StrictModeViolation(name)) => {
                assert!(name.contains("Widget"));
            }
            other => panic!("expected StrictModeViolation, got {:?}", other.err()),
        }
        assert!(!container.can_resolve::<Widget>());
    }

    #[test]
    fn explicit_registration_beats_synthesized() {
        let container = {
            let mut builder = ContainerBuilder::new();
            builder
                .add_instance(Widget {
                    label: "explicit".into(),
                })
                .unwrap();
            builder.build()
        };
        let widget = container.resolve_or_construct::<Widget>().unwrap();
        assert_eq!(widget.label, "explicit");
    }
}
