//! Providers: the polymorphic units that produce service instances.
//!
//! A [`Provider`] knows how to produce instances of exactly one declared
//! type, under one of four lifetimes, from either a synchronous or an
//! asynchronous factory. Providers are immutable after construction except
//! for lifetime-dependent cached state: the singleton slot lives on the
//! provider, the scoped cache lives on the activation scope, and transient
//! providers cache nothing.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use crate::descriptors::{FactoryArity, FactoryDescriptor, Signature};
use crate::error::{DiError, DiResult};
use crate::internal::{AnyArc, BoxFuture};
use crate::key::ServiceType;
use crate::lifetime::Lifetime;

pub mod scope;
pub use scope::ActivationScope;

/// A synchronous factory in one of the three accepted shapes.
///
/// Modeled as a closed set of tagged variants rather than runtime arity
/// inspection, so the accepted shapes are checked exhaustively at
/// registration time.
///
/// # Examples
///
/// ```rust
/// use weld_di::{ActivationScope, Factory, ServiceType};
///
/// struct Greeting(String);
///
/// let zero_arg: Factory<Greeting> =
///     Factory::NoArgs(Box::new(|| Ok(Greeting("hello".into()))));
/// let with_type: Factory<Greeting> = Factory::ContextAndType(Box::new(
///     |_scope: &ActivationScope, requested: ServiceType| {
///         Ok(Greeting(format!("built for {}", requested.name())))
///     },
/// ));
/// # let _ = (zero_arg, with_type);
/// ```
pub enum Factory<T> {
    /// `fn() -> T`: no access to the activation context.
    NoArgs(Box<dyn Fn() -> DiResult<T> + Send + Sync>),
    /// `fn(&scope) -> T`: may resolve further dependencies from the scope.
    Context(Box<dyn Fn(&ActivationScope) -> DiResult<T> + Send + Sync>),
    /// `fn(&scope, requested) -> T`: additionally receives the type under
    /// which the resolution was requested, for factories that vary their
    /// output on it.
    ContextAndType(Box<dyn Fn(&ActivationScope, ServiceType) -> DiResult<T> + Send + Sync>),
}

impl<T> Factory<T> {
    /// The shape tag of this factory.
    pub fn arity(&self) -> FactoryArity {
        match self {
            Factory::NoArgs(_) => FactoryArity::NoArgs,
            Factory::Context(_) => FactoryArity::Context,
            Factory::ContextAndType(_) => FactoryArity::ContextAndType,
        }
    }
}

/// A factory that constructs a service asynchronously.
///
/// Implement this for services whose construction performs async work
/// (connection handshakes, warm-up). The resolver reads the async capability
/// off the provider and refuses to run it from a synchronous resolution
/// path, failing with [`DiError::AsyncContextRequired`] instead of blocking.
///
/// Zero-argument closures returning a future implement this trait
/// automatically.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use weld_di::{ActivationScope, AsyncFactory, DiResult, ServiceType};
///
/// struct Pool { url: String }
/// struct PoolFactory;
///
/// #[async_trait]
/// impl AsyncFactory<Pool> for PoolFactory {
///     async fn create(&self, _scope: &ActivationScope, _requested: ServiceType) -> DiResult<Pool> {
///         // await a handshake here
///         Ok(Pool { url: "postgres://localhost".into() })
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncFactory<T: Send + Sync + 'static>: Send + Sync {
    /// Creates a new instance, resolving further dependencies from `scope`.
    async fn create(&self, scope: &ActivationScope, requested: ServiceType) -> DiResult<T>;
}

#[async_trait]
impl<T, F, Fut> AsyncFactory<T> for F
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = DiResult<T>> + Send,
{
    async fn create(&self, _scope: &ActivationScope, _requested: ServiceType) -> DiResult<T> {
        self().await
    }
}

/// An asynchronous constructor for planned providers: receives the
/// parameter values the engine resolved from the declared [`Signature`].
#[async_trait]
pub trait AsyncAssembler<T: Send + Sync + 'static>: Send + Sync {
    /// Builds the instance from the resolved parameter values.
    async fn assemble(&self, scope: &ActivationScope, args: ResolvedArgs) -> DiResult<T>;
}

/// Resolved parameter values of a planned provider, in declaration order.
///
/// A parameter that was skipped (unregistered dependency with a declared
/// default) is present by name but empty; the factory falls back to its own
/// default for it.
pub struct ResolvedArgs {
    values: Vec<(&'static str, Option<AnyArc>)>,
}

impl ResolvedArgs {
    pub(crate) fn new(values: Vec<(&'static str, Option<AnyArc>)>) -> Self {
        Self { values }
    }

    /// The resolved value for parameter `name`.
    pub fn required<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        match self.values.iter().find(|(n, _)| *n == name) {
            Some((_, Some(value))) => value
                .clone()
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
            _ => Err(DiError::TypeUnresolvable(name.to_string())),
        }
    }

    /// The resolved value for parameter `name`, or `None` if the parameter
    /// was skipped because it carries a default.
    pub fn optional<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        match self.values.iter().find(|(n, _)| *n == name) {
            Some((_, Some(value))) => value
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
            Some((_, None)) => Ok(None),
            None => Err(DiError::TypeUnresolvable(name.to_string())),
        }
    }

    /// The number of declared parameters, resolved or skipped.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the signature declared no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// Erased factory forms stored on a provider.

type SyncCtor = Arc<dyn Fn(&ActivationScope, ServiceType) -> DiResult<AnyArc> + Send + Sync>;
type SyncBuild = Arc<dyn Fn(&ActivationScope, ResolvedArgs) -> DiResult<AnyArc> + Send + Sync>;

pub(crate) trait ErasedAsyncFactory: Send + Sync {
    fn create<'a>(
        &'a self,
        scope: &'a ActivationScope,
        requested: ServiceType,
    ) -> BoxFuture<'a, DiResult<AnyArc>>;
}

struct AsyncAdapter<T, F> {
    inner: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ErasedAsyncFactory for AsyncAdapter<T, F>
where
    T: Send + Sync + 'static,
    F: AsyncFactory<T>,
{
    fn create<'a>(
        &'a self,
        scope: &'a ActivationScope,
        requested: ServiceType,
    ) -> BoxFuture<'a, DiResult<AnyArc>> {
        Box::pin(async move {
            let value = self.inner.create(scope, requested).await?;
            Ok(Arc::new(value) as AnyArc)
        })
    }
}

pub(crate) trait ErasedAsyncAssembler: Send + Sync {
    fn assemble<'a>(
        &'a self,
        scope: &'a ActivationScope,
        args: ResolvedArgs,
    ) -> BoxFuture<'a, DiResult<AnyArc>>;
}

struct AssemblerAdapter<T, F> {
    inner: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ErasedAsyncAssembler for AssemblerAdapter<T, F>
where
    T: Send + Sync + 'static,
    F: AsyncAssembler<T>,
{
    fn assemble<'a>(
        &'a self,
        scope: &'a ActivationScope,
        args: ResolvedArgs,
    ) -> BoxFuture<'a, DiResult<AnyArc>> {
        Box::pin(async move {
            let value = self.inner.assemble(scope, args).await?;
            Ok(Arc::new(value) as AnyArc)
        })
    }
}

enum FactorySource {
    /// Pre-built value; the factory is never invoked.
    Value(AnyArc),
    Sync(SyncCtor),
    Async(Arc<dyn ErasedAsyncFactory>),
    Planned {
        signature: Arc<Signature>,
        build: SyncBuild,
    },
    PlannedAsync {
        signature: Arc<Signature>,
        build: Arc<dyn ErasedAsyncAssembler>,
    },
}

/// A unit that produces instances of one declared type under a lifetime
/// policy.
///
/// Constructed by [`ContainerBuilder`](crate::ContainerBuilder) registration
/// entry points; invoked by the resolver with the current activation scope
/// and the originally requested type.
pub struct Provider {
    service: ServiceType,
    lifetime: Lifetime,
    source: FactorySource,
    /// Provider-local singleton slot; the sole shared mutable state outside
    /// a scope. `None` for non-singleton lifetimes.
    slot: Option<OnceCell<AnyArc>>,
    /// Serializes async singleton initialization so exactly one factory
    /// invocation occurs under a concurrent first access.
    async_init: tokio::sync::Mutex<()>,
    /// Disambiguates scoped cache entries of multi-bound providers sharing
    /// one declared type.
    binding_index: u32,
}

impl Provider {
    fn new(service: ServiceType, lifetime: Lifetime, source: FactorySource) -> Self {
        let slot = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };
        Self {
            service,
            lifetime,
            source,
            slot,
            async_init: tokio::sync::Mutex::new(()),
            binding_index: 0,
        }
    }

    /// A provider returning a pre-built value.
    pub(crate) fn instance(service: ServiceType, value: AnyArc) -> Self {
        Self::new(service, Lifetime::Instance, FactorySource::Value(value))
    }

    /// A provider backed by a synchronous factory, declared for `T` itself.
    pub(crate) fn from_factory<T: Send + Sync + 'static>(
        lifetime: Lifetime,
        factory: Factory<T>,
    ) -> DiResult<Self> {
        Self::from_factory_for(ServiceType::of::<T>(), lifetime, factory)
    }

    /// A provider backed by a synchronous factory producing `T`, registered
    /// under `service`. Used for trait-object registrations where the
    /// produced value (`Arc<dyn Trait>`) differs from the declared key
    /// (`dyn Trait`).
    pub(crate) fn from_factory_for<T: Send + Sync + 'static>(
        service: ServiceType,
        lifetime: Lifetime,
        factory: Factory<T>,
    ) -> DiResult<Self> {
        let descriptor =
            FactoryDescriptor::new(Some(service), lifetime, factory.arity().param_count());
        let (service, _arity) = descriptor.validate()?;
        let ctor: SyncCtor = match factory {
            Factory::NoArgs(f) => Arc::new(move |_, _| Ok(Arc::new(f()?) as AnyArc)),
            Factory::Context(f) => Arc::new(move |scope, _| Ok(Arc::new(f(scope)?) as AnyArc)),
            Factory::ContextAndType(f) => {
                Arc::new(move |scope, requested| Ok(Arc::new(f(scope, requested)?) as AnyArc))
            }
        };
        Ok(Self::new(service, lifetime, FactorySource::Sync(ctor)))
    }

    /// A provider backed by an asynchronous factory.
    pub(crate) fn from_async<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<T> + 'static,
    {
        let adapter = AsyncAdapter {
            inner: factory,
            _marker: PhantomData,
        };
        Self::new(
            ServiceType::of::<T>(),
            lifetime,
            FactorySource::Async(Arc::new(adapter)),
        )
    }

    /// A planned provider: the engine resolves `signature` and hands the
    /// values to `build`.
    pub(crate) fn planned<T, F>(lifetime: Lifetime, signature: Signature, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope, ResolvedArgs) -> DiResult<T> + Send + Sync + 'static,
    {
        let build: SyncBuild =
            Arc::new(move |scope, args| Ok(Arc::new(build(scope, args)?) as AnyArc));
        Self::new(
            ServiceType::of::<T>(),
            lifetime,
            FactorySource::Planned {
                signature: Arc::new(signature),
                build,
            },
        )
    }

    /// A planned provider with an asynchronous constructor.
    pub(crate) fn planned_async<T, F>(lifetime: Lifetime, signature: Signature, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: AsyncAssembler<T> + 'static,
    {
        let adapter = AssemblerAdapter {
            inner: build,
            _marker: PhantomData,
        };
        Self::new(
            ServiceType::of::<T>(),
            lifetime,
            FactorySource::PlannedAsync {
                signature: Arc::new(signature),
                build: Arc::new(adapter),
            },
        )
    }

    pub(crate) fn with_binding_index(mut self, index: u32) -> Self {
        self.binding_index = index;
        self
    }

    pub(crate) fn service(&self) -> ServiceType {
        self.service
    }

    pub(crate) fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Whether this provider's construction must run in an async context.
    pub(crate) fn requires_async(&self) -> bool {
        matches!(
            self.source,
            FactorySource::Async(_) | FactorySource::PlannedAsync { .. }
        )
    }

    /// Scoped cache key: the provider's own declared type plus binding
    /// index, never the requested or alias type.
    fn cache_key(&self) -> (std::any::TypeId, u32) {
        (self.service.id(), self.binding_index)
    }

    /// Produces one instance synchronously, ignoring lifetime caching.
    fn produce(&self, scope: &ActivationScope, requested: ServiceType) -> DiResult<AnyArc> {
        match &self.source {
            FactorySource::Value(value) => Ok(value.clone()),
            FactorySource::Sync(ctor) => ctor(scope, requested),
            FactorySource::Planned { signature, build } => {
                let args = scope.resolve_parameters(self.service, signature)?;
                build(scope, args)
            }
            FactorySource::Async(_) | FactorySource::PlannedAsync { .. } => {
                Err(DiError::AsyncContextRequired(self.service.name()))
            }
        }
    }

    /// Produces one instance, awaiting async factories and resolving planned
    /// parameters through the suspension-capable path.
    async fn produce_async(
        &self,
        scope: &ActivationScope,
        requested: ServiceType,
    ) -> DiResult<AnyArc> {
        match &self.source {
            FactorySource::Value(value) => Ok(value.clone()),
            // Synchronous factories are invoked directly; no suspension needed.
            FactorySource::Sync(ctor) => ctor(scope, requested),
            FactorySource::Planned { signature, build } => {
                let args = scope.resolve_parameters_async(self.service, signature).await?;
                build(scope, args)
            }
            FactorySource::Async(factory) => factory.create(scope, requested).await,
            FactorySource::PlannedAsync { signature, build } => {
                let args = scope.resolve_parameters_async(self.service, signature).await?;
                build.assemble(scope, args).await
            }
        }
    }

    /// Invokes the provider on the synchronous path, applying its lifetime
    /// contract.
    pub(crate) fn invoke(
        &self,
        scope: &ActivationScope,
        requested: ServiceType,
    ) -> DiResult<AnyArc> {
        if self.requires_async() {
            return Err(DiError::AsyncContextRequired(self.service.name()));
        }
        match self.lifetime {
            Lifetime::Instance | Lifetime::Transient => self.produce(scope, requested),
            Lifetime::Scoped => {
                if let Some(hit) = scope.scoped_get(self.service, self.cache_key())? {
                    tracing::trace!(service = self.service.name(), "scoped cache hit");
                    return Ok(hit);
                }
                let value = self.produce(scope, requested)?;
                Ok(scope.scoped_insert(self.cache_key(), value))
            }
            Lifetime::Singleton => {
                // OnceCell serializes concurrent initializers, so the
                // factory runs at most once for the container's lifetime.
                let slot = self.slot.as_ref().expect("singleton provider has a slot");
                slot.get_or_try_init(|| self.produce(scope, requested))
                    .map(Arc::clone)
            }
        }
    }

    /// Invokes the provider on the asynchronous path.
    pub(crate) fn invoke_async<'a>(
        &'a self,
        scope: &'a ActivationScope,
        requested: ServiceType,
    ) -> BoxFuture<'a, DiResult<AnyArc>> {
        Box::pin(async move {
            match self.lifetime {
                Lifetime::Instance | Lifetime::Transient => {
                    self.produce_async(scope, requested).await
                }
                Lifetime::Scoped => {
                    if let Some(hit) = scope.scoped_get(self.service, self.cache_key())? {
                        tracing::trace!(service = self.service.name(), "scoped cache hit");
                        return Ok(hit);
                    }
                    let value = self.produce_async(scope, requested).await?;
                    Ok(scope.scoped_insert(self.cache_key(), value))
                }
                Lifetime::Singleton => {
                    let slot = self.slot.as_ref().expect("singleton provider has a slot");
                    if let Some(value) = slot.get() {
                        return Ok(value.clone());
                    }
                    // Double-checked behind the async gate: only one task
                    // awaits the factory, the rest observe the filled slot.
                    let _gate = self.async_init.lock().await;
                    if let Some(value) = slot.get() {
                        return Ok(value.clone());
                    }
                    let value = self.produce_async(scope, requested).await?;
                    Ok(slot.get_or_init(|| value).clone())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn async_capability_marker() {
        let sync = Provider::from_factory::<u32>(
            Lifetime::Transient,
            Factory::NoArgs(Box::new(|| Ok(1u32))),
        )
        .unwrap();
        assert!(!sync.requires_async());

        let asynchronous =
            Provider::from_async::<u32, _>(Lifetime::Transient, || async { Ok(2u32) });
        assert!(asynchronous.requires_async());
    }

    #[test]
    fn only_singletons_carry_a_slot() {
        let transient = Provider::from_factory::<u32>(
            Lifetime::Transient,
            Factory::NoArgs(Box::new(|| Ok(1u32))),
        )
        .unwrap();
        assert!(transient.slot.is_none());

        let singleton = Provider::from_factory::<u32>(
            Lifetime::Singleton,
            Factory::NoArgs(Box::new(|| Ok(1u32))),
        )
        .unwrap();
        assert!(singleton.slot.is_some());
    }

    #[test]
    fn resolved_args_lookup() {
        let args = ResolvedArgs::new(vec![
            ("db", Some(Arc::new(41usize) as AnyArc)),
            ("cache", None),
        ]);
        assert_eq!(*args.required::<usize>("db").unwrap(), 41);
        assert!(args.optional::<usize>("cache").unwrap().is_none());
        assert!(args.required::<usize>("missing").is_err());
        assert!(matches!(
            args.required::<String>("db"),
            Err(DiError::TypeMismatch(_))
        ));
    }
}
