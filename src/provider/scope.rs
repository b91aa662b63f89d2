//! Activation scopes and the recursive resolution engine.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::container::ContainerInner;
use crate::descriptors::{ParamShape, Signature};
use crate::error::{DiError, DiResult};
use crate::internal::{AnyArc, BoxFuture, ResolutionChain};
use crate::key::ServiceType;
use crate::provider::ResolvedArgs;

/// A resolution context carrying the scoped instance cache and the
/// in-flight resolution chain.
///
/// Create one per unit of work (a request, a job) with
/// [`Container::create_scope`](crate::Container::create_scope); scoped
/// providers then yield one shared instance per scope. Scopes are cheap and
/// independent: nothing resolved in one scope is visible to another, except
/// singletons, which live on the container.
///
/// # Examples
///
/// ```rust
/// use weld_di::ContainerBuilder;
///
/// #[derive(Clone)]
/// struct RequestId(u64);
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_scoped_factory::<RequestId, _>(|_| Ok(RequestId(7)))?;
/// let container = builder.build();
///
/// let scope = container.create_scope();
/// let a = scope.get::<RequestId>()?;
/// let b = scope.get::<RequestId>()?;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # Ok::<(), weld_di::DiError>(())
/// ```
pub struct ActivationScope {
    container: Arc<ContainerInner>,
    /// `None` when scoped caching is unavailable in this context; a scoped
    /// provider then fails with [`DiError::ScopedServicesUnavailable`].
    scoped: Option<Mutex<HashMap<(TypeId, u32), AnyArc>>>,
    chain: ResolutionChain,
}

impl ActivationScope {
    pub(crate) fn new(container: Arc<ContainerInner>, with_cache: bool) -> Self {
        Self {
            container,
            scoped: if with_cache {
                Some(Mutex::new(HashMap::new()))
            } else {
                None
            },
            chain: ResolutionChain::new(),
        }
    }

    // ---- scoped cache ----

    pub(crate) fn scoped_get(
        &self,
        service: ServiceType,
        key: (TypeId, u32),
    ) -> DiResult<Option<AnyArc>> {
        match &self.scoped {
            Some(cache) => Ok(cache.lock().unwrap().get(&key).cloned()),
            None => Err(DiError::ScopedServicesUnavailable(service.name())),
        }
    }

    /// Inserts a freshly built scoped instance, first write wins. The lock
    /// is never held across a factory call, so if two threads race on the
    /// same scope both factories may run; both then observe the same stored
    /// value.
    pub(crate) fn scoped_insert(&self, key: (TypeId, u32), value: AnyArc) -> AnyArc {
        let cache = self
            .scoped
            .as_ref()
            .expect("scoped_insert follows a successful scoped_get");
        let mut cache = cache.lock().unwrap();
        cache.entry(key).or_insert(value).clone()
    }

    // ---- erased resolution engine ----

    /// Resolves `ty` through its registered (or synthesized) provider,
    /// guarding against cycles.
    pub(crate) fn resolve_type(&self, ty: ServiceType) -> DiResult<AnyArc> {
        let provider = self
            .container
            .lookup_provider(&ty)
            .ok_or_else(|| DiError::TypeUnresolvable(ty.name().to_string()))?;
        let _guard = self.chain.enter(ty)?;
        tracing::trace!(service = ty.name(), lifetime = ?provider.lifetime(), "resolving");
        provider.invoke(self, ty)
    }

    /// Async counterpart of [`resolve_type`](Self::resolve_type). Boxed so
    /// the recursion through planned providers has a finite future type.
    pub(crate) fn resolve_type_async(&self, ty: ServiceType) -> BoxFuture<'_, DiResult<AnyArc>> {
        Box::pin(async move {
            let provider = self
                .container
                .lookup_provider(&ty)
                .ok_or_else(|| DiError::TypeUnresolvable(ty.name().to_string()))?;
            let _guard = self.chain.enter(ty)?;
            tracing::trace!(service = ty.name(), lifetime = ?provider.lifetime(), "resolving");
            provider.invoke_async(self, ty).await
        })
    }

    /// Resolves every multi-bound provider of `ty`, in registration order.
    pub(crate) fn resolve_type_all(&self, ty: ServiceType) -> DiResult<Vec<AnyArc>> {
        let providers = self.container.providers_for_all(&ty);
        let _guard = self.chain.enter(ty)?;
        let mut values = Vec::with_capacity(providers.len());
        for provider in &providers {
            values.push(provider.invoke(self, ty)?);
        }
        Ok(values)
    }

    // ---- parameter resolution for planned providers ----

    /// Resolves a planned provider's declared parameters, strictly left to
    /// right.
    pub(crate) fn resolve_parameters(
        &self,
        owner: ServiceType,
        signature: &Signature,
    ) -> DiResult<ResolvedArgs> {
        let mut values = Vec::with_capacity(signature.len());
        for param in signature.params() {
            let value = match param.shape() {
                ParamShape::Concrete(ty) => {
                    match self.resolve_type(*ty) {
                        Ok(value) => Some(value),
                        Err(err) => param_failure(owner, param.name(), param.has_default(), err)?,
                    }
                }
                ParamShape::Optional(_) | ParamShape::OneOf(_) => {
                    return Err(DiError::UnsupportedParameterShape {
                        owner: owner.name(),
                        param: param.name(),
                    });
                }
                ParamShape::Deferred => {
                    return Err(DiError::MissingFactoryContext {
                        owner: owner.name(),
                        param: param.name(),
                    });
                }
            };
            values.push((param.name(), value));
        }
        Ok(ResolvedArgs::new(values))
    }

    /// Async counterpart of [`resolve_parameters`](Self::resolve_parameters).
    pub(crate) async fn resolve_parameters_async(
        &self,
        owner: ServiceType,
        signature: &Signature,
    ) -> DiResult<ResolvedArgs> {
        let mut values = Vec::with_capacity(signature.len());
        for param in signature.params() {
            let value = match param.shape() {
                ParamShape::Concrete(ty) => {
                    match self.resolve_type_async(*ty).await {
                        Ok(value) => Some(value),
                        Err(err) => param_failure(owner, param.name(), param.has_default(), err)?,
                    }
                }
                ParamShape::Optional(_) | ParamShape::OneOf(_) => {
                    return Err(DiError::UnsupportedParameterShape {
                        owner: owner.name(),
                        param: param.name(),
                    });
                }
                ParamShape::Deferred => {
                    return Err(DiError::MissingFactoryContext {
                        owner: owner.name(),
                        param: param.name(),
                    });
                }
            };
            values.push((param.name(), value));
        }
        Ok(ResolvedArgs::new(values))
    }

    // ---- typed surface ----

    /// Resolves `T` within this scope.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let value = self.resolve_type(ServiceType::of::<T>())?;
        downcast_concrete(value)
    }

    /// Resolves `T`, panicking on failure. Intended for application startup
    /// paths where a missing registration is a programming error.
    pub fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        match self.get::<T>() {
            Ok(value) => value,
            Err(err) => panic!("required service {}: {}", std::any::type_name::<T>(), err),
        }
    }

    /// Resolves a trait object registered with one of the trait entry
    /// points.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let value = self.resolve_type(ServiceType::of::<T>())?;
        downcast_trait::<T>(value)
    }

    /// Resolves all multi-bound implementations of trait `T`, in
    /// registration order.
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_type_all(ServiceType::of::<T>())?
            .into_iter()
            .map(downcast_trait::<T>)
            .collect()
    }

    /// Resolves `T`, awaiting async providers along the path.
    pub async fn aget<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let value = self.resolve_type_async(ServiceType::of::<T>()).await?;
        downcast_concrete(value)
    }

    /// Async counterpart of [`get_trait`](Self::get_trait).
    pub async fn aget_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let value = self.resolve_type_async(ServiceType::of::<T>()).await?;
        downcast_trait::<T>(value)
    }
}

pub(crate) fn downcast_concrete<T: Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

pub(crate) fn downcast_trait<T: ?Sized + Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast::<Arc<T>>()
        .map(|wrapped| (*wrapped).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// Applies the wrapping policy for a failed parameter resolution.
///
/// Cycle, depth, and async-context errors describe the resolution process
/// itself and pass through untouched. An unresolvable dependency with a
/// declared default yields a skip. Everything else is wrapped so the error
/// names the owning factory and parameter.
fn param_failure(
    owner: ServiceType,
    param: &'static str,
    has_default: bool,
    err: DiError,
) -> DiResult<Option<AnyArc>> {
    match err {
        DiError::CircularDependency { .. }
        | DiError::DepthExceeded(_)
        | DiError::AsyncContextRequired(_) => Err(err),
        DiError::TypeUnresolvable(_) if has_default => Ok(None),
        other => Err(DiError::ParameterUnresolvable {
            owner: owner.name(),
            param,
            source: Box::new(other),
        }),
    }
}
