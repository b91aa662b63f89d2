//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use weld_di::{ContainerBuilder, DiResult};
///
/// struct Config { port: u16 }
/// struct Session { id: u32 }
///
/// # fn main() -> DiResult<()> {
/// let mut builder = ContainerBuilder::new();
/// builder.add_instance(Config { port: 8080 })?;
/// builder.add_scoped_factory::<Session, _>(|_| Ok(Session { id: 7 }))?;
/// let container = builder.build();
///
/// // Instance: the same pre-built value every time.
/// let a = container.resolve::<Config>()?;
/// let b = container.resolve::<Config>()?;
/// assert!(Arc::ptr_eq(&a, &b));
///
/// // Scoped: one per activation scope.
/// let scope = container.create_scope();
/// let s1 = container.resolve_in::<Session>(&scope)?;
/// let s2 = container.resolve_in::<Session>(&scope)?;
/// assert!(Arc::ptr_eq(&s1, &s2));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// A pre-built value registered up front; the factory is never invoked.
    Instance,
    /// A new instance on every resolution, never cached.
    Transient,
    /// One instance per activation scope, cached for the scope's duration.
    ///
    /// The cache is keyed by the provider's declared type, not the requested
    /// or alias type, so aliases sharing one scoped provider share one
    /// cached instance.
    Scoped,
    /// One instance per container, cached on the provider forever.
    ///
    /// The first caller to observe an empty slot invokes the factory; all
    /// later calls, from any scope or thread, return the stored instance.
    Singleton,
}
