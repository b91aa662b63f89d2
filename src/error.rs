//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors.
///
/// Every failure raised during registration or resolution is a configuration
/// defect, not a transient fault: the engine never retries internally, and
/// errors propagate unmodified to the caller of [`resolve`] or [`aresolve`],
/// enriched only with the type/parameter context added as a recursive
/// resolution unwinds.
///
/// [`resolve`]: crate::Container::resolve
/// [`aresolve`]: crate::Container::aresolve
///
/// # Examples
///
/// ```rust
/// use weld_di::{ContainerBuilder, DiError};
///
/// let container = ContainerBuilder::new().build();
/// match container.resolve::<String>() {
///     Err(DiError::TypeUnresolvable(name)) => {
///         assert_eq!(name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No provider can be found or constructed for a requested type or key.
    #[error("unable to resolve the type '{0}'")]
    TypeUnresolvable(String),

    /// While building `owner`, parameter `param` could not be resolved.
    ///
    /// Distinct from [`TypeUnresolvable`](Self::TypeUnresolvable) so the call
    /// chain context is preserved: the caller learns both the failing
    /// parameter and the enclosing type without source inspection.
    #[error("unable to resolve parameter '{param}' when resolving '{owner}': {source}")]
    ParameterUnresolvable {
        owner: &'static str,
        param: &'static str,
        #[source]
        source: Box<DiError>,
    },

    /// A factory parameter is declared as optional-of-T or a union of types.
    /// The engine refuses to guess which variant to supply.
    #[error(
        "optional or union type declaration is not supported; cannot resolve \
         parameter '{param}' when resolving '{owner}'"
    )]
    UnsupportedParameterShape {
        owner: &'static str,
        param: &'static str,
    },

    /// A provider is already registered for this key and overrides are not
    /// allowed.
    #[error("a service with key '{0}' is already registered and would be overridden")]
    DuplicateRegistration(String),

    /// Resolving a type required resolving itself again before the first
    /// resolution completed. Carries the full in-flight chain, cycle last.
    #[error("circular dependency detected: {}", path.join(" -> "))]
    CircularDependency { path: Vec<&'static str> },

    /// Implicit registration of an unregistered concrete type was attempted
    /// while the container is configured in strict mode.
    #[error("the container is configured in strict mode; implicit registration of '{0}' is invalid")]
    StrictModeViolation(&'static str),

    /// An alias with this name is already defined.
    #[error("cannot define alias '{0}': an alias with the given name is already defined")]
    DuplicateAlias(String),

    /// An alias was defined for a type that is not registered in the
    /// container.
    #[error("an alias '{name}' for type '{target}' was defined, but the type is not registered")]
    DanglingAlias {
        name: String,
        target: &'static str,
    },

    /// A factory was registered without declaring the type it produces.
    #[error("the factory does not declare a return type; specify the type it produces")]
    MissingReturnType,

    /// A factory's parameter list matches none of the accepted shapes:
    /// zero-arg, context-only, or (context, requested-type).
    #[error(
        "a factory taking {0} arguments is not valid; it must accept no arguments, \
         a context, or a context and the requested type"
    )]
    InvalidFactoryShape(usize),

    /// A synchronous resolution path encountered a provider that requires
    /// asynchronous construction.
    #[error(
        "cannot resolve '{0}': this dependency requires an async context. \
         Hint: use `container.aresolve()` instead of `container.resolve()`"
    )]
    AsyncContextRequired(&'static str),

    /// A factory parameter's declared type could not be determined from its
    /// definition context (a deferred declaration reached resolution).
    #[error(
        "the declared type of parameter '{param}' of '{owner}' could not be \
         determined from its definition context"
    )]
    MissingFactoryContext {
        owner: &'static str,
        param: &'static str,
    },

    /// A scoped provider was invoked in an activation scope without scoped
    /// storage (the container was built without scoping support).
    #[error("scoped services are not available when resolving '{0}'")]
    ScopedServicesUnavailable(&'static str),

    /// A resolved value failed to downcast to the requested type at the
    /// typed API boundary.
    #[error("type mismatch for '{0}'")]
    TypeMismatch(&'static str),

    /// Maximum resolution depth exceeded.
    #[error("maximum resolution depth {0} exceeded")]
    DepthExceeded(usize),
}

/// Result type for DI operations.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_message_joins_path() {
        let err = DiError::CircularDependency {
            path: vec!["A", "B", "A"],
        };
        assert_eq!(err.to_string(), "circular dependency detected: A -> B -> A");
    }

    #[test]
    fn parameter_error_carries_source() {
        let err = DiError::ParameterUnresolvable {
            owner: "App",
            param: "db",
            source: Box::new(DiError::TypeUnresolvable("Database".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("'db'"));
        assert!(msg.contains("'App'"));
        assert!(msg.contains("Database"));
    }

    #[test]
    fn async_hint_mentions_aresolve() {
        let err = DiError::AsyncContextRequired("Pool");
        assert!(err.to_string().contains("aresolve"));
    }

    #[test]
    fn invalid_shape_reports_arity() {
        let err = DiError::InvalidFactoryShape(3);
        assert!(err.to_string().contains("3 arguments"));
    }
}
