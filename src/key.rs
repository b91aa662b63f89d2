//! Service identity types for the dependency injection container.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Identity of a resolvable service type.
///
/// Pairs a `TypeId` with the `std::any::type_name` of the type for
/// diagnostics. Equality and hashing use the `TypeId` alone, so two
/// `ServiceType` values for the same Rust type are always equal regardless of
/// how the name was rendered.
///
/// Works for concrete types and for trait object types (`dyn Trait`), since
/// both have a `TypeId` when `'static`.
///
/// # Examples
///
/// ```rust
/// use weld_di::ServiceType;
///
/// let a = ServiceType::of::<String>();
/// let b = ServiceType::of::<String>();
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "alloc::string::String");
///
/// trait Logger: Send + Sync {}
/// let t = ServiceType::of::<dyn Logger>();
/// assert!(t.name().contains("Logger"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    /// The service type for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The human-readable type name, for diagnostics and error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Identity is the TypeId; the name is carried for display only.
impl PartialEq for ServiceType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl std::hash::Hash for ServiceType {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Key identifying a requested service: an exact type, or a named alias
/// bound to an already-registered type.
///
/// A registry guarantees at most one provider per exact key; multi-binding
/// ("all implementations of interface X") is a separate, append-only store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    /// Request by exact type identity.
    Type(ServiceType),
    /// Request by alias name; translated to its bound type before resolution.
    Alias(Arc<str>),
}

impl ServiceKey {
    /// The display name of the key, for error messages.
    pub fn display_name(&self) -> &str {
        match self {
            ServiceKey::Type(ty) => ty.name(),
            ServiceKey::Alias(name) => name,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equality_ignores_name_rendering() {
        let a = ServiceType::of::<u32>();
        let b = ServiceType::of::<u32>();
        assert_eq!(a, b);
        assert_ne!(a, ServiceType::of::<u64>());
    }

    #[test]
    fn usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(ServiceType::of::<String>(), 1);
        map.insert(ServiceType::of::<usize>(), 2);
        assert_eq!(map.get(&ServiceType::of::<String>()), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn trait_object_types_have_identity() {
        trait Marker {}
        let a = ServiceType::of::<dyn Marker>();
        let b = ServiceType::of::<dyn Marker>();
        assert_eq!(a, b);
    }

    #[test]
    fn key_display() {
        let key = ServiceKey::Alias("db".into());
        assert_eq!(key.to_string(), "db");
        let key = ServiceKey::Type(ServiceType::of::<u8>());
        assert_eq!(key.to_string(), "u8");
    }
}
