//! Factory signatures and registration-time shape validation.
//!
//! The engine does not introspect callables. A configuration layer (or the
//! caller directly) describes a factory's parameter list as a [`Signature`]
//! of [`Parameter`] entries, and the resolver walks that declaration when
//! activating a planned provider. Composite parameter declarations
//! (optional-of, union-of) are representable so they can be detected and
//! rejected; they are never resolved.

use crate::error::{DiError, DiResult};
use crate::key::ServiceType;
use crate::lifetime::Lifetime;

/// The declared shape of a single factory parameter.
#[derive(Debug, Clone)]
pub enum ParamShape {
    /// A single concrete or trait-object type; resolved recursively.
    Concrete(ServiceType),
    /// Declared as optional-of-T. Detected and rejected at resolution with
    /// [`DiError::UnsupportedParameterShape`]; the engine does not guess.
    Optional(ServiceType),
    /// Declared as a union of several types. Rejected like `Optional`.
    OneOf(Vec<ServiceType>),
    /// The declared type could not be determined from the factory's
    /// definition context. Rejected at resolution with
    /// [`DiError::MissingFactoryContext`].
    Deferred,
}

/// One entry of a factory's declared parameter list.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: &'static str,
    shape: ParamShape,
    has_default: bool,
}

impl Parameter {
    /// A parameter of a single concrete (or trait object) type.
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            shape: ParamShape::Concrete(ServiceType::of::<T>()),
            has_default: false,
        }
    }

    /// A parameter declared as optional-of-`T`.
    pub fn optional<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            shape: ParamShape::Optional(ServiceType::of::<T>()),
            has_default: false,
        }
    }

    /// A parameter declared as a union of several types.
    pub fn one_of(name: &'static str, types: Vec<ServiceType>) -> Self {
        Self {
            name,
            shape: ParamShape::OneOf(types),
            has_default: false,
        }
    }

    /// A parameter whose declared type could not be determined.
    pub fn deferred(name: &'static str) -> Self {
        Self {
            name,
            shape: ParamShape::Deferred,
            has_default: false,
        }
    }

    /// Marks the parameter as carrying a default value. An unregistered
    /// dependency is then skipped instead of failing the resolution.
    pub fn or_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// The declared parameter name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared shape.
    pub fn shape(&self) -> &ParamShape {
        &self.shape
    }

    /// Whether the parameter carries a default value.
    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

/// Ordered parameter list of a planned factory.
///
/// Parameters are resolved strictly in declaration order, left to right; a
/// later parameter's resolution never begins before an earlier one completed.
///
/// # Examples
///
/// ```rust
/// use weld_di::{Parameter, Signature};
///
/// struct Database;
/// struct Cache;
///
/// let sig = Signature::new()
///     .with(Parameter::of::<Database>("db"))
///     .with(Parameter::of::<Cache>("cache").or_default());
/// assert_eq!(sig.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    /// An empty signature.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Appends a parameter declaration.
    pub fn with(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// The declared parameters, in order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// The number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters are declared.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// The closed set of accepted factory arities.
///
/// A factory accepts no arguments, exactly a context, or exactly a context
/// and the requested type. Anything else is rejected with
/// [`DiError::InvalidFactoryShape`] before the factory is ever wrapped in a
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryArity {
    /// `fn() -> T`
    NoArgs,
    /// `fn(&ActivationScope) -> T`
    Context,
    /// `fn(&ActivationScope, ServiceType) -> T`
    ContextAndType,
}

impl FactoryArity {
    /// Classifies a raw parameter count as one of the accepted shapes.
    pub fn from_param_count(count: usize) -> DiResult<Self> {
        match count {
            0 => Ok(FactoryArity::NoArgs),
            1 => Ok(FactoryArity::Context),
            2 => Ok(FactoryArity::ContextAndType),
            other => Err(DiError::InvalidFactoryShape(other)),
        }
    }

    /// The raw parameter count for this shape.
    pub fn param_count(&self) -> usize {
        match self {
            FactoryArity::NoArgs => 0,
            FactoryArity::Context => 1,
            FactoryArity::ContextAndType => 2,
        }
    }
}

/// Registration-time description of a factory, as produced by an external
/// configuration layer.
///
/// `validate` performs the shape checks the engine requires before a
/// provider may be constructed: the produced type must be declared, and the
/// arity must be one of the accepted shapes.
#[derive(Debug, Clone)]
pub struct FactoryDescriptor {
    produces: Option<ServiceType>,
    lifetime: Lifetime,
    param_count: usize,
}

impl FactoryDescriptor {
    /// Describes a factory producing `produces` from `param_count` raw
    /// parameters.
    pub fn new(produces: Option<ServiceType>, lifetime: Lifetime, param_count: usize) -> Self {
        Self {
            produces,
            lifetime,
            param_count,
        }
    }

    /// The lifetime the factory was registered under.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Validates the descriptor, yielding the produced type and classified
    /// arity.
    pub fn validate(&self) -> DiResult<(ServiceType, FactoryArity)> {
        let produces = self.produces.ok_or(DiError::MissingReturnType)?;
        let arity = FactoryArity::from_param_count(self.param_count)?;
        Ok((produces, arity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_arities() {
        assert_eq!(FactoryArity::from_param_count(0).unwrap(), FactoryArity::NoArgs);
        assert_eq!(FactoryArity::from_param_count(1).unwrap(), FactoryArity::Context);
        assert_eq!(
            FactoryArity::from_param_count(2).unwrap(),
            FactoryArity::ContextAndType
        );
    }

    #[test]
    fn rejected_arity() {
        match FactoryArity::from_param_count(3) {
            Err(DiError::InvalidFactoryShape(3)) => {}
            other => panic!("expected InvalidFactoryShape, got {:?}", other),
        }
    }

    #[test]
    fn descriptor_requires_return_type() {
        let descriptor = FactoryDescriptor::new(None, Lifetime::Transient, 1);
        match descriptor.validate() {
            Err(DiError::MissingReturnType) => {}
            other => panic!("expected MissingReturnType, got {:?}", other),
        }
    }

    #[test]
    fn descriptor_validates_shape() {
        let descriptor =
            FactoryDescriptor::new(Some(ServiceType::of::<String>()), Lifetime::Singleton, 2);
        let (ty, arity) = descriptor.validate().unwrap();
        assert_eq!(ty, ServiceType::of::<String>());
        assert_eq!(arity, FactoryArity::ContextAndType);
    }

    #[test]
    fn default_marker() {
        let p = Parameter::of::<u32>("port").or_default();
        assert!(p.has_default());
        assert_eq!(p.name(), "port");
    }
}
