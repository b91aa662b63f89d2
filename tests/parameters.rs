//! Planned providers: declared signatures, resolution order, and the
//! parameter error policy.

use std::sync::{Arc, Mutex};

use weld_di::{
    ContainerBuilder, DiError, Lifetime, ParamShape, Parameter, ServiceType, Signature,
};

struct Database {
    url: String,
}

struct Cache;

struct App {
    db: Arc<Database>,
    cache: Option<Arc<Cache>>,
}

#[test]
fn planned_provider_receives_resolved_arguments() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_instance(Database {
            url: "primary".into(),
        })
        .unwrap();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new()
                .with(Parameter::of::<Database>("db"))
                .with(Parameter::of::<Cache>("cache").or_default()),
            |_, args| {
                Ok(App {
                    db: args.required::<Database>("db")?,
                    cache: args.optional::<Cache>("cache")?,
                })
            },
        )
        .unwrap();
    let container = builder.build();

    let app = container.resolve::<App>().unwrap();
    assert_eq!(app.db.url, "primary");
    // Cache is unregistered but declared with a default, so it was skipped.
    assert!(app.cache.is_none());
}

#[test]
fn parameters_resolve_left_to_right() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut builder = ContainerBuilder::new();
    let seen = order.clone();
    builder
        .add_transient_factory::<Database, _>(move |_| {
            seen.lock().unwrap().push("db");
            Ok(Database { url: "x".into() })
        })
        .unwrap();
    let seen = order.clone();
    builder
        .add_transient_factory::<Cache, _>(move |_| {
            seen.lock().unwrap().push("cache");
            Ok(Cache)
        })
        .unwrap();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new()
                .with(Parameter::of::<Database>("db"))
                .with(Parameter::of::<Cache>("cache")),
            |_, args| {
                Ok(App {
                    db: args.required::<Database>("db")?,
                    cache: Some(args.required::<Cache>("cache")?),
                })
            },
        )
        .unwrap();
    let container = builder.build();

    container.resolve::<App>().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["db", "cache"]);
}

#[test]
fn missing_dependency_names_owner_and_parameter() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::of::<Database>("db")),
            |_, args| {
                Ok(App {
                    db: args.required::<Database>("db")?,
                    cache: None,
                })
            },
        )
        .unwrap();
    let container = builder.build();

    match container.resolve::<App>() {
        Err(DiError::ParameterUnresolvable {
            owner,
            param,
            source,
        }) => {
            assert!(owner.contains("App"));
            assert_eq!(param, "db");
            assert!(matches!(*source, DiError::TypeUnresolvable(_)));
        }
        other => panic!("expected ParameterUnresolvable, got {:?}", other.err()),
    }
}

#[test]
fn optional_shape_is_rejected() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::optional::<Database>("db")),
            |_, _| unreachable!("the factory must not run"),
        )
        .unwrap();
    let container = builder.build();

    match container.resolve::<App>() {
        Err(DiError::UnsupportedParameterShape { owner, param }) => {
            assert!(owner.contains("App"));
            assert_eq!(param, "db");
        }
        other => panic!("expected UnsupportedParameterShape, got {:?}", other.err()),
    }
}

#[test]
fn union_shape_is_rejected() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::one_of(
                "store",
                vec![ServiceType::of::<Database>(), ServiceType::of::<Cache>()],
            )),
            |_, _| unreachable!("the factory must not run"),
        )
        .unwrap();
    let container = builder.build();

    assert!(matches!(
        container.resolve::<App>(),
        Err(DiError::UnsupportedParameterShape { .. })
    ));
}

#[test]
fn deferred_shape_requires_definition_context() {
    let mut builder = ContainerBuilder::new();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::deferred("db")),
            |_, _| unreachable!("the factory must not run"),
        )
        .unwrap();
    let container = builder.build();

    match container.resolve::<App>() {
        Err(DiError::MissingFactoryContext { owner, param }) => {
            assert!(owner.contains("App"));
            assert_eq!(param, "db");
        }
        other => panic!("expected MissingFactoryContext, got {:?}", other.err()),
    }
}

#[test]
fn shape_rejection_wins_over_defaults() {
    // A default never rescues an unsupported declaration.
    let mut builder = ContainerBuilder::new();
    builder
        .add_with::<App, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::optional::<Database>("db").or_default()),
            |_, _| unreachable!("the factory must not run"),
        )
        .unwrap();
    let container = builder.build();

    assert!(matches!(
        container.resolve::<App>(),
        Err(DiError::UnsupportedParameterShape { .. })
    ));
}

#[test]
fn cycles_through_planned_providers_stay_unwrapped() {
    struct Left;
    struct Right;

    let mut builder = ContainerBuilder::new();
    builder
        .add_with::<Left, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::of::<Right>("right")),
            |_, _| Ok(Left),
        )
        .unwrap();
    builder
        .add_with::<Right, _>(
            Lifetime::Transient,
            Signature::new().with(Parameter::of::<Left>("left")),
            |_, _| Ok(Right),
        )
        .unwrap();
    let container = builder.build();

    // The cycle surfaces as-is, not buried inside ParameterUnresolvable.
    match container.resolve::<Left>() {
        Err(DiError::CircularDependency { path }) => assert_eq!(path.len(), 3),
        other => panic!("expected CircularDependency, got {:?}", other.err()),
    }
}

#[test]
fn shape_accessors_expose_declarations() {
    let sig = Signature::new()
        .with(Parameter::of::<Database>("db"))
        .with(Parameter::deferred("later").or_default());

    assert_eq!(sig.len(), 2);
    assert!(matches!(sig.params()[0].shape(), ParamShape::Concrete(_)));
    assert!(matches!(sig.params()[1].shape(), ParamShape::Deferred));
    assert!(sig.params()[1].has_default());
}
