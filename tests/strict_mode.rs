//! Strict mode, overrides, and implicit construction.

use std::sync::Arc;

use weld_di::{ContainerBuilder, DiError};

#[derive(Default)]
struct Settings {
    verbose: bool,
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut builder = ContainerBuilder::new();
    builder.add_instance(Settings::default()).unwrap();
    match builder.add_instance(Settings::default()) {
        Err(DiError::DuplicateRegistration(key)) => assert!(key.contains("Settings")),
        other => panic!("expected DuplicateRegistration, got {:?}", other.err()),
    }
}

#[test]
fn overrides_replace_the_earlier_registration() {
    let mut builder = ContainerBuilder::new();
    builder.allow_overrides();
    builder.add_instance(Settings { verbose: false }).unwrap();
    builder.add_instance(Settings { verbose: true }).unwrap();
    let container = builder.build();

    let settings = container.resolve::<Settings>().unwrap();
    assert!(settings.verbose);
}

#[test]
fn implicit_construction_uses_default() {
    let container = ContainerBuilder::new().build();
    assert!(container.resolve::<Settings>().is_err());

    let settings = container.resolve_or_construct::<Settings>().unwrap();
    assert!(!settings.verbose);
}

#[test]
fn implicit_construction_is_transient() {
    let container = ContainerBuilder::new().build();
    let a = container.resolve_or_construct::<Settings>().unwrap();
    let b = container.resolve_or_construct::<Settings>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn synthesized_registration_serves_later_resolutions() {
    let container = ContainerBuilder::new().build();
    container.resolve_or_construct::<Settings>().unwrap();

    // The one-off registration is now visible to the plain entry points.
    assert!(container.can_resolve::<Settings>());
    assert!(container.resolve::<Settings>().is_ok());
}

#[test]
fn strict_mode_never_synthesizes() {
    let mut builder = ContainerBuilder::new();
    builder.strict();
    let container = builder.build();

    match container.resolve_or_construct::<Settings>() {
        Err(DiError::StrictModeViolation(name)) => assert!(name.contains("Settings")),
        other => panic!("expected StrictModeViolation, got {:?}", other.err()),
    }
    assert!(!container.can_resolve::<Settings>());
}

#[test]
fn strict_mode_still_resolves_explicit_registrations() {
    let mut builder = ContainerBuilder::new();
    builder.strict();
    builder.add_instance(Settings { verbose: true }).unwrap();
    let container = builder.build();

    let via_construct = container.resolve_or_construct::<Settings>().unwrap();
    assert!(via_construct.verbose);
}
