//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use workspace_model_foundation::{
    EntityId, Error, ErrorContext, ErrorKind, FieldType, PersistentId, Value,
};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_missing_required_field() {
    let err = Error::missing_required_field("ModuleEntity", "name");
    assert!(matches!(
        err.kind,
        ErrorKind::MissingRequiredField { ref entity_type, ref field }
            if entity_type == "ModuleEntity" && field == "name"
    ));
    assert_eq!(
        err.to_string(),
        "field ModuleEntity#name should be initialized"
    );
}

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch("ModuleEntity", "name", FieldType::String, "int".to_string());
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    let msg = err.to_string();
    assert!(msg.contains("string"));
    assert!(msg.contains("int"));
}

#[test]
fn error_entity_not_found() {
    let err = Error::entity_not_found(EntityId::new(42, 1));
    assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
    assert!(err.to_string().contains("42"));
}

#[test]
fn error_stale_entity() {
    let id = EntityId::new(5, 3);
    let err = Error::stale_entity(id);
    assert!(matches!(err.kind, ErrorKind::StaleEntity(stale) if stale == id));
}

#[test]
fn error_duplicate_persistent_id() {
    let pid = PersistentId::new("ModuleId", [Value::from("core")]);
    let err = Error::duplicate_persistent_id(pid.clone());
    assert!(matches!(err.kind, ErrorKind::DuplicatePersistentId(ref dup) if *dup == pid));
    assert!(err.to_string().contains("ModuleId(core)"));
}

#[test]
fn error_builder_state() {
    assert!(matches!(
        Error::frozen_entity("ModuleEntity").kind,
        ErrorKind::FrozenEntity { .. }
    ));
    assert!(matches!(
        Error::cross_builder("ModuleEntity").kind,
        ErrorKind::CrossBuilderEntity { .. }
    ));
    assert!(matches!(
        Error::unresolved_parent_list("SourceRootEntity", "module").kind,
        ErrorKind::UnresolvedParentList { .. }
    ));
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn frames_accumulate_innermost_first() {
    let err = Error::unknown_field("ModuleEntity", "nmae")
        .in_frame("set")
        .in_frame("modify_entity");
    let context = err.context.unwrap();
    assert_eq!(context.stack, vec!["set", "modify_entity"]);
}

#[test]
fn context_replaces_existing() {
    let err = Error::internal("boom")
        .in_frame("first")
        .with_context(ErrorContext::new().with_entity_type("LibraryEntity"));
    let context = err.context.unwrap();
    assert_eq!(context.entity_type.as_deref(), Some("LibraryEntity"));
    assert!(context.stack.is_empty());
}

#[test]
fn context_display_names_entity() {
    let context = ErrorContext::new()
        .with_entity_type("ModuleEntity")
        .with_entity(EntityId::new(7, 1))
        .with_frame("add_entity");
    let text = context.to_string();
    assert!(text.starts_with("in ModuleEntity EntityId(7v1)"));
    assert!(text.contains("in add_entity"));
}

#[test]
fn error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&Error::unknown_entity_type("Nope"));
}
