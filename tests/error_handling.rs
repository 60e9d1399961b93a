//! Failure-path tests: every error must leave the store untouched and
//! surface as a structured response at the command boundary.

use dynstore::{
    dispatch, respond, AdapterError, ClassSchema, CommandArgs, FieldKind, FieldSchema,
    MemoryEngine, Outcome, PredicateTerm, Response, StoreConfig, StoreRegistry, Value,
};

fn setup() -> StoreRegistry {
    let (registry, _events) = StoreRegistry::new(MemoryEngine::new());
    let args = CommandArgs {
        store_id: Some("primary".into()),
        config: Some(StoreConfig::in_memory(
            "error-tests",
            vec![ClassSchema::new(
                "Recording",
                vec![
                    FieldSchema::scalar("title", FieldKind::String),
                    FieldSchema::scalar("durationSeconds", FieldKind::Int),
                ],
            )],
        )),
        ..Default::default()
    };
    dispatch(&registry, "initialize", &args).unwrap();
    registry
}

fn args() -> CommandArgs {
    CommandArgs {
        store_id: Some("primary".into()),
        class_name: Some("Recording".into()),
        ..Default::default()
    }
}

fn count_all(registry: &StoreRegistry) -> usize {
    let mut command = args();
    command.predicate = Some(vec![]);
    match dispatch(registry, "objects", &command).unwrap() {
        Outcome::Results { count, .. } => count,
        other => panic!("expected results, got {:?}", other),
    }
}

#[test]
fn test_update_nonexistent_record() {
    let registry = setup();

    let mut command = args();
    command.primary_key = Some("ghost".into());
    command.value = Some(
        [("title".to_string(), Value::from("x"))]
            .into_iter()
            .collect(),
    );
    let err = dispatch(&registry, "updateObject", &command).unwrap_err();
    assert!(matches!(err, AdapterError::RecordNotFound { .. }));
    assert_eq!(
        err.to_string(),
        "Recording not found with primaryKey = ghost"
    );
    assert_eq!(count_all(&registry), 0);
}

#[test]
fn test_duplicate_primary_key_rolls_back() {
    let registry = setup();

    let mut command = args();
    command.uuid = Some("r1".into());
    command.fields = Some(
        [("title".to_string(), Value::from("first"))]
            .into_iter()
            .collect(),
    );
    dispatch(&registry, "createObject", &command).unwrap();

    command.fields = Some(
        [("title".to_string(), Value::from("second"))]
            .into_iter()
            .collect(),
    );
    let err = dispatch(&registry, "createObject", &command).unwrap_err();
    assert!(matches!(err, AdapterError::DuplicateKey { .. }));

    // The first write survives unchanged.
    let mut lookup = args();
    lookup.primary_key = Some("r1".into());
    match dispatch(&registry, "object", &lookup).unwrap() {
        Outcome::Record(record) => {
            assert_eq!(record.get("title"), Some(&Value::from("first")));
        }
        other => panic!("expected record, got {:?}", other),
    }
    assert_eq!(count_all(&registry), 1);
}

#[test]
fn test_bad_field_type_rolls_back_whole_create() {
    let registry = setup();

    let mut command = args();
    command.uuid = Some("r1".into());
    command.fields = Some(
        [
            ("title".to_string(), Value::from("valid")),
            ("durationSeconds".to_string(), Value::from("not an int")),
        ]
        .into_iter()
        .collect(),
    );
    let err = dispatch(&registry, "createObject", &command).unwrap_err();
    assert!(
        matches!(err, AdapterError::UnsupportedFieldType { ref field } if field == "durationSeconds")
    );

    // No partial record: even the valid fields were discarded.
    assert_eq!(count_all(&registry), 0);
}

#[test]
fn test_unknown_operator() {
    let registry = setup();
    let mut command = args();
    command.predicate = Some(vec![PredicateTerm::compare(
        "matchesRegex",
        "title",
        Value::from("x"),
    )]);
    let err = dispatch(&registry, "objects", &command).unwrap_err();
    assert!(matches!(err, AdapterError::UnknownOperator(ref op) if op == "matchesRegex"));
}

#[test]
fn test_operand_type_mismatch() {
    let registry = setup();
    let mut command = args();
    command.predicate = Some(vec![PredicateTerm::compare(
        "lessThan",
        "durationSeconds",
        Value::from("ten"),
    )]);
    let err = dispatch(&registry, "objects", &command).unwrap_err();
    assert!(
        matches!(err, AdapterError::UnsupportedPredicateType { ref operator } if operator == "lessThan")
    );
}

#[test]
fn test_unknown_class() {
    let registry = setup();
    let command = CommandArgs {
        store_id: Some("primary".into()),
        class_name: Some("Phantom".into()),
        subscription_id: Some("sub".into()),
        ..Default::default()
    };
    let err = dispatch(&registry, "subscribeAllObjects", &command).unwrap_err();
    assert!(matches!(err, AdapterError::UnknownClass(ref class) if class == "Phantom"));
}

#[test]
fn test_unsubscribe_without_subscription() {
    let registry = setup();
    let mut command = args();
    command.subscription_id = Some("never-registered".into());
    let err = dispatch(&registry, "unsubscribe", &command).unwrap_err();
    assert!(matches!(err, AdapterError::SubscriptionNotFound(_)));
    assert_eq!(err.to_string(), "Not subscribed: never-registered");
}

#[test]
fn test_store_not_found_on_the_wire() {
    let registry = setup();
    let command = CommandArgs {
        store_id: Some("ghost".into()),
        class_name: Some("Recording".into()),
        ..Default::default()
    };
    let response = respond(&registry, "deleteAllObjects", &command);
    match response {
        Response::Error { kind, message, .. } => {
            assert_eq!(kind, "StoreNotFound");
            assert!(message.contains("ghost"));
        }
        other => panic!("expected error response, got {:?}", other),
    }
}

#[test]
fn test_missing_argument_names_the_field() {
    let registry = setup();
    // createObject without a uuid.
    let mut command = args();
    command.fields = Some(Default::default());
    let err = dispatch(&registry, "createObject", &command).unwrap_err();
    assert!(matches!(err, AdapterError::MissingArgument(ref name) if name == "uuid"));
    assert_eq!(err.to_string(), "No argument: uuid");
}
