//! Cross-component walkthrough: registry mutations, the trail they leave,
//! and the envelope the presentation layer sees.

use masterdata::{
    ActorContext, AuditAction, AuditLog, AuditOutbox, AuditQuery, EntityRef, Envelope, Error,
    ErrorKind, FieldSpec, ListFilter, MemoryStore, RecordSchema, Registry, Series, TenantKey,
    Value, DELETION_SENTINEL,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn tenant() -> TenantKey {
    TenantKey::new("acme", "lab-1")
}

fn actor() -> ActorContext {
    ActorContext::new("alice")
}

fn chemicals_schema() -> RecordSchema {
    RecordSchema::new("chemicals")
        .with_field(FieldSpec::string("cas_number").required())
        .with_field(FieldSpec::string("grade"))
        .with_field(FieldSpec::boolean("is_active"))
}

fn setup() -> (Arc<MemoryStore>, Arc<AuditOutbox>, Registry) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(AuditOutbox::new(AuditLog::new(store.clone())));
    let registry = Registry::new(store.clone(), outbox.clone(), chemicals_schema());
    (store, outbox, registry)
}

fn acetone_attrs() -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    attrs.insert("cas_number".to_string(), Value::String("67-64-1".into()));
    attrs.insert("is_active".to_string(), Value::Bool(true));
    attrs
}

#[test]
fn lifecycle_leaves_a_complete_trail() {
    let (_, outbox, registry) = setup();

    let record = registry
        .create(&tenant(), &actor(), "Acetone", acetone_attrs())
        .unwrap();

    let mut patch = BTreeMap::new();
    patch.insert("grade".to_string(), Value::String("HPLC".into()));
    registry.update(&tenant(), &actor(), record.id, patch).unwrap();

    registry.delete(&tenant(), &actor(), record.id).unwrap();

    let history = outbox
        .log()
        .query(
            &tenant(),
            &AuditQuery {
                entity: Some(EntityRef::new("chemicals", record.id)),
                ..Default::default()
            },
        )
        .unwrap();

    let actions: Vec<AuditAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Create, AuditAction::Update, AuditAction::Delete]
    );

    // CREATE: every field from Null
    assert!(history[0].field_diffs.iter().all(|d| d.old_value == Value::Null));
    // UPDATE: exactly the changed field
    assert_eq!(history[1].field_diffs.len(), 1);
    assert_eq!(history[1].field_diffs[0].field, "grade");
    // DELETE: full prior record into the sentinel
    let sentinel = Value::String(DELETION_SENTINEL.to_string());
    assert!(history[2].field_diffs.iter().all(|d| d.new_value == sentinel));
}

#[test]
fn audit_date_filter_is_calendar_day_granular() {
    let (_, outbox, registry) = setup();
    registry
        .create(&tenant(), &actor(), "Acetone", acetone_attrs())
        .unwrap();

    let today = chrono::Utc::now().date_naive();
    let on_today = outbox
        .log()
        .query(
            &tenant(),
            &AuditQuery {
                on_date: Some(today),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(on_today.len(), 1);

    let on_tomorrow = outbox
        .log()
        .query(
            &tenant(),
            &AuditQuery {
                on_date: Some(today + chrono::Duration::days(1)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(on_tomorrow.is_empty());
}

#[test]
fn search_spans_fields_values_and_actors() {
    let (_, outbox, registry) = setup();
    let record = registry
        .create(&tenant(), &actor(), "Acetone", acetone_attrs())
        .unwrap();
    let mut patch = BTreeMap::new();
    patch.insert("grade".to_string(), Value::String("HPLC".into()));
    registry
        .update(&tenant(), &ActorContext::new("bob"), record.id, patch)
        .unwrap();

    let search = |text: &str| {
        outbox
            .log()
            .query(
                &tenant(),
                &AuditQuery {
                    search_text: Some(text.to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
    };

    assert_eq!(search("hplc").len(), 1, "new value, case-insensitive");
    assert_eq!(search("bob").len(), 1, "actor id");
    assert_eq!(search("acetone").len(), 2, "entity name hits both entries");
    assert_eq!(search("cas_number").len(), 1, "field name");
}

#[test]
fn audit_entries_survive_only_in_their_tenant() {
    let (_, outbox, registry) = setup();
    let lab2 = TenantKey::new("acme", "lab-2");
    registry
        .create(&tenant(), &actor(), "Acetone", acetone_attrs())
        .unwrap();
    registry
        .create(&lab2, &actor(), "Methanol", acetone_attrs())
        .unwrap();

    let mine = outbox.log().query(&tenant(), &AuditQuery::default()).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].entity_name, "Acetone");
}

#[test]
fn list_reports_dropped_rows_instead_of_failing() {
    let (store, _, registry) = setup();
    registry
        .create(&tenant(), &actor(), "Acetone", acetone_attrs())
        .unwrap();

    // A foreign-tenant record smuggled under this tenant's keyspace
    use masterdata::{Key, MasterRecord, RecordId, RecordStore};
    let foreign = MasterRecord::new(
        TenantKey::new("zenith", "hq"),
        "Smuggled",
        acetone_attrs(),
        "mallory",
    );
    let payload = Value::String(serde_json::to_string(&foreign).unwrap());
    store
        .insert_new(Key::new_record(tenant(), "chemicals", &foreign.id), payload)
        .unwrap();
    store
        .insert_new(
            Key::new_record(tenant(), "chemicals", &RecordId::new()),
            Value::String("{broken".into()),
        )
        .unwrap();

    let outcome = registry.list(&tenant(), None).unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.dropped, 2);
}

#[test]
fn list_filter_narrows_by_name() {
    let (_, _, registry) = setup();
    for name in ["Acetone", "Acetonitrile", "Methanol"] {
        registry
            .create(&tenant(), &actor(), name, acetone_attrs())
            .unwrap();
    }
    let outcome = registry
        .list(
            &tenant(),
            Some(&ListFilter {
                name_contains: Some("ACETO".to_string()),
            }),
        )
        .unwrap();
    let names: Vec<&str> = outcome.records.iter().map(|r| r.natural_key.as_str()).collect();
    assert_eq!(names, vec!["Acetone", "Acetonitrile"]);
}

#[test]
fn envelope_maps_success_and_failure() {
    let (_, _, registry) = setup();

    let created: Envelope<_> = registry
        .create(&tenant(), &actor(), "Acetone", acetone_attrs())
        .into();
    assert!(created.success);
    assert!(created.data.is_some());

    let duplicate: Envelope<_> = registry
        .create(&tenant(), &actor(), "acetone", acetone_attrs())
        .into();
    assert!(!duplicate.success);
    assert_eq!(duplicate.kind, Some(ErrorKind::Conflict));
    assert_eq!(
        duplicate.error.as_deref(),
        Some("chemicals 'acetone' already exists")
    );
}

#[test]
fn envelope_surfaces_series_errors_verbatim() {
    use masterdata::{AuditLog, ResetFrequency, SeriesDraft, SeriesEngine};

    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(AuditOutbox::new(AuditLog::new(store.clone())));
    let engine = SeriesEngine::new(store, outbox);

    let result: Result<Series, Error> = engine.create(
        &tenant(),
        &actor(),
        &SeriesDraft {
            name: "Invoice".into(),
            prefix: "INV-".into(),
            suffix: String::new(),
            current_number: 10,
            end_number: 5,
            padding: 3,
            reset_frequency: ResetFrequency::None,
            is_active: true,
        },
    );
    let env: Envelope<Series> = result.into();
    assert_eq!(
        env.error.as_deref(),
        Some("End Number must not be less than Current Number")
    );
    assert_eq!(env.kind, Some(ErrorKind::Validation));
}
