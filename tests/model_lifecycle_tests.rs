mod support;

use std::sync::Arc;

use memomodel::{
    Binder, Entity, EntityState, FieldSpec, FieldSpecRegistry, ModelError, OperationKind, Row,
    Value, model, row_from,
};
use support::{Call, RecordingAdapter};

model! {
    pub struct Counter as "counters" { name, count }
}

model! {
    pub struct Ticket as "tickets" { title, priority, draft }
}

model! {
    pub struct Registered as "registered_counters" { name, count }
}

#[test]
fn fresh_entity_tracks_exactly_the_initial_fields() {
    let ticket = Entity::<Ticket>::new([("title", Value::from("Broken")), ("priority", Value::from(2i64))])
        .unwrap();

    assert_eq!(ticket.state(), EntityState::New);
    assert_eq!(ticket.changed_fields(), vec!["priority", "title"]);
    assert!(!ticket.is_changed("draft"));
}

#[tokio::test]
async fn insert_assigns_identifier_and_clears_changes() {
    let adapter = Arc::new(RecordingAdapter::new("counters"));
    let counters = Binder::<Counter>::new(adapter.clone()).build();

    let mut counter = Entity::<Counter>::new([("name", Value::from("A")), ("count", Value::from(1i64))])
        .unwrap();
    let outcome = counters.save(&mut counter).await.unwrap();

    assert_eq!(outcome.operation, Some(OperationKind::Insert));
    assert!(counter.is_persisted());
    assert_eq!(counter.id(), Some(&Value::Integer(1)));
    assert!(counter.changed_fields().is_empty());
    assert_eq!(
        adapter.writes(),
        vec![Call::Insert(row_from([("count", Value::Integer(1)), ("name", Value::from("A"))]))]
    );
}

#[tokio::test]
async fn unchanged_persisted_entity_skips_dispatch() {
    let adapter = Arc::new(RecordingAdapter::new("counters"));
    let counters = Binder::<Counter>::new(adapter.clone()).build();

    let mut counter = Entity::<Counter>::new([("name", "A")]).unwrap();
    counters.save(&mut counter).await.unwrap();
    let second = counters.save(&mut counter).await.unwrap();

    assert!(second.is_skipped());
    assert_eq!(adapter.writes().len(), 1);
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
    let adapter = Arc::new(RecordingAdapter::new("counters"));
    let counters = Binder::<Counter>::new(adapter.clone()).build();

    let mut counter = Entity::<Counter>::new([("name", Value::from("A")), ("count", Value::from(1i64))])
        .unwrap();
    counters.save(&mut counter).await.unwrap();
    adapter.clear();

    counter.set("count", 2i64).unwrap();
    let outcome = counters.save(&mut counter).await.unwrap();

    assert_eq!(outcome.operation, Some(OperationKind::Update));
    assert_eq!(outcome.rows_affected, 1);
    assert_eq!(
        adapter.writes(),
        vec![Call::Update(Value::Integer(1), row_from([("count", 2i64)]))]
    );

    let stored = adapter.inner().raw_row(&Value::Integer(1)).await.unwrap();
    assert_eq!(stored["name"], Value::from("A"));
    assert_eq!(stored["count"], Value::Integer(2));
}

#[tokio::test]
async fn put_values_are_not_persisted_on_their_own() {
    let adapter = Arc::new(RecordingAdapter::new("counters"));
    let counters = Binder::<Counter>::new(adapter.clone()).build();

    let mut counter = Entity::<Counter>::new([("name", "A")]).unwrap();
    counters.save(&mut counter).await.unwrap();

    counter.put("count", 5i64).unwrap();
    assert!(counters.save(&mut counter).await.unwrap().is_skipped());

    counter.mark_changed("count").unwrap();
    counters.save(&mut counter).await.unwrap();
    assert_eq!(
        adapter.writes().last(),
        Some(&Call::Update(Value::Integer(1), row_from([("count", 5i64)])))
    );
}

#[tokio::test]
async fn rejected_save_keeps_tracking_for_retry() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();

    let mut ticket = Entity::<Ticket>::new([("title", "Flaky")]).unwrap();
    adapter.reject_writes(true);

    let err = tickets.save(&mut ticket).await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::SaveFailed {
            model: "tickets",
            operation: "insert"
        }
    ));
    assert!(!ticket.is_persisted());
    assert!(ticket.id().is_none());
    assert_eq!(ticket.changed_fields(), vec!["title"]);

    adapter.reject_writes(false);
    tickets.save(&mut ticket).await.unwrap();

    let writes = adapter.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], writes[1]);
    assert!(ticket.is_persisted());
}

#[tokio::test]
async fn rejected_update_leaves_entity_persisted_and_dirty() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();

    let mut ticket = Entity::<Ticket>::new([("title", "First")]).unwrap();
    tickets.save(&mut ticket).await.unwrap();

    ticket.set("priority", 1i64).unwrap();
    adapter.reject_writes(true);
    let err = tickets.save(&mut ticket).await.unwrap_err();

    assert!(matches!(err, ModelError::SaveFailed { operation: "update", .. }));
    assert!(ticket.is_persisted());
    assert_eq!(ticket.changed_fields(), vec!["priority"]);
}

#[tokio::test]
async fn update_of_vanished_row_fails() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();

    let mut row = Row::new();
    row.insert("id".into(), Value::Integer(404));
    let mut ghost = Entity::<Ticket>::restore(row).unwrap();
    ghost.set("title", "gone").unwrap();

    let err = tickets.save(&mut ghost).await.unwrap_err();
    assert!(matches!(err, ModelError::SaveFailed { .. }));
}

#[tokio::test]
async fn deleted_entity_cannot_be_saved_or_deleted_again() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();

    let mut ticket = Entity::<Ticket>::new([("title", "Done")]).unwrap();
    tickets.save(&mut ticket).await.unwrap();
    assert!(tickets.delete(&mut ticket).await.unwrap());

    assert!(ticket.is_deleted());
    assert!(ticket.is_persisted());
    assert_eq!(ticket.get("title").unwrap(), &Value::from("Done"));

    ticket.set("title", "Again").unwrap();
    assert!(matches!(
        tickets.save(&mut ticket).await,
        Err(ModelError::IllegalState(_))
    ));
    assert!(matches!(
        tickets.delete(&mut ticket).await,
        Err(ModelError::IllegalState(_))
    ));
    assert_eq!(adapter.writes().len(), 1);
}

#[tokio::test]
async fn unsaved_entity_cannot_be_deleted() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();

    let mut ticket = Entity::<Ticket>::new([("title", "Draft")]).unwrap();
    assert!(matches!(
        tickets.delete(&mut ticket).await,
        Err(ModelError::IllegalState(_))
    ));
    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn deleting_missing_row_reports_false() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();

    let mut ticket = Entity::<Ticket>::new([("title", "Twice")]).unwrap();
    tickets.save(&mut ticket).await.unwrap();
    let mut stale = tickets.get(ticket.id().cloned().unwrap()).await.unwrap().unwrap();

    assert!(tickets.delete(&mut ticket).await.unwrap());
    assert!(!tickets.delete(&mut stale).await.unwrap());
    assert_eq!(stale.state(), EntityState::Persisted);
}

#[tokio::test]
async fn skipped_only_changes_do_not_trigger_update() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone())
        .fields(FieldSpecRegistry::new().field("draft", FieldSpec::new().skip()))
        .build();

    let mut ticket = Entity::<Ticket>::new([("title", "T")]).unwrap();
    tickets.save(&mut ticket).await.unwrap();

    ticket.set("draft", "scribbles").unwrap();
    assert!(tickets.save(&mut ticket).await.unwrap().is_skipped());
    assert_eq!(adapter.writes().len(), 1);
    assert_eq!(ticket.changed_fields(), vec!["draft"]);
}

#[tokio::test]
async fn registered_binding_drives_entity_methods_end_to_end() {
    let adapter = Arc::new(RecordingAdapter::new("registered_counters"));
    Binder::<Registered>::new(adapter.clone()).register().unwrap();

    let mut counter =
        Entity::<Registered>::new([("name", Value::from("A")), ("count", Value::from(1i64))]).unwrap();
    counter.save().await.unwrap();
    let id = counter.id().cloned().unwrap();

    counter.set("count", 2i64).unwrap();
    counter.save().await.unwrap();
    assert_eq!(
        adapter.writes().last(),
        Some(&Call::Update(id.clone(), row_from([("count", 2i64)])))
    );

    let loaded = Entity::<Registered>::find(id.clone()).await.unwrap().unwrap();
    assert_eq!(loaded.get("count").unwrap(), &Value::Integer(2));
    assert!(loaded.changed_fields().is_empty());

    assert!(counter.delete().await.unwrap());
    assert!(Entity::<Registered>::find(id).await.unwrap().is_none());
    assert!(Entity::<Registered>::all(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unbound_model_reports_not_bound() {
    model! {
        struct Orphan as "orphans" { label }
    }

    let mut orphan = Entity::<Orphan>::new([("label", "x")]).unwrap();
    assert!(matches!(orphan.save().await, Err(ModelError::NotBound("orphans"))));
    assert!(matches!(
        Entity::<Orphan>::find(1i64).await,
        Err(ModelError::NotBound("orphans"))
    ));
}

#[tokio::test]
async fn insert_without_returned_identifier_leaves_entity_new() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();
    adapter.drop_ids(true);

    let mut ticket = Entity::<Ticket>::new([("title", "Nameless")]).unwrap();
    let err = tickets.save(&mut ticket).await.unwrap_err();

    assert!(matches!(err, ModelError::MissingIdentifier("tickets")));
    assert!(ticket.is_new());
    assert_eq!(ticket.changed_fields(), vec!["title"]);
    // The adapter already committed the row.
    assert_eq!(adapter.inner().len().await, 1);
}

#[tokio::test]
async fn client_identifier_satisfies_insert_without_returned_identifier() {
    let adapter = Arc::new(RecordingAdapter::new("tickets"));
    let tickets = Binder::<Ticket>::new(adapter.clone()).build();
    adapter.drop_ids(true);

    let mut ticket = Entity::<Ticket>::new([("id", Value::Integer(7)), ("title", Value::from("Named"))])
        .unwrap();
    tickets.save(&mut ticket).await.unwrap();

    assert!(ticket.is_persisted());
    assert_eq!(ticket.id(), Some(&Value::Integer(7)));
}
