mod common;

use std::sync::Arc;

use common::MockBackend;
use liveorm::{
    DataType, EntityType, EntityTypeBuilder, KeyValue, OrmError, PropertyDescriptor, Value,
};

fn item() -> Arc<EntityType> {
    EntityTypeBuilder::new("Item")
        .property(PropertyDescriptor::new("code", DataType::Text))
        .property(PropertyDescriptor::new("label", DataType::Text).optional())
        .key(&["code"])
        .resolve()
        .unwrap()
}

fn user() -> Arc<EntityType> {
    EntityTypeBuilder::new("User")
        .property(PropertyDescriptor::new("name", DataType::Text))
        .surrogate_key("id")
        .resolve()
        .unwrap()
}

#[test]
fn test_same_key_construction_yields_same_instance() {
    let ty = item();
    let first = ty.create(&[("code", "A".into()), ("label", "first".into())], &[]).unwrap();
    let second = ty.create(&[("code", "A".into()), ("label", "second".into())], &[]).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    // the existing instance wins; the fresh construction is discarded
    assert_eq!(second.get("label").unwrap(), Value::from("first"));
    assert_eq!(ty.cache().len(), 1);
}

#[test]
fn test_distinct_keys_are_distinct_instances() {
    let ty = item();
    let a = ty.create(&[("code", "A".into())], &[]).unwrap();
    let b = ty.create(&[("code", "B".into())], &[]).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(ty.cache().len(), 2);
}

#[test]
fn test_cache_does_not_keep_instances_alive() {
    let ty = item();
    {
        let _a = ty.create(&[("code", "A".into())], &[]).unwrap();
        assert!(ty.cache().lookup(&KeyValue::from("A")).is_some());
    }
    assert!(ty.cache().lookup(&KeyValue::from("A")).is_none());
    assert!(ty.cache().is_empty());
}

#[test]
fn test_instance_without_key_is_not_cached() {
    let ty = user();
    let u = ty.create(&[("name", "Eve".into())], &[]).unwrap();
    assert!(u.key().is_none());
    assert!(ty.cache().is_empty());
}

#[tokio::test]
async fn test_fetch_miss_queries_store_and_registers() {
    let db = MockBackend::new();
    let ty = item();

    db.queue_rows(vec![vec![Value::from("A"), Value::from("ample")]]);
    let fetched = ty.find_by_key(&KeyValue::from("A"), db.as_ref()).await.unwrap();
    assert!(fetched.is_persisted());
    assert_eq!(fetched.get("label").unwrap(), Value::from("ample"));
    assert_eq!(db.queried().len(), 1);

    // second fetch hits the cache, no storage round trip
    let again = ty.find_by_key(&KeyValue::from("A"), db.as_ref()).await.unwrap();
    assert!(Arc::ptr_eq(&fetched, &again));
    assert_eq!(db.queried().len(), 1);
}

#[tokio::test]
async fn test_fetch_with_zero_rows_is_not_single() {
    let db = MockBackend::new();
    let ty = item();
    let err = ty.find_by_key(&KeyValue::from("missing"), db.as_ref()).await.unwrap_err();
    assert!(matches!(err, OrmError::NotSingle(0)));
}

#[tokio::test]
async fn test_surrogate_insert_registers_generated_key() {
    let db = MockBackend::new();
    let ty = user();
    let u = ty.create(&[("name", "Eve".into())], &[]).unwrap();

    db.queue_rows(vec![vec![Value::Integer(7)]]);
    u.insert(db.as_ref()).await.unwrap();

    assert_eq!(u.get("id").unwrap(), Value::Integer(7));
    assert!(u.is_persisted());
    let cached = ty.cache().lookup(&KeyValue::from(7i64)).unwrap();
    assert!(Arc::ptr_eq(&cached, &u));
}

#[tokio::test]
#[should_panic(expected = "already holds an instance")]
async fn test_surrogate_double_registration_is_fatal() {
    let db = MockBackend::new();
    let ty = user();

    // id 7 already resident via a fetch
    let resident = ty.from_row(vec![Value::from("Eve"), Value::Integer(7)]).unwrap();
    assert!(resident.key().is_some());

    // a store that hands out the same key again violates the cache invariant
    let fresh = ty.create(&[("name", "Mallory".into())], &[]).unwrap();
    db.queue_rows(vec![vec![Value::Integer(7)]]);
    let _ = fresh.insert(db.as_ref()).await;
}

#[tokio::test]
async fn test_fetch_hit_skips_storage_entirely() {
    let db = MockBackend::new();
    let ty = item();
    let resident = ty.create(&[("code", "A".into()), ("label", "mine".into())], &[]).unwrap();

    let fetched = ty.find_by_key(&KeyValue::from("A"), db.as_ref()).await.unwrap();
    assert!(Arc::ptr_eq(&fetched, &resident));
    assert!(db.queried().is_empty());
}

#[test]
fn test_stale_row_decodes_to_resident_instance() {
    let ty = item();
    let resident = ty.create(&[("code", "A".into()), ("label", "mine".into())], &[]).unwrap();

    // a row for the same key decodes to the canonical instance, stale values
    // and all discarded
    let decoded = ty.from_row(vec![Value::from("A"), Value::from("stale")]).unwrap();
    assert!(Arc::ptr_eq(&decoded, &resident));
    assert_eq!(decoded.get("label").unwrap(), Value::from("mine"));
}
