mod common;

use std::ops::Not;
use std::sync::Arc;

use common::MockBackend;
use liveorm::{
    DataType, EntityType, EntityTypeBuilder, KeyValue, OrmError, PropertyDescriptor, Value,
};

fn score() -> Arc<EntityType> {
    EntityTypeBuilder::new("Score")
        .property(PropertyDescriptor::new("player", DataType::Text))
        .property(PropertyDescriptor::new("level", DataType::Integer))
        .property(PropertyDescriptor::new("points", DataType::Integer))
        .key(&["player", "level"])
        .resolve()
        .unwrap()
}

fn item() -> Arc<EntityType> {
    EntityTypeBuilder::new("Item")
        .property(PropertyDescriptor::new("code", DataType::Text))
        .key(&["code"])
        .resolve()
        .unwrap()
}

#[test]
fn test_comparison_renders_bound_parameter() {
    let ty = score();
    let (statement, params) = ty.get(ty.col("points").gt(100i64)).build();
    assert_eq!(
        statement.text(),
        "SELECT * FROM table_Score WHERE (table_Score.points > :p0)"
    );
    assert_eq!(params.get("p0"), Some(&Value::Integer(100)));
}

#[test]
fn test_condition_combinators() {
    let ty = score();
    let cond = ty
        .col("points")
        .ge(10i64)
        .and(ty.col("player").eq("Eve"))
        .or(ty.col("level").lt(2i64).not());
    let (statement, params) = ty.get(cond).build();
    assert_eq!(
        statement.text(),
        "SELECT * FROM table_Score WHERE \
         (((table_Score.points >= :p0) AND (table_Score.player = :p1)) OR \
         ((NOT table_Score.level < :p2)))"
    );
    assert_eq!(params.len(), 3);
}

#[test]
fn test_order_limit_offset() {
    let ty = score();
    let (statement, _) = ty
        .select()
        .order_by(ty.col("points").desc())
        .order_by(ty.col("player").asc())
        .limit(10)
        .offset(5)
        .build();
    assert_eq!(
        statement.text(),
        "SELECT * FROM table_Score ORDER BY table_Score.points DESC, table_Score.player ASC \
         LIMIT 10 OFFSET 5"
    );
}

#[test]
fn test_single_and_composite_keys_share_the_comparison_surface() {
    let single = item();
    let (statement, params) = single.get(single.key_expr().eq(KeyValue::from("A"))).build();
    assert_eq!(statement.text(), "SELECT * FROM table_Item WHERE (table_Item.code = :p0)");
    assert_eq!(params.get("p0"), Some(&Value::from("A")));

    let composite = score();
    let key = KeyValue::Composite(vec![Value::from("Eve"), Value::Integer(3)]);
    let (statement, params) = composite.get(composite.key_expr().eq(key)).build();
    assert_eq!(
        statement.text(),
        "SELECT * FROM table_Score WHERE \
         ((table_Score.player, table_Score.level) = (:p0, :p1))"
    );
    assert_eq!(params.len(), 2);
}

#[tokio::test]
async fn test_all_decodes_rows_through_the_identity_map() {
    let db = MockBackend::new();
    let ty = item();
    let resident = ty.create(&[("code", "A".into())], &[]).unwrap();

    db.queue_rows(vec![vec![Value::from("A")], vec![Value::from("B")]]);
    let found = ty.select().all(db.as_ref()).await.unwrap();

    assert_eq!(found.len(), 2);
    assert!(Arc::ptr_eq(&found[0], &resident));
    assert!(found.iter().all(|i| i.is_persisted() || Arc::ptr_eq(i, &resident)));
    assert_eq!(ty.cache().len(), 2);
}

#[tokio::test]
async fn test_single_requires_exactly_one_row() {
    let db = MockBackend::new();
    let ty = item();
    db.queue_rows(vec![vec![Value::from("A")], vec![Value::from("B")]]);
    let err = ty.select().single(db.as_ref()).await.unwrap_err();
    assert!(matches!(err, OrmError::NotSingle(2)));
}

#[tokio::test]
async fn test_amount_bounds_the_result() {
    let db = MockBackend::new();
    let ty = item();
    db.queue_rows(vec![vec![Value::from("A")], vec![Value::from("B")], vec![Value::from("C")]]);
    let found = ty.select().amount(db.as_ref(), 2).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_raw_query_decodes_as_instances() {
    let db = MockBackend::new();
    let ty = item();
    db.queue_rows(vec![vec![Value::from("Z")]]);

    let found = ty
        .raw("SELECT * FROM table_Item WHERE code != :skip")
        .bind("skip", "A")
        .all(db.as_ref())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("code").unwrap(), Value::from("Z"));

    let (statement, params) = db.queried().into_iter().next().unwrap();
    assert_eq!(statement, "SELECT * FROM table_Item WHERE code != :skip");
    assert_eq!(params.get("skip"), Some(&Value::from("A")));
}

#[tokio::test]
async fn test_storage_failure_wraps_statement_and_params() {
    let db = MockBackend::new();
    let ty = item();
    db.fail_next("connection reset");

    let err = ty.get(ty.col("code").eq("A")).all(db.as_ref()).await.unwrap_err();
    match err {
        OrmError::Storage { statement, params, source } => {
            assert!(statement.starts_with("SELECT * FROM table_Item"));
            assert_eq!(params.get("p0"), Some(&Value::from("A")));
            assert_eq!(source.to_string(), "connection reset");
        }
        other => panic!("expected storage error, got {:?}", other),
    }
}
