use std::sync::Arc;

use liveorm::{DataType, EntityType, EntityTypeBuilder, PropertyDescriptor};

fn user() -> Arc<EntityType> {
    EntityTypeBuilder::new("User")
        .property(PropertyDescriptor::new("name", DataType::Text))
        .surrogate_key("id")
        .resolve()
        .unwrap()
}

fn score() -> Arc<EntityType> {
    EntityTypeBuilder::new("Score")
        .property(PropertyDescriptor::new("player", DataType::Text))
        .property(PropertyDescriptor::new("level", DataType::Integer))
        .property(PropertyDescriptor::new("points", DataType::Integer))
        .key(&["player", "level"])
        .resolve()
        .unwrap()
}

#[test]
fn test_create_table_for_surrogate_key() {
    assert_eq!(
        user().statements().create_table.text(),
        "CREATE TABLE table_User (\n\
         \tname VARCHAR NOT NULL,\n\
         \tid SERIAL,\n\
         \tPRIMARY KEY (id)\n\
         )"
    );
}

#[test]
fn test_create_table_with_foreign_key_constraint() {
    let post = EntityTypeBuilder::new("Post")
        .property(PropertyDescriptor::new("title", DataType::Text))
        .surrogate_key("id")
        .reference("author", &user())
        .resolve()
        .unwrap();
    assert_eq!(
        post.statements().create_table.text(),
        "CREATE TABLE table_Post (\n\
         \ttitle VARCHAR NOT NULL,\n\
         \tid SERIAL,\n\
         \tauthor_id INT NOT NULL,\n\
         \tFOREIGN KEY (author_id) REFERENCES table_User,\n\
         \tPRIMARY KEY (id)\n\
         )"
    );
}

#[test]
fn test_drop_table_cascades() {
    assert_eq!(
        user().statements().drop_table.text(),
        "DROP TABLE IF EXISTS table_User CASCADE"
    );
}

#[test]
fn test_insert_excludes_surrogate_column_and_returns_it() {
    assert_eq!(
        user().statements().insert.text(),
        "INSERT INTO table_User (name) VALUES (:name) RETURNING id"
    );
}

#[test]
fn test_insert_with_natural_key_has_no_returning() {
    assert_eq!(
        score().statements().insert.text(),
        "INSERT INTO table_Score (player, level, points) VALUES (:player, :level, :points)"
    );
}

#[test]
fn test_update_sets_non_key_columns_filtered_by_key() {
    assert_eq!(
        user().statements().update.text(),
        "UPDATE table_User SET name = :name WHERE id = :id"
    );
}

#[test]
fn test_update_with_composite_key_predicate() {
    assert_eq!(
        score().statements().update.text(),
        "UPDATE table_Score SET player = :player, level = :level, points = :points \
         WHERE (player, level) = (:player, :level)"
    );
}

#[test]
fn test_delete_by_key() {
    assert_eq!(
        user().statements().delete.text(),
        "DELETE FROM table_User WHERE id = :id"
    );
    assert_eq!(
        score().statements().delete.text(),
        "DELETE FROM table_Score WHERE (player, level) = (:player, :level)"
    );
}

#[test]
fn test_find_by_key_select() {
    assert_eq!(
        user().statements().find_by_key.text(),
        "SELECT * FROM table_User WHERE id = :id"
    );
    assert_eq!(
        score().statements().find_by_key.text(),
        "SELECT * FROM table_Score WHERE (player, level) = (:player, :level)"
    );
}

#[test]
fn test_templates_are_stable_across_instances() {
    let ty = user();
    let before = ty.statements().insert.clone();
    let _ = ty.create(&[("name", "Eve".into())], &[]).unwrap();
    assert_eq!(ty.statements().insert, before);
}
