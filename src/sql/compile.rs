//! Renders the CRUD statement templates for a resolved entity type.
//!
//! This is a pure function of the resolved schema, run exactly once from the
//! schema resolver. Column order is resolution order: declared properties
//! first, then reference expansions.

use crate::schema::{KeyDescriptor, PropertyDescriptor, ReferenceDescriptor};
use crate::sql::{Statement, Statements};

pub(crate) fn compile(
    table: &str,
    props: &[PropertyDescriptor],
    refs: &[ReferenceDescriptor],
    key: &KeyDescriptor,
) -> Statements {
    Statements {
        create_table: create_table(table, props, refs, key),
        drop_table: drop_table(table),
        insert: insert(table, props, key),
        update: update(table, props, key),
        delete: delete(table, props, key),
        find_by_key: find_by_key(table, props, key),
    }
}

fn key_columns<'a>(props: &'a [PropertyDescriptor], key: &KeyDescriptor) -> Vec<&'a str> {
    key.slots().iter().map(|&s| props[s].name()).collect()
}

/// Insertable columns: everything except a surrogate key column, which the
/// store generates.
fn complete_columns<'a>(props: &'a [PropertyDescriptor], key: &KeyDescriptor) -> Vec<&'a str> {
    let surrogate = key.is_surrogate().then(|| key.slots()[0]);
    props
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != surrogate)
        .map(|(_, p)| p.name())
        .collect()
}

fn key_predicate(props: &[PropertyDescriptor], key: &KeyDescriptor) -> String {
    let cols = key_columns(props, key);
    if cols.len() == 1 {
        format!("{} = :{}", cols[0], cols[0])
    } else {
        format!(
            "({}) = ({})",
            cols.join(", "),
            cols.iter().map(|c| format!(":{}", c)).collect::<Vec<_>>().join(", ")
        )
    }
}

fn create_table(
    table: &str,
    props: &[PropertyDescriptor],
    refs: &[ReferenceDescriptor],
    key: &KeyDescriptor,
) -> Statement {
    let mut lines: Vec<String> = props.iter().map(PropertyDescriptor::sql_def).collect();
    for r in refs {
        let cols: Vec<&str> = r.slots().iter().map(|&s| props[s].name()).collect();
        lines.push(format!(
            "\tFOREIGN KEY ({}) REFERENCES {}",
            cols.join(", "),
            r.target().table()
        ));
    }
    lines.push(format!("\tPRIMARY KEY ({})", key_columns(props, key).join(", ")));
    Statement::new(format!("CREATE TABLE {} (\n{}\n)", table, lines.join(",\n")))
}

fn drop_table(table: &str) -> Statement {
    Statement::new(format!("DROP TABLE IF EXISTS {} CASCADE", table))
}

fn insert(table: &str, props: &[PropertyDescriptor], key: &KeyDescriptor) -> Statement {
    let cols = complete_columns(props, key);
    let placeholders: Vec<String> = cols.iter().map(|c| format!(":{}", c)).collect();
    let mut text = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        cols.join(", "),
        placeholders.join(", ")
    );
    if key.is_surrogate() {
        text.push_str(" RETURNING ");
        text.push_str(props[key.slots()[0]].name());
    }
    Statement::new(text)
}

fn update(table: &str, props: &[PropertyDescriptor], key: &KeyDescriptor) -> Statement {
    let assignments: Vec<String> = complete_columns(props, key)
        .iter()
        .map(|c| format!("{} = :{}", c, c))
        .collect();
    Statement::new(format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments.join(", "),
        key_predicate(props, key)
    ))
}

fn delete(table: &str, props: &[PropertyDescriptor], key: &KeyDescriptor) -> Statement {
    Statement::new(format!("DELETE FROM {} WHERE {}", table, key_predicate(props, key)))
}

fn find_by_key(table: &str, props: &[PropertyDescriptor], key: &KeyDescriptor) -> Statement {
    Statement::new(format!("SELECT * FROM {} WHERE {}", table, key_predicate(props, key)))
}
