use std::fmt;

use log::debug;

use crate::core::{OrmError, Params, Result};
use crate::storage::{Rows, StorageBackend};

/// A reusable SQL statement template with named `:param` placeholders.
///
/// Templates are rendered once at schema-resolution time and executed many
/// times with different parameter maps. Backend failures come back wrapped
/// together with the statement text and the parameters that caused them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Run as a command, returning the number of affected rows.
    pub async fn exec(&self, db: &dyn StorageBackend, params: &Params) -> Result<u64> {
        debug!("exec: {} {:?}", self.text, params);
        db.execute(&self.text, params)
            .await
            .map_err(|source| OrmError::Storage {
                statement: self.text.clone(),
                params: params.clone(),
                source,
            })
    }

    /// Run as a query, returning a cursor over the fetched rows.
    pub async fn query(&self, db: &dyn StorageBackend, params: &Params) -> Result<Rows> {
        debug!("query: {} {:?}", self.text, params);
        db.query(&self.text, params)
            .await
            .map_err(|source| OrmError::Storage {
                statement: self.text.clone(),
                params: params.clone(),
                source,
            })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// The statement templates compiled from one resolved entity type.
#[derive(Debug, Clone)]
pub struct Statements {
    pub create_table: Statement,
    pub drop_table: Statement,
    /// Excludes a surrogate key column; carries `RETURNING` when the key is
    /// surrogate so the generated value comes back from the store.
    pub insert: Statement,
    pub update: Statement,
    pub delete: Statement,
    /// Cache-miss fallback: select one row by key equality.
    pub find_by_key: Statement,
}

impl Statements {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Statement)> {
        [
            ("create_table", &self.create_table),
            ("drop_table", &self.drop_table),
            ("insert", &self.insert),
            ("update", &self.update),
            ("delete", &self.delete),
            ("find_by_key", &self.find_by_key),
        ]
        .into_iter()
    }
}
