use async_trait::async_trait;

use crate::core::{OrmError, Params, Result, Row};

/// Error type produced by a storage backend. The mapping layer wraps it into
/// [`OrmError::Storage`] together with the offending statement and parameters.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// The storage collaborator: one logical statement per call, one awaited
/// result. Connection lifecycle, pooling and retry are the implementor's
/// concern and are never exposed to the entity layer.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Run a command, returning the number of affected rows.
    async fn execute(&self, statement: &str, params: &Params)
    -> std::result::Result<u64, BackendError>;

    /// Run a query, returning a cursor over the fetched rows.
    async fn query(&self, statement: &str, params: &Params)
    -> std::result::Result<Rows, BackendError>;
}

/// Cursor over the rows of one query result.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    rows: Vec<Row>,
}

impl Rows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Number of rows fetched.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Exactly one row, or [`OrmError::NotSingle`].
    pub fn single(mut self) -> Result<Row> {
        if self.rows.len() != 1 {
            return Err(OrmError::NotSingle(self.rows.len()));
        }
        Ok(self.rows.remove(0))
    }

    /// All fetched rows.
    pub fn all(self) -> Vec<Row> {
        self.rows
    }

    /// At most `n` rows.
    pub fn amount(mut self, n: usize) -> Vec<Row> {
        self.rows.truncate(n);
        self.rows
    }

    /// The first row, if any, without cardinality checks.
    pub fn first(mut self) -> Option<Row> {
        if self.rows.is_empty() { None } else { Some(self.rows.remove(0)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_single_requires_exactly_one_row() {
        assert!(matches!(Rows::new(vec![]).single(), Err(OrmError::NotSingle(0))));
        assert!(
            Rows::new(vec![vec![Value::Integer(1)], vec![Value::Integer(2)]])
                .single()
                .is_err()
        );
        assert_eq!(
            Rows::new(vec![vec![Value::Integer(1)]]).single().unwrap(),
            vec![Value::Integer(1)]
        );
    }

    #[test]
    fn test_amount_bounds() {
        let rows = Rows::new(vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
        assert_eq!(rows.amount(1).len(), 1);
    }
}
