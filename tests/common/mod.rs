#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use liveorm::{BackendError, Params, Row, Rows, StorageBackend};

/// Scripted storage double: records every statement and replays queued query
/// results in FIFO order. A query with nothing queued returns zero rows.
pub struct MockBackend {
    queued: Mutex<VecDeque<Vec<Row>>>,
    executed: Mutex<Vec<(String, Params)>>,
    queried: Mutex<Vec<(String, Params)>>,
    fail_next: Mutex<Option<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
            queried: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        })
    }

    /// Queue the result rows for the next query.
    pub fn queue_rows(&self, rows: Vec<Row>) {
        self.queued.lock().unwrap().push_back(rows);
    }

    /// Make the next execute/query call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn executed(&self) -> Vec<(String, Params)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn queried(&self) -> Vec<(String, Params)> {
        self.queried.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<BackendError> {
        self.fail_next.lock().unwrap().take().map(Into::into)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    async fn execute(
        &self,
        statement: &str,
        params: &Params,
    ) -> Result<u64, BackendError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.executed.lock().unwrap().push((statement.to_string(), params.clone()));
        Ok(1)
    }

    async fn query(&self, statement: &str, params: &Params) -> Result<Rows, BackendError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.queried.lock().unwrap().push((statement.to_string(), params.clone()));
        let rows = self.queued.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Rows::new(rows))
    }
}
