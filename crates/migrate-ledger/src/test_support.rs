//! Scripted mock connection shared by dialect tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::connection::SqlConnection;
use crate::core::value::Row;
use crate::error::{LedgerError, Result};

/// Error type used to simulate engine failures.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeEngineError(pub String);

/// Scripted connection: queues of canned responses per query shape, plus a
/// log of every SQL string issued.
///
/// When a queue is empty the mock answers with a neutral default (empty
/// string, zero, false, no rows, success), so tests only script the calls
/// they care about.
#[derive(Default)]
pub struct MockConnection {
    strings: Mutex<VecDeque<Result<String>>>,
    longs: Mutex<VecDeque<Result<i64>>>,
    bools: Mutex<VecDeque<Result<bool>>>,
    rows: Mutex<VecDeque<Result<Vec<Row>>>>,
    execs: Mutex<VecDeque<Result<()>>>,
    log: Mutex<Vec<String>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_string(&self, value: impl Into<String>) {
        self.strings.lock().unwrap().push_back(Ok(value.into()));
    }

    pub fn push_long(&self, value: i64) {
        self.longs.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_bool(&self, value: bool) {
        self.bools.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.rows.lock().unwrap().push_back(Ok(rows));
    }

    pub fn fail_next_execute(&self, message: &str) {
        self.execs
            .lock()
            .unwrap()
            .push_back(Err(LedgerError::database(FakeEngineError(
                message.to_string(),
            ))));
    }

    /// Every SQL string issued through any method, in call order.
    pub fn sql_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Statements issued through `execute`, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|sql| sql.starts_with("EXEC:"))
            .map(|sql| sql["EXEC:".len()..].to_string())
            .collect()
    }

    fn record(&self, tag: &str, sql: &str) {
        self.log.lock().unwrap().push(format!("{tag}{sql}"));
    }
}

#[async_trait]
impl SqlConnection for MockConnection {
    async fn query_string(&self, sql: &str) -> Result<String> {
        self.record("", sql);
        self.strings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    async fn query_long(&self, sql: &str) -> Result<i64> {
        self.record("", sql);
        self.longs.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }

    async fn query_bool(&self, sql: &str) -> Result<bool> {
        self.record("", sql);
        self.bools.lock().unwrap().pop_front().unwrap_or(Ok(false))
    }

    async fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        self.record("", sql);
        self.rows
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.record("EXEC:", sql);
        self.execs.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
