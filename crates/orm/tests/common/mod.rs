//! In-memory connection provider that records every statement it sees

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::{stream, StreamExt};

use elif_dynamic::{
    AttributeBag, DatabaseConnection, DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue,
    ModelError, ModelHooks, OrmResult, RowStream, ValidationErrors,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

#[derive(Debug, Clone)]
pub struct MockRow {
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl MockRow {
    pub fn new(pairs: Vec<(&str, DatabaseValue)>) -> Self {
        Self {
            columns: pairs.iter().map(|(name, _)| name.to_string()).collect(),
            values: pairs.into_iter().map(|(_, value)| value).collect(),
        }
    }

    pub fn scalar(value: DatabaseValue) -> Self {
        Self::new(vec![("value", value)])
    }

    pub fn column(name: &str, data_type: &str, default: Option<&str>) -> Self {
        Self::new(vec![
            ("column_name", DatabaseValue::from(name)),
            ("data_type", DatabaseValue::from(data_type)),
            ("column_default", DatabaseValue::from(default)),
            ("is_nullable", DatabaseValue::from("YES")),
        ])
    }
}

impl DatabaseRow for MockRow {
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| ModelError::Database(format!("No column at {}", index)))
    }

    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        let index = self
            .columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ModelError::Database(format!("Column '{}' not found", name)))?;
        self.get_by_index(index)
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }
}

#[derive(Default)]
struct State {
    executed: Vec<Executed>,
    events: Vec<String>,
    responses: Vec<(String, Vec<MockRow>)>,
    fail_on: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockPool {
    state: Arc<Mutex<State>>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn DatabasePool> {
        Arc::new(self.clone())
    }

    /// Answer any query containing `fragment` with `rows`
    pub fn respond(&self, fragment: &str, rows: Vec<MockRow>) {
        self.state.lock().unwrap().responses.push((fragment.to_string(), rows));
    }

    /// Fail any statement containing `fragment`
    pub fn fail_on(&self, fragment: &str) {
        self.state.lock().unwrap().fail_on = Some(fragment.to_string());
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.executed().into_iter().map(|e| e.sql).collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    fn record(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<()> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(Executed {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &state.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => {
                Err(ModelError::Database(format!("forced failure on {}", sql)))
            }
            _ => Ok(()),
        }
    }

    fn run_execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.record(sql, params)?;
        Ok(1)
    }

    fn run_fetch(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        self.record(sql, params)?;
        let state = self.state.lock().unwrap();
        let rows = state
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        Ok(rows.into_iter().map(|row| Box::new(row) as Box<dyn DatabaseRow>).collect())
    }

    fn event(&self, event: &str) {
        self.state.lock().unwrap().events.push(event.to_string());
    }
}

#[async_trait]
impl DatabasePool for MockPool {
    async fn acquire(&self) -> OrmResult<Box<dyn DatabaseConnection>> {
        Ok(Box::new(MockConnection { pool: self.clone() }))
    }

    async fn begin_transaction(&self) -> OrmResult<Box<dyn DatabaseTransaction>> {
        self.event("BEGIN");
        Ok(Box::new(MockTransaction { pool: self.clone() }))
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.run_execute(sql, params)
    }

    fn fetch<'a>(&'a self, sql: &'a str, params: &'a [DatabaseValue]) -> RowStream<'a> {
        match self.run_fetch(sql, params) {
            Ok(rows) => stream::iter(rows.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn close(&self) -> OrmResult<()> {
        Ok(())
    }
}

pub struct MockConnection {
    pool: MockPool,
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.pool.run_execute(sql, params)
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        self.pool.run_fetch(sql, params)
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Box<dyn DatabaseRow>>> {
        Ok(self.pool.run_fetch(sql, params)?.into_iter().next())
    }

    async fn close(&mut self) -> OrmResult<()> {
        Ok(())
    }
}

pub struct MockTransaction {
    pool: MockPool,
}

#[async_trait]
impl DatabaseTransaction for MockTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.pool.run_execute(sql, params)
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Box<dyn DatabaseRow>>> {
        Ok(self.pool.run_fetch(sql, params)?.into_iter().next())
    }

    async fn commit(self: Box<Self>) -> OrmResult<()> {
        self.pool.event("COMMIT");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> OrmResult<()> {
        self.pool.event("ROLLBACK");
        Ok(())
    }
}

/// Hooks that require an Email and record every lifecycle call
#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub events: Arc<Mutex<Vec<String>>>,
    pub veto_save: bool,
    pub veto_delete: bool,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl ModelHooks for RecordingHooks {
    fn validate(&self, record: &AttributeBag, errors: &mut ValidationErrors) {
        errors.validates_presence_of(record, "Email", "Email is required");
    }

    async fn before_save(&self, _record: &mut AttributeBag) -> bool {
        self.push("before_save".to_string());
        !self.veto_save
    }

    async fn inserted(&self, record: &AttributeBag) {
        self.push(format!("inserted {:?}", record.get("ID")));
    }

    async fn updated(&self, _record: &AttributeBag) {
        self.push("updated".to_string());
    }

    async fn before_delete(&self, record: Option<&AttributeBag>) -> bool {
        self.push(format!("before_delete {}", record.is_some()));
        !self.veto_delete
    }

    async fn deleted(&self, _record: Option<&AttributeBag>) {
        self.push("deleted".to_string());
    }
}
