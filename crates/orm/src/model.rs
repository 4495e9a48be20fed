//! Dynamic model - table access without a compile-time schema
//!
//! A [`DynamicModel`] binds a table name, its primary key field and a
//! connection pool. Records travel as [`AttributeBag`]s; anything that
//! implements [`IntoAttributeBag`] (serializable structs via JSON, form data,
//! plain bags) is accepted wherever a record is expected.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::attributes::{AttributeBag, FormData, IntoAttributeBag};
use crate::backends::{DatabaseBackendRegistry, DatabasePool, DatabaseValue};
use crate::command::{Command, CommandBuilder};
use crate::config::ConnectionSettings;
use crate::convention::{ConventionPlan, ConventionRequest, DynamicCall};
use crate::dialect::SqlDialect;
use crate::error::{ModelError, OrmResult};
use crate::hooks::{ModelHooks, NoHooks};
use crate::query::{build_select, order_clause, total_pages, PageSource, PagedResult, PagingPlan, QueryOptions, Records};
use crate::schema::{ColumnDescriptor, SchemaCache};
use crate::validation::ValidationErrors;

/// Primary key field used unless the model names another
pub const DEFAULT_PRIMARY_KEY: &str = "ID";

/// Result of a convention call
#[derive(Debug)]
pub enum DynamicResult {
    Count(u64),
    Scalar(DatabaseValue),
    Row(Option<AttributeBag>),
    Rows(Records),
    /// The call resolved to an aggregate the dialect does not provide
    NoResult,
}

/// Convention-driven access to one table
pub struct DynamicModel {
    table: String,
    primary_key: String,
    descriptor_field: Option<String>,
    dialect: SqlDialect,
    pool: Arc<dyn DatabasePool>,
    hooks: Arc<dyn ModelHooks>,
    schema: SchemaCache,
}

impl DynamicModel {
    pub fn new(pool: Arc<dyn DatabasePool>, dialect: SqlDialect, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            schema: SchemaCache::new(table.clone(), dialect),
            table,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            descriptor_field: None,
            dialect,
            pool,
            hooks: Arc::new(NoHooks),
        }
    }

    /// Open a model over a named connection from the environment
    /// (`DATABASE_URL[_<NAME>]`, `DATABASE_DRIVER[_<NAME>]`).
    pub async fn open(connection: &str, table: impl Into<String>) -> OrmResult<Self> {
        let settings = ConnectionSettings::from_env(connection)?;
        Self::open_with(&DatabaseBackendRegistry::with_defaults(), &settings, table).await
    }

    /// Open a model from resolved settings through a backend registry
    pub async fn open_with(
        registry: &DatabaseBackendRegistry,
        settings: &ConnectionSettings,
        table: impl Into<String>,
    ) -> OrmResult<Self> {
        let backend = registry.backend_for(settings)?;
        let pool = backend.create_pool(&settings.url).await?;
        Ok(Self::new(pool, backend.sql_dialect(), table))
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Column shown for each key by [`DynamicModel::key_values`]
    pub fn with_descriptor_field(mut self, field: impl Into<String>) -> Self {
        self.descriptor_field = Some(field.into());
        self
    }

    pub fn with_hooks(mut self, hooks: impl ModelHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn descriptor_field(&self) -> Option<&str> {
        self.descriptor_field.as_deref()
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn pool(&self) -> &Arc<dyn DatabasePool> {
        &self.pool
    }

    fn commands(&self) -> CommandBuilder<'_> {
        CommandBuilder::new(&self.table, &self.primary_key, self.dialect)
    }

    // Schema

    pub async fn schema(&self) -> OrmResult<&[ColumnDescriptor]> {
        self.schema.columns(self.pool.as_ref()).await
    }

    pub async fn column_exists(&self, name: &str) -> OrmResult<bool> {
        self.schema.column_exists(self.pool.as_ref(), name).await
    }

    pub async fn get_column(&self, name: &str) -> OrmResult<Option<&ColumnDescriptor>> {
        self.schema.get_column(self.pool.as_ref(), name).await
    }

    pub async fn default_value(&self, name: &str) -> OrmResult<DatabaseValue> {
        self.schema.default_value(self.pool.as_ref(), name).await
    }

    /// A new record pre-filled with every column's default
    pub async fn prototype(&self) -> OrmResult<AttributeBag> {
        self.schema.prototype(self.pool.as_ref()).await
    }

    /// A record holding only the submitted fields that are columns of this
    /// table, named as the table declares them
    pub async fn create_from(&self, form: FormData) -> OrmResult<AttributeBag> {
        let submitted = form.into_attribute_bag()?;
        let columns = self.schema().await?;
        let mut record = AttributeBag::new();
        for (name, value) in submitted {
            match columns.iter().find(|column| column.name.eq_ignore_ascii_case(&name)) {
                Some(column) => {
                    record.insert(column.name.clone(), value);
                }
                None => debug!("Ignoring form field {} not present in {}", name, self.table),
            }
        }
        Ok(record)
    }

    // Keys and validation

    pub fn has_primary_key(&self, record: impl IntoAttributeBag) -> OrmResult<bool> {
        Ok(self.primary_key_of(record)?.is_some())
    }

    pub fn primary_key_of(&self, record: impl IntoAttributeBag) -> OrmResult<Option<DatabaseValue>> {
        Ok(record.into_attribute_bag()?.primary_key(&self.primary_key).cloned())
    }

    /// Run the validation hook, returning every failure found
    pub fn validate(&self, record: &AttributeBag) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        self.hooks.validate(record, &mut errors);
        errors
    }

    pub fn is_valid(&self, record: &AttributeBag) -> bool {
        self.validate(record).is_empty()
    }

    // Raw SQL

    /// Lazy rows of an arbitrary query
    pub fn query(&self, sql: &str, args: Vec<DatabaseValue>) -> Records {
        Records::new(self.pool.clone(), Command::new(sql, args))
    }

    /// First column of the first row, NULL when there are no rows
    pub async fn scalar(&self, sql: &str, args: &[DatabaseValue]) -> OrmResult<DatabaseValue> {
        debug!("Scalar: {} ({} params)", sql, args.len());
        self.pool.fetch_scalar(sql, args).await
    }

    /// Run commands in one transaction; any failure rolls back all of them.
    /// Returns the total number of affected rows.
    pub async fn execute(&self, commands: Vec<Command>) -> OrmResult<u64> {
        if commands.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin_transaction().await?;
        debug!("Beginning transaction for {} commands", commands.len());

        let mut affected = 0;
        for command in &commands {
            debug!("Execute: {} ({} params)", command.sql, command.params.len());
            match tx.execute(&command.sql, &command.params).await {
                Ok(rows) => affected += rows,
                Err(e) => {
                    warn!("Rolling back transaction on {}: {}", self.table, e);
                    if let Err(rollback_error) = tx.rollback().await {
                        warn!("Rollback failed: {}", rollback_error);
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        debug!("Transaction committed ({} rows affected)", affected);
        Ok(affected)
    }

    // Reads

    /// Every row matching the options, read lazily
    pub fn all(&self, options: &QueryOptions) -> Records {
        Records::new(self.pool.clone(), build_select(self.dialect, &self.table, options))
    }

    /// First row matching the options
    pub async fn first(&self, options: &QueryOptions) -> OrmResult<Option<AttributeBag>> {
        let options = options.clone().limit(1);
        self.all(&options).first().await
    }

    /// Row with the given primary key
    pub async fn single(&self, key: impl Into<DatabaseValue>) -> OrmResult<Option<AttributeBag>> {
        let key_predicate = self.commands().key_predicate();
        self.single_where(&key_predicate, vec![key.into()]).await
    }

    /// First row matching a predicate
    pub async fn single_where(&self, where_sql: &str, args: Vec<DatabaseValue>) -> OrmResult<Option<AttributeBag>> {
        self.first(&QueryOptions::new().filter(where_sql, args)).await
    }

    /// Rows matching a predicate (all rows when it is blank)
    pub async fn count(&self, where_sql: &str, args: &[DatabaseValue]) -> OrmResult<u64> {
        let sql = self.dialect.count("*", &self.table, &crate::query::where_clause(where_sql));
        to_count(self.scalar(&sql, args).await?)
    }

    /// One page of this table
    pub async fn paged(&self, options: &QueryOptions) -> OrmResult<PagedResult> {
        self.page_of(PageSource::Table(self.table.clone()), options).await
    }

    /// One page of an arbitrary query, ordered by the primary key unless the
    /// options say otherwise
    pub async fn paged_sql(&self, sql: &str, options: &QueryOptions) -> OrmResult<PagedResult> {
        self.page_of(PageSource::Sql(sql.to_string()), options).await
    }

    async fn page_of(&self, source: PageSource, options: &QueryOptions) -> OrmResult<PagedResult> {
        let plan = PagingPlan::build(self.dialect, &source, &self.primary_key, options)?;
        let total_records = to_count(self.scalar(&plan.count.sql, &plan.count.params).await?)?;

        Ok(PagedResult {
            total_pages: total_pages(total_records, plan.page_size),
            total_records,
            items: Records::new(self.pool.clone(), plan.window),
        })
    }

    /// (key, descriptor) pairs for pick lists, in `order_by` order
    /// (key order when blank)
    pub async fn key_values(&self, order_by: &str) -> OrmResult<Vec<(DatabaseValue, DatabaseValue)>> {
        let descriptor = self.descriptor_field.as_deref().ok_or_else(|| {
            ModelError::Configuration(format!(
                "Model for {} has no descriptor field; set one with with_descriptor_field",
                self.table
            ))
        })?;
        let order = if order_by.trim().is_empty() { self.primary_key.as_str() } else { order_by };
        let sql = self.dialect.select(
            &format!("{}, {}", self.primary_key, descriptor),
            &self.table,
            "",
            &order_clause(order),
            0,
        );

        debug!("Query: {}", sql);
        let rows = self.pool.fetch_all(&sql, &[]).await?;
        rows.iter()
            .map(|row| -> OrmResult<(DatabaseValue, DatabaseValue)> {
                Ok((row.get_by_index(0)?, row.get_by_index(1)?))
            })
            .collect()
    }

    /// Resolve and run a convention call such as `FindByEmail(email: ..)`
    pub async fn invoke(&self, call: &DynamicCall) -> OrmResult<DynamicResult> {
        let request = ConventionRequest::parse(call)?;
        let plan = ConventionPlan::build(&request, self.dialect, &self.table, &self.primary_key)?;
        debug!("{} resolved to {:?}", call.method, plan);

        Ok(match plan {
            ConventionPlan::Count(command) => {
                DynamicResult::Count(to_count(self.scalar(&command.sql, &command.params).await?)?)
            }
            ConventionPlan::Aggregate(command) => {
                DynamicResult::Scalar(self.scalar(&command.sql, &command.params).await?)
            }
            ConventionPlan::Single(command) => {
                DynamicResult::Row(Records::new(self.pool.clone(), command).first().await?)
            }
            ConventionPlan::Many(command) => DynamicResult::Rows(Records::new(self.pool.clone(), command)),
            ConventionPlan::NoResult => DynamicResult::NoResult,
        })
    }

    // Writes

    fn ensure_valid(&self, record: &AttributeBag) -> OrmResult<()> {
        let errors = self.validate(record);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Validation(errors))
        }
    }

    /// Insert a record and return it with its key populated. `None` when the
    /// `before_save` hook vetoed the insert.
    ///
    /// When the record carries no key, the dialect's identity query reads it
    /// back on the inserting connection. That query only sees keys generated by
    /// a sequence or identity column: on PostgreSQL a key defaulting to
    /// `gen_random_uuid()` makes `lastval()` fail after the row has been
    /// stored, and the error is returned for a row that exists. Supply such
    /// keys on the record instead.
    pub async fn insert(&self, record: impl IntoAttributeBag) -> OrmResult<Option<AttributeBag>> {
        let mut record = record.into_attribute_bag()?;
        self.ensure_valid(&record)?;
        if !self.hooks.before_save(&mut record).await {
            warn!("Insert into {} vetoed by before_save", self.table);
            return Ok(None);
        }

        let command = self.commands().build_insert(&record)?;
        let needs_identity = record.primary_key(&self.primary_key).is_none();

        // the identity query must run on the connection that inserted
        let mut conn = self.pool.acquire().await?;
        debug!("Execute: {} ({} params)", command.sql, command.params.len());
        conn.execute(&command.sql, &command.params).await?;
        if needs_identity {
            let identity = conn.fetch_scalar(self.dialect.identity_query(), &[]).await?;
            record.insert(self.primary_key.clone(), identity);
        }
        conn.close().await?;

        self.hooks.inserted(&record).await;
        Ok(Some(record))
    }

    /// Update the row with the given key; returns affected rows
    pub async fn update(&self, record: impl IntoAttributeBag, key: impl Into<DatabaseValue>) -> OrmResult<u64> {
        let mut record = record.into_attribute_bag()?;
        self.ensure_valid(&record)?;
        if !self.hooks.before_save(&mut record).await {
            warn!("Update of {} vetoed by before_save", self.table);
            return Ok(0);
        }

        let command = self.commands().build_update_by_key(&record, key.into())?;
        let affected = self.execute_one(&command).await?;
        self.hooks.updated(&record).await;
        Ok(affected)
    }

    /// Update every row matching `where_sql`; a blank predicate updates nothing
    pub async fn update_where(
        &self,
        record: impl IntoAttributeBag,
        where_sql: &str,
        args: Vec<DatabaseValue>,
    ) -> OrmResult<u64> {
        if where_sql.trim().is_empty() {
            return Ok(0);
        }

        let mut record = record.into_attribute_bag()?;
        self.ensure_valid(&record)?;
        if !self.hooks.before_save(&mut record).await {
            warn!("Update of {} vetoed by before_save", self.table);
            return Ok(0);
        }

        let command = self.commands().build_update_where(&record, where_sql, args)?;
        let affected = self.execute_one(&command).await?;
        self.hooks.updated(&record).await;
        Ok(affected)
    }

    /// Delete by key, by predicate, or everything when neither is given.
    /// The affected row is read first and handed to the delete hooks.
    pub async fn delete(
        &self,
        key: Option<DatabaseValue>,
        where_sql: Option<&str>,
        args: Vec<DatabaseValue>,
    ) -> OrmResult<u64> {
        let target = match (&key, where_sql) {
            (Some(key), _) => self.single(key.clone()).await?,
            (None, Some(fragment)) if !fragment.trim().is_empty() => {
                self.single_where(fragment, args.clone()).await?
            }
            _ => None,
        };

        if !self.hooks.before_delete(target.as_ref()).await {
            warn!("Delete from {} vetoed by before_delete", self.table);
            return Ok(0);
        }

        let command = self.commands().build_delete(where_sql, key, args);
        let affected = self.execute_one(&command).await?;
        self.hooks.deleted(target.as_ref()).await;
        Ok(affected)
    }

    /// Insert or update each record (by presence of a key) in one transaction.
    /// Every record is validated first; a single failure aborts the batch
    /// before anything is executed and reports the messages of all records.
    pub async fn save<I>(&self, records: I) -> OrmResult<u64>
    where
        I: IntoIterator,
        I::Item: IntoAttributeBag,
    {
        let records = records
            .into_iter()
            .map(IntoAttributeBag::into_attribute_bag)
            .collect::<OrmResult<Vec<_>>>()?;

        let mut errors = ValidationErrors::new();
        for record in &records {
            errors.merge(self.validate(record));
        }
        if !errors.is_empty() {
            return Err(ModelError::Validation(errors));
        }

        let builder = self.commands();
        let commands = records
            .iter()
            .map(|record| match record.primary_key(&self.primary_key) {
                Some(key) => builder.build_update_by_key(record, key.clone()),
                None => builder.build_insert(record),
            })
            .collect::<OrmResult<Vec<_>>>()?;

        self.execute(commands).await
    }

    async fn execute_one(&self, command: &Command) -> OrmResult<u64> {
        debug!("Execute: {} ({} params)", command.sql, command.params.len());
        self.pool.execute(&command.sql, &command.params).await
    }
}

impl std::fmt::Debug for DynamicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicModel")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("descriptor_field", &self.descriptor_field)
            .field("dialect", &self.dialect)
            .finish()
    }
}

fn to_count(value: DatabaseValue) -> OrmResult<u64> {
    match value {
        DatabaseValue::Null => Ok(0),
        other => other
            .as_i64()
            .and_then(|count| u64::try_from(count).ok())
            .ok_or_else(|| ModelError::Database(format!("Count query returned {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_count() {
        assert_eq!(to_count(DatabaseValue::Int64(45)).unwrap(), 45);
        assert_eq!(to_count(DatabaseValue::Null).unwrap(), 0);
        assert_eq!(to_count(DatabaseValue::String("7".into())).unwrap(), 7);
        assert!(to_count(DatabaseValue::Bool(true)).is_err());
        assert!(to_count(DatabaseValue::Int64(-1)).is_err());
    }
}
