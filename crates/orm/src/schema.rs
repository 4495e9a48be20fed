//! Schema cache and default value resolution
//!
//! Column metadata is loaded once per model through the dialect's
//! describe-table query and kept for the lifetime of the model. Concurrent
//! first access performs a single load; a failed load is not cached, so the
//! next caller sees the failure again rather than an empty schema.

use chrono::Utc;
use tokio::sync::OnceCell;

use crate::attributes::AttributeBag;
use crate::backends::{DatabasePool, DatabaseRow, DatabaseValue};
use crate::dialect::SqlDialect;
use crate::error::{ModelError, OrmResult};

/// Metadata for one table column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    /// Declared default expression, verbatim
    pub default: Option<String>,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            default: None,
            nullable: true,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Build a descriptor from a describe-table row
    pub fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self> {
        let name = match row.get_by_name("column_name")? {
            DatabaseValue::String(name) => name,
            other => {
                return Err(ModelError::Schema(format!(
                    "Describe query returned a non-text column name: {:?}",
                    other
                )))
            }
        };
        let data_type = row.get_by_name("data_type")?.as_str().unwrap_or_default().to_string();
        let default = match row.get_by_name("column_default")? {
            DatabaseValue::Null => None,
            DatabaseValue::String(s) => Some(s),
            other => Some(other.to_json().to_string()),
        };
        let nullable = row
            .get_by_name("is_nullable")?
            .as_str()
            .map(|flag| !flag.eq_ignore_ascii_case("NO"))
            .unwrap_or(true);

        Ok(Self {
            name,
            data_type,
            default,
            nullable,
        })
    }

    /// Value to pre-fill a new record with
    pub fn default_value(&self) -> DatabaseValue {
        match &self.default {
            Some(expression) => resolve_default(expression),
            None => DatabaseValue::Null,
        }
    }
}

/// Lazily loaded, never invalidated column metadata for one table
#[derive(Debug)]
pub struct SchemaCache {
    table: String,
    dialect: SqlDialect,
    columns: OnceCell<Vec<ColumnDescriptor>>,
}

impl SchemaCache {
    pub fn new(table: impl Into<String>, dialect: SqlDialect) -> Self {
        Self {
            table: table.into(),
            dialect,
            columns: OnceCell::new(),
        }
    }

    /// Columns in declaration order, loading them on first use
    pub async fn columns(&self, pool: &dyn DatabasePool) -> OrmResult<&[ColumnDescriptor]> {
        let columns = self
            .columns
            .get_or_try_init(|| async {
                let (sql, params) = self.dialect.describe_table(&self.table);
                tracing::debug!("Loading schema for table {}", self.table);
                let rows = pool.fetch_all(&sql, &params).await?;
                let columns = rows
                    .iter()
                    .map(|row| ColumnDescriptor::from_row(row.as_ref()))
                    .collect::<OrmResult<Vec<_>>>()?;
                if columns.is_empty() {
                    tracing::warn!("Table {} has no columns or does not exist", self.table);
                }
                Ok::<_, ModelError>(columns)
            })
            .await?;
        Ok(columns.as_slice())
    }

    /// Columns if they have already been loaded
    pub fn loaded(&self) -> Option<&[ColumnDescriptor]> {
        self.columns.get().map(Vec::as_slice)
    }

    pub async fn get_column(&self, pool: &dyn DatabasePool, name: &str) -> OrmResult<Option<&ColumnDescriptor>> {
        let columns = self.columns(pool).await?;
        Ok(columns.iter().find(|column| column.name.eq_ignore_ascii_case(name)))
    }

    pub async fn column_exists(&self, pool: &dyn DatabasePool, name: &str) -> OrmResult<bool> {
        Ok(self.get_column(pool, name).await?.is_some())
    }

    /// Default for a column; unknown columns are a schema error
    pub async fn default_value(&self, pool: &dyn DatabasePool, name: &str) -> OrmResult<DatabaseValue> {
        self.get_column(pool, name)
            .await?
            .map(ColumnDescriptor::default_value)
            .ok_or_else(|| ModelError::Schema(format!("Table {} has no column '{}'", self.table, name)))
    }

    /// A record holding every column's default
    pub async fn prototype(&self, pool: &dyn DatabasePool) -> OrmResult<AttributeBag> {
        Ok(self
            .columns(pool)
            .await?
            .iter()
            .map(|column| (column.name.clone(), column.default_value()))
            .collect())
    }
}

/// Resolve a declared default expression into a concrete value.
///
/// Clock and identifier generators produce a fresh value, sequence defaults
/// stay null (the database assigns them), literals are unquoted and typed.
pub fn resolve_default(expression: &str) -> DatabaseValue {
    let expression = strip_wrapping_parens(expression.trim());
    let lowered = expression.to_lowercase();

    if lowered == "null" || lowered.starts_with("null::") {
        return DatabaseValue::Null;
    }

    match lowered.as_str() {
        "now()" | "current_timestamp" | "current_timestamp()" | "getdate()" | "getutcdate()"
        | "sysdatetime()" | "localtimestamp" | "transaction_timestamp()" | "datetime('now')" => {
            return DatabaseValue::DateTime(Utc::now())
        }
        "current_date" | "curdate()" | "date('now')" => return DatabaseValue::Date(Utc::now().date_naive()),
        "newid()" | "newsequentialid()" | "gen_random_uuid()" | "uuid_generate_v4()" | "uuid()" => {
            return DatabaseValue::Uuid(uuid::Uuid::new_v4())
        }
        "true" => return DatabaseValue::Bool(true),
        "false" => return DatabaseValue::Bool(false),
        _ => {}
    }

    if lowered.starts_with("nextval(") {
        return DatabaseValue::Null;
    }

    if let Some(literal) = quoted_literal(expression) {
        return DatabaseValue::String(literal);
    }

    // strip a trailing cast such as 0::integer
    let bare = expression.split("::").next().unwrap_or(expression).trim();
    if let Ok(i) = bare.parse::<i64>() {
        return i32::try_from(i).map(DatabaseValue::Int32).unwrap_or(DatabaseValue::Int64(i));
    }
    if let Ok(f) = bare.parse::<f64>() {
        return DatabaseValue::Float64(f);
    }

    DatabaseValue::String(bare.to_string())
}

/// Remove parentheses that wrap the whole expression: `((0))` -> `0`
fn strip_wrapping_parens(mut expression: &str) -> &str {
    while expression.starts_with('(') && expression.ends_with(')') && outer_pair_wraps(expression) {
        expression = expression[1..expression.len() - 1].trim();
    }
    expression
}

fn outer_pair_wraps(expression: &str) -> bool {
    let mut depth = 0usize;
    for (index, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && index != expression.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// `'text'`, `N'text'` or `'text'::character varying`
fn quoted_literal(expression: &str) -> Option<String> {
    let body = expression.strip_prefix('N').unwrap_or(expression);
    let body = body.strip_prefix('\'')?;
    let end = body.rfind('\'')?;
    Some(body[..end].replace("''", "'"))
}
