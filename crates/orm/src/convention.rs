//! Convention-based query dispatch
//!
//! A [`DynamicCall`] is a method name plus named arguments that are only
//! known at run time, e.g. `FindByEmail(email: "a@b.c")` or
//! `Sum(columns: "total", status: "paid")`. The method name picks the query
//! shape and each argument becomes either an equality filter or one of the
//! control options `orderby` and `columns`.
//!
//! | method name                             | shape                       |
//! |-----------------------------------------|-----------------------------|
//! | `count`                                 | row count                   |
//! | `sum` / `max` / `min` / `avg`           | aggregate over `columns`    |
//! | `First*` / `Get*` / `Find*` / `Single*` | one row, key ascending      |
//! | `Last*`                                 | one row, key descending     |
//! | anything else                           | every matching row          |

use crate::backends::DatabaseValue;
use crate::command::Command;
use crate::dialect::SqlDialect;
use crate::error::{ModelError, OrmResult};
use crate::query::{build_select, QueryOptions};

const ORDER_BY_ARGUMENT: &str = "orderby";
const COLUMNS_ARGUMENT: &str = "columns";

/// Query intent inferred from a method name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Count,
    Sum,
    Max,
    Min,
    Avg,
    First,
    Last,
    FindMany,
    Single,
}

impl Verb {
    pub fn from_method_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "count" => return Verb::Count,
            "sum" => return Verb::Sum,
            "max" => return Verb::Max,
            "min" => return Verb::Min,
            "avg" => return Verb::Avg,
            _ => {}
        }

        // Prefixes are case-sensitive: `lastOrders` is a plain listing
        if name.starts_with("Last") {
            Verb::Last
        } else if name.starts_with("First") {
            Verb::First
        } else if name.starts_with("Get") || name.starts_with("Find") || name.starts_with("Single") {
            Verb::Single
        } else {
            Verb::FindMany
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Verb::Count | Verb::Sum | Verb::Max | Verb::Min | Verb::Avg)
    }

    pub fn returns_single_row(&self) -> bool {
        matches!(self, Verb::First | Verb::Last | Verb::Single)
    }
}

/// An invocation resolved at run time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicCall {
    pub method: String,
    pub arguments: Vec<DatabaseValue>,
    pub argument_names: Vec<String>,
}

impl DynamicCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Add a named argument
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.argument_names.push(name.into());
        self.arguments.push(value.into());
        self
    }

    /// Add an argument without a name (rejected at dispatch)
    pub fn positional(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.arguments.push(value.into());
        self
    }
}

/// A [`DynamicCall`] sorted into intent, filters and options
#[derive(Debug, Clone, PartialEq)]
pub struct ConventionRequest {
    pub verb: Verb,
    /// Equality filters in argument order
    pub filters: Vec<(String, DatabaseValue)>,
    pub order_by: Option<String>,
    pub columns: Option<String>,
}

impl ConventionRequest {
    pub fn parse(call: &DynamicCall) -> OrmResult<Self> {
        if call.arguments.len() != call.argument_names.len() {
            return Err(ModelError::Usage(format!(
                "{} received {} arguments but {} names; every argument must be named",
                call.method,
                call.arguments.len(),
                call.argument_names.len()
            )));
        }

        let mut request = ConventionRequest {
            verb: Verb::from_method_name(&call.method),
            filters: Vec::new(),
            order_by: None,
            columns: None,
        };

        for (name, value) in call.argument_names.iter().zip(&call.arguments) {
            if name.eq_ignore_ascii_case(ORDER_BY_ARGUMENT) {
                request.order_by = Some(option_text(name, value)?);
            } else if name.eq_ignore_ascii_case(COLUMNS_ARGUMENT) {
                request.columns = Some(option_text(name, value)?);
            } else {
                request.filters.push((name.clone(), value.clone()));
            }
        }

        Ok(request)
    }
}

fn option_text(name: &str, value: &DatabaseValue) -> OrmResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::Usage(format!("'{}' expects a SQL fragment, got {:?}", name, value)))
}

/// What a convention call turns into
#[derive(Debug, Clone, PartialEq)]
pub enum ConventionPlan {
    /// Scalar row count
    Count(Command),
    /// Scalar aggregate value
    Aggregate(Command),
    /// At most one row
    Single(Command),
    /// Every matching row
    Many(Command),
    /// The dialect has no function for this aggregate; nothing is executed
    NoResult,
}

impl ConventionPlan {
    pub fn build(
        request: &ConventionRequest,
        dialect: SqlDialect,
        table: &str,
        primary_key: &str,
    ) -> OrmResult<Self> {
        let predicates: Vec<String> = request
            .filters
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = {}", column, dialect.placeholder(i)))
            .collect();
        let where_sql = predicates.join(" AND ");
        let params: Vec<DatabaseValue> = request.filters.iter().map(|(_, value)| value.clone()).collect();

        if request.verb.is_aggregate() {
            let function = dialect.aggregate_function(request.verb);
            return Self::aggregate(request, function, dialect, table, &where_sql, params);
        }

        let direction = if request.verb == Verb::Last { "DESC" } else { "ASC" };
        let order_by = request
            .order_by
            .clone()
            .unwrap_or_else(|| format!("{} {}", primary_key, direction));
        let limit = if request.verb.returns_single_row() { 1 } else { 0 };

        let options = QueryOptions::new()
            .filter(&where_sql, params)
            .order_by(&order_by)
            .columns(request.columns.as_deref().unwrap_or("*"))
            .limit(limit);
        let command = build_select(dialect, table, &options);

        Ok(if limit == 1 {
            ConventionPlan::Single(command)
        } else {
            ConventionPlan::Many(command)
        })
    }

    fn aggregate(
        request: &ConventionRequest,
        function: Option<&'static str>,
        dialect: SqlDialect,
        table: &str,
        where_sql: &str,
        params: Vec<DatabaseValue>,
    ) -> OrmResult<Self> {
        let Some(function) = function else {
            tracing::debug!("No {:?} aggregate for {:?}; returning no result", request.verb, dialect);
            return Ok(ConventionPlan::NoResult);
        };
        let columns = match (&request.columns, request.verb) {
            (Some(columns), _) => columns.as_str(),
            (None, Verb::Count) => "*",
            (None, verb) => {
                return Err(ModelError::Usage(format!(
                    "{:?} needs a 'columns' argument naming what to aggregate",
                    verb
                )))
            }
        };
        let sql = dialect.aggregate(function, columns, table, &crate::query::where_clause(where_sql));
        let command = Command::new(sql, params);
        Ok(match request.verb {
            Verb::Count => ConventionPlan::Count(command),
            _ => ConventionPlan::Aggregate(command),
        })
    }
}
