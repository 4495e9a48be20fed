//! Statement templates per SQL dialect
//!
//! Each dialect owns the textual skeleton of every statement the dynamic model
//! emits, the rendering of positional placeholders, and the aggregate function
//! names available to convention calls. Fragments handed in here are already
//! complete clauses (`WHERE ...`, `ORDER BY ...`) or empty.

use crate::backends::DatabaseValue;
use crate::convention::Verb;

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    PostgreSQL,
    MySQL,
    SQLite,
    SqlServer,
}

impl SqlDialect {
    /// Prefix character of a positional placeholder
    pub fn parameter_prefix(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "$",
            SqlDialect::MySQL | SqlDialect::SQLite => "?",
            SqlDialect::SqlServer => "@",
        }
    }

    /// Render the placeholder for a zero-based parameter ordinal.
    ///
    /// PostgreSQL and SQLite number their parameters from one, SQL Server from
    /// zero, and MySQL placeholders are anonymous.
    pub fn placeholder(&self, ordinal: usize) -> String {
        match self {
            SqlDialect::PostgreSQL | SqlDialect::SQLite => format!("{}{}", self.parameter_prefix(), ordinal + 1),
            SqlDialect::MySQL => self.parameter_prefix().to_string(),
            SqlDialect::SqlServer => format!("{}{}", self.parameter_prefix(), ordinal),
        }
    }

    /// Whether placeholders carry their ordinal. Anonymous placeholders bind
    /// in order of appearance in the statement text.
    pub fn numbered_parameters(&self) -> bool {
        !matches!(self, SqlDialect::MySQL)
    }

    /// SELECT with optional row limit (0 = unlimited)
    pub fn select(&self, columns: &str, table: &str, where_sql: &str, order_sql: &str, limit: usize) -> String {
        match (self, limit) {
            (_, 0) => join_clauses(&[format!("SELECT {} FROM {}", columns, table).as_str(), where_sql, order_sql]),
            (SqlDialect::SqlServer, limit) => join_clauses(&[
                format!("SELECT TOP {} {} FROM {}", limit, columns, table).as_str(),
                where_sql,
                order_sql,
            ]),
            (_, limit) => join_clauses(&[
                format!("SELECT {} FROM {}", columns, table).as_str(),
                where_sql,
                order_sql,
                format!("LIMIT {}", limit).as_str(),
            ]),
        }
    }

    /// One page of an ordered source
    pub fn window(
        &self,
        columns: &str,
        source: &str,
        where_sql: &str,
        order_sql: &str,
        page_size: u64,
        offset: u64,
    ) -> String {
        let head = format!("SELECT {} FROM {}", columns, source);
        match self {
            SqlDialect::SqlServer => join_clauses(&[
                head.as_str(),
                where_sql,
                order_sql,
                format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, page_size).as_str(),
            ]),
            _ => join_clauses(&[
                head.as_str(),
                where_sql,
                order_sql,
                format!("LIMIT {} OFFSET {}", page_size, offset).as_str(),
            ]),
        }
    }

    /// Row count over a filtered source
    pub fn count(&self, count_expression: &str, source: &str, where_sql: &str) -> String {
        join_clauses(&[format!("SELECT COUNT({}) FROM {}", count_expression, source).as_str(), where_sql])
    }

    /// Aggregate over a filtered table
    pub fn aggregate(&self, function: &str, columns: &str, table: &str, where_sql: &str) -> String {
        join_clauses(&[format!("SELECT {}({}) FROM {}", function, columns, table).as_str(), where_sql])
    }

    /// Wrap arbitrary SQL so it can be used as a FROM source
    pub fn subquery(&self, sql: &str) -> String {
        format!("({}) AS paged_source", sql.trim().trim_end_matches(';'))
    }

    pub fn insert(&self, table: &str, columns: &[&str], placeholders: &[String]) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn update(&self, table: &str, assignments: &[String], where_sql: &str) -> String {
        join_clauses(&[format!("UPDATE {} SET {}", table, assignments.join(", ")).as_str(), where_sql])
    }

    pub fn delete(&self, table: &str, where_sql: &str) -> String {
        join_clauses(&[format!("DELETE FROM {}", table).as_str(), where_sql])
    }

    /// Query returning the key generated by the last insert on the same connection
    pub fn identity_query(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "SELECT lastval()",
            SqlDialect::MySQL => "SELECT LAST_INSERT_ID()",
            SqlDialect::SQLite => "SELECT last_insert_rowid()",
            SqlDialect::SqlServer => "SELECT SCOPE_IDENTITY()",
        }
    }

    /// Aggregate function for a convention verb, or `None` when the verb is
    /// not an aggregate this dialect supports.
    pub fn aggregate_function(&self, verb: Verb) -> Option<&'static str> {
        match verb {
            Verb::Count => Some("COUNT"),
            Verb::Sum => Some("SUM"),
            Verb::Max => Some("MAX"),
            Verb::Min => Some("MIN"),
            Verb::Avg => Some("AVG"),
            Verb::First | Verb::Last | Verb::Single | Verb::FindMany => None,
        }
    }

    /// Describe-table query yielding `column_name`, `data_type`,
    /// `column_default` and `is_nullable` ("YES"/"NO") per column, in
    /// declaration order.
    pub fn describe_table(&self, table: &str) -> (String, Vec<DatabaseValue>) {
        let bare_table = table.rsplit('.').next().unwrap_or(table).to_string();
        let sql = match self {
            SqlDialect::PostgreSQL => format!(
                "SELECT column_name::text AS column_name, data_type::text AS data_type, \
                 column_default::text AS column_default, is_nullable::text AS is_nullable \
                 FROM information_schema.columns WHERE table_name = {} ORDER BY ordinal_position",
                self.placeholder(0)
            ),
            SqlDialect::MySQL => format!(
                "SELECT COLUMN_NAME AS column_name, DATA_TYPE AS data_type, \
                 COLUMN_DEFAULT AS column_default, IS_NULLABLE AS is_nullable \
                 FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = {} \
                 ORDER BY ordinal_position",
                self.placeholder(0)
            ),
            SqlDialect::SQLite => format!(
                "SELECT name AS column_name, type AS data_type, dflt_value AS column_default, \
                 CASE WHEN \"notnull\" = 1 THEN 'NO' ELSE 'YES' END AS is_nullable \
                 FROM pragma_table_info({}) ORDER BY cid",
                self.placeholder(0)
            ),
            SqlDialect::SqlServer => format!(
                "SELECT COLUMN_NAME AS column_name, DATA_TYPE AS data_type, \
                 COLUMN_DEFAULT AS column_default, IS_NULLABLE AS is_nullable \
                 FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} ORDER BY ORDINAL_POSITION",
                self.placeholder(0)
            ),
        };
        (sql, vec![DatabaseValue::String(bare_table)])
    }
}

/// Join non-empty clauses with single spaces
fn join_clauses(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
