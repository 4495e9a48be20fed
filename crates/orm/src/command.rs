//! INSERT / UPDATE / DELETE synthesis from attribute bags
//!
//! Column names and where fragments are trusted SQL text; only values are
//! bound as parameters.

use crate::attributes::AttributeBag;
use crate::backends::DatabaseValue;
use crate::dialect::SqlDialect;
use crate::error::{ModelError, OrmResult};
use crate::query::where_clause;

/// Statement text plus its ordered parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

impl Command {
    pub fn new(sql: impl Into<String>, params: Vec<DatabaseValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Builds DML commands against one table
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    table: &'a str,
    primary_key: &'a str,
    dialect: SqlDialect,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(table: &'a str, primary_key: &'a str, dialect: SqlDialect) -> Self {
        Self {
            table,
            primary_key,
            dialect,
        }
    }

    fn is_key(&self, column: &str) -> bool {
        column.eq_ignore_ascii_case(self.primary_key)
    }

    /// `<pk> = <first placeholder>`
    pub fn key_predicate(&self) -> String {
        format!("{} = {}", self.primary_key, self.dialect.placeholder(0))
    }

    /// INSERT binding every entry in insertion order. A null primary key is
    /// left out so the database can generate it.
    pub fn build_insert(&self, bag: &AttributeBag) -> OrmResult<Command> {
        let entries: Vec<(&str, &DatabaseValue)> = bag
            .iter()
            .filter(|(column, value)| !(self.is_key(column) && value.is_null()))
            .collect();

        if entries.is_empty() {
            return Err(ModelError::NoOp(format!("No columns to insert into {}", self.table)));
        }

        let columns: Vec<&str> = entries.iter().map(|(column, _)| *column).collect();
        let placeholders: Vec<String> = (0..entries.len()).map(|i| self.dialect.placeholder(i)).collect();
        let params = entries.into_iter().map(|(_, value)| value.clone()).collect();

        Ok(Command::new(self.dialect.insert(self.table, &columns, &placeholders), params))
    }

    /// UPDATE of the row identified by `key`
    pub fn build_update_by_key(&self, bag: &AttributeBag, key: DatabaseValue) -> OrmResult<Command> {
        self.build_update_where(bag, &self.key_predicate(), vec![key])
    }

    /// UPDATE of every row matching `where_sql`.
    ///
    /// The primary key and null-valued entries never appear in SET. SET
    /// placeholders are numbered after the where arguments.
    pub fn build_update_where(
        &self,
        bag: &AttributeBag,
        where_sql: &str,
        where_args: Vec<DatabaseValue>,
    ) -> OrmResult<Command> {
        let entries: Vec<(&str, &DatabaseValue)> = bag
            .iter()
            .filter(|(column, value)| !self.is_key(column) && !value.is_null())
            .collect();

        if entries.is_empty() {
            return Err(ModelError::NoOp(format!("No columns to update in {}", self.table)));
        }

        let first_ordinal = where_args.len();
        let assignments: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = {}", column, self.dialect.placeholder(first_ordinal + i)))
            .collect();
        let set_values = entries.into_iter().map(|(_, value)| value.clone());

        // anonymous placeholders bind in textual order: SET before WHERE
        let params: Vec<DatabaseValue> = if self.dialect.numbered_parameters() {
            where_args.into_iter().chain(set_values).collect()
        } else {
            set_values.chain(where_args).collect()
        };

        Ok(Command::new(
            self.dialect.update(self.table, &assignments, &where_clause(where_sql)),
            params,
        ))
    }

    /// DELETE by key, by predicate, or of every row when neither is given.
    /// A key takes precedence over `where_sql`.
    pub fn build_delete(
        &self,
        where_sql: Option<&str>,
        key: Option<DatabaseValue>,
        where_args: Vec<DatabaseValue>,
    ) -> Command {
        if let Some(key) = key {
            let sql = self.dialect.delete(self.table, &where_clause(&self.key_predicate()));
            return Command::new(sql, vec![key]);
        }

        match where_sql.filter(|fragment| !fragment.trim().is_empty()) {
            Some(fragment) => Command::new(self.dialect.delete(self.table, &where_clause(fragment)), where_args),
            None => {
                tracing::warn!("Building unfiltered DELETE for table {}", self.table);
                Command::raw(self.dialect.delete(self.table, ""))
            }
        }
    }
}
