//! Paging: a count over the filtered source plus one ordered window of it

use super::{order_clause, where_clause, QueryOptions, Records};
use crate::command::Command;
use crate::dialect::SqlDialect;
use crate::error::{ModelError, OrmResult};

/// What a page is cut from
#[derive(Debug, Clone, PartialEq)]
pub enum PageSource {
    /// A table or view name
    Table(String),
    /// Arbitrary SQL, wrapped as a derived table
    Sql(String),
}

impl PageSource {
    fn from_clause(&self, dialect: SqlDialect) -> String {
        match self {
            PageSource::Table(table) => table.clone(),
            PageSource::Sql(sql) => dialect.subquery(sql),
        }
    }
}

/// The two statements behind one page
#[derive(Debug, Clone, PartialEq)]
pub struct PagingPlan {
    pub count: Command,
    pub window: Command,
    pub page_size: u64,
    pub current_page: u64,
}

impl PagingPlan {
    /// Plan a page of `source`. Without an explicit order the window is
    /// ordered by `primary_key`, so pages are stable.
    pub fn build(
        dialect: SqlDialect,
        source: &PageSource,
        primary_key: &str,
        options: &QueryOptions,
    ) -> OrmResult<Self> {
        if options.page_size == 0 {
            return Err(ModelError::Usage("Page size must be greater than zero".to_string()));
        }
        if options.current_page == 0 {
            return Err(ModelError::Usage("Pages are numbered from 1".to_string()));
        }

        let from = source.from_clause(dialect);
        let where_sql = where_clause(&options.where_sql);
        let order_sql = if options.order_by.trim().is_empty() {
            order_clause(primary_key)
        } else {
            order_clause(&options.order_by)
        };
        let columns = if options.columns.trim().is_empty() { "*" } else { options.columns.as_str() };
        let offset = (options.current_page - 1).saturating_mul(options.page_size);

        Ok(Self {
            count: Command::new(dialect.count("*", &from, &where_sql), options.args.clone()),
            window: Command::new(
                dialect.window(columns, &from, &where_sql, &order_sql, options.page_size, offset),
                options.args.clone(),
            ),
            page_size: options.page_size,
            current_page: options.current_page,
        })
    }
}

/// Number of pages needed for `total` records; an exact fit adds no page
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// One page of records with the totals of the whole filtered source
#[derive(Debug)]
pub struct PagedResult {
    pub items: Records,
    pub total_records: u64,
    pub total_pages: u64,
}
