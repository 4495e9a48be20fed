//! Query synthesis - SELECT statements, paging windows and lazy result sets
//!
//! Where, order and column fragments are trusted literal SQL. A fragment
//! gets its `WHERE` / `ORDER BY` keyword only when it does not already start
//! with one (compared case-insensitively).

pub mod execution;
pub mod pagination;
pub mod select;

pub use execution::Records;
pub use pagination::{total_pages, PageSource, PagedResult, PagingPlan};
pub use select::build_select;

use crate::backends::DatabaseValue;

/// Options for a single query or a page of one
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub where_sql: String,
    pub order_by: String,
    pub columns: String,
    /// 0 means unlimited
    pub limit: usize,
    pub args: Vec<DatabaseValue>,
    pub page_size: u64,
    /// 1-based
    pub current_page: u64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            where_sql: String::new(),
            order_by: String::new(),
            columns: "*".to_string(),
            limit: 0,
            args: Vec::new(),
            page_size: 20,
            current_page: 1,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter fragment and its arguments
    pub fn filter(mut self, where_sql: &str, args: Vec<DatabaseValue>) -> Self {
        self.where_sql = where_sql.to_string();
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = order_by.to_string();
        self
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Page window (LIMIT + OFFSET)
    pub fn paginate(mut self, page_size: u64, current_page: u64) -> Self {
        self.page_size = page_size;
        self.current_page = current_page;
        self
    }
}

/// `WHERE <fragment>` unless the fragment already carries the keyword
pub fn where_clause(fragment: &str) -> String {
    keyword_clause("WHERE", fragment)
}

/// `ORDER BY <fragment>` unless the fragment already carries the keyword
pub fn order_clause(fragment: &str) -> String {
    keyword_clause("ORDER BY", fragment)
}

fn keyword_clause(keyword: &str, fragment: &str) -> String {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        String::new()
    } else if starts_with_keyword(fragment, keyword) {
        fragment.to_string()
    } else {
        format!("{} {}", keyword, fragment)
    }
}

fn starts_with_keyword(fragment: &str, keyword: &str) -> bool {
    match (fragment.get(..keyword.len()), fragment.get(keyword.len()..)) {
        (Some(head), Some(rest)) => {
            head.eq_ignore_ascii_case(keyword) && rest.chars().next().map_or(true, char::is_whitespace)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_prefixing() {
        assert_eq!(where_clause("age > $1"), "WHERE age > $1");
        assert_eq!(where_clause("  where age > $1"), "where age > $1");
        assert_eq!(where_clause("whereabouts = $1"), "WHERE whereabouts = $1");
        assert_eq!(where_clause("   "), "");
        assert_eq!(order_clause("name DESC"), "ORDER BY name DESC");
        assert_eq!(order_clause("Order By name"), "Order By name");
    }

    #[test]
    fn test_query_options_builder() {
        let options = QueryOptions::new()
            .filter("age > $1", vec![DatabaseValue::Int32(30)])
            .order_by("name")
            .columns("id, name")
            .limit(5)
            .paginate(10, 2);

        assert_eq!(options.where_sql, "age > $1");
        assert_eq!(options.columns, "id, name");
        assert_eq!(options.limit, 5);
        assert_eq!((options.page_size, options.current_page), (10, 2));
        assert_eq!(QueryOptions::default().columns, "*");
    }
}
