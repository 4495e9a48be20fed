//! SELECT synthesis

use super::{order_clause, where_clause, QueryOptions};
use crate::command::Command;
use crate::dialect::SqlDialect;

/// SELECT over `table` honouring the options' filter, order, projection and
/// limit. The options' arguments become the command parameters.
pub fn build_select(dialect: SqlDialect, table: &str, options: &QueryOptions) -> Command {
    let columns = if options.columns.trim().is_empty() { "*" } else { options.columns.as_str() };
    let sql = dialect.select(
        columns,
        table,
        &where_clause(&options.where_sql),
        &order_clause(&options.order_by),
        options.limit,
    );
    Command::new(sql, options.args.clone())
}
