//! Lazy result sets

use std::fmt;
use std::sync::Arc;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};

use crate::attributes::AttributeBag;
use crate::backends::DatabasePool;
use crate::command::Command;
use crate::error::OrmResult;

/// A query that has not been run yet.
///
/// Every call to [`Records::stream`] issues the command again and yields rows
/// as they arrive; dropping the stream early releases the cursor.
#[derive(Clone)]
pub struct Records {
    pool: Arc<dyn DatabasePool>,
    command: Command,
}

impl Records {
    pub fn new(pool: Arc<dyn DatabasePool>, command: Command) -> Self {
        Self { pool, command }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Forward-only stream of materialized rows
    pub fn stream(&self) -> BoxStream<'_, OrmResult<AttributeBag>> {
        tracing::debug!("Query: {} ({} params)", self.command.sql, self.command.params.len());
        self.pool
            .fetch(&self.command.sql, &self.command.params)
            .map(|row| row.and_then(|row| AttributeBag::from_row(row.as_ref())))
            .boxed()
    }

    pub async fn to_vec(&self) -> OrmResult<Vec<AttributeBag>> {
        self.stream().try_collect().await
    }

    /// First row only; the rest of the result is never read
    pub async fn first(&self) -> OrmResult<Option<AttributeBag>> {
        self.stream().next().await.transpose()
    }
}

impl fmt::Debug for Records {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records").field("command", &self.command).finish()
    }
}
