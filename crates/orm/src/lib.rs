//! # elif-dynamic: Convention-based data access for elif.rs
//!
//! Table access without a compile-time schema. Records are ordered,
//! case-insensitive attribute bags; INSERT/UPDATE/DELETE statements are
//! synthesized from them, queries are inferred from method names and named
//! arguments, and paging pairs a count with an ordered window.
//!
//! ```no_run
//! use elif_dynamic::{DynamicCall, DynamicModel, DynamicResult};
//!
//! # async fn demo() -> elif_dynamic::OrmResult<()> {
//! let customers = DynamicModel::open("default", "customers").await?;
//! let call = DynamicCall::new("FindByEmail").arg("Email", "ann@example.com");
//! if let DynamicResult::Row(Some(customer)) = customers.invoke(&call).await? {
//!     println!("{}", customer.to_json());
//! }
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod backends;
pub mod command;
pub mod config;
pub mod convention;
pub mod dialect;
pub mod error;
pub mod hooks;
pub mod model;
pub mod query;
pub mod schema;
pub mod validation;

// Re-export core traits and types
pub use attributes::{AttributeBag, FormData, IntoAttributeBag};
pub use backends::{
    DatabaseBackend, DatabaseBackendRegistry, DatabaseBackendType, DatabaseConnection, DatabasePool,
    DatabaseRow, DatabaseTransaction, DatabaseValue, PostgresBackend, RowStream,
};
pub use command::{Command, CommandBuilder};
pub use config::{ConfigError, ConnectionSettings, DEFAULT_CONNECTION};
pub use convention::{ConventionPlan, ConventionRequest, DynamicCall, Verb};
pub use dialect::SqlDialect;
pub use error::{ModelError, ModelResult, OrmError, OrmResult};
pub use hooks::{ModelHooks, NoHooks};
pub use model::{DynamicModel, DynamicResult, DEFAULT_PRIMARY_KEY};
pub use query::{PageSource, PagedResult, PagingPlan, QueryOptions, Records};
pub use schema::{ColumnDescriptor, SchemaCache};
pub use validation::{ValidationError, ValidationErrors};
