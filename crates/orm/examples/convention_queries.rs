//! Convention Query Examples
//!
//! Runs a few convention calls, a paged read and a batched save against a
//! PostgreSQL `customers` table:
//!
//! ```sql
//! CREATE TABLE customers (
//!     ID serial PRIMARY KEY,
//!     LastName text,
//!     Email text,
//!     Status text DEFAULT 'new',
//!     CreatedAt timestamptz DEFAULT now()
//! );
//! ```
//!
//! Run with `DATABASE_URL=postgres://... RUST_LOG=elif_dynamic=debug`.

use async_trait::async_trait;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use elif_dynamic::{
    AttributeBag, DynamicCall, DynamicModel, DynamicResult, ModelHooks, OrmResult, QueryOptions,
    ValidationErrors,
};

struct CustomerRules;

#[async_trait]
impl ModelHooks for CustomerRules {
    fn validate(&self, record: &AttributeBag, errors: &mut ValidationErrors) {
        errors.validates_presence_of(record, "Email", "Email is required");
    }
}

#[tokio::main]
async fn main() -> OrmResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let customers = DynamicModel::open("default", "customers")
        .await?
        .with_descriptor_field("LastName")
        .with_hooks(CustomerRules);

    let mut draft = customers.prototype().await?;
    draft.insert("LastName", "Smith");
    draft.insert("Email", "smith@example.com");
    if let Some(saved) = customers.insert(draft).await? {
        println!("inserted {}", saved.to_json());
    }

    let saved = customers
        .save(vec![
            serde_json::json!({"LastName": "Jones", "Email": "jones@example.com"}),
            serde_json::json!({"LastName": "Lee", "Email": "lee@example.com"}),
        ])
        .await?;
    println!("batch saved {} rows", saved);

    let call = DynamicCall::new("FindByLastName").arg("LastName", "Smith");
    if let DynamicResult::Row(Some(row)) = customers.invoke(&call).await? {
        println!("found {}", row.to_json());
    }

    if let DynamicResult::Count(total) = customers.invoke(&DynamicCall::new("Count")).await? {
        println!("{} customers", total);
    }

    let page = customers
        .paged(&QueryOptions::new().order_by("LastName").paginate(10, 1))
        .await?;
    println!("page 1 of {} ({} records)", page.total_pages, page.total_records);
    let mut rows = page.items.stream();
    while let Some(row) = rows.next().await {
        println!("  {}", row?.to_json());
    }

    for (key, name) in customers.key_values("LastName").await? {
        println!("{:?} => {:?}", key, name);
    }

    Ok(())
}
