mod common;

use async_trait::async_trait;
use common::{MockPool, MockRow, RecordingHooks};
use elif_dynamic::{AttributeBag, DatabaseValue, DynamicModel, ModelError, ModelHooks, SqlDialect, ValidationErrors};
use serde_json::json;

fn customers(pool: &MockPool, hooks: RecordingHooks) -> DynamicModel {
    DynamicModel::new(pool.shared(), SqlDialect::PostgreSQL, "customers").with_hooks(hooks)
}

#[tokio::test]
async fn test_insert_populates_generated_key() {
    let pool = MockPool::new();
    pool.respond("lastval", vec![MockRow::scalar(DatabaseValue::Int64(42))]);
    let hooks = RecordingHooks::default();
    let model = customers(&pool, hooks.clone());

    let record = model
        .insert(json!({"Name": "Ann", "Email": "ann@example.com"}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.get("id"), Some(&DatabaseValue::Int64(42)));
    assert_eq!(
        pool.statements(),
        vec!["INSERT INTO customers (Name, Email) VALUES ($1, $2)", "SELECT lastval()"]
    );
    assert_eq!(hooks.events(), vec!["before_save", "inserted Some(Int64(42))"]);
}

#[tokio::test]
async fn test_insert_with_supplied_key_skips_identity_query() {
    let pool = MockPool::new();
    let model = customers(&pool, RecordingHooks::default());

    let record = model
        .insert(json!({"ID": 7, "Email": "bo@example.com"}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record.get("ID"), Some(&DatabaseValue::Int32(7)));
    assert_eq!(pool.statements(), vec!["INSERT INTO customers (ID, Email) VALUES ($1, $2)"]);
}

#[tokio::test]
async fn test_invalid_insert_executes_nothing() {
    let pool = MockPool::new();
    let hooks = RecordingHooks::default();
    let model = customers(&pool, hooks.clone());

    let err = model.insert(json!({"Name": "Ann"})).await.unwrap_err();

    assert_eq!(err.validation_errors().unwrap().messages(), vec!["Email is required"]);
    assert!(pool.statements().is_empty());
    assert!(hooks.events().is_empty());
}

#[tokio::test]
async fn test_failed_identity_read_surfaces_after_insert() {
    let pool = MockPool::new();
    pool.fail_on("lastval");
    let hooks = RecordingHooks::default();
    let model = customers(&pool, hooks.clone());

    let err = model.insert(json!({"Email": "uuid@example.com"})).await.unwrap_err();

    assert!(matches!(err, ModelError::Database(_)));
    assert_eq!(
        pool.statements(),
        vec!["INSERT INTO customers (Email) VALUES ($1)", "SELECT lastval()"]
    );
    assert_eq!(hooks.events(), vec!["before_save"]);
}

#[tokio::test]
async fn test_vetoed_insert_returns_no_record() {
    let pool = MockPool::new();
    let hooks = RecordingHooks {
        veto_save: true,
        ..Default::default()
    };
    let model = customers(&pool, hooks);

    let result = model.insert(json!({"Email": "ann@example.com"})).await.unwrap();

    assert!(result.is_none());
    assert!(pool.statements().is_empty());
}

#[tokio::test]
async fn test_update_by_key() {
    let pool = MockPool::new();
    let hooks = RecordingHooks::default();
    let model = customers(&pool, hooks.clone());

    let affected = model
        .update(json!({"ID": 3, "Email": "new@example.com", "Notes": null}), 3)
        .await
        .unwrap();

    assert_eq!(affected, 1);
    let executed = pool.executed();
    assert_eq!(executed[0].sql, "UPDATE customers SET Email = $2 WHERE ID = $1");
    assert_eq!(
        executed[0].params,
        vec![DatabaseValue::Int32(3), DatabaseValue::from("new@example.com")]
    );
    assert_eq!(hooks.events(), vec!["before_save", "updated"]);
}

#[tokio::test]
async fn test_update_where_with_blank_predicate_is_skipped() {
    let pool = MockPool::new();
    let model = customers(&pool, RecordingHooks::default());

    let affected = model
        .update_where(json!({"Email": "x@example.com"}), "  ", vec![])
        .await
        .unwrap();

    assert_eq!(affected, 0);
    assert!(pool.statements().is_empty());
}

#[tokio::test]
async fn test_update_of_only_nulls_is_noop() {
    let pool = MockPool::new();
    let model = DynamicModel::new(pool.shared(), SqlDialect::PostgreSQL, "customers");

    let err = model.update(json!({"ID": 3, "Email": null}), 3).await.unwrap_err();
    assert!(matches!(err, ModelError::NoOp(_)));
}

#[tokio::test]
async fn test_delete_reads_row_before_hooks() {
    let pool = MockPool::new();
    pool.respond(
        "SELECT * FROM customers WHERE ID = $1",
        vec![MockRow::new(vec![("ID", DatabaseValue::Int32(5)), ("Email", "a@b.c".into())])],
    );
    let hooks = RecordingHooks::default();
    let model = customers(&pool, hooks.clone());

    let affected = model.delete(Some(DatabaseValue::Int32(5)), None, vec![]).await.unwrap();

    assert_eq!(affected, 1);
    assert_eq!(
        pool.statements(),
        vec!["SELECT * FROM customers WHERE ID = $1 LIMIT 1", "DELETE FROM customers WHERE ID = $1"]
    );
    assert_eq!(hooks.events(), vec!["before_delete true", "deleted"]);
}

#[tokio::test]
async fn test_vetoed_delete_only_reads() {
    let pool = MockPool::new();
    let hooks = RecordingHooks {
        veto_delete: true,
        ..Default::default()
    };
    let model = customers(&pool, hooks);

    let affected = model
        .delete(None, Some("Email = $1"), vec!["gone@example.com".into()])
        .await
        .unwrap();

    assert_eq!(affected, 0);
    assert_eq!(pool.statements(), vec!["SELECT * FROM customers WHERE Email = $1 LIMIT 1"]);
}

#[tokio::test]
async fn test_save_rejects_whole_batch_on_any_invalid_item() {
    let pool = MockPool::new();
    let model = customers(&pool, RecordingHooks::default());

    let err = model
        .save(vec![
            json!({"Name": "Ann", "Email": "ann@example.com"}),
            json!({"Name": "Bo"}),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.validation_errors().unwrap().messages(), vec!["Email is required"]);
    assert!(pool.statements().is_empty());
    assert!(pool.events().is_empty());
}

struct ContactRules;

#[async_trait]
impl ModelHooks for ContactRules {
    fn validate(&self, record: &AttributeBag, errors: &mut ValidationErrors) {
        errors.validates_presence_of(record, "Name", "Name is required");
        errors.validates_presence_of(record, "Email", "Email is required");
    }
}

#[tokio::test]
async fn test_save_reports_every_invalid_item_in_order() {
    let pool = MockPool::new();
    let model = DynamicModel::new(pool.shared(), SqlDialect::PostgreSQL, "customers").with_hooks(ContactRules);

    let err = model
        .save(vec![
            json!({"Name": "Ann"}),
            json!({"Name": "Cy", "Email": "cy@example.com"}),
            json!({"Email": "bo@example.com"}),
        ])
        .await
        .unwrap_err();

    assert_eq!(
        err.validation_errors().unwrap().messages(),
        vec!["Email is required", "Name is required"]
    );
    assert!(pool.statements().is_empty());
    assert!(pool.events().is_empty());
}

#[tokio::test]
async fn test_save_inserts_and_updates_in_one_transaction() {
    let pool = MockPool::new();
    let model = customers(&pool, RecordingHooks::default());

    let affected = model
        .save(vec![
            json!({"Email": "ann@example.com"}),
            json!({"ID": 9, "Email": "bo@example.com"}),
        ])
        .await
        .unwrap();

    assert_eq!(affected, 2);
    assert_eq!(
        pool.statements(),
        vec![
            "INSERT INTO customers (Email) VALUES ($1)",
            "UPDATE customers SET Email = $2 WHERE ID = $1",
        ]
    );
    assert_eq!(pool.events(), vec!["BEGIN", "COMMIT"]);
}

#[tokio::test]
async fn test_failed_batch_rolls_back() {
    let pool = MockPool::new();
    pool.fail_on("UPDATE");
    let model = customers(&pool, RecordingHooks::default());

    let err = model
        .save(vec![
            json!({"Email": "ann@example.com"}),
            json!({"ID": 9, "Email": "bo@example.com"}),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Database(_)));
    assert_eq!(pool.events(), vec!["BEGIN", "ROLLBACK"]);
}
