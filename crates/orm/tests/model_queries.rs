mod common;

use common::{MockPool, MockRow};
use elif_dynamic::{
    DatabaseValue, DynamicCall, DynamicModel, DynamicResult, FormData, ModelError, QueryOptions, SqlDialect,
};
use futures::StreamExt;
use std::sync::Arc;

fn customers(pool: &MockPool) -> DynamicModel {
    DynamicModel::new(pool.shared(), SqlDialect::PostgreSQL, "customers")
}

fn customer_row(id: i32, last_name: &str) -> MockRow {
    MockRow::new(vec![("ID", DatabaseValue::Int32(id)), ("LastName", last_name.into())])
}

#[tokio::test]
async fn test_find_by_convention_returns_single_row() {
    let pool = MockPool::new();
    pool.respond("WHERE LastName = $1", vec![customer_row(1, "Smith")]);
    let model = customers(&pool);

    let call = DynamicCall::new("FindByLastName").arg("LastName", "Smith");
    let DynamicResult::Row(Some(row)) = model.invoke(&call).await.unwrap() else {
        panic!("expected one row");
    };

    assert_eq!(row.get("lastname"), Some(&DatabaseValue::from("Smith")));
    let executed = pool.executed();
    assert_eq!(
        executed[0].sql,
        "SELECT * FROM customers WHERE LastName = $1 ORDER BY ID ASC LIMIT 1"
    );
    assert_eq!(executed[0].params, vec![DatabaseValue::from("Smith")]);
}

#[tokio::test]
async fn test_count_and_aggregate_conventions() {
    let pool = MockPool::new();
    pool.respond("COUNT(*)", vec![MockRow::scalar(DatabaseValue::Int64(3))]);
    pool.respond("SUM(Balance)", vec![MockRow::scalar(DatabaseValue::Float64(120.5))]);
    let model = customers(&pool);

    let count = model.invoke(&DynamicCall::new("Count").arg("Region", "EU")).await.unwrap();
    assert!(matches!(count, DynamicResult::Count(3)));

    let sum = model
        .invoke(&DynamicCall::new("sum").arg("columns", "Balance"))
        .await
        .unwrap();
    assert!(matches!(sum, DynamicResult::Scalar(DatabaseValue::Float64(v)) if v == 120.5));

    let err = model.invoke(&DynamicCall::new("Avg")).await.unwrap_err();
    assert!(matches!(err, ModelError::Usage(_)));
}

#[tokio::test]
async fn test_unnamed_arguments_are_rejected_before_any_query() {
    let pool = MockPool::new();
    let model = customers(&pool);

    let err = model
        .invoke(&DynamicCall::new("FindBy").arg("LastName", "Smith").positional("Ann"))
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Usage(_)));
    assert!(pool.statements().is_empty());
}

#[tokio::test]
async fn test_many_rows_are_lazy_and_reissued() {
    let pool = MockPool::new();
    pool.respond("FROM customers", vec![customer_row(1, "Smith"), customer_row(2, "Jones")]);
    let model = customers(&pool);

    let DynamicResult::Rows(records) = model.invoke(&DynamicCall::new("Everyone")).await.unwrap() else {
        panic!("expected rows");
    };
    assert!(pool.statements().is_empty());

    let first_pass = records.to_vec().await.unwrap();
    let mut stream = records.stream();
    let first_of_second_pass = stream.next().await.unwrap().unwrap();

    assert_eq!(first_pass.len(), 2);
    assert_eq!(first_of_second_pass.get("ID"), Some(&DatabaseValue::Int32(1)));
    assert_eq!(
        pool.statements(),
        vec!["SELECT * FROM customers ORDER BY ID ASC", "SELECT * FROM customers ORDER BY ID ASC"]
    );
}

#[tokio::test]
async fn test_paged_reports_totals() {
    let pool = MockPool::new();
    pool.respond("COUNT(*)", vec![MockRow::scalar(DatabaseValue::Int64(45))]);
    let model = customers(&pool);

    let page = model
        .paged(&QueryOptions::new().filter("Region = $1", vec!["EU".into()]).paginate(20, 3))
        .await
        .unwrap();

    assert_eq!(page.total_records, 45);
    assert_eq!(page.total_pages, 3);
    assert_eq!(
        page.items.command().sql,
        "SELECT * FROM customers WHERE Region = $1 ORDER BY ID LIMIT 20 OFFSET 40"
    );
    assert_eq!(pool.statements(), vec!["SELECT COUNT(*) FROM customers WHERE Region = $1"]);
}

#[tokio::test]
async fn test_paged_sql_wraps_source() {
    let pool = MockPool::new();
    pool.respond("COUNT(*)", vec![MockRow::scalar(DatabaseValue::Int64(40))]);
    let model = customers(&pool);

    let page = model
        .paged_sql("SELECT * FROM customers WHERE Active", &QueryOptions::new().paginate(20, 1))
        .await
        .unwrap();

    assert_eq!(page.total_pages, 2);
    assert_eq!(
        page.items.command().sql,
        "SELECT * FROM (SELECT * FROM customers WHERE Active) AS paged_source ORDER BY ID LIMIT 20 OFFSET 0"
    );
}

#[tokio::test]
async fn test_count_single_and_scalar() {
    let pool = MockPool::new();
    pool.respond("SELECT COUNT(*) FROM customers WHERE", vec![MockRow::scalar(DatabaseValue::Int64(2))]);
    pool.respond("WHERE ID = $1", vec![customer_row(4, "Lee")]);
    let model = customers(&pool);

    assert_eq!(model.count("Region = $1", &[DatabaseValue::from("EU")]).await.unwrap(), 2);
    assert_eq!(model.count("", &[]).await.unwrap(), 0);

    let row = model.single(4).await.unwrap().unwrap();
    assert_eq!(row.get("LastName"), Some(&DatabaseValue::from("Lee")));

    let nothing = model.scalar("SELECT MAX(ID) FROM archive", &[]).await.unwrap();
    assert!(nothing.is_null());
}

#[tokio::test]
async fn test_key_values_need_descriptor() {
    let pool = MockPool::new();
    pool.respond("SELECT ID, LastName", vec![customer_row(1, "Smith"), customer_row(2, "Jones")]);

    let err = customers(&pool).key_values("").await.unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));

    let model = customers(&pool).with_descriptor_field("LastName");
    let pairs = model.key_values("LastName").await.unwrap();

    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[1], (DatabaseValue::Int32(2), DatabaseValue::from("Jones")));
    assert_eq!(
        pool.statements().last().unwrap(),
        "SELECT ID, LastName FROM customers ORDER BY LastName"
    );
}

#[tokio::test]
async fn test_schema_is_loaded_once_and_drives_defaults() {
    let pool = MockPool::new();
    pool.respond(
        "information_schema.columns",
        vec![
            MockRow::column("ID", "integer", Some("nextval('customers_id_seq'::regclass)")),
            MockRow::column("LastName", "text", None),
            MockRow::column("Status", "character varying", Some("'new'::character varying")),
            MockRow::column("CreatedAt", "timestamp with time zone", Some("now()")),
        ],
    );
    let model = customers(&pool);

    let prototype = model.prototype().await.unwrap();
    assert!(prototype.get("ID").unwrap().is_null());
    assert_eq!(prototype.get("status"), Some(&DatabaseValue::from("new")));
    assert!(matches!(prototype.get("CreatedAt"), Some(DatabaseValue::DateTime(_))));

    assert!(model.column_exists("lastname").await.unwrap());
    assert!(!model.column_exists("nickname").await.unwrap());
    assert_eq!(model.get_column("STATUS").await.unwrap().unwrap().data_type, "character varying");
    assert!(matches!(model.default_value("missing").await, Err(ModelError::Schema(_))));

    let record = model
        .create_from(FormData::parse("lastname=Smith&status=vip&csrf_token=abc"))
        .await
        .unwrap();
    assert_eq!(record.keys().collect::<Vec<_>>(), vec!["LastName", "Status"]);

    let describes = pool
        .statements()
        .into_iter()
        .filter(|sql| sql.contains("information_schema.columns"))
        .count();
    assert_eq!(describes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_schema_reads_describe_once() {
    let pool = MockPool::new();
    pool.respond(
        "information_schema.columns",
        vec![
            MockRow::column("ID", "integer", None),
            MockRow::column("LastName", "text", None),
        ],
    );
    let model = Arc::new(customers(&pool));

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let model = Arc::clone(&model);
            tokio::spawn(async move { model.schema().await.map(|columns| columns.len()) })
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.await.unwrap().unwrap(), 2);
    }

    let describes = pool
        .statements()
        .into_iter()
        .filter(|sql| sql.contains("information_schema.columns"))
        .count();
    assert_eq!(describes, 1);
}

#[tokio::test]
async fn test_primary_key_helpers() {
    let model = customers(&MockPool::new());

    assert!(model.has_primary_key(serde_json::json!({"id": 5})).unwrap());
    assert!(!model.has_primary_key(serde_json::json!({"ID": null})).unwrap());
    assert_eq!(
        model.primary_key_of(serde_json::json!({"Id": 5, "Name": "x"})).unwrap(),
        Some(DatabaseValue::Int32(5))
    );
}
