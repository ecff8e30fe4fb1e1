use serde_json::{json, Value};
use sheetbase::config::{builtin_tables, features_schema, permissions_schema, tables};
use sheetbase::{ColumnType, Filter, MemoryStore, RetryPolicy, Row, StoreError, TableSchema, TableService};
use std::sync::Arc;

const ITEMS: &str = "items";

fn items_schema() -> TableSchema {
    TableSchema::new()
        .column("ID", ColumnType::Id)
        .column("Group", ColumnType::Text)
        .column("Amount", ColumnType::Number100)
}

fn row(v: Value) -> Row {
    match v {
        Value::Object(m) => m,
        _ => panic!("not an object"),
    }
}

async fn setup() -> (Arc<MemoryStore>, TableService) {
    let store = Arc::new(MemoryStore::new());
    let service = TableService::new(store.clone(), RetryPolicy::immediate(15));
    service.ensure_tables(&[(ITEMS, items_schema())]).await.unwrap();
    (store, service)
}

/// Ten rows r1..r10; rows 2, 5 and 7 are in group "x".
async fn seed_ten(service: &TableService) {
    let rows: Vec<Row> = (1..=10)
        .map(|i| {
            let group = if [2, 5, 7].contains(&i) { "x" } else { "y" };
            row(json!({"ID": format!("r{}", i), "Group": group, "Amount": i}))
        })
        .collect();
    service.insert(ITEMS, rows, &items_schema()).await.unwrap();
}

fn ids(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r["ID"].as_str().unwrap_or_default().to_string()).collect()
}

#[tokio::test]
async fn select_on_empty_table_keeps_schema_columns() {
    let (_store, service) = setup().await;
    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    assert!(set.is_empty());
    assert_eq!(set.columns, vec!["ID", "Group", "Amount"]);
}

#[tokio::test]
async fn select_on_missing_table_fails() {
    let (_store, service) = setup().await;
    let err = service.select("nope", &items_schema()).await.unwrap_err();
    assert!(matches!(err, StoreError::TableNotFound(_)));
}

#[tokio::test]
async fn numero100_round_trip() {
    let (store, service) = setup().await;
    for (i, x) in [json!(0), json!(1), json!(99.5), json!(-3)].iter().enumerate() {
        let r = row(json!({"ID": format!("n{}", i), "Amount": x.clone()}));
        service.insert(ITEMS, r, &items_schema()).await.unwrap();
    }
    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    let amounts: Vec<Value> = set.rows.iter().map(|r| r["Amount"].clone()).collect();
    assert_eq!(amounts, vec![json!(0), json!(1), json!(99.5), json!(-3)]);

    let raw = store.snapshot(ITEMS).await.unwrap();
    assert_eq!(raw[3][2], json!(9950));
}

#[tokio::test]
async fn insert_generates_distinct_ids() {
    let (_store, service) = setup().await;
    let rows: Vec<Row> = (0..50).map(|i| row(json!({"Group": format!("g{}", i)}))).collect();
    let ids = service.insert(ITEMS, rows, &items_schema()).await.unwrap();
    assert_eq!(ids.len(), 50);
    assert!(ids.iter().all(|id| !id.is_empty()));
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 50);

    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    assert_eq!(self::ids(&set.rows), ids);
}

#[tokio::test]
async fn insert_grows_header_for_new_columns() {
    let (_store, service) = setup().await;
    seed_ten(&service).await;
    service
        .insert(ITEMS, row(json!({"ID": "r11", "Colour": "red"})), &items_schema())
        .await
        .unwrap();
    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    assert_eq!(set.columns, vec!["ID", "Group", "Amount", "Colour"]);
    assert_eq!(set.rows[10]["Colour"], json!("red"));
    assert_eq!(set.rows[0]["Colour"], json!(""));
}

#[tokio::test]
async fn update_without_matches_writes_nothing() {
    let (store, service) = setup().await;
    seed_ten(&service).await;
    let writes = store.write_count();
    let n = service
        .update(ITEMS, &["Amount"], &[json!(5)], &Filter::eq("Group", "zzz"), &items_schema())
        .await
        .unwrap();
    assert_eq!(n, 0);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn update_on_empty_table_returns_zero() {
    let (_store, service) = setup().await;
    let n = service
        .update(ITEMS, &["Amount"], &[json!(5)], &Filter::eq("Group", "x"), &items_schema())
        .await
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn update_writes_every_named_column_of_matched_rows() {
    let (store, service) = setup().await;
    seed_ten(&service).await;
    let n = service
        .update(
            ITEMS,
            &["amount", "Group"],
            &[json!(12.5), json!("z")],
            &Filter::eq("Group", "x"),
            &items_schema(),
        )
        .await
        .unwrap();
    assert_eq!(n, 3);

    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    for r in &set.rows {
        let id = r["ID"].as_str().unwrap();
        if ["r2", "r5", "r7"].contains(&id) {
            assert_eq!(r["Amount"], json!(12.5));
            assert_eq!(r["Group"], json!("z"));
        } else {
            assert_eq!(r["Group"], json!("y"));
            assert_ne!(r["Amount"], json!(12.5));
        }
    }
    let raw = store.snapshot(ITEMS).await.unwrap();
    assert_eq!(raw[2][2], json!(1250));
}

#[tokio::test]
async fn numero100_filter_uses_display_units() {
    let (_store, service) = setup().await;
    seed_ten(&service).await;
    let n = service
        .update(ITEMS, &["Group"], &[json!("three")], &Filter::eq("Amount", "3"), &items_schema())
        .await
        .unwrap();
    assert_eq!(n, 1);
    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    assert_eq!(set.find("ID", "r3").unwrap()["Group"], json!("three"));
}

#[tokio::test]
async fn unknown_column_is_reported_before_any_write() {
    let (store, service) = setup().await;
    seed_ten(&service).await;
    let writes = store.write_count();

    let err = service
        .update(ITEMS, &["Group", "Nope"], &[json!("a"), json!("b")], &Filter::eq("Group", "x"), &items_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownColumn { ref column, .. } if column == "Nope"));

    let err = service
        .delete(ITEMS, &Filter::eq("Missing", "x"), &items_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownColumn { .. }));
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn update_rejects_mismatched_arguments() {
    let (_store, service) = setup().await;
    let err = service
        .update(ITEMS, &["Group"], &[], &Filter::eq("Group", "x"), &items_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ArgumentMismatch { columns: 1, values: 0 }));
}

#[tokio::test]
async fn delete_removes_exactly_the_matched_rows() {
    let (store, service) = setup().await;
    seed_ten(&service).await;
    let n = service.delete(ITEMS, &Filter::eq("Group", "x"), &items_schema()).await.unwrap();
    assert_eq!(n, 3);

    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    assert_eq!(ids(&set.rows), vec!["r1", "r3", "r4", "r6", "r8", "r9", "r10"]);
    let raw = store.snapshot(ITEMS).await.unwrap();
    assert_eq!(raw.len(), 8);
}

#[tokio::test]
async fn delete_with_not_equal() {
    let (_store, service) = setup().await;
    seed_ten(&service).await;
    let filter: Filter = "Group,ne,x".parse().unwrap();
    let n = service.delete(ITEMS, &filter, &items_schema()).await.unwrap();
    assert_eq!(n, 7);
    let set = service.select(ITEMS, &items_schema()).await.unwrap();
    assert_eq!(ids(&set.rows), vec!["r2", "r5", "r7"]);
}

#[tokio::test]
async fn legacy_filter_rejects_other_operators() {
    let err = "Amount,>,3".parse::<Filter>().unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedOperator(_)));
    let err = "Amount,=".parse::<Filter>().unwrap_err();
    assert!(matches!(err, StoreError::InvalidFilter(_)));
}

#[tokio::test]
async fn verify_permission_follows_link_rows() {
    let store = Arc::new(MemoryStore::new());
    let service = TableService::new(store, RetryPolicy::immediate(3));
    service.ensure_tables(&builtin_tables()).await.unwrap();
    service
        .insert(
            tables::FEATURES,
            row(json!({"ID": "f1", "MenuID": "m1", "Name": "Clients", "Path": "clients"})),
            &features_schema(),
        )
        .await
        .unwrap();

    assert!(!service.verify_permission("u1", "Clients").await.unwrap());
    service
        .insert(
            tables::PERMISSIONS,
            row(json!({"UserID": "u1", "FeatureID": "f1"})),
            &permissions_schema(),
        )
        .await
        .unwrap();
    assert!(service.verify_permission("u1", "Clients").await.unwrap());
    assert!(!service.verify_permission("u2", "Clients").await.unwrap());
    assert!(!service.verify_permission("u1", "Finance").await.unwrap());
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (store, service) = setup().await;
    let before = store.call_count();
    store.fail_next(3);
    service.select(ITEMS, &items_schema()).await.unwrap();
    assert_eq!(store.call_count() - before, 4);
}

#[tokio::test]
async fn retry_budget_exhaustion_is_remote_unavailable() {
    let (store, service) = setup().await;
    let before = store.call_count();
    store.fail_next(1_000);
    let err = service.select(ITEMS, &items_schema()).await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteUnavailable { attempts: 15, .. }));
    assert_eq!(store.call_count() - before, 15);
}

#[tokio::test]
async fn text_column_numbers_match_at_full_precision() {
    let (_store, service) = setup().await;
    service
        .insert(ITEMS, row(json!({"ID": "p1", "Rate": 0.1234567891234})), &items_schema())
        .await
        .unwrap();
    let n = service
        .update(ITEMS, &["Group"], &[json!("short")], &Filter::eq("Rate", "0.123456789"), &items_schema())
        .await
        .unwrap();
    assert_eq!(n, 0);
    let n = service
        .update(ITEMS, &["Group"], &[json!("exact")], &Filter::eq("Rate", "0.1234567891234"), &items_schema())
        .await
        .unwrap();
    assert_eq!(n, 1);
}
