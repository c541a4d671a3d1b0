use bill_sync_service::models::{Bill, BillRecord};
use bill_sync_service::services::{MongoDb, MongoRecordStore, RecordStore};
use service_core::error::AppError;

fn bill(id: &str) -> Bill {
    Bill {
        id: id.to_string(),
        bill_type: "STATEMENT".to_string(),
        from_date: "2024-01-01".to_string(),
        to_date: "2024-01-31".to_string(),
        issued_date: "2024-02-03".to_string(),
        total: 1050,
        temporary_url: "https://kraken.example/b1.pdf".to_string(),
    }
}

async fn connect() -> (MongoDb, TestDatabase) {
    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let name = format!("bill_sync_test_{}", uuid::Uuid::new_v4().simple());
    let db = MongoDb::connect(&uri, &name)
        .await
        .expect("Failed to connect to MongoDB");
    db.health_check().await.expect("MongoDB is not reachable");
    (db, TestDatabase { uri, name })
}

struct TestDatabase {
    uri: String,
    name: String,
}

async fn cleanup(test_db: TestDatabase) {
    mongodb::Client::with_uri_str(&test_db.uri)
        .await
        .expect("Failed to connect to MongoDB")
        .database(&test_db.name)
        .drop(None)
        .await
        .expect("Failed to drop test database");
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn records_round_trip_and_archive_marking() {
    let (db, test_db) = connect().await;
    let store = MongoRecordStore::new(&db, "octopus_bills");

    assert!(!store.record_exists("B1").await.unwrap());

    store
        .put_record(&BillRecord::from_bill(&bill("B1")).unwrap())
        .await
        .expect("Insert should succeed");

    let found = store.find_record("B1").await.unwrap().expect("B1 should exist");
    assert_eq!(found.total, 1050);
    assert!(!found.is_archived());

    store
        .mark_archived("B1", "octopus/B1.pdf")
        .await
        .expect("Marking should succeed");
    let found = store.find_record("B1").await.unwrap().unwrap();
    assert_eq!(found.archive_key.as_deref(), Some("octopus/B1.pdf"));

    cleanup(test_db).await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn duplicate_insert_is_rejected() {
    let (db, test_db) = connect().await;
    let store = MongoRecordStore::new(&db, "octopus_bills");
    let record = BillRecord::from_bill(&bill("B1")).unwrap();

    store.put_record(&record).await.expect("First insert should succeed");
    let second = store.put_record(&record).await;

    assert!(matches!(second, Err(AppError::DatabaseError(_))));

    cleanup(test_db).await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn marking_unknown_bill_is_not_found() {
    let (db, test_db) = connect().await;
    let store = MongoRecordStore::new(&db, "octopus_bills");

    let result = store.mark_archived("missing", "octopus/missing.pdf").await;

    assert!(matches!(result, Err(AppError::NotFound(_))));

    cleanup(test_db).await;
}
