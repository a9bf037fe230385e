//! Round trip against a real Postgres. Skipped unless `DATABASE_URL` (or one of the
//! Netlify spellings) is set, e.g. via `.env`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use patita_store::domain::collection::CollectionSchema;
use patita_store::storage::CollectionStore;
use patita_store::transport::http::{create_router, AppState};
use patita_store::{
    CollectionRegistry, CollectionService, Config, MutationRequest, PgCollectionStore, Scope,
};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

fn database_url() -> Option<String> {
    dotenv::dotenv().ok();
    ["NETLIFY_DATABASE_URL_UNPOOLED", "NETLIFY_DATABASE_URL", "DATABASE_URL"]
        .iter()
        .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
}

fn request(v: serde_json::Value) -> MutationRequest {
    serde_json::from_value(v).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn documents_round_trip_through_postgres() -> Result<(), Box<dyn std::error::Error>> {
    let Some(url) = database_url() else {
        eprintln!("database url not set; skipping");
        return Ok(());
    };

    let store = PgCollectionStore::connect(&url, 2).await?;
    store.ping().await?;
    let service = CollectionService::new(Arc::new(store), CollectionRegistry::builtin())
        .with_migrations_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations"));
    service.migrate().await?;
    assert!(service
        .schema_report()
        .await?
        .iter()
        .all(|r| r.matches_layout));

    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let pet_id = format!("it_pet_{}", suffix);
    let req_id = format!("it_req_{}", suffix);
    let owner = format!("it_owner_{}", suffix);

    service
        .mutate(request(json!({"action": "create", "collection": "pets",
            "item": {"id": pet_id, "name": "Luna", "age": "3", "rescuedBy": owner}})))
        .await?;
    service
        .mutate(request(json!({"action": "create", "collection": "adoption-requests",
            "item": {"id": req_id, "petId": pet_id, "applicantId": "it_adopter", "status": "pending"}})))
        .await?;

    let pet = service.get_by_id("pets", &pet_id).await?;
    assert_eq!(pet["age"], 3);
    assert_eq!(pet["profileId"], owner.as_str());

    let owned = service.query("pets", Scope::Owner(owner.clone())).await?;
    assert_eq!(owned.len(), 1);
    let incoming = service
        .query("adoption_requests", Scope::Owner(owner.clone()))
        .await?;
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0]["status"], "PENDING");

    service
        .mutate(request(json!({"action": "update", "collection": "pets", "id": pet_id,
            "item": {"name": "Luna II", "profileId": owner}})))
        .await?;
    assert_eq!(service.get_by_id("pets", &pet_id).await?["name"], "Luna II");

    for (collection, id) in [("adoption_requests", &req_id), ("pets", &pet_id)] {
        service
            .mutate(request(json!({"action": "delete", "collection": collection, "id": id})))
            .await?;
    }
    assert!(service.get_by_id("pets", &pet_id).await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn column_tables_with_non_text_ids_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let Some(url) = database_url() else {
        eprintln!("database url not set; skipping");
        return Ok(());
    };

    let store = PgCollectionStore::connect(&url, 2).await?;
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let shelters = format!("it_shelters_{}", suffix);
    let legacy = format!("it_legacy_{}", suffix);
    sqlx::query(&format!(
        "CREATE TABLE {} (id SERIAL PRIMARY KEY, name TEXT, capacity INT4, rating NUMERIC, \
         is_open BOOLEAN, tags JSONB, opened_at TIMESTAMPTZ)",
        shelters
    ))
    .execute(store.pool())
    .await?;
    sqlx::query(&format!(
        "CREATE TABLE {} (id SERIAL PRIMARY KEY, username TEXT)",
        legacy
    ))
    .execute(store.pool())
    .await?;
    sqlx::query(&format!("INSERT INTO {} (username) VALUES ('ana')", legacy))
        .execute(store.pool())
        .await?;

    let mut registry = CollectionRegistry::builtin();
    registry.register(CollectionSchema::document(&shelters));
    registry.use_column_layout(&shelters);
    registry.register(CollectionSchema::document(&legacy));
    let service = CollectionService::new(Arc::new(store.clone()), registry);
    assert_eq!(service.sync_layouts().await?, 1);

    let outcome = exercise_column_table(&service, &shelters, &legacy).await;

    for table in [&shelters, &legacy] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(store.pool())
            .await?;
    }
    outcome?;

    let state = AppState::new(
        CollectionService::new(Arc::new(store), CollectionRegistry::builtin()),
        Config {
            database_url: Some(url),
            ..Config::default()
        },
    );
    let resp = create_router(state)
        .oneshot(Request::builder().uri("/db-health").body(Body::empty())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonValue =
        serde_json::from_slice(&axum::body::to_bytes(resp.into_body(), usize::MAX).await?)?;
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Connected to DB");
    assert_eq!(body["backend"], "postgres");
    Ok(())
}

async fn exercise_column_table(
    service: &CollectionService,
    shelters: &str,
    legacy: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    service
        .mutate(request(json!({"action": "create", "collection": shelters, "item": {
            "id": "41",
            "name": "Patitas Norte",
            "capacity": "12",
            "rating": "4.5",
            "isOpen": "t",
            "tags": ["cats", "dogs"],
            "openedAt": "2024-05-01T10:00:00Z",
            "unmapped": "dropped"
        }})))
        .await?;

    let row = service.get_by_id(shelters, "41").await?;
    assert_eq!(row["id"], 41);
    assert_eq!(row["name"], "Patitas Norte");
    assert_eq!(row["capacity"], 12);
    assert_eq!(row["rating"], 4.5);
    assert_eq!(row["is_open"], true);
    assert_eq!(row["tags"], json!(["cats", "dogs"]));
    // rendered in the session time zone
    assert!(row["opened_at"].as_str().is_some());
    assert!(row.get("unmapped").is_none());

    // only the provided column changes; non-numeric text binds NULL
    service
        .mutate(request(json!({"action": "update", "collection": shelters, "id": "41",
            "item": {"capacity": "lots"}})))
        .await?;
    let row = service.get_by_id(shelters, "41").await?;
    assert_eq!(row["capacity"], JsonValue::Null);
    assert_eq!(row["name"], "Patitas Norte");

    service
        .mutate(request(json!({"action": "delete", "collection": shelters, "id": "41"})))
        .await?;
    assert!(service.query(shelters, Scope::All).await?.is_empty());

    // a document-declared table without a `data` column is read row by row
    let rows = service.query(legacy, Scope::All).await?;
    assert_eq!(rows, vec![json!({"id": 1, "username": "ana"})]);
    Ok(())
}
