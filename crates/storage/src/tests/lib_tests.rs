use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("site_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("site.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn sqlite_path_ignores_memory_and_query_string() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/site.db?mode=rwc"),
        Some(PathBuf::from("./data/site.db"))
    );
    assert_eq!(sqlite_path("postgres://host/db"), None);
}

#[tokio::test]
async fn session_data_survives_a_round_trip() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.load_session("missing").await.expect("load").is_none());

    let mut data = Map::new();
    data.insert("visit_count".into(), Value::from(3));
    storage.save_session("abc", &data).await.expect("save");
    data.insert("visit_count".into(), Value::from(4));
    storage.save_session("abc", &data).await.expect("overwrite");

    let loaded = storage.load_session("abc").await.expect("load").expect("row");
    assert_eq!(loaded.get("visit_count"), Some(&Value::from(4)));
}

#[tokio::test]
async fn purge_keeps_fresh_sessions() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.save_session("fresh", &Map::new()).await.expect("save");
    sqlx::query("INSERT INTO sessions (id, data, updated_at) VALUES ('stale', '{}', '2000-01-01 00:00:00')")
        .execute(&storage.pool)
        .await
        .expect("stale row");

    let purged = storage.purge_sessions(3600).await.expect("purge");
    assert_eq!(purged, 1);
    assert!(storage.load_session("fresh").await.expect("load").is_some());
    assert!(storage.load_session("stale").await.expect("load").is_none());
}

#[tokio::test]
async fn created_user_password_verifies() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user("alice", "alice@example.com", "hunter2", Role::Admin)
        .await
        .expect("user");

    let row = storage
        .db()
        .read_one(
            "users",
            "salt, password_hash, role",
            "WHERE id = :id",
            &Params::new().with("id", id.0),
        )
        .await
        .expect("read")
        .expect("row");
    assert!(verify_password(row.text("salt"), "hunter2", row.text("password_hash")));
    assert!(!verify_password(row.text("salt"), "hunter3", row.text("password_hash")));
    assert_eq!(row.text("role"), "admin");
}

#[tokio::test]
async fn duplicate_username_is_a_unique_violation() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .create_user("bob", "", "pw", Role::User)
        .await
        .expect("first");
    let salt = new_salt();
    let err = storage
        .db()
        .insert(
            "users",
            &Params::new()
                .with("username", "bob")
                .with("password_hash", hash_password(&salt, "pw"))
                .with("salt", salt),
        )
        .await
        .expect_err("duplicate");
    assert!(err.is_unique_violation());
}
