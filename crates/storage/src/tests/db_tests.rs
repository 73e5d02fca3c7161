use super::*;
use crate::Storage;

async fn seeded() -> Db {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let db = storage.db();
    db.qry(
        "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, body TEXT, score REAL)",
        &Params::new(),
        QueryType::None,
    )
    .await
    .expect("table");
    for (title, score) in [("alpha", 1.5), ("beta", 2.0), ("gamma", 3.25)] {
        db.insert(
            "notes",
            &Params::new().with("title", title).with("score", score),
        )
        .await
        .expect("insert");
    }
    db
}

#[test]
fn named_placeholders_become_positional_slots() {
    let params = Params::new().with("a", 1).with(":b", "x");
    let mut binder = Binder::new(&params);
    let sql = binder
        .rewrite("WHERE x = :b AND y = :a OR z = :b AND s = ':a'")
        .expect("rewrite");
    assert_eq!(sql, "WHERE x = ?1 AND y = ?2 OR z = ?1 AND s = ':a'");
    assert_eq!(
        binder.binds(),
        vec![&Param::Text("x".into()), &Param::Int(1)]
    );
}

#[test]
fn quoted_identifiers_and_comments_keep_their_colons() {
    let params = Params::new().with("id", 7);
    let mut binder = Binder::new(&params);
    let sql = binder
        .rewrite("SELECT \"a:b\" FROM t -- filter on :missing\nWHERE id = :id AND s = 'it''s :x'")
        .expect("rewrite");
    assert_eq!(
        sql,
        "SELECT \"a:b\" FROM t -- filter on :missing\nWHERE id = ?1 AND s = 'it''s :x'"
    );
    assert_eq!(binder.binds(), vec![&Param::Int(7)]);
}

#[tokio::test]
async fn comments_in_clauses_do_not_need_bindings() {
    let db = seeded().await;
    let rows = db
        .read_all(
            "notes",
            "title",
            "WHERE score > :min -- skip :low scores\nORDER BY title",
            &Params::new().with("min", 1.75),
        )
        .await
        .expect("read");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text("title"), "beta");
}

#[test]
fn unbound_placeholder_is_reported() {
    let params = Params::new();
    let err = Binder::new(&params)
        .rewrite("WHERE id = :id")
        .expect_err("missing");
    assert!(matches!(err, DbError::MissingParameter(name) if name == "id"));
}

#[test]
fn shifted_slots_follow_the_offset() {
    assert_eq!(shift_slots("WHERE a = ?1 AND b = ?2", 3), "WHERE a = ?4 AND b = ?5");
    assert_eq!(shift_slots("WHERE a = '?1'", 3), "WHERE a = '?1'");
    assert_eq!(
        shift_slots("WHERE \"?1\" = ?1 -- ?2\nAND b = ?2", 1),
        "WHERE \"?1\" = ?2 -- ?2\nAND b = ?3"
    );
}

#[test]
fn column_lists_reject_injection() {
    assert_eq!(column_list("id, title").expect("plain"), "id, title");
    assert!(column_list("COUNT(*) AS total").is_ok());
    assert!(column_list("*").is_ok());
    assert!(column_list("id; DROP TABLE notes").is_err());
    assert!(column_list("id, (SELECT 1)").is_err());
    assert!(identifier("users--").is_err());
}

#[tokio::test]
async fn read_one_without_match_is_none() {
    let db = seeded().await;
    let row = db
        .read_one("notes", "*", "WHERE title = :t", &Params::new().with("t", "nope"))
        .await
        .expect("read");
    assert!(row.is_none());
}

#[tokio::test]
async fn read_all_without_match_is_empty() {
    let db = seeded().await;
    let rows = db
        .read_all("notes", "id", "WHERE score > :s", &Params::new().with("s", 100.0))
        .await
        .expect("read");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn read_shapes_decode_rows_and_scalars() {
    let db = seeded().await;

    let rows = db
        .read_all("notes", "id, title, body, score", "ORDER BY id DESC", &Params::new())
        .await
        .expect("all");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].text("title"), "gamma");
    assert_eq!(rows[0].get("body"), Some(&Value::Null));
    assert_eq!(rows[0].get("score").and_then(Value::as_f64), Some(3.25));

    let count = db
        .read_column("notes", "COUNT(*)", "WHERE score >= :min", &Params::new().with("min", 2.0))
        .await
        .expect("count");
    assert_eq!(count.and_then(|v| v.as_i64()), Some(2));
}

#[tokio::test]
async fn update_and_delete_report_rows_affected() {
    let db = seeded().await;
    let changed = db
        .update(
            "notes",
            &Params::new().with("body", "edited"),
            "WHERE title = :title",
            &Params::new().with("title", "beta"),
        )
        .await
        .expect("update");
    assert_eq!(changed, 1);

    let row = db
        .read_one("notes", "body", "WHERE title = :title", &Params::new().with("title", "beta"))
        .await
        .expect("read")
        .expect("row");
    assert_eq!(row.text("body"), "edited");

    let removed = db
        .delete("notes", "WHERE score < :s", &Params::new().with("s", 2.5))
        .await
        .expect("delete");
    assert_eq!(removed, 2);
}

#[tokio::test]
async fn insert_returns_new_ids() {
    let db = seeded().await;
    let id = db
        .insert("notes", &Params::new().with("title", "delta"))
        .await
        .expect("insert");
    assert_eq!(id, 4);
    assert!(matches!(
        db.insert("notes", &Params::new()).await,
        Err(DbError::EmptyWrite(_))
    ));
}
