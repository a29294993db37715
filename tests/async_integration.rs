//! Cooperative-façade mirror of `tests/integration.rs`'s CRUD round-trip,
//! gated the same way behind `MONGODB_URI`/`MONGODB_DB`.

use mongo_dbapi::params::{ParameterSet, Value};
use mongo_dbapi::r#async::connect;
use serial_test::serial;

fn target() -> Option<(String, String)> {
    let uri = std::env::var("MONGODB_URI").ok()?;
    let db = std::env::var("MONGODB_DB").ok()?;
    Some((uri, db))
}

#[tokio::test]
#[serial]
async fn async_crud_roundtrip() {
    let Some((uri, db)) = target() else {
        eprintln!("skipping: MONGODB_URI/MONGODB_DB not set, requires a live mongod");
        return;
    };

    let conn = connect(&uri, &db).await.unwrap();
    let mut cur = conn.cursor();

    cur.execute(
        "DELETE FROM users WHERE id = %s",
        &ParameterSet::positional([Value::Int(999)]),
    )
    .await
    .ok();

    cur.execute(
        "INSERT INTO users (id, name) VALUES (%s, %s)",
        &ParameterSet::positional([Value::Int(999), Value::Text("Async".into())]),
    )
    .await
    .unwrap();

    cur.execute(
        "SELECT id, name FROM users WHERE id = %s",
        &ParameterSet::positional([Value::Int(999)]),
    )
    .await
    .unwrap();
    let rows = cur.fetchall();
    assert_eq!(rows, vec![vec![Value::Int(999), Value::Text("Async".into())]]);

    cur.execute(
        "DELETE FROM users WHERE id = %s",
        &ParameterSet::positional([Value::Int(999)]),
    )
    .await
    .unwrap();
    conn.commit().await.unwrap();
    conn.close().await.unwrap();
}
