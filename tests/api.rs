//! Router smoke tests: drive the HTTP surface end to end against a
//! temporary data directory, one request at a time.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sheetdb::{app, Record, SheetStore};
use tower::ServiceExt;

fn test_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let store = SheetStore::new(dir.path()).unwrap();
    (dir, app::router(store))
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_add_read_over_http() {
    let (_dir, app) = test_app();

    let res = app
        .clone()
        .oneshot(json_post(
            "/api/files",
            r#"{"fileName":"t.csv","columns":["ID","Name","Value"]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(json_post(
            "/api/add-row",
            r#"{"fileName":"t.csv","rowData":{"ID":"1","Name":"ProductA","Value":"100"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_post(
            "/api/add-row",
            r#"{"fileName":"t.csv","rowData":{"ID":"2","Name":"ProductB","Value":"150"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_post(
            "/api/read",
            r#"{"fileName":"t.csv","filter":[{"column":"Value","operator":"greaterThan","value":"120"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let records: Vec<Record> = body_json(res).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Name"], "ProductB");

    let res = app
        .clone()
        .oneshot(get("/api/files/t.csv/columns"))
        .await
        .unwrap();
    let columns: Vec<String> = body_json(res).await;
    assert_eq!(columns, vec!["ID", "Name", "Value"]);
}

#[tokio::test]
async fn error_kinds_map_to_status_codes() {
    let (_dir, app) = test_app();

    // NotFound
    let res = app
        .clone()
        .oneshot(get("/api/files/missing.csv/sheets"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Conflict
    let create = r#"{"fileName":"x.csv"}"#;
    let res = app.clone().oneshot(json_post("/api/files", create)).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = app.clone().oneshot(json_post("/api/files", create)).await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // InvalidInput
    let res = app
        .clone()
        .oneshot(json_post("/api/files", r#"{"fileName":"notes.txt"}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_and_delete_report_counts() {
    let (_dir, app) = test_app();

    app.clone()
        .oneshot(json_post(
            "/api/files",
            r#"{"fileName":"t.csv","columns":["ID","Tag"]}"#,
        ))
        .await
        .unwrap();
    for row in ["1", "2", "3"] {
        let body = format!(r#"{{"fileName":"t.csv","rowData":{{"ID":"{row}","Tag":"old"}}}}"#);
        app.clone().oneshot(json_post("/api/add-row", &body)).await.unwrap();
    }

    let res = app
        .clone()
        .oneshot(json_post(
            "/api/update-rows",
            r#"{"fileName":"t.csv","filter":[{"column":"Tag","operator":"equals","value":"old"}],"rowData":{"Tag":"new"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(res).await;
    assert_eq!(body["updated"], 3);

    let res = app
        .clone()
        .oneshot(json_post(
            "/api/delete-rows",
            r#"{"fileName":"t.csv","filter":[{"column":"ID","operator":"lessThan","value":"3"}]}"#,
        ))
        .await
        .unwrap();
    let body: serde_json::Value = body_json(res).await;
    assert_eq!(body["deleted"], 2);
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let (_dir, app) = test_app();

    app.clone()
        .oneshot(json_post("/api/files", r#"{"fileName":"t.csv","columns":["A"]}"#))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(get("/api/download/t.csv"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"A\n");
}
