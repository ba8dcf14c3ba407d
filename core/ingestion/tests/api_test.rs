use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use docnote_ingestion::{
    router, AnalysisStore, AppState, HeuristicAnalyzer, SqliteBackend, TextExtractor,
};
use docnote_schemas::AnalysisRecord;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "docnote-test-boundary";

async fn test_app(dir: &TempDir) -> Result<Router> {
    let backend = SqliteBackend::open(dir.path().join("analyses.db"))?;
    let store = AnalysisStore::new(Arc::new(backend));
    store.init().await?;

    let state = AppState::new(store, TextExtractor::default(), HeuristicAnalyzer::default());
    Ok(router(state, 10 * 1024 * 1024))
}

fn multipart_body(files: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, contents) in files {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{n}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{c}\r\n",
            b = BOUNDARY,
            n = name,
            c = contents
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body
}

async fn send(app: &Router, request: Request<Body>) -> Result<Value> {
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn upload(app: &Router, files: &[(&str, &str)]) -> Result<Value> {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(files)))?;
    send(app, request).await
}

async fn get_json(app: &Router, uri: &str) -> Result<Value> {
    send(app, Request::builder().uri(uri).body(Body::empty())?).await
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Result<Value> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))?;
    send(app, request).await
}

#[tokio::test]
async fn test_upload_hello_txt() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let response = upload(&app, &[("hello.txt", "Hello world")]).await?;
    assert_eq!(response["success"], true);
    assert!(response["analysis"].as_str().unwrap().contains("Smart Summary"));

    let id = response["id"].as_i64().unwrap();
    let record: AnalysisRecord =
        serde_json::from_value(get_json(&app, &format!("/analyses/{}", id)).await?)?;

    assert!(record.content_text.contains("=== File: hello.txt ==="));
    assert!(record.content_text.contains("Hello world"));
    assert!(record.analysis_summary.contains("Smart Summary"));
    assert_eq!(record.created_at, record.updated_at);
    Ok(())
}

#[tokio::test]
async fn test_upload_keeps_file_order_and_placeholders() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let response = upload(
        &app,
        &[("b.md", "# Second upload\nbody"), ("archive.zip", "PK"), ("a.txt", "Third")],
    )
    .await?;
    let id = response["id"].as_i64().unwrap();
    let record = get_json(&app, &format!("/analyses/{}", id)).await?;
    let content = record["content_text"].as_str().unwrap();

    let b = content.find("=== File: b.md ===").unwrap();
    let zip = content.find("=== File: archive.zip ===").unwrap();
    let a = content.find("=== File: a.txt ===").unwrap();
    assert!(b < zip && zip < a);
    assert!(content.contains("[Unsupported file type: archive.zip]"));
    assert!(response["analysis"]
        .as_str()
        .unwrap()
        .contains("**Files analyzed:** 3 (b.md, archive.zip, a.txt)"));
    Ok(())
}

#[tokio::test]
async fn test_upload_without_files_fails_softly() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let response = upload(&app, &[]).await?;
    assert_eq!(response["success"], false);
    assert!(response["error"].is_string());

    assert_eq!(get_json(&app, "/analyses").await?, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_update_then_get_reflects_edit() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let id = upload(&app, &[("notes.txt", "Original notes here.")]).await?["id"]
        .as_i64()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let response = send_json(
        &app,
        "PUT",
        &format!("/analyses/{}", id),
        json!({"analysis_summary": "edited summary", "content_text": "edited content"}),
    )
    .await?;
    assert_eq!(response, json!({"success": true, "changes": 1}));

    let record: AnalysisRecord =
        serde_json::from_value(get_json(&app, &format!("/analyses/{}", id)).await?)?;
    assert_eq!(record.analysis_summary, "edited summary");
    assert_eq!(record.content_text, "edited content");
    assert!(record.updated_at > record.created_at);
    Ok(())
}

#[tokio::test]
async fn test_delete_missing_and_existing() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let missing = send_json(&app, "DELETE", "/analyses/999", json!({})).await?;
    assert_eq!(missing["success"], false);

    let id = upload(&app, &[("x.txt", "Some text to delete later.")]).await?["id"]
        .as_i64()
        .unwrap();
    let deleted = send_json(&app, "DELETE", &format!("/analyses/{}", id), json!({})).await?;
    assert_eq!(deleted, json!({"success": true, "message": "Analysis deleted"}));

    let after = get_json(&app, &format!("/analyses/{}", id)).await?;
    assert_eq!(after["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_non_numeric_id_fails_softly() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let response = get_json(&app, "/analyses/abc").await?;
    assert_eq!(response["success"], false);
    assert!(response["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_empty_search_matches_list() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    upload(&app, &[("one.txt", "Tokio runtime internals explained.")]).await?;
    upload(&app, &[("two.txt", "Gardening tips for tomatoes.")]).await?;

    let listed = get_json(&app, "/analyses").await?;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert_eq!(get_json(&app, "/analyses/search").await?, listed);
    assert_eq!(get_json(&app, "/analyses/search?keyword=").await?, listed);

    let hits = get_json(&app, "/analyses/search?keyword=TOKIO").await?;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_card_note_workflow() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let id = upload(
        &app,
        &[(
            "design.txt",
            "The main focus is caching strategy for the API. We recommend a write-through cache. \
             Caching reduces database load significantly.",
        )],
    )
    .await?["id"]
        .as_i64()
        .unwrap();

    let concepts = send_json(
        &app,
        "POST",
        "/card-notes/extract-concepts",
        json!({"analysisId": id.to_string()}),
    )
    .await?;
    assert_eq!(concepts["success"], true);
    let concept_list = concepts["data"].as_array().unwrap().clone();
    assert!(!concept_list.is_empty() && concept_list.len() <= 5);

    let cards = send_json(
        &app,
        "POST",
        "/card-notes/create-cards",
        json!({"concepts": concept_list, "analysisId": id}),
    )
    .await?;
    assert_eq!(cards["success"], true);
    let card_list = cards["data"].as_array().unwrap().clone();
    assert_eq!(card_list.len(), concept_list.len());

    let connections = send_json(
        &app,
        "POST",
        "/card-notes/create-connections",
        json!({"cards": card_list}),
    )
    .await?;
    assert_eq!(connections["success"], true);
    let n = card_list.len();
    let expected = if n < 2 { 0 } else { (n - 1).min(3) + usize::from(n >= 3) };
    assert_eq!(connections["data"].as_array().unwrap().len(), expected);

    let generated = send_json(&app, "POST", "/card-notes/generate", json!({"analysisId": id})).await?;
    assert_eq!(generated["success"], true);
    assert_eq!(generated["data"]["concepts"], concepts["data"]);
    assert_eq!(generated["data"]["cards"], cards["data"]);
    Ok(())
}

#[tokio::test]
async fn test_markdown_upload_keeps_smart_summary_concepts() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let id = upload(
        &app,
        &[(
            "design.md",
            "# Key analysis of the caching layer design\nShort body.\nWe use redis.",
        )],
    )
    .await?["id"]
        .as_i64()
        .unwrap();

    let concepts = send_json(
        &app,
        "POST",
        "/card-notes/extract-concepts",
        json!({"analysisId": id}),
    )
    .await?;
    assert_eq!(concepts["success"], true);
    assert!(concepts["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["source"] == "smart_summary"));
    Ok(())
}

#[tokio::test]
async fn test_card_notes_for_missing_analysis() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let concepts =
        send_json(&app, "POST", "/card-notes/extract-concepts", json!({"analysisId": 42})).await?;
    assert_eq!(concepts["success"], false);

    let generated =
        send_json(&app, "POST", "/card-notes/generate", json!({"analysisId": 42})).await?;
    assert_eq!(generated["success"], false);

    let malformed = send_json(&app, "POST", "/card-notes/create-cards", json!({"oops": true})).await?;
    assert_eq!(malformed["success"], false);
    Ok(())
}

#[tokio::test]
async fn test_health_and_index() -> Result<()> {
    let dir = TempDir::new()?;
    let app = test_app(&dir).await?;

    let health = get_json(&app, "/health").await?;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["database"], "sqlite");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(String::from_utf8_lossy(&bytes).contains("Document Analysis"));
    Ok(())
}
