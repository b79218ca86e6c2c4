use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use campus_core::{EngineConfig, SearchEngine, Tokenizer, WhitespaceTokenizer};
use campus_server::{build_app, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

const CORPUS: &str = r#"{"cut_content": "scholarship exam", "title": "Exam notice", "link": "https://news/1", "content": "Scholarship exam schedule released."}
{"cut_content": "cafeteria menu", "title": "New menu", "link": "https://news/2", "content": "The cafeteria has a new menu."}
{"cut_content": "scholarship deadline", "title": "Deadline", "link": "https://news/3", "content": "Scholarship applications close Friday."}
"#;

fn state(corpus: &Path) -> AppState {
    let tokenizer: Box<dyn Tokenizer> = Box::new(WhitespaceTokenizer);
    AppState::new(SearchEngine::new(tokenizer, EngineConfig::default()), corpus)
        .with_admin_token(Some("secret".into()))
}

fn loaded_app(dir: &Path) -> (AppState, Router) {
    let path = dir.join("news.jsonl");
    fs::write(&path, CORPUS).unwrap();
    let state = state(&path);
    state.reload().unwrap();
    (state.clone(), build_app(state))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let (_, app) = loaded_app(dir.path());

    let (status, body) = call(app, get("/search?q=scholarship&k=5")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(json["total_hits"], 2);
    assert_eq!(arr[0]["doc_id"], 0);
    assert_eq!(arr[1]["doc_id"], 2);
    assert_eq!(arr[0]["title"], "Exam notice");
    assert_eq!(arr[0]["link"], "https://news/1");
    assert_eq!(arr[0]["snippet"], "<em>Scholarship</em> exam schedule released.");
}

#[tokio::test]
async fn k_truncates_but_total_hits_counts_all() {
    let dir = tempdir().unwrap();
    let (_, app) = loaded_app(dir.path());

    let (status, body) = call(app, get("/search?q=scholarship&k=1")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn unknown_terms_give_empty_results() {
    let dir = tempdir().unwrap();
    let (_, app) = loaded_app(dir.path());

    let (status, body) = call(app, get("/search?q=gym")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn bad_floor_is_rejected() {
    let dir = tempdir().unwrap();
    let (_, app) = loaded_app(dir.path());
    let (status, _) = call(app, get("/search?q=menu&floor=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_before_load_is_unavailable() {
    let dir = tempdir().unwrap();
    let app = build_app(state(&dir.path().join("missing.jsonl")));
    let (status, _) = call(app.clone(), get("/search?q=menu")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = call(app, get("/stats")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn doc_lookup() {
    let dir = tempdir().unwrap();
    let (_, app) = loaded_app(dir.path());

    let (status, body) = call(app.clone(), get("/doc/1")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["metadata"]["title"], "New menu");
    assert_eq!(json["num_tokens"], 2);

    let (status, _) = call(app, get("/doc/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_token_and_keeps_old_index_on_bad_corpus() {
    let dir = tempdir().unwrap();
    let (state, app) = loaded_app(dir.path());

    let reload = |token: &str| {
        Request::post("/admin/reload").header("X-ADMIN-TOKEN", token).body(Body::empty()).unwrap()
    };
    let (status, _) = call(app.clone(), reload("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // a record without a link is rejected; the old index keeps serving
    fs::write(&state.corpus_path, "{\"cut_content\": \"gym\", \"title\": \"Gym\"}\n").unwrap();
    let (status, _) = call(app.clone(), reload("secret")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, body) = call(app.clone(), get("/search?q=menu")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"][0]["doc_id"], 1);

    fs::write(&state.corpus_path, "{\"cut_content\": \"gym hours\", \"title\": \"Gym\", \"link\": \"/gym\"}\n").unwrap();
    let (status, body) = call(app.clone(), reload("secret")).await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["num_docs"], 1);

    let (_, body) = call(app, get("/search?q=gym")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"][0]["title"], "Gym");
}
