//! End-to-end tests for the HTTP surface.
//!
//! Routes are mounted on an in-process actix test service, so no socket is
//! opened.
//!
//! ```bash
//! cargo test --test e2e_http_server
//! ```

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use edgequake_rerank::{server, MathReranker, MemoryStore, RerankService, ResultCache};

fn service() -> Arc<RerankService> {
    let math = Arc::new(MathReranker::new().with_reference_year(2026));
    let cache = ResultCache::new(Arc::new(MemoryStore::default()), Duration::from_secs(3600));
    Arc::new(RerankService::new(math, cache))
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($service))
                .configure(server::configure),
        )
        .await
    };
}

fn example_body() -> Value {
    json!({
        "query": "machine learning 2023",
        "items": [
            {"id": "a", "content": "A 2023 paper on machine learning techniques."},
            {"id": "b", "content": "An unrelated essay on gardening."}
        ]
    })
}

#[actix_web::test]
async fn test_descriptor() {
    let app = app!(service());
    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["service"], "edgequake-rerank");
    assert!(body["version"].is_string());
    let endpoints: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(endpoints.contains(&"POST /rerank"));
    assert!(endpoints.contains(&"GET /health"));
}

#[actix_web::test]
async fn test_health() {
    let app = app!(service());
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[actix_web::test]
async fn test_rerank_response_shape() {
    let app = app!(service());
    let req = test::TestRequest::post()
        .uri("/rerank")
        .set_json(example_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["method"], "math");
    assert_eq!(body["cached"], false);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], "a");
    assert_eq!(items[1]["id"], "b");
    assert!(items[0]["finalScore"].as_f64().unwrap() > items[1]["finalScore"].as_f64().unwrap());
    assert_eq!(items[0]["length"], 44);

    let trace = &items[0]["scores"];
    for field in [
        "vectorScore",
        "semanticScore",
        "queryTermMatch",
        "recency",
        "length",
        "stringScore",
        "fuzzyScore",
        "keywordScore",
        "finalScore",
    ] {
        assert!(trace[field].is_number(), "missing trace field {field}");
    }
}

#[actix_web::test]
async fn test_second_request_is_cached() {
    let app = app!(service());

    let first: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/rerank")
            .set_json(example_body())
            .to_request(),
    )
    .await;

    let mut truncated = example_body();
    truncated["topK"] = json!(1);
    let second: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/rerank")
            .set_json(truncated)
            .to_request(),
    )
    .await;

    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["items"][0], first["items"][0]);
}

#[actix_web::test]
async fn test_ai_mode_without_backend_reports_math() {
    let app = app!(service());
    let mut body = example_body();
    body["mode"] = json!("ai");

    let resp: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post().uri("/rerank").set_json(body).to_request(),
    )
    .await;
    assert_eq!(resp["method"], "math");
    assert_eq!(resp["items"][0]["id"], "a");
}

#[actix_web::test]
async fn test_invalid_requests_are_400() {
    let app = app!(service());

    let bodies = vec![
        json!({"query": "q", "items": []}),
        json!({"query": "q", "items": [{"id": "a"}]}),
        json!({"items": [{"id": "a", "content": "x"}]}),
        json!({"query": "q", "items": [{"id": "a", "content": "x"}], "excludeFactors": ["bogus"]}),
        json!({"query": "q", "items": [{"id": "a", "content": "x"}], "mode": "quantum"}),
    ];

    for body in bodies {
        let req = test::TestRequest::post()
            .uri("/rerank")
            .set_json(&body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");

        let json: Value = test::read_body_json(resp).await;
        assert!(json["error"].is_string());
    }
}

#[actix_web::test]
async fn test_malformed_json_is_400() {
    let app = app!(service());
    let req = test::TestRequest::post()
        .uri("/rerank")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"query\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_unknown_route_is_404() {
    let app = app!(service());
    let req = test::TestRequest::get().uri("/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json, json!({"error": "Not found"}));
}
