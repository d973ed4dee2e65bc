//! Integration tests for menulens-scan HTTP endpoints

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::*;
use http_body_util::BodyExt;
use menulens_common::ScanEvent;
use menulens_scan::providers::scripted::{sample_menu, ScriptedEnrichment, ScriptedExtraction};
use menulens_scan::services::StaticCuisineSource;
use menulens_scan::types::EnrichmentTier;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state) = test_app(echo_pipeline(1, 1), StaticCuisineSource::new()).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "menulens-scan");
    assert!(json["uptime_seconds"].is_u64());
    assert_eq!(json["active_scans"], 0);
    assert_eq!(json["pipeline"]["extraction"], json!(["scripted"]));
    assert_eq!(json["pipeline"]["enrichment"], json!(["groq"]));
    assert_eq!(json["pipeline"]["batchSize"], 1);
    assert_eq!(json["pipeline"]["tier"], "full");
}

#[tokio::test]
async fn test_scan_streams_ndjson_events() {
    let (app, state) = test_app(echo_pipeline(4, 3), StaticCuisineSource::new()).await;

    let response = app
        .oneshot(post_json("/scan", json!({ "image": image_data_uri() })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/x-ndjson"
    );
    let scan_id = response.headers()["x-scan-id"].to_str().unwrap().to_string();
    assert!(Uuid::parse_str(&scan_id).is_ok());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let events: Vec<ScanEvent> = text
        .lines()
        .map(|line| ScanEvent::from_ndjson_line(line).unwrap())
        .collect();

    assert_eq!(
        event_types(&events),
        vec!["progress", "phase1", "progress", "batch", "batch", "done"]
    );
    assert_eq!(batch_ids(&events), vec!["dish-1", "dish-2", "dish-3", "dish-4"]);

    // Registration is removed once the body is gone
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(state.cancellation_tokens.read().await.is_empty());
}

#[tokio::test]
async fn test_scan_rejects_bad_image() {
    let (app, _state) = test_app(echo_pipeline(1, 1), StaticCuisineSource::new()).await;

    let response = app
        .clone()
        .oneshot(post_json("/scan", json!({ "image": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json("/scan", json!({ "image": "data:text/plain;base64,aGk=" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_IMAGE");
}

#[tokio::test]
async fn test_cancel_scan() {
    let slow = pipeline(
        vec![Arc::new(ScriptedExtraction::returning(
            "scripted",
            sample_menu(2, "Japan"),
        ))],
        vec![Arc::new(
            ScriptedEnrichment::echo("groq").with_delay(|_| Duration::from_secs(3600)),
        )],
        settings(2, EnrichmentTier::Full),
    );
    let (app, _state) = test_app(slow, StaticCuisineSource::new()).await;

    let response = app
        .clone()
        .oneshot(post_json("/scan", json!({ "image": image_data_uri() })))
        .await
        .unwrap();
    let scan_id = response.headers()["x-scan-id"].to_str().unwrap().to_string();
    let cancel_uri = format!("/scan/{}/cancel", scan_id);

    let cancelled = app
        .clone()
        .oneshot(post_json(&cancel_uri, json!({})))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), StatusCode::OK);
    let json = body_json(cancelled).await;
    assert_eq!(json["cancelled"], true);

    let again = app
        .clone()
        .oneshot(post_json(&cancel_uri, json!({})))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    // The stream ends without a done event
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("\"done\""));
}

#[tokio::test]
async fn test_cancel_finished_scan_is_conflict() {
    let (app, state) = test_app(echo_pipeline(2, 2), StaticCuisineSource::new()).await;

    let response = app
        .clone()
        .oneshot(post_json("/scan", json!({ "image": image_data_uri() })))
        .await
        .unwrap();
    let scan_id = response.headers()["x-scan-id"].to_str().unwrap().to_string();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("\"done\""));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(state.cancellation_tokens.read().await.is_empty());

    let cancelled = app
        .oneshot(post_json(&format!("/scan/{}/cancel", scan_id), json!({})))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), StatusCode::CONFLICT);
    let json = body_json(cancelled).await;
    assert_eq!(json["error"]["code"], "SCAN_FINISHED");
}

#[tokio::test]
async fn test_cancel_unknown_scan_is_not_found() {
    let (app, _state) = test_app(echo_pipeline(1, 1), StaticCuisineSource::new()).await;

    let response = app
        .oneshot(post_json(
            &format!("/scan/{}/cancel", Uuid::new_v4()),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enrich_detail() {
    let (app, _state) = test_app(echo_pipeline(1, 1), StaticCuisineSource::new()).await;

    let empty = app
        .clone()
        .oneshot(post_json("/enrich-detail", json!({ "dishes": [] })))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/enrich-detail",
            json!({
                "dishes": [{
                    "id": "dish-3",
                    "nameEnglish": "Tom Yum Goong",
                    "nameLocal": "ต้มยำกุ้ง",
                    "brief": "hot and sour soup",
                    "country": "Thailand"
                }],
                "preferences": { "diet": "Veg" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["dishes"][0]["id"], "dish-3");
    assert_eq!(json["dishes"][0]["ingredients"][0]["name"], "tom yum goong");
    assert!(json["dishes"][0]["nutrition"]["kcal"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_cache_match_endpoint() {
    let (app, _state) = test_app(echo_pipeline(1, 1), korean_source()).await;

    let response = app
        .oneshot(post_json(
            "/cache/match",
            json!({
                "dishes": [
                    { "id": "dish-1", "nameEnglish": "Kimchi Jjigae", "nameLocal": "김치찌개",
                      "price": "9,000", "country": "South Korea" },
                    { "id": "dish-2", "nameEnglish": "Japchae", "nameLocal": "",
                      "price": "12,000", "country": "South Korea" }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["cuisine"], "korean");
    assert_eq!(json["hits"][0]["id"], "dish-1");
    assert_eq!(json["hits"][0]["price"], "9,000");
    assert_eq!(json["missIds"], json!(["dish-2"]));
    assert_eq!(
        json["hitImages"]["dish-1"],
        json!(["https://img.example/kimchi-1.jpg"])
    );
}

#[tokio::test]
async fn test_rank_endpoint_recommended_view() {
    let (app, _state) = test_app(echo_pipeline(1, 1), StaticCuisineSource::new()).await;

    let response = app
        .oneshot(post_json(
            "/rank",
            json!({
                "dishes": [
                    { "id": "dish-1", "nameEnglish": "Pork Belly", "dietaryType": "non-veg",
                      "ingredients": [{ "name": "pork belly", "category": "protein" }] },
                    { "id": "dish-2", "nameEnglish": "Tofu Stew", "dietaryType": "veg",
                      "ingredients": [{ "name": "soft tofu", "category": "protein" }],
                      "rankScore": 12 }
                ],
                "preferences": { "diet": "Veg", "proteins": ["tofu"] },
                "view": "recommended"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["dishes"][0]["id"], "dish-2");
    assert_eq!(json["dishes"][0]["rankLabel"], "Top Pick");
    assert_eq!(json["dishes"][0]["rankScore"], 77.0);
    assert_eq!(json["dishes"][1]["rankLabel"], "#2 Pick");
    assert_eq!(json["dishes"][1]["rankScore"], -50.0);
}
