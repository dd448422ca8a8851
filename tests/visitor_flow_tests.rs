//! Router tests for the visitor flow: unlocks, passport, contents, story

mod common;

use axum::{body::Body, http::StatusCode};
use common::*;
use distim::session::DeviceId;
use serde_json::json;

#[tokio::test]
async fn test_valid_qr_unlocks_and_stamps_once() {
    let ctx = seeded_context().await;
    let app = router(&ctx);
    let device = DeviceId::new().to_string();

    let request = || {
        get("/totem/piata-unirii?qr=abc123")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap()
    };

    let (status, page) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["unlocked"], true);
    assert_eq!(page["bonus_text"], "Fântâna de pe piață ascunde o poveste");
    assert_eq!(page["visit"]["target"], "device");
    assert_eq!(page["visit"]["recorded"], true);
    assert!(page["totem"].get("qr_slug").is_none());
    assert!(page["totem"].get("locked_text").is_none());

    let (_, again) = send(&app, request()).await;
    assert_eq!(again["visit"]["recorded"], false);
    assert_eq!(again["stamp_collected"], true);

    let (status, passport) = send(
        &app,
        get("/api/passport")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(passport["count"], 1);
    assert_eq!(passport["stamps"][0]["stamp_label"], "Unirii");
}

#[tokio::test]
async fn test_wrong_qr_keeps_page_locked() {
    let ctx = seeded_context().await;
    let app = router(&ctx);
    let device = DeviceId::new().to_string();

    let (status, page) = send(
        &app,
        get("/totem/piata-unirii?qr=WRONG")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["unlocked"], false);
    assert!(page.get("bonus_text").is_none());
    assert_eq!(page["totem"]["teaser_text"], "Scanează codul pentru povestea ascunsă");

    let (_, passport) = send(
        &app,
        get("/api/passport")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(passport["count"], 0);
}

#[tokio::test]
async fn test_unknown_totem_and_bad_headers() {
    let ctx = seeded_context().await;
    let app = router(&ctx);

    let (status, body) = send(&app, get("/totem/nowhere?qr=abc123").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let (status, _) = send(
        &app,
        get("/totem/piata-unirii")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        get("/api/passport")
            .header("x-device-id", "not-a-uuid")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_in_unlock_and_device_claim() {
    let ctx = seeded_context().await;
    let app = router(&ctx);
    let device = DeviceId::new().to_string();
    let bearer = format!("Bearer {}", token("auth0|maria", None));

    send(
        &app,
        get("/totem/piata-unirii?qr=abc123")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let (status, outcome) = send(
        &app,
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/passport/claim")
            .header("authorization", &bearer)
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "claimed": 1, "already_present": 0, "dropped": 0, "failed": 0 }));

    let (_, account) = send(
        &app,
        get("/api/passport")
            .header("authorization", &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(account["source"], "account");
    assert_eq!(account["count"], 1);

    let (_, device_view) = send(
        &app,
        get("/api/passport")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(device_view["count"], 0);

    let (_, page) = send(
        &app,
        get("/totem/piata-unirii?qr=abc123")
            .header("authorization", &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(page["visit"]["target"], "account");
    assert_eq!(page["visit"]["already_collected"], true);
}

#[tokio::test]
async fn test_clear_device_passport() {
    let ctx = seeded_context().await;
    let app = router(&ctx);
    let device = DeviceId::new().to_string();

    send(
        &app,
        get("/totem/piata-unirii?qr=abc123")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let (status, body) = send(
        &app,
        axum::http::Request::builder()
            .method("DELETE")
            .uri("/api/passport")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, passport) = send(
        &app,
        get("/api/passport")
            .header("x-device-id", &device)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(passport["count"], 0);
}

#[tokio::test]
async fn test_content_views_and_categories() {
    let ctx = seeded_context().await;
    let app = router(&ctx);
    let id = ctx.contents.list_all().await.unwrap()[0].id.clone();

    let (status, first) = send(&app, get(&format!("/api/contents/{}", id)).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["views"], 1);
    assert_eq!(first["totem_name"], "Piața Unirii");
    assert!(first.get("submitter_email").is_none());

    let (_, second) = send(&app, get(&format!("/api/contents/{}", id)).body(Body::empty()).unwrap()).await;
    assert_eq!(second["views"], 2);

    let (status, listing) = send(&app, get("/api/categories/poezie").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["label"], "Poezie");
    assert_eq!(listing["items"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, get("/api/categories/sculptura").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = send(&app, get("/api/totems/piata-unirii").body(Body::empty()).unwrap()).await;
    assert_eq!(page["categories"][0]["category"], "poezie");
}

#[tokio::test]
async fn test_submit_content_validation() {
    let ctx = seeded_context().await;
    let app = router(&ctx);

    let (status, item) = send(
        &app,
        json_body(
            "POST",
            "/api/contents",
            json!({
                "totem_id": "piata-unirii",
                "category": "muzica",
                "title": "  Dimineață la Operă  ",
                "artist": "Ion",
                "media_url": "https://example.com/track.mp3"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["title"], "Dimineață la Operă");
    assert_eq!(item["views"], 0);

    let (status, _) = send(
        &app,
        json_body(
            "POST",
            "/api/contents",
            json!({ "totem_id": "nowhere", "category": "muzica", "title": "X" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_body(
            "POST",
            "/api/contents",
            json!({ "totem_id": "piata-unirii", "category": "arte", "title": "" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_story_falls_back_without_model() {
    let ctx = seeded_context().await;
    let app = router(&ctx);

    let (status, story) = send(
        &app,
        json_body("POST", "/api/story", json!({ "places": ["Opera Națională"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["source"], "fallback");
    assert!(story["text"].as_str().unwrap().contains("Opera Națională"));

    let (status, _) = send(&app, get("/api/story").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = format!("Bearer {}", token("auth0|ion", None));
    send(
        &app,
        get("/totem/piata-unirii?qr=abc123")
            .header("authorization", &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let (status, story) = send(
        &app,
        get("/api/story")
            .header("authorization", &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["places"], json!(["Unirii"]));
}

#[tokio::test]
async fn test_user_story_survives_database_failure() {
    let ctx = seeded_context().await;
    let app = router(&ctx);
    let bearer = format!("Bearer {}", token("auth0|ion", None));

    ctx.db.close().await;

    let (status, story) = send(
        &app,
        get("/api/story")
            .header("authorization", &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["source"], "fallback");
    assert_eq!(
        story["places"].as_array().unwrap().len(),
        distim::story::DEFAULT_PLACES.len()
    );
}

#[tokio::test]
async fn test_health_metrics_and_fallback() {
    let ctx = seeded_context().await;
    let app = router(&ctx);

    let (status, health) = send(&app, get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let (status, ready) = send(&app, get("/health/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["checks"][0]["status"], "healthy");

    let (status, metrics) = send(&app, get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(metrics.as_str().unwrap().contains("http_requests_total"));

    let (status, body) = send(&app, get("/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Endpoint not found");
}
