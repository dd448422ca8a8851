//! Shared fixtures for router tests
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use distim::{
    catalog::{NewTotem, SubmitContent},
    config::{
        AuthConfig, DeviceStoreConfig, LoggingConfig, RateLimitConfig, ServerConfig,
        ServiceConfig, StorageConfig, StoryConfig, TokenVerification, DEFAULT_ROLE_CLAIM,
    },
    db::models::ContentCategory,
    server::build_router,
    AppContext,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-of-32-chars+";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            version: "test".to_string(),
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            database: PathBuf::from("./data/distim.sqlite"),
            device_store: DeviceStoreConfig::Memory,
        },
        authentication: AuthConfig {
            verification: TokenVerification::SharedSecret {
                secret: SECRET.to_string(),
            },
            role_claim: DEFAULT_ROLE_CLAIM.to_string(),
        },
        story: StoryConfig {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
        },
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Context seeded with one totem (slug "abc123") and one poem
pub async fn seeded_context() -> AppContext {
    let ctx = AppContext::in_memory(test_config()).await.unwrap();

    ctx.totems
        .create(NewTotem {
            id: "piata-unirii".to_string(),
            name: "Piața Unirii".to_string(),
            description: Some("Stația din centrul vechi".to_string()),
            teaser_text: Some("Scanează codul pentru povestea ascunsă".to_string()),
            locked_text: Some("Fântâna de pe piață ascunde o poveste".to_string()),
            qr_slug: Some("abc123".to_string()),
            stamp_label: Some("Unirii".to_string()),
            stamp_emoji: Some("⛲".to_string()),
            latitude: 45.7579,
            longitude: 21.2290,
        })
        .await
        .unwrap();

    ctx.contents
        .submit(SubmitContent {
            totem_id: "piata-unirii".to_string(),
            category: ContentCategory::Poezie,
            title: "Seară pe Bega".to_string(),
            artist: Some("Ana".to_string()),
            artist_email: Some("ana@example.com".to_string()),
            snippet: Some("Luminile cad în apă".to_string()),
            full_text: None,
            media_url: None,
        })
        .await
        .unwrap();

    ctx
}

pub fn router(ctx: &AppContext) -> Router {
    build_router(ctx.clone())
}

pub fn token(sub: &str, role: Option<&str>) -> String {
    let mut claims = json!({
        "sub": sub,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    if let Some(role) = role {
        claims[DEFAULT_ROLE_CLAIM] = json!(role);
    }
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn json_body(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
