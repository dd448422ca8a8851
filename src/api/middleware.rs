/// Request header helpers and request metrics middleware
use crate::{error::DistimResult, metrics, session::DeviceId};
use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Header carrying the anonymous device id
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Extract the device id header; a malformed value is a client error
pub fn extract_device_id(headers: &HeaderMap) -> DistimResult<Option<DeviceId>> {
    match headers.get(DEVICE_ID_HEADER).and_then(|h| h.to_str().ok()) {
        Some(value) if !value.trim().is_empty() => value.parse().map(Some),
        _ => Ok(None),
    }
}

/// Record count and latency of every request, labelled by route template
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer eyJ.abc.def"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("eyJ.abc.def"));
    }

    #[test]
    fn test_extract_device_id() {
        let mut headers = HeaderMap::new();
        assert!(extract_device_id(&headers).unwrap().is_none());

        let device = DeviceId::new();
        headers.insert(
            DEVICE_ID_HEADER,
            HeaderValue::from_str(&device.to_string()).unwrap(),
        );
        assert_eq!(extract_device_id(&headers).unwrap(), Some(device));

        headers.insert(DEVICE_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(extract_device_id(&headers).is_err());
    }
}
