/// Admin API endpoints
///
/// Every route requires a token carrying the admin role. Deletions answer
/// `{ "success": true }` or `400 { "error": message }`.
use crate::{
    auth::AdminAuth,
    catalog::NewTotem,
    context::AppContext,
    db::models::{ContentItem, Profile, Totem},
    error::{DistimError, DistimResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/contents", get(list_contents))
        .route("/api/admin/profiles", get(list_profiles))
        .route("/api/admin/totems", post(create_totem))
        .route("/api/admin/content/:id", delete(delete_content))
        .route("/api/admin/profile/:id", delete(delete_profile))
}

type AdminDeleteResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn deletion_response(result: DistimResult<()>) -> AdminDeleteResult {
    match result {
        Ok(()) => Ok(Json(json!({ "success": true }))),
        Err(e) => Err((StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))),
    }
}

async fn list_contents(
    State(ctx): State<AppContext>,
    _admin: AdminAuth,
) -> DistimResult<Json<Vec<ContentItem>>> {
    Ok(Json(ctx.contents.list_all().await?))
}

async fn list_profiles(
    State(ctx): State<AppContext>,
    _admin: AdminAuth,
) -> DistimResult<Json<Vec<Profile>>> {
    Ok(Json(ctx.profiles.list().await?))
}

async fn create_totem(
    State(ctx): State<AppContext>,
    admin: AdminAuth,
    Json(totem): Json<NewTotem>,
) -> DistimResult<(StatusCode, Json<Totem>)> {
    let totem = ctx.totems.create(totem).await?;
    tracing::info!("Admin {} created totem {}", admin.user_id, totem.id);

    Ok((StatusCode::CREATED, Json(totem)))
}

async fn delete_content(
    State(ctx): State<AppContext>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> AdminDeleteResult {
    if id.trim().is_empty() {
        return deletion_response(Err(DistimError::Validation("Missing id".to_string())));
    }

    let result = ctx.contents.delete(&id).await;
    match &result {
        Ok(()) => tracing::info!("Admin {} deleted content {}", admin.user_id, id),
        Err(e) => tracing::warn!("Admin {} failed to delete content {}: {}", admin.user_id, id, e),
    }
    deletion_response(result)
}

async fn delete_profile(
    State(ctx): State<AppContext>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> AdminDeleteResult {
    if id.trim().is_empty() {
        return deletion_response(Err(DistimError::Validation("Missing id".to_string())));
    }

    let result = ctx.profiles.delete(&id).await;
    match &result {
        Ok(()) => tracing::info!("Admin {} deleted profile {}", admin.user_id, id),
        Err(e) => tracing::warn!("Admin {} failed to delete profile {}: {}", admin.user_id, id, e),
    }
    deletion_response(result)
}
