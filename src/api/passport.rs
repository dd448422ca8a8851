/// Passport endpoints
use crate::{
    auth::{Session, UserAuth},
    context::AppContext,
    error::{DistimError, DistimResult},
    passport::{ClaimOutcome, Passport},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/passport", get(get_passport).delete(clear_passport))
        .route("/api/passport/claim", post(claim_passport))
}

async fn get_passport(
    State(ctx): State<AppContext>,
    Session(session): Session,
) -> DistimResult<Json<Passport>> {
    Ok(Json(ctx.passport.passport(&session).await?))
}

/// Wipe the stamps of the calling device
async fn clear_passport(
    State(ctx): State<AppContext>,
    Session(session): Session,
) -> DistimResult<Json<Value>> {
    ctx.passport.clear(&session).await?;
    Ok(Json(json!({ "success": true })))
}

/// Move the calling device's stamps onto the signed-in account
async fn claim_passport(
    State(ctx): State<AppContext>,
    user: UserAuth,
) -> DistimResult<Json<ClaimOutcome>> {
    let device = user.device.ok_or_else(|| {
        DistimError::Validation("X-Device-Id header is required to claim stamps".to_string())
    })?;

    let outcome = ctx
        .passport
        .claim_device_stamps(&user.user_id, &device)
        .await?;

    Ok(Json(outcome))
}
