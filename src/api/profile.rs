/// Own profile endpoint
use crate::{
    auth::UserAuth,
    catalog::ProfileUpdate,
    context::AppContext,
    db::models::Profile,
    error::{DistimError, DistimResult},
};
use axum::{extract::State, routing::get, Json, Router};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

async fn get_profile(
    State(ctx): State<AppContext>,
    user: UserAuth,
) -> DistimResult<Json<Profile>> {
    let profile = ctx
        .profiles
        .get(&user.user_id)
        .await?
        .ok_or_else(|| DistimError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    user: UserAuth,
    Json(update): Json<ProfileUpdate>,
) -> DistimResult<Json<Profile>> {
    Ok(Json(ctx.profiles.upsert(&user.user_id, update).await?))
}
