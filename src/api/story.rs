/// Story generation endpoints
use crate::{auth::UserAuth, context::AppContext, story::Story};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/story", post(story_for_places).get(story_for_user))
}

#[derive(Debug, Default, Deserialize)]
struct StoryRequest {
    #[serde(default)]
    places: Vec<String>,
}

/// Story over the places the client selected; an empty list uses the defaults
async fn story_for_places(
    State(ctx): State<AppContext>,
    Json(request): Json<StoryRequest>,
) -> Json<Story> {
    let places: Vec<String> = request
        .places
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    Json(ctx.story.generate(&places).await)
}

/// Story over the places the signed-in user has unlocked
///
/// A failed lookup degrades to the default places.
async fn story_for_user(State(ctx): State<AppContext>, user: UserAuth) -> Json<Story> {
    let places = ctx
        .passport
        .remote()
        .visited_places(&user.user_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading visited places for {}: {}", user.user_id, e);
            Vec::new()
        });

    Json(ctx.story.generate(&places).await)
}
