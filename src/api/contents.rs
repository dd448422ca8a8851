/// Category listings, content detail and artist submissions
use crate::{
    catalog::SubmitContent,
    context::AppContext,
    db::models::{ContentCategory, ContentItem},
    error::DistimResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/categories/:category", get(list_category))
        .route("/api/contents", post(submit_content))
        .route("/api/contents/:content_id", get(get_content))
}

#[derive(Debug, Serialize)]
struct CategoryListing {
    category: ContentCategory,
    label: &'static str,
    items: Vec<ContentItem>,
}

async fn list_category(
    State(ctx): State<AppContext>,
    Path(category): Path<String>,
) -> DistimResult<Json<CategoryListing>> {
    let category: ContentCategory = category.parse()?;
    let items = ctx.contents.list_by_category(category).await?;

    Ok(Json(CategoryListing {
        category,
        label: category.label(),
        items,
    }))
}

/// Content detail; every successful load counts one view
async fn get_content(
    State(ctx): State<AppContext>,
    Path(content_id): Path<String>,
) -> DistimResult<Json<ContentItem>> {
    Ok(Json(ctx.contents.view(&content_id).await?))
}

async fn submit_content(
    State(ctx): State<AppContext>,
    Json(submission): Json<SubmitContent>,
) -> DistimResult<(StatusCode, Json<ContentItem>)> {
    let item = ctx.contents.submit(submission).await?;
    Ok((StatusCode::CREATED, Json(item)))
}
