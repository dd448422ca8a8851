/// Totem pages and QR unlocks
use crate::{
    auth::Session,
    catalog::TotemPage,
    context::AppContext,
    db::models::Totem,
    error::DistimResult,
    unlock::BonusPage,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/totem/:totem_id", get(bonus_page))
        .route("/api/totems", get(list_totems))
        .route("/api/totems/:totem_id", get(totem_page))
}

#[derive(Debug, Deserialize)]
struct UnlockQuery {
    qr: Option<String>,
}

/// Page reached by scanning a totem's QR code
async fn bonus_page(
    State(ctx): State<AppContext>,
    Session(session): Session,
    Path(totem_id): Path<String>,
    Query(query): Query<UnlockQuery>,
) -> DistimResult<Json<BonusPage>> {
    let page = ctx
        .unlock_resolver
        .resolve(&session, &totem_id, query.qr.as_deref())
        .await?;

    Ok(Json(page))
}

async fn list_totems(State(ctx): State<AppContext>) -> DistimResult<Json<Vec<Totem>>> {
    Ok(Json(ctx.totems.list().await?))
}

async fn totem_page(
    State(ctx): State<AppContext>,
    Path(totem_id): Path<String>,
) -> DistimResult<Json<TotemPage>> {
    Ok(Json(ctx.totems.page(&totem_id).await?))
}
