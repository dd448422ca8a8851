/// API routes and handlers
pub mod admin;
pub mod contents;
pub mod health;
pub mod middleware;
pub mod passport;
pub mod profile;
pub mod story;
pub mod totems;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(totems::routes())
        .merge(contents::routes())
        .merge(passport::routes())
        .merge(story::routes())
        .merge(profile::routes())
        .merge(admin::routes())
}
