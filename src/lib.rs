/// DisTim - cultural QR totems with a virtual stamp passport
///
/// Visitors scan QR codes on totems placed at transit stations to unlock
/// bonus stories and collect stamps; stamps feed a generated story of their
/// walk through the city.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod metrics;
pub mod passport;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod story;
pub mod unlock;

pub use context::AppContext;
pub use error::{DistimError, DistimResult};
