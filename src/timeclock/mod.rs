pub mod dto;
pub mod handlers;
pub mod services;

pub use dto::EntryView;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::clock_routes())
        .merge(handlers::entry_routes())
}
