mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::report_routes())
        .merge(handlers::entry_routes())
        .merge(handlers::backup_routes())
}
