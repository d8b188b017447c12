use crate::state::AppState;
use axum::Router;

mod dto;
pub mod filter;
pub mod handlers;
pub mod model;
pub mod repo;
pub mod validation;

pub fn router() -> Router<AppState> {
    handlers::card_routes()
}
