use serde::Serialize;

use super::{filter::Pagination, model::Card};

#[derive(Debug, Serialize)]
pub struct CardListResponse {
    pub cards: Vec<Card>,
    pub pagination: Pagination,
}
