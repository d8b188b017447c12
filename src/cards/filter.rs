//! Turns the `GET /cards` query string into a filter predicate and a page window.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Card;
use crate::error::{messages, AppError};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_PAGE: i64 = 1;

/// Raw listing parameters; everything is optional and arrives as text.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCardsQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub number: Option<String>,
    pub attribute: Option<String>,
    pub level: Option<String>,
    pub attack_ge: Option<String>,
    pub attack_le: Option<String>,
    pub defense_ge: Option<String>,
    pub defense_le: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{}", messages::INVALID_LIMIT)]
    InvalidLimit,
    #[error("{}", messages::INVALID_PAGE)]
    InvalidPage,
    #[error("The '{0}' parameter must be an integer.")]
    NotAnInteger(&'static str),
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        AppError::InvalidParameter(e.to_string())
    }
}

/// Inclusive bounds on an integer column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    pub ge: Option<i32>,
    pub le: Option<i32>,
}

impl Range {
    fn from_bounds(ge: Option<i32>, le: Option<i32>) -> Option<Self> {
        (ge.is_some() || le.is_some()).then_some(Self { ge, le })
    }

    pub fn contains(&self, v: i32) -> bool {
        self.ge.map_or(true, |ge| v >= ge) && self.le.map_or(true, |le| v <= le)
    }
}

/// Field-level conditions, all of which must hold.
///
/// Text fields are case-insensitive substring matches; a condition on a column
/// that is NULL never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub card_type: Option<String>,
    pub number: Option<String>,
    pub attribute: Option<String>,
    pub level: Option<i32>,
    pub attack: Option<Range>,
    pub defense: Option<Range>,
}

impl CardFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn matches(&self, card: &Card) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }
        fn in_range(v: Option<i32>, range: &Option<Range>) -> bool {
            match range {
                None => true,
                Some(r) => v.is_some_and(|v| r.contains(v)),
            }
        }

        self.id.map_or(true, |id| card.id == id)
            && contains(&card.name, &self.name)
            && contains(card.card_type.as_str(), &self.card_type)
            && (self.number.is_none()
                || card.number.as_deref().is_some_and(|n| contains(n, &self.number)))
            && contains(card.attribute.as_str(), &self.attribute)
            && self.level.map_or(true, |l| card.level == Some(l))
            && in_range(card.attack, &self.attack)
            && in_range(card.defense, &self.defense)
    }
}

/// Escape LIKE wildcards and wrap the term for a "contains" match.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub page: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        self.limit * (self.page - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardQuery {
    pub filter: CardFilter,
    pub window: PageWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_pages: i64,
    pub total_items: i64,
    pub current_page: i64,
    pub next_page: Option<i64>,
    pub previous_page: Option<i64>,
}

impl Pagination {
    pub fn new(window: PageWindow, total_items: i64) -> Self {
        let total_pages = (total_items + window.limit - 1) / window.limit;
        Self {
            total_pages,
            total_items,
            current_page: window.page,
            next_page: (window.page < total_pages).then_some(window.page + 1),
            previous_page: (window.page > 1).then_some(window.page - 1),
        }
    }
}

fn text(v: &Option<String>) -> Option<String> {
    v.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn int(v: &Option<String>, param: &'static str) -> Result<Option<i32>, QueryError> {
    match v.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<i32>()
            .map(Some)
            .map_err(|_| QueryError::NotAnInteger(param)),
    }
}

pub fn build_query(q: &ListCardsQuery) -> Result<CardQuery, QueryError> {
    let limit = match q.limit.as_deref() {
        None => DEFAULT_LIMIT,
        Some(s) => s.trim().parse::<i64>().map_err(|_| QueryError::InvalidLimit)?,
    };
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(QueryError::InvalidLimit);
    }

    let page = match q.page.as_deref() {
        None => DEFAULT_PAGE,
        Some(s) => s.trim().parse::<i64>().map_err(|_| QueryError::InvalidPage)?,
    };
    // the offset must stay representable
    if page < 1 || (page - 1).checked_mul(limit).is_none() {
        return Err(QueryError::InvalidPage);
    }

    let filter = CardFilter {
        id: None,
        name: text(&q.name),
        card_type: text(&q.card_type),
        number: text(&q.number),
        attribute: text(&q.attribute),
        // zero means "no level filter"
        level: int(&q.level, "level")?.filter(|l| *l != 0),
        attack: Range::from_bounds(int(&q.attack_ge, "attackGe")?, int(&q.attack_le, "attackLe")?),
        defense: Range::from_bounds(
            int(&q.defense_ge, "defenseGe")?,
            int(&q.defense_le, "defenseLe")?,
        ),
    };

    Ok(CardQuery {
        filter,
        window: PageWindow { limit, page },
    })
}
