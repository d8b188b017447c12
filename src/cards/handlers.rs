use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    cards::{
        dto::CardListResponse,
        filter::{build_query, CardFilter, ListCardsQuery, Pagination},
        model::Card,
        validation::{check_monster_complete, validate_card, validate_patch, CardCandidate, CardViolation},
    },
    error::{messages, AppError, RepoError},
    state::AppState,
};

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/cards", post(create_card).get(list_cards))
        .route(
            "/cards/:id",
            get(get_card).put(update_card).delete(delete_card),
        )
}

fn parse_card_id(raw: &str) -> Result<Uuid, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation(messages::CARD_ID_IS_REQUIRED.into()));
    }
    // a malformed id cannot name any stored card
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(messages::CARD_NOT_FOUND.into()))
}

fn candidate(payload: Result<Json<CardCandidate>, JsonRejection>) -> Result<CardCandidate, AppError> {
    payload.map(|Json(c)| c).map_err(|e| {
        warn!(error = %e, "unreadable card body");
        AppError::Validation(e.body_text())
    })
}

fn rejected(v: CardViolation) -> AppError {
    warn!(violation = ?v, "card rejected");
    AppError::Validation(v.to_string())
}

fn storage_error(e: RepoError) -> AppError {
    match e {
        RepoError::Constraint(detail) => {
            warn!(error = %detail, "card constraint violation");
            AppError::Validation(messages::CARD_CONSTRAINT.into())
        }
        other => other.into(),
    }
}

fn not_found() -> AppError {
    AppError::NotFound(messages::CARD_NOT_FOUND.into())
}

#[instrument(skip(state, payload))]
pub async fn create_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<CardCandidate>, JsonRejection>,
) -> Result<(StatusCode, Json<Card>), AppError> {
    let new_card = validate_card(&candidate(payload)?).map_err(rejected)?;

    let card = state
        .cards
        .create(identity.id, new_card)
        .await
        .map_err(storage_error)?;

    info!(card_id = %card.id, owner = %identity.id, card_type = %card.card_type, "card created");
    Ok((StatusCode::CREATED, Json(card)))
}

#[instrument(skip(state))]
pub async fn list_cards(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    query: Result<Query<ListCardsQuery>, QueryRejection>,
) -> Result<Json<CardListResponse>, AppError> {
    let Query(q) = query.map_err(|e| {
        warn!(error = %e, "unreadable listing query");
        AppError::InvalidParameter(e.body_text())
    })?;
    let query = build_query(&q).map_err(|e| {
        warn!(error = %e, "invalid listing parameters");
        AppError::from(e)
    })?;

    let (cards, total) = state
        .cards
        .find_and_count(&query.filter, query.window.limit, query.window.offset())
        .await?;

    Ok(Json(CardListResponse {
        cards,
        pagination: Pagination::new(query.window, total),
    }))
}

#[instrument(skip(state))]
pub async fn get_card(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Card>, AppError> {
    let id = parse_card_id(&id)?;
    let card = state
        .cards
        .find_one(&CardFilter::by_id(id))
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(card))
}

#[instrument(skip(state, payload))]
pub async fn update_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<CardCandidate>, JsonRejection>,
) -> Result<Json<Card>, AppError> {
    let id = parse_card_id(&id)?;
    let existing = state.cards.find_by_id(id).await?.ok_or_else(not_found)?;

    let patch = validate_patch(&candidate(payload)?).map_err(rejected)?;
    check_monster_complete(&existing.patched(&patch)).map_err(rejected)?;

    let card = state
        .cards
        .update(id, patch)
        .await
        .map_err(storage_error)?
        .ok_or_else(not_found)?;

    info!(card_id = %card.id, by = %identity.id, "card updated");
    Ok(Json(card))
}

#[instrument(skip(state))]
pub async fn delete_card(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_card_id(&id)?;
    if state.cards.find_by_id(id).await?.is_none() {
        return Err(not_found());
    }
    if !state.cards.destroy(id).await? {
        return Err(not_found());
    }

    info!(card_id = %id, by = %identity.id, "card deleted");
    Ok(StatusCode::NO_CONTENT)
}
