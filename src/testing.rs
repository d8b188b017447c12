//! In-memory repositories and request helpers shared by handler tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use lazy_static::lazy_static;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::password::hash_password,
    cards::{
        filter::CardFilter,
        model::{Card, CardPatch, NewCard},
        repo::{CardRepository, DynCardRepository},
    },
    config::{AppConfig, JwtConfig},
    error::RepoError,
    state::AppState,
    users::{
        repo::{DynUserRepository, UserRepository},
        repo_types::{NewUser, User},
    },
};

#[derive(Default)]
pub struct MemoryUserRepository {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<u64, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|u| u.id != id);
        Ok((before - rows.len()) as u64)
    }
}

/// Keeps insertion order and the unique columns of the `cards` table.
#[derive(Default)]
pub struct MemoryCardRepository {
    rows: Mutex<Vec<Card>>,
}

fn unique_violation(rows: &[Card], candidate: &Card) -> Option<&'static str> {
    let others = rows.iter().filter(|c| c.id != candidate.id);
    for other in others {
        if other.name == candidate.name {
            return Some("cards_name_key");
        }
        if other.image == candidate.image {
            return Some("cards_image_key");
        }
        if other.number.is_some() && other.number == candidate.number {
            return Some("cards_number_key");
        }
    }
    None
}

#[async_trait]
impl CardRepository for MemoryCardRepository {
    async fn create(&self, owner: Uuid, card: NewCard) -> Result<Card, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        let card = Card {
            id: Uuid::new_v4(),
            number: card.number,
            name: card.name,
            card_type: card.card_type,
            image: card.image,
            attribute: card.attribute,
            sub_types: card.sub_types,
            level: card.level,
            attack: card.attack,
            defense: card.defense,
            description: card.description,
            user_id: owner,
            created_at: now,
            updated_at: now,
        };
        if let Some(constraint) = unique_violation(&rows, &card) {
            return Err(RepoError::Constraint(constraint.into()));
        }
        rows.push(card.clone());
        Ok(card)
    }

    async fn find_one(&self, filter: &CardFilter) -> Result<Option<Card>, RepoError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| filter.matches(c))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Card>, RepoError> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn find_and_count(
        &self,
        filter: &CardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Card>, i64), RepoError> {
        let rows = self.rows.lock().unwrap();
        let matched: Vec<&Card> = rows.iter().filter(|c| filter.matches(c)).collect();
        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update(&self, id: Uuid, patch: CardPatch) -> Result<Option<Card>, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(pos) = rows.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let mut updated = rows[pos].clone().patched(&patch);
        updated.updated_at = OffsetDateTime::now_utc();
        if let Some(constraint) = unique_violation(&rows, &updated) {
            return Err(RepoError::Constraint(constraint.into()));
        }
        rows[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn destroy(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id);
        Ok(rows.len() < before)
    }
}

pub fn fake_state() -> AppState {
    let config = AppConfig {
        database_url: "postgres://unused".into(),
        max_connections: 1,
        jwt: JwtConfig {
            secret: "test".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 5,
        },
    };
    let users = Arc::new(MemoryUserRepository::default()) as DynUserRepository;
    let cards = Arc::new(MemoryCardRepository::default()) as DynCardRepository;
    AppState::from_parts(&config, users, cards)
}

pub fn fake_app() -> (Router, AppState) {
    let state = fake_state();
    (build_app(state.clone()), state)
}

/// Sends one request through the router; an empty body decodes as `Value::Null`.
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<String>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        req = req.header(header::AUTHORIZATION, auth);
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

pub fn bearer(state: &AppState, user: &User) -> String {
    format!("Bearer {}", state.jwt.sign(user.id).unwrap())
}

pub async fn seed_user(state: &AppState, email: &str, password: &str) -> User {
    let password_hash = hash_password(password).unwrap();
    state
        .users
        .create(NewUser {
            name: "Seeded".into(),
            email: email.into(),
            password_hash,
        })
        .await
        .unwrap()
}

lazy_static! {
    static ref OWNER_HASH: String = hash_password("owner-password").unwrap();
}

static SEQ: AtomicUsize = AtomicUsize::new(1);

fn next_seq() -> usize {
    SEQ.fetch_add(1, Ordering::Relaxed)
}

/// A fresh user plus a bearer header for it.
pub async fn seed_owner(state: &AppState) -> (User, String) {
    let user = state
        .users
        .create(NewUser {
            name: "Owner".into(),
            email: format!("owner{}@example.com", next_seq()),
            password_hash: OWNER_HASH.clone(),
        })
        .await
        .unwrap();
    let auth = bearer(state, &user);
    (user, auth)
}

/// A complete Monster payload with unique number and image.
pub fn monster_body(name: &str, level: i32) -> Value {
    let n = next_seq();
    json!({
        "name": name,
        "type": "Monster",
        "image": format!("https://img.example.com/{n}.png"),
        "attribute": "Dark",
        "description": format!("{name} test card."),
        "number": format!("TEST-EN{n:03}"),
        "level": level,
        "subTypes": "Normal",
        "attack": 1500,
        "defense": 1000,
    })
}
