use crate::auth::jwt::JwtKeys;
use crate::cards::repo::{DynCardRepository, PgCardRepository};
use crate::config::AppConfig;
use crate::users::repo::{DynUserRepository, PgUserRepository};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtKeys>,
    pub users: DynUserRepository,
    pub cards: DynCardRepository,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing with existing schema");
        }

        let users = Arc::new(PgUserRepository::new(db.clone())) as DynUserRepository;
        let cards = Arc::new(PgCardRepository::new(db)) as DynCardRepository;

        Ok(Self::from_parts(&config, users, cards))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: DynUserRepository,
        cards: DynCardRepository,
    ) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt));
        Self {
            jwt,
            users,
            cards,
        }
    }
}
