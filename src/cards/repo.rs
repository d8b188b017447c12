use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    filter::{like_pattern, CardFilter, Range},
    model::{Card, CardPatch, CardRow, NewCard},
};
use crate::error::RepoError;

pub type DynCardRepository = Arc<dyn CardRepository + Send + Sync>;

#[async_trait]
pub trait CardRepository {
    async fn create(&self, owner: Uuid, card: NewCard) -> Result<Card, RepoError>;
    /// First card (in insertion order) matching `filter`.
    async fn find_one(&self, filter: &CardFilter) -> Result<Option<Card>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Card>, RepoError>;
    /// One page of matching cards, in insertion order, plus the total match count.
    async fn find_and_count(
        &self,
        filter: &CardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Card>, i64), RepoError>;
    /// `None` when no card has this id.
    async fn update(&self, id: Uuid, patch: CardPatch) -> Result<Option<Card>, RepoError>;
    /// `false` when no card has this id.
    async fn destroy(&self, id: Uuid) -> Result<bool, RepoError>;
}

const CARD_COLUMNS: &str = "id, number, name, card_type, image, attribute, sub_types, level, \
                            attack, defense, description, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgCardRepository {
    db: PgPool,
}

impl PgCardRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_range(qb: &mut QueryBuilder<'_, Postgres>, column: &str, range: &Option<Range>) {
    let Some(range) = range else { return };
    if let Some(ge) = range.ge {
        qb.push(format!(" AND {column} >= ")).push_bind(ge);
    }
    if let Some(le) = range.le {
        qb.push(format!(" AND {column} <= ")).push_bind(le);
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, f: &CardFilter) {
    qb.push(" WHERE TRUE");
    if let Some(id) = f.id {
        qb.push(" AND id = ").push_bind(id);
    }
    let text = [
        ("name", &f.name),
        ("card_type", &f.card_type),
        ("number", &f.number),
        ("attribute", &f.attribute),
    ];
    for (column, term) in text {
        if let Some(term) = term {
            qb.push(format!(" AND {column} ILIKE "))
                .push_bind(like_pattern(term));
        }
    }
    if let Some(level) = f.level {
        qb.push(" AND level = ").push_bind(level);
    }
    push_range(qb, "attack", &f.attack);
    push_range(qb, "defense", &f.defense);
}

fn into_cards(rows: Vec<CardRow>) -> Result<Vec<Card>, RepoError> {
    rows.into_iter()
        .map(|r| Card::try_from(r).context("decode card row").map_err(RepoError::from))
        .collect()
}

#[async_trait]
impl CardRepository for PgCardRepository {
    async fn create(&self, owner: Uuid, card: NewCard) -> Result<Card, RepoError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            r#"
            INSERT INTO cards (id, number, name, card_type, image, attribute, sub_types,
                               level, attack, defense, description, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&card.number)
        .bind(&card.name)
        .bind(card.card_type.as_str())
        .bind(&card.image)
        .bind(card.attribute.as_str())
        .bind(card.sub_types.map(|s| s.as_str()))
        .bind(card.level)
        .bind(card.attack)
        .bind(card.defense)
        .bind(&card.description)
        .bind(owner)
        .fetch_one(&self.db)
        .await?;
        Ok(Card::try_from(row).context("decode card row")?)
    }

    async fn find_one(&self, filter: &CardFilter) -> Result<Option<Card>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {CARD_COLUMNS} FROM cards"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY seq ASC LIMIT 1");
        let row = qb.build_query_as::<CardRow>().fetch_optional(&self.db).await?;
        Ok(into_cards(row.into_iter().collect())?.pop())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Card>, RepoError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(into_cards(row.into_iter().collect())?.pop())
    }

    async fn find_and_count(
        &self,
        filter: &CardFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Card>, i64), RepoError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cards");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut page = QueryBuilder::<Postgres>::new(format!("SELECT {CARD_COLUMNS} FROM cards"));
        push_filter(&mut page, filter);
        page.push(" ORDER BY seq ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = page.build_query_as::<CardRow>().fetch_all(&self.db).await?;

        Ok((into_cards(rows)?, total))
    }

    async fn update(&self, id: Uuid, patch: CardPatch) -> Result<Option<Card>, RepoError> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            r#"
            UPDATE cards SET
                number      = COALESCE($2, number),
                name        = COALESCE($3, name),
                card_type   = COALESCE($4, card_type),
                image       = COALESCE($5, image),
                attribute   = COALESCE($6, attribute),
                sub_types   = COALESCE($7, sub_types),
                level       = COALESCE($8, level),
                attack      = COALESCE($9, attack),
                defense     = COALESCE($10, defense),
                description = COALESCE($11, description),
                updated_at  = now()
            WHERE id = $1
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.number)
        .bind(&patch.name)
        .bind(patch.card_type.map(|t| t.as_str()))
        .bind(&patch.image)
        .bind(patch.attribute.map(|a| a.as_str()))
        .bind(patch.sub_types.map(|s| s.as_str()))
        .bind(patch.level)
        .bind(patch.attack)
        .bind(patch.defense)
        .bind(&patch.description)
        .fetch_optional(&self.db)
        .await?;
        Ok(into_cards(row.into_iter().collect())?.pop())
    }

    async fn destroy(&self, id: Uuid) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_sql_binds_every_condition() {
        let filter = CardFilter {
            name: Some("Dragon".into()),
            level: Some(4),
            attack: Some(Range { ge: Some(1000), le: Some(2000) }),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cards");
        push_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM cards WHERE TRUE AND name ILIKE $1 AND level = $2 \
             AND attack >= $3 AND attack <= $4"
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM cards");
        push_filter(&mut qb, &CardFilter::default());
        assert_eq!(qb.sql(), "SELECT 1 FROM cards WHERE TRUE");
    }
}
