//! Postgres-backed repository implementations.

mod categories;
mod comments;
mod locations;
mod posts;
mod sessions;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, query,
    postgres::{PgPool, PgPoolOptions},
};
use time::OffsetDateTime;

use crate::application::repos::PostListScope;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// The publication-window predicate, composable into any query that
    /// aliases `posts` as `p` and left-joins `categories` as `c`.
    fn push_public_visibility<'q>(qb: &mut QueryBuilder<'q, Postgres>, now: OffsetDateTime) {
        qb.push(" AND p.is_published AND p.pub_date <= ");
        qb.push_bind(now);
        qb.push(" AND (p.category_id IS NULL OR c.is_published) ");
    }

    fn apply_scope_conditions<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        scope: &'q PostListScope,
        now: OffsetDateTime,
    ) {
        match scope {
            PostListScope::Public => {
                Self::push_public_visibility(qb, now);
            }
            PostListScope::Category { slug } => {
                Self::push_public_visibility(qb, now);
                qb.push(" AND c.slug = ");
                qb.push_bind(slug);
            }
            PostListScope::Profile {
                author_id,
                include_hidden,
            } => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(*author_id);
                if !include_hidden {
                    Self::push_public_visibility(qb, now);
                }
            }
            PostListScope::Admin => {}
        }
    }

    fn convert_count(value: i64) -> Result<u64, crate::application::repos::RepoError> {
        value.try_into().map_err(|_| {
            crate::application::repos::RepoError::from_persistence("count exceeds supported range")
        })
    }
}
