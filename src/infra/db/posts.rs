use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    NewPostParams, PostFlagsParams, PostListItem, PostListScope, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

/// Shared SELECT head for the joined read model; every consumer appends
/// conditions against the `p`/`u`/`c`/`l` aliases.
const POST_LIST_SELECT: &str = "SELECT p.id, p.title, p.text, p.image_path, p.pub_date, \
     p.is_published, p.created_at, p.author_id, u.username AS author_username, \
     p.category_id, c.title AS category_title, c.slug AS category_slug, \
     c.is_published AS category_published, \
     p.location_id, l.name AS location_name, \
     (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN locations l ON l.id = p.location_id \
     WHERE 1=1 ";

const POST_COUNT_SELECT: &str = "SELECT COUNT(*) FROM posts p \
     LEFT JOIN categories c ON c.id = p.category_id \
     WHERE 1=1 ";

#[derive(sqlx::FromRow)]
struct PostListRow {
    id: Uuid,
    title: String,
    text: String,
    image_path: Option<String>,
    pub_date: OffsetDateTime,
    is_published: bool,
    created_at: OffsetDateTime,
    author_id: Uuid,
    author_username: String,
    category_id: Option<Uuid>,
    category_title: Option<String>,
    category_slug: Option<String>,
    category_published: Option<bool>,
    location_id: Option<Uuid>,
    location_name: Option<String>,
    comment_count: i64,
}

impl From<PostListRow> for PostListItem {
    fn from(row: PostListRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            text: row.text,
            image_path: row.image_path,
            pub_date: row.pub_date,
            is_published: row.is_published,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: row.author_username,
            category_id: row.category_id,
            category_title: row.category_title,
            category_slug: row.category_slug,
            category_published: row.category_published,
            location_id: row.location_id,
            location_name: row.location_name,
            comment_count: row.comment_count,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    text: String,
    image_path: Option<String>,
    pub_date: OffsetDateTime,
    is_published: bool,
    author_id: Uuid,
    category_id: Option<Uuid>,
    location_id: Option<Uuid>,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            text: row.text,
            image_path: row.image_path,
            pub_date: row.pub_date,
            is_published: row.is_published,
            author_id: row.author_id,
            category_id: row.category_id,
            location_id: row.location_id,
            created_at: row.created_at,
        }
    }
}

const POST_RETURNING: &str = "RETURNING id, title, text, image_path, pub_date, is_published, \
     author_id, category_id, location_id, created_at";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: &PostListScope,
        now: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostListItem>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LIST_SELECT);
        Self::apply_scope_conditions(&mut qb, scope, now);

        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<PostListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostListItem::from).collect())
    }

    async fn count_posts(
        &self,
        scope: &PostListScope,
        now: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new(POST_COUNT_SELECT);
        Self::apply_scope_conditions(&mut qb, scope, now);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostListItem>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LIST_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostListItem::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO posts (title, text, image_path, pub_date, is_published, author_id, \
             category_id, location_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) {POST_RETURNING}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&params.title)
            .bind(&params.text)
            .bind(&params.image_path)
            .bind(params.pub_date)
            .bind(params.is_published)
            .bind(params.author_id)
            .bind(params.category_id)
            .bind(params.location_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "UPDATE posts SET title = $1, text = $2, pub_date = $3, \
             image_path = COALESCE($4, image_path) WHERE id = $5 {POST_RETURNING}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&params.title)
            .bind(&params.text)
            .bind(params.pub_date)
            .bind(&params.image_path)
            .bind(params.id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post_flags(&self, params: PostFlagsParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "UPDATE posts SET is_published = $1, category_id = $2, location_id = $3 \
             WHERE id = $4 {POST_RETURNING}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.is_published)
            .bind(params.category_id)
            .bind(params.location_id)
            .bind(params.id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
