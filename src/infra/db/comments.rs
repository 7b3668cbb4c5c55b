use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CommentWithAuthor, CommentsRepo, CommentsWriteRepo, NewCommentParams, RepoError,
};
use crate::domain::entities::CommentRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    text: String,
    post_id: Uuid,
    author_id: Uuid,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            post_id: row.post_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentWithAuthorRow {
    id: Uuid,
    text: String,
    post_id: Uuid,
    author_id: Uuid,
    author_username: String,
    created_at: OffsetDateTime,
}

impl From<CommentWithAuthorRow> for CommentWithAuthor {
    fn from(row: CommentWithAuthorRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: row.author_username,
            created_at: row.created_at,
        }
    }
}

const COMMENT_COLUMNS: &str = "id, text, post_id, author_id, created_at";

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let rows = sqlx::query_as::<_, CommentWithAuthorRow>(
            "SELECT cm.id, cm.text, cm.post_id, cm.author_id, \
             u.username AS author_username, cm.created_at \
             FROM comments cm \
             INNER JOIN users u ON u.id = cm.author_id \
             WHERE cm.post_id = $1 \
             ORDER BY cm.created_at, cm.id",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentWithAuthor::from).collect())
    }

    async fn find_comment(
        &self,
        post_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CommentRecord>, RepoError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND post_id = $2");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .bind(post_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }

    async fn count_comments(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl CommentsWriteRepo for PostgresRepositories {
    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO comments (text, post_id, author_id) VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(&params.text)
            .bind(params.post_id)
            .bind(params.author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(CommentRecord::from(row))
    }

    async fn update_comment(&self, id: Uuid, text: String) -> Result<CommentRecord, RepoError> {
        let sql =
            format!("UPDATE comments SET text = $1 WHERE id = $2 RETURNING {COMMENT_COLUMNS}");

        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(&text)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(CommentRecord::from(row))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
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
