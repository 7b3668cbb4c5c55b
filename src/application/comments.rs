//! Comment mutations, gated by the ownership predicates.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, NewCommentParams, PostsRepo, RepoError,
};
use crate::domain::entities::{CommentRecord, UserRecord};
use crate::domain::visibility::{Viewer, can_edit_comment, can_view_post};

#[derive(Debug, Error)]
pub enum CommentActionError {
    #[error("comment or post not found")]
    NotFound,
    #[error("viewer is not the comment's author")]
    NotAuthor,
    #[error("invalid comment data: {0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

fn validate_text(text: &str) -> Result<(), CommentActionError> {
    if text.trim().is_empty() {
        return Err(CommentActionError::Validation(
            "comment text must not be empty".into(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    comments_write: Arc<dyn CommentsWriteRepo>,
}

impl CommentService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        comments_write: Arc<dyn CommentsWriteRepo>,
    ) -> Self {
        Self {
            posts,
            comments,
            comments_write,
        }
    }

    /// Attach a comment to a post the author can currently view.
    pub async fn add(
        &self,
        post_id: Uuid,
        author: &UserRecord,
        text: String,
    ) -> Result<CommentRecord, CommentActionError> {
        validate_text(&text)?;

        let now = OffsetDateTime::now_utc();
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(CommentActionError::NotFound)?;

        if !can_view_post(Viewer::User(author.id), post.author_id, post.visibility(), now) {
            return Err(CommentActionError::NotFound);
        }

        let record = self
            .comments_write
            .create_comment(NewCommentParams {
                post_id: post.id,
                author_id: author.id,
                text,
            })
            .await?;

        Ok(record)
    }

    /// Load a comment for its edit/delete form; non-authors are denied
    /// without revealing whether the comment exists.
    pub async fn load_own(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        viewer: Viewer,
    ) -> Result<CommentRecord, CommentActionError> {
        let comment = self
            .comments
            .find_comment(post_id, comment_id)
            .await?
            .ok_or(CommentActionError::NotFound)?;

        if !can_edit_comment(viewer, comment.author_id).is_allowed() {
            return Err(CommentActionError::NotAuthor);
        }

        Ok(comment)
    }

    pub async fn update(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        viewer: Viewer,
        text: String,
    ) -> Result<CommentRecord, CommentActionError> {
        validate_text(&text)?;
        let comment = self.load_own(post_id, comment_id, viewer).await?;

        let record = self.comments_write.update_comment(comment.id, text).await?;
        Ok(record)
    }

    pub async fn delete(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        viewer: Viewer,
    ) -> Result<(), CommentActionError> {
        let comment = self.load_own(post_id, comment_id, viewer).await?;
        self.comments_write.delete_comment(comment.id).await?;
        Ok(())
    }
}
