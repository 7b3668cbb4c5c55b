//! Post mutations, gated by the ownership predicates.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    NewPostParams, PostListItem, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{PostRecord, UserRecord};
use crate::domain::visibility::{Viewer, can_delete_post, can_edit_post};

#[derive(Debug, Error)]
pub enum PostActionError {
    #[error("post not found")]
    NotFound,
    #[error("viewer is not the post's author")]
    NotAuthor,
    #[error("invalid post data: {0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Author-submitted post fields. Publication state is not part of the form:
/// new posts are published and scheduling happens through `pub_date` alone.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub image_path: Option<String>,
}

impl PostDraft {
    fn validate(&self) -> Result<(), PostActionError> {
        if self.title.trim().is_empty() {
            return Err(PostActionError::Validation("title must not be empty".into()));
        }
        if self.text.trim().is_empty() {
            return Err(PostActionError::Validation("text must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostsRepo>, posts_write: Arc<dyn PostsWriteRepo>) -> Self {
        Self { posts, posts_write }
    }

    /// Create a post authored by the current user. Future publication dates
    /// are stored as submitted; the read path keeps them hidden until due.
    pub async fn create(
        &self,
        author: &UserRecord,
        draft: PostDraft,
    ) -> Result<PostRecord, PostActionError> {
        draft.validate()?;

        let record = self
            .posts_write
            .create_post(NewPostParams {
                title: draft.title,
                text: draft.text,
                image_path: draft.image_path,
                pub_date: draft.pub_date,
                is_published: true,
                author_id: author.id,
                category_id: None,
                location_id: None,
            })
            .await?;

        Ok(record)
    }

    /// Load a post for its edit form; denies non-authors before any state
    /// is rendered back to them.
    pub async fn load_for_edit(
        &self,
        id: Uuid,
        viewer: Viewer,
    ) -> Result<PostListItem, PostActionError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(PostActionError::NotFound)?;

        if !can_edit_post(viewer, post.author_id).is_allowed() {
            return Err(PostActionError::NotAuthor);
        }

        Ok(post)
    }

    pub async fn update(
        &self,
        id: Uuid,
        viewer: Viewer,
        draft: PostDraft,
    ) -> Result<PostRecord, PostActionError> {
        draft.validate()?;
        self.load_for_edit(id, viewer).await?;

        let record = self
            .posts_write
            .update_post(UpdatePostParams {
                id,
                title: draft.title,
                text: draft.text,
                pub_date: draft.pub_date,
                image_path: draft.image_path,
            })
            .await?;

        Ok(record)
    }

    /// Load a post for its delete-confirmation page.
    pub async fn load_for_delete(
        &self,
        id: Uuid,
        viewer: Viewer,
    ) -> Result<PostListItem, PostActionError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(PostActionError::NotFound)?;

        if !can_delete_post(viewer, post.author_id).is_allowed() {
            return Err(PostActionError::NotAuthor);
        }

        Ok(post)
    }

    pub async fn delete(&self, id: Uuid, viewer: Viewer) -> Result<(), PostActionError> {
        self.load_for_delete(id, viewer).await?;
        self.posts_write.delete_post(id).await?;
        Ok(())
    }
}
