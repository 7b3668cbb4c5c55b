//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{
    CategoryRecord, CommentRecord, LocationRecord, PostRecord, SessionRecord, UserRecord,
};
use crate::domain::visibility::PostVisibility;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which slice of the post table a listing query may see.
///
/// `Public` and `Category` apply the full publication-window predicate;
/// `Profile` applies it only when the viewer is not the profile owner;
/// `Admin` sees everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostListScope {
    Public,
    Category { slug: String },
    Profile { author_id: Uuid, include_hidden: bool },
    Admin,
}

/// A post row joined with its author, category, location, and comment count.
#[derive(Debug, Clone, Serialize)]
pub struct PostListItem {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub image_path: Option<String>,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
    pub author_id: Uuid,
    pub author_username: String,
    pub category_id: Option<Uuid>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    pub category_published: Option<bool>,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub comment_count: i64,
}

impl PostListItem {
    pub fn visibility(&self) -> PostVisibility {
        PostVisibility {
            is_published: self.is_published,
            pub_date: self.pub_date,
            category_published: self.category_published,
        }
    }
}

/// A comment row joined with its author's username.
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub text: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPostParams {
    pub title: String,
    pub text: String,
    pub image_path: Option<String>,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    /// `Some` replaces the stored image path; `None` leaves it untouched.
    pub image_path: Option<String>,
}

/// Admin list-row update: the in-place editable columns.
#[derive(Debug, Clone, Copy)]
pub struct PostFlagsParams {
    pub id: Uuid,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        scope: &PostListScope,
        now: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostListItem>, RepoError>;

    async fn count_posts(&self, scope: &PostListScope, now: OffsetDateTime)
    -> Result<u64, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostListItem>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post_flags(&self, params: PostFlagsParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CategoryParams {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        id: Uuid,
        params: CategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn set_category_published(&self, id: Uuid, published: bool) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct LocationParams {
    pub name: String,
    pub is_published: bool,
}

#[async_trait]
pub trait LocationsRepo: Send + Sync {
    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError>;

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError>;
}

#[async_trait]
pub trait LocationsWriteRepo: Send + Sync {
    async fn create_location(&self, params: LocationParams) -> Result<LocationRecord, RepoError>;

    async fn update_location(
        &self,
        id: Uuid,
        params: LocationParams,
    ) -> Result<LocationRecord, RepoError>;

    async fn set_location_published(&self, id: Uuid, published: bool) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for a post, oldest first, joined with author usernames.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;

    /// A comment addressed as `post/{post_id}/comment/{id}`; `None` when the
    /// comment does not exist or hangs off a different post.
    async fn find_comment(&self, post_id: Uuid, id: Uuid)
    -> Result<Option<CommentRecord>, RepoError>;

    async fn count_comments(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: Uuid, text: String) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewUserParams {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: NewUserParams) -> Result<UserRecord, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewSessionParams {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: NewSessionParams) -> Result<SessionRecord, RepoError>;

    /// Resolve a session cookie to its user, ignoring expired sessions.
    async fn find_session_user(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError>;

    async fn delete_session(&self, token: &str) -> Result<(), RepoError>;
}
