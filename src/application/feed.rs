//! Read path for listings and post details.
//!
//! All queries funnel the publication-window policy through
//! [`PostListScope`]; the detail view additionally applies the owner bypass
//! from [`crate::domain::visibility`].

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CommentWithAuthor, CommentsRepo, PostListItem, PostListScope, PostsRepo,
    RepoError, UsersRepo,
};
use crate::domain::entities::{CategoryRecord, UserRecord};
use crate::domain::visibility::{Viewer, can_view_post};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("resource not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub category: CategoryRecord,
    pub page: Page<PostListItem>,
}

#[derive(Debug, Clone)]
pub struct ProfileListing {
    pub owner: UserRecord,
    pub page: Page<PostListItem>,
    pub viewer_is_owner: bool,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostListItem,
    pub comments: Vec<CommentWithAuthor>,
    pub viewer_is_author: bool,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    comments: Arc<dyn CommentsRepo>,
    users: Arc<dyn UsersRepo>,
    page_size: u32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        comments: Arc<dyn CommentsRepo>,
        users: Arc<dyn UsersRepo>,
        page_size: u32,
    ) -> Self {
        Self {
            posts,
            categories,
            comments,
            users,
            page_size,
        }
    }

    pub async fn index_page(&self, page_number: u32) -> Result<Page<PostListItem>, FeedError> {
        self.list(&PostListScope::Public, page_number).await
    }

    /// Posts under one category slug; the category itself must exist and be
    /// published.
    pub async fn category_page(
        &self,
        slug: &str,
        page_number: u32,
    ) -> Result<CategoryListing, FeedError> {
        let category = self
            .categories
            .find_category_by_slug(slug)
            .await?
            .filter(|category| category.is_published)
            .ok_or(FeedError::NotFound)?;

        let scope = PostListScope::Category {
            slug: category.slug.clone(),
        };
        let page = self.list(&scope, page_number).await?;

        Ok(CategoryListing { category, page })
    }

    /// A user's posts. The owner sees everything they wrote; everyone else
    /// sees only the public-visible subset.
    pub async fn profile_page(
        &self,
        username: &str,
        viewer: Viewer,
        page_number: u32,
    ) -> Result<ProfileListing, FeedError> {
        let owner = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::NotFound)?;

        let viewer_is_owner = viewer.is(owner.id);
        let scope = PostListScope::Profile {
            author_id: owner.id,
            include_hidden: viewer_is_owner,
        };
        let page = self.list(&scope, page_number).await?;

        Ok(ProfileListing {
            owner,
            page,
            viewer_is_owner,
        })
    }

    /// A single post with its comment thread, oldest comment first.
    pub async fn post_detail(&self, id: Uuid, viewer: Viewer) -> Result<PostDetail, FeedError> {
        let now = OffsetDateTime::now_utc();
        let post = self.posts.find_post(id).await?.ok_or(FeedError::NotFound)?;

        if !can_view_post(viewer, post.author_id, post.visibility(), now) {
            return Err(FeedError::NotFound);
        }

        let comments = self.comments.list_comments(post.id).await?;
        let viewer_is_author = viewer.is(post.author_id);

        Ok(PostDetail {
            post,
            comments,
            viewer_is_author,
        })
    }

    async fn list(
        &self,
        scope: &PostListScope,
        page_number: u32,
    ) -> Result<Page<PostListItem>, FeedError> {
        let now = OffsetDateTime::now_utc();
        let request = PageRequest::new(page_number, self.page_size);

        let items = self.posts.list_posts(scope, now, request).await?;
        let total = self.posts.count_posts(scope, now).await?;

        Page::new(items, request, total).map_err(|_| FeedError::NotFound)
    }
}
