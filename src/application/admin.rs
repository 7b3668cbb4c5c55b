//! Staff panel services: unscoped listings and in-place publish toggles.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryParams, CommentsRepo, LocationParams,
    LocationsRepo, LocationsWriteRepo, PostFlagsParams, PostListItem, PostListScope, PostsRepo,
    PostsWriteRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CategoryRecord, LocationRecord};
use crate::domain::slug::{SlugError, generate_unique_slug};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardCounts {
    pub posts: u64,
    pub comments: u64,
    pub categories: u64,
    pub locations: u64,
    pub users: u64,
}

/// Category form payload; a blank slug is derived from the title.
#[derive(Debug, Clone)]
pub struct CategoryForm {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct LocationForm {
    pub name: String,
    pub is_published: bool,
}

#[derive(Clone)]
pub struct AdminService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    categories_write: Arc<dyn CategoriesWriteRepo>,
    locations: Arc<dyn LocationsRepo>,
    locations_write: Arc<dyn LocationsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    users: Arc<dyn UsersRepo>,
    page_size: u32,
}

impl AdminService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        categories_write: Arc<dyn CategoriesWriteRepo>,
        locations: Arc<dyn LocationsRepo>,
        locations_write: Arc<dyn LocationsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        users: Arc<dyn UsersRepo>,
        page_size: u32,
    ) -> Self {
        Self {
            posts,
            posts_write,
            categories,
            categories_write,
            locations,
            locations_write,
            comments,
            users,
            page_size,
        }
    }

    pub async fn dashboard_counts(&self) -> Result<DashboardCounts, AdminError> {
        let now = OffsetDateTime::now_utc();
        let posts = self.posts.count_posts(&PostListScope::Admin, now).await?;
        let comments = self.comments.count_comments().await?;
        let categories = self.categories.list_categories().await?.len() as u64;
        let locations = self.locations.list_locations().await?.len() as u64;
        let users = self.users.count_users().await?;

        Ok(DashboardCounts {
            posts,
            comments,
            categories,
            locations,
            users,
        })
    }

    /// Every post regardless of visibility, newest publication date first.
    pub async fn posts_page(&self, page_number: u32) -> Result<Page<PostListItem>, AdminError> {
        let now = OffsetDateTime::now_utc();
        let request = PageRequest::new(page_number, self.page_size);

        let items = self
            .posts
            .list_posts(&PostListScope::Admin, now, request)
            .await?;
        let total = self.posts.count_posts(&PostListScope::Admin, now).await?;

        Page::new(items, request, total).map_err(|_| AdminError::NotFound)
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, AdminError> {
        Ok(self.categories.list_categories().await?)
    }

    pub async fn locations(&self) -> Result<Vec<LocationRecord>, AdminError> {
        Ok(self.locations.list_locations().await?)
    }

    pub async fn category(&self, id: Uuid) -> Result<CategoryRecord, AdminError> {
        self.categories
            .find_category(id)
            .await?
            .ok_or(AdminError::NotFound)
    }

    pub async fn location(&self, id: Uuid) -> Result<LocationRecord, AdminError> {
        self.locations
            .find_location(id)
            .await?
            .ok_or(AdminError::NotFound)
    }

    /// Apply a post row's in-place editable columns (published flag,
    /// category, location). Referenced rows must exist.
    pub async fn update_post_row(&self, params: PostFlagsParams) -> Result<(), AdminError> {
        if let Some(category_id) = params.category_id
            && self.categories.find_category(category_id).await?.is_none()
        {
            return Err(AdminError::Validation("unknown category".into()));
        }
        if let Some(location_id) = params.location_id
            && self.locations.find_location(location_id).await?.is_none()
        {
            return Err(AdminError::Validation("unknown location".into()));
        }

        self.posts_write
            .update_post_flags(params)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => AdminError::NotFound,
                other => AdminError::Repo(other),
            })?;

        Ok(())
    }

    pub async fn create_category(&self, form: CategoryForm) -> Result<CategoryRecord, AdminError> {
        let params = self.category_params(form, None).await?;
        Ok(self.categories_write.create_category(params).await?)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        form: CategoryForm,
    ) -> Result<CategoryRecord, AdminError> {
        self.category(id).await?;
        let params = self.category_params(form, Some(id)).await?;
        Ok(self.categories_write.update_category(id, params).await?)
    }

    pub async fn set_category_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<(), AdminError> {
        self.category(id).await?;
        Ok(self
            .categories_write
            .set_category_published(id, published)
            .await?)
    }

    pub async fn create_location(&self, form: LocationForm) -> Result<LocationRecord, AdminError> {
        validate_location(&form)?;
        Ok(self
            .locations_write
            .create_location(LocationParams {
                name: form.name.trim().to_string(),
                is_published: form.is_published,
            })
            .await?)
    }

    pub async fn update_location(
        &self,
        id: Uuid,
        form: LocationForm,
    ) -> Result<LocationRecord, AdminError> {
        validate_location(&form)?;
        self.location(id).await?;
        Ok(self
            .locations_write
            .update_location(
                id,
                LocationParams {
                    name: form.name.trim().to_string(),
                    is_published: form.is_published,
                },
            )
            .await?)
    }

    pub async fn set_location_published(
        &self,
        id: Uuid,
        published: bool,
    ) -> Result<(), AdminError> {
        self.location(id).await?;
        Ok(self
            .locations_write
            .set_location_published(id, published)
            .await?)
    }

    /// Resolve a category form into storage params, deriving a unique slug
    /// from the title when the slug field was left blank.
    async fn category_params(
        &self,
        form: CategoryForm,
        editing: Option<Uuid>,
    ) -> Result<CategoryParams, AdminError> {
        let title = form.title.trim().to_string();
        if title.is_empty() {
            return Err(AdminError::Validation("title must not be empty".into()));
        }

        let existing = self.categories.list_categories().await?;
        let is_free = |candidate: &str| {
            !existing
                .iter()
                .any(|category| category.slug == candidate && Some(category.id) != editing)
        };

        let slug = if form.slug.trim().is_empty() {
            generate_unique_slug(&title, is_free)?
        } else {
            let slug = form.slug.trim().to_string();
            if !is_free(&slug) {
                return Err(AdminError::Validation(format!("slug `{slug}` is taken")));
            }
            slug
        };

        Ok(CategoryParams {
            title,
            description: form.description.trim().to_string(),
            slug,
            is_published: form.is_published,
        })
    }
}

fn validate_location(form: &LocationForm) -> Result<(), AdminError> {
    if form.name.trim().is_empty() {
        return Err(AdminError::Validation("name must not be empty".into()));
    }
    Ok(())
}
