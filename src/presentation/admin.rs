//! View models for the staff panel.

use askama::Template;

use crate::application::admin::DashboardCounts;
use crate::application::pagination::Page;
use crate::application::repos::PostListItem;
use crate::domain::entities::{CategoryRecord, LocationRecord};
use crate::presentation::views::{
    LayoutContext, PaginatorView, format_human_datetime, post_path,
};

#[derive(Clone)]
pub struct AdminOptionView {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

fn category_options(categories: &[CategoryRecord], selected: Option<uuid::Uuid>) -> Vec<AdminOptionView> {
    categories
        .iter()
        .map(|category| AdminOptionView {
            id: category.id.to_string(),
            label: category.title.clone(),
            selected: selected == Some(category.id),
        })
        .collect()
}

fn location_options(locations: &[LocationRecord], selected: Option<uuid::Uuid>) -> Vec<AdminOptionView> {
    locations
        .iter()
        .map(|location| AdminOptionView {
            id: location.id.to_string(),
            label: location.name.clone(),
            selected: selected == Some(location.id),
        })
        .collect()
}

/// One row of the admin post list with its in-place editable columns.
pub struct AdminPostRowView {
    pub title: String,
    pub detail_path: String,
    pub author_username: String,
    pub pub_date_human: String,
    pub comment_count: i64,
    pub is_published: bool,
    pub category_options: Vec<AdminOptionView>,
    pub location_options: Vec<AdminOptionView>,
    pub action: String,
}

impl AdminPostRowView {
    pub fn from_item(
        item: &PostListItem,
        categories: &[CategoryRecord],
        locations: &[LocationRecord],
        page_number: u32,
    ) -> Self {
        Self {
            title: item.title.clone(),
            detail_path: post_path(item.id),
            author_username: item.author_username.clone(),
            pub_date_human: format_human_datetime(item.pub_date),
            comment_count: item.comment_count,
            is_published: item.is_published,
            category_options: category_options(categories, item.category_id),
            location_options: location_options(locations, item.location_id),
            action: format!("/admin/posts/{}/update/?page={page_number}", item.id),
        }
    }
}

pub struct AdminDashboardContext {
    pub posts: u64,
    pub comments: u64,
    pub categories: u64,
    pub locations: u64,
    pub users: u64,
}

impl From<DashboardCounts> for AdminDashboardContext {
    fn from(counts: DashboardCounts) -> Self {
        Self {
            posts: counts.posts,
            comments: counts.comments,
            categories: counts.categories,
            locations: counts.locations,
            users: counts.users,
        }
    }
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub view: LayoutContext<AdminDashboardContext>,
}

pub struct AdminPostsContext {
    pub rows: Vec<AdminPostRowView>,
    pub paginator: PaginatorView,
}

impl AdminPostsContext {
    pub fn new(
        page: &Page<PostListItem>,
        categories: &[CategoryRecord],
        locations: &[LocationRecord],
    ) -> Self {
        Self {
            rows: page
                .items
                .iter()
                .map(|item| AdminPostRowView::from_item(item, categories, locations, page.number))
                .collect(),
            paginator: PaginatorView::from_page(page, "/admin/posts/"),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/posts.html")]
pub struct AdminPostsTemplate {
    pub view: LayoutContext<AdminPostsContext>,
}

pub struct AdminCategoryRowView {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_published: bool,
    pub created_human: String,
    pub edit_path: String,
    pub toggle_action: String,
    pub toggle_target: bool,
}

impl AdminCategoryRowView {
    pub fn from_record(category: &CategoryRecord) -> Self {
        Self {
            title: category.title.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            is_published: category.is_published,
            created_human: format_human_datetime(category.created_at),
            edit_path: format!("/admin/categories/{}/edit/", category.id),
            toggle_action: format!("/admin/categories/{}/publish/", category.id),
            toggle_target: !category.is_published,
        }
    }
}

pub struct AdminCategoriesContext {
    pub rows: Vec<AdminCategoryRowView>,
}

#[derive(Template)]
#[template(path = "admin/categories.html")]
pub struct AdminCategoriesTemplate {
    pub view: LayoutContext<AdminCategoriesContext>,
}

pub struct AdminLocationRowView {
    pub name: String,
    pub is_published: bool,
    pub created_human: String,
    pub edit_path: String,
    pub toggle_action: String,
    pub toggle_target: bool,
}

impl AdminLocationRowView {
    pub fn from_record(location: &LocationRecord) -> Self {
        Self {
            name: location.name.clone(),
            is_published: location.is_published,
            created_human: format_human_datetime(location.created_at),
            edit_path: format!("/admin/locations/{}/edit/", location.id),
            toggle_action: format!("/admin/locations/{}/publish/", location.id),
            toggle_target: !location.is_published,
        }
    }
}

pub struct AdminLocationsContext {
    pub rows: Vec<AdminLocationRowView>,
}

#[derive(Template)]
#[template(path = "admin/locations.html")]
pub struct AdminLocationsTemplate {
    pub view: LayoutContext<AdminLocationsContext>,
}

pub struct AdminCategoryFormContext {
    pub heading: String,
    pub action: String,
    pub title_value: String,
    pub description_value: String,
    pub slug_value: String,
    pub is_published: bool,
    pub error: String,
    pub has_error: bool,
}

impl AdminCategoryFormContext {
    pub fn create() -> Self {
        Self {
            heading: "New category".to_string(),
            action: "/admin/categories/new/".to_string(),
            title_value: String::new(),
            description_value: String::new(),
            slug_value: String::new(),
            is_published: true,
            error: String::new(),
            has_error: false,
        }
    }

    pub fn edit(category: &CategoryRecord) -> Self {
        Self {
            heading: "Edit category".to_string(),
            action: format!("/admin/categories/{}/edit/", category.id),
            title_value: category.title.clone(),
            description_value: category.description.clone(),
            slug_value: category.slug.clone(),
            is_published: category.is_published,
            error: String::new(),
            has_error: false,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self.has_error = true;
        self
    }
}

#[derive(Template)]
#[template(path = "admin/category_form.html")]
pub struct AdminCategoryFormTemplate {
    pub view: LayoutContext<AdminCategoryFormContext>,
}

pub struct AdminLocationFormContext {
    pub heading: String,
    pub action: String,
    pub name_value: String,
    pub is_published: bool,
    pub error: String,
    pub has_error: bool,
}

impl AdminLocationFormContext {
    pub fn create() -> Self {
        Self {
            heading: "New location".to_string(),
            action: "/admin/locations/new/".to_string(),
            name_value: String::new(),
            is_published: true,
            error: String::new(),
            has_error: false,
        }
    }

    pub fn edit(location: &LocationRecord) -> Self {
        Self {
            heading: "Edit location".to_string(),
            action: format!("/admin/locations/{}/edit/", location.id),
            name_value: location.name.clone(),
            is_published: location.is_published,
            error: String::new(),
            has_error: false,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self.has_error = true;
        self
    }
}

#[derive(Template)]
#[template(path = "admin/location_form.html")]
pub struct AdminLocationFormTemplate {
    pub view: LayoutContext<AdminLocationFormContext>,
}
