use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::application::repos::{CommentWithAuthor, PostListItem};
use crate::domain::entities::UserRecord;
use crate::domain::visibility::Viewer;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year] [hour]:[minute]");
pub const ISO_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

pub fn format_human_datetime(value: OffsetDateTime) -> String {
    value.format(HUMAN_DATE_FORMAT).unwrap_or_default()
}

pub fn format_iso_date(value: OffsetDateTime) -> String {
    value.format(ISO_DATE_FORMAT).unwrap_or_default()
}

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, public_message, &error)
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// The signed-in identity rendered into the navigation chrome.
#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_path: String,
    pub is_staff: bool,
}

impl ViewerView {
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            profile_path: profile_path(&user.username),
            is_staff: user.is_staff,
        }
    }
}

/// Per-request chrome shared by every page: who is signed in and the CSRF
/// token echoed into forms.
#[derive(Clone, Default)]
pub struct PageShell {
    pub viewer: Option<ViewerView>,
    pub csrf_token: String,
}

impl PageShell {
    pub fn new(user: Option<&UserRecord>, csrf_token: String) -> Self {
        Self {
            viewer: user.map(ViewerView::from_user),
            csrf_token,
        }
    }

    pub fn signed_in(&self) -> bool {
        self.viewer.is_some()
    }
}

pub struct LayoutContext<T> {
    pub shell: PageShell,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(shell: PageShell, content: T) -> Self {
        Self { shell, content }
    }
}

pub fn post_path(id: uuid::Uuid) -> String {
    format!("/posts/{id}/")
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn category_path(slug: &str) -> String {
    format!("/category/{slug}/")
}

/// One post row rendered on the index, category, profile, and detail pages.
#[derive(Clone)]
pub struct PostCardView {
    pub title: String,
    pub text: String,
    pub detail_path: String,
    pub author_username: String,
    pub author_path: String,
    pub pub_date_human: String,
    pub has_category: bool,
    pub category_title: String,
    pub category_path: String,
    pub has_location: bool,
    pub location_name: String,
    pub has_image: bool,
    pub image_path: String,
    pub comment_count: i64,
    pub is_published: bool,
    pub is_scheduled: bool,
}

impl PostCardView {
    pub fn from_item(item: &PostListItem, now: OffsetDateTime) -> Self {
        let (has_category, category_title, category_path) =
            match (&item.category_title, &item.category_slug) {
                (Some(title), Some(slug)) => (true, title.clone(), self::category_path(slug)),
                _ => (false, String::new(), String::new()),
            };
        let (has_location, location_name) = match &item.location_name {
            Some(name) => (true, name.clone()),
            None => (false, String::new()),
        };
        let (has_image, image_path) = match &item.image_path {
            Some(path) => (true, format!("/uploads/{path}")),
            None => (false, String::new()),
        };

        Self {
            title: item.title.clone(),
            text: item.text.clone(),
            detail_path: post_path(item.id),
            author_username: item.author_username.clone(),
            author_path: profile_path(&item.author_username),
            pub_date_human: format_human_datetime(item.pub_date),
            has_category,
            category_title,
            category_path,
            has_location,
            location_name,
            has_image,
            image_path,
            comment_count: item.comment_count,
            is_published: item.is_published,
            is_scheduled: item.pub_date > now,
        }
    }
}

/// Pagination controls with hrefs precomputed against the listing path.
#[derive(Clone)]
pub struct PaginatorView {
    pub number: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub previous_href: String,
    pub has_next: bool,
    pub next_href: String,
}

impl PaginatorView {
    pub fn from_page<T>(page: &Page<T>, base_path: &str) -> Self {
        Self {
            number: page.number,
            total_pages: page.total_pages(),
            has_previous: page.has_previous(),
            previous_href: format!("{base_path}?page={}", page.previous_number()),
            has_next: page.has_next(),
            next_href: format!("{base_path}?page={}", page.next_number()),
        }
    }
}

pub fn build_cards(page: &Page<PostListItem>, now: OffsetDateTime) -> Vec<PostCardView> {
    page.items
        .iter()
        .map(|item| PostCardView::from_item(item, now))
        .collect()
}

pub struct IndexContext {
    pub cards: Vec<PostCardView>,
    pub paginator: PaginatorView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

pub struct CategoryContext {
    pub title: String,
    pub description: String,
    pub cards: Vec<PostCardView>,
    pub paginator: PaginatorView,
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub view: LayoutContext<CategoryContext>,
}

pub struct ProfileContext {
    pub username: String,
    pub display_name: String,
    pub is_owner: bool,
    pub edit_path: String,
    pub cards: Vec<PostCardView>,
    pub paginator: PaginatorView,
}

impl ProfileContext {
    pub fn new(
        owner: &UserRecord,
        is_owner: bool,
        cards: Vec<PostCardView>,
        paginator: PaginatorView,
    ) -> Self {
        Self {
            username: owner.username.clone(),
            display_name: owner.display_name(),
            is_owner,
            edit_path: format!("/profile/{}/edit/", owner.username),
            cards,
            paginator,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_path: String,
    pub created_at_human: String,
    pub text: String,
    pub is_own: bool,
    pub edit_path: String,
    pub delete_path: String,
}

impl CommentView {
    pub fn from_comment(comment: &CommentWithAuthor, viewer: Viewer) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            author_path: profile_path(&comment.author_username),
            created_at_human: format_human_datetime(comment.created_at),
            text: comment.text.clone(),
            is_own: viewer.is(comment.author_id),
            edit_path: format!("/posts/{}/comment/{}/edit/", comment.post_id, comment.id),
            delete_path: format!("/posts/{}/comment/{}/delete/", comment.post_id, comment.id),
        }
    }
}

pub struct PostDetailContext {
    pub card: PostCardView,
    pub can_edit: bool,
    pub edit_path: String,
    pub delete_path: String,
    pub comments: Vec<CommentView>,
    pub comment_action: String,
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

/// Shared create/edit post form: field values survive validation errors.
pub struct PostFormContext {
    pub heading: String,
    pub action: String,
    pub title_value: String,
    pub text_value: String,
    pub pub_date_value: String,
    pub has_image: bool,
    pub image_path: String,
    pub error: String,
    pub has_error: bool,
}

impl PostFormContext {
    pub fn create() -> Self {
        Self {
            heading: "New post".to_string(),
            action: "/posts/create/".to_string(),
            title_value: String::new(),
            text_value: String::new(),
            pub_date_value: String::new(),
            has_image: false,
            image_path: String::new(),
            error: String::new(),
            has_error: false,
        }
    }

    pub fn edit(post: &PostListItem) -> Self {
        let (has_image, image_path) = match &post.image_path {
            Some(path) => (true, format!("/uploads/{path}")),
            None => (false, String::new()),
        };
        Self {
            heading: "Edit post".to_string(),
            action: format!("/posts/{}/edit/", post.id),
            title_value: post.title.clone(),
            text_value: post.text.clone(),
            pub_date_value: format_iso_date(post.pub_date),
            has_image,
            image_path,
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
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

pub struct PostDeleteContext {
    pub card: PostCardView,
    pub action: String,
}

#[derive(Template)]
#[template(path = "post_confirm_delete.html")]
pub struct PostDeleteTemplate {
    pub view: LayoutContext<PostDeleteContext>,
}

pub struct CommentFormContext {
    pub heading: String,
    pub action: String,
    pub text_value: String,
    pub error: String,
    pub has_error: bool,
}

#[derive(Template)]
#[template(path = "comment_form.html")]
pub struct CommentFormTemplate {
    pub view: LayoutContext<CommentFormContext>,
}

pub struct CommentDeleteContext {
    pub text: String,
    pub action: String,
}

#[derive(Template)]
#[template(path = "comment_confirm_delete.html")]
pub struct CommentDeleteTemplate {
    pub view: LayoutContext<CommentDeleteContext>,
}

pub struct ProfileFormContext {
    pub action: String,
    pub username_value: String,
    pub first_name_value: String,
    pub last_name_value: String,
    pub email_value: String,
    pub error: String,
    pub has_error: bool,
}

impl ProfileFormContext {
    pub fn for_user(user: &UserRecord) -> Self {
        Self {
            action: format!("/profile/{}/edit/", user.username),
            username_value: user.username.clone(),
            first_name_value: user.first_name.clone(),
            last_name_value: user.last_name.clone(),
            email_value: user.email.clone(),
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
#[template(path = "profile_form.html")]
pub struct ProfileFormTemplate {
    pub view: LayoutContext<ProfileFormContext>,
}

pub struct LoginContext {
    pub next_value: String,
    pub username_value: String,
    pub error: String,
    pub has_error: bool,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

pub struct RegistrationContext {
    pub username_value: String,
    pub error: String,
    pub has_error: bool,
}

#[derive(Template)]
#[template(path = "auth/registration.html")]
pub struct RegistrationTemplate {
    pub view: LayoutContext<RegistrationContext>,
}

pub struct ErrorPageContext {
    pub title: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageContext>,
}

#[derive(Template)]
#[template(path = "errors/403csrf.html")]
pub struct CsrfFailureTemplate {
    pub view: LayoutContext<ErrorPageContext>,
}

#[derive(Template)]
#[template(path = "errors/500.html")]
pub struct ServerErrorTemplate {
    pub view: LayoutContext<ErrorPageContext>,
}

pub fn render_not_found_response(shell: PageShell) -> Response {
    let content = ErrorPageContext {
        title: "Page not found".to_string(),
        message: "The page you requested does not exist or is not available to you.".to_string(),
    };
    let mut response = render_template_response(
        NotFoundTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

pub fn render_csrf_failure_response(shell: PageShell) -> Response {
    let content = ErrorPageContext {
        title: "Request rejected".to_string(),
        message: "The submitted form is missing a valid security token. Go back, reload the page, and try again.".to_string(),
    };
    let mut response = render_template_response(
        CsrfFailureTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::FORBIDDEN,
    );
    ErrorReport::from_message(
        "presentation::views::render_csrf_failure_response",
        StatusCode::FORBIDDEN,
        "CSRF token mismatch",
    )
    .attach(&mut response);
    response
}

pub fn render_server_error_response(shell: PageShell, detail: impl Into<String>) -> Response {
    let content = ErrorPageContext {
        title: "Something went wrong".to_string(),
        message: "The server hit an unexpected error while handling your request.".to_string(),
    };
    let mut response = render_template_response(
        ServerErrorTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    ErrorReport::from_message(
        "presentation::views::render_server_error_response",
        StatusCode::INTERNAL_SERVER_ERROR,
        detail,
    )
    .attach(&mut response);
    response
}
