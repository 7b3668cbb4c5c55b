//! Staff panel routes: list views over posts, categories, and locations with
//! in-place publish toggles.

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    application::admin::{AdminError, CategoryForm, LocationForm},
    application::repos::PostFlagsParams,
    presentation::admin::{
        AdminCategoriesContext, AdminCategoriesTemplate, AdminCategoryFormContext,
        AdminCategoryFormTemplate, AdminCategoryRowView, AdminDashboardTemplate,
        AdminLocationFormContext, AdminLocationFormTemplate, AdminLocationRowView,
        AdminLocationsContext, AdminLocationsTemplate, AdminPostsContext, AdminPostsTemplate,
    },
    presentation::views::{
        LayoutContext, PageShell, render_csrf_failure_response, render_not_found_response,
        render_server_error_response, render_template_response,
    },
};

use super::HttpState;
use super::extract::{CsrfToken, StaffUser};
use super::public::{PageQuery, parse_id};

pub fn router() -> Router<HttpState> {
    Router::new()
        .route("/admin/", get(dashboard))
        .route("/admin/posts/", get(posts))
        .route("/admin/posts/{id}/update/", post(update_post_row))
        .route("/admin/categories/", get(categories))
        .route(
            "/admin/categories/new/",
            get(category_create_form).post(category_create),
        )
        .route(
            "/admin/categories/{id}/edit/",
            get(category_edit_form).post(category_update),
        )
        .route("/admin/categories/{id}/publish/", post(category_publish))
        .route("/admin/locations/", get(locations))
        .route(
            "/admin/locations/new/",
            get(location_create_form).post(location_create),
        )
        .route(
            "/admin/locations/{id}/edit/",
            get(location_edit_form).post(location_update),
        )
        .route("/admin/locations/{id}/publish/", post(location_publish))
}

fn admin_error_response(err: AdminError, shell: PageShell) -> Response {
    match err {
        AdminError::NotFound => render_not_found_response(shell),
        AdminError::Validation(message) => render_server_error_response(shell, message),
        AdminError::Slug(err) => render_server_error_response(shell, err.to_string()),
        AdminError::Repo(err) => render_server_error_response(shell, err.to_string()),
    }
}

async fn dashboard(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);

    match state.admin.dashboard_counts().await {
        Ok(counts) => render_template_response(
            AdminDashboardTemplate {
                view: LayoutContext::new(shell, counts.into()),
            },
            StatusCode::OK,
        ),
        Err(err) => admin_error_response(err, shell),
    }
}

async fn posts(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<PageQuery>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);

    let page = match state.admin.posts_page(query.number()).await {
        Ok(page) => page,
        Err(err) => return admin_error_response(err, shell),
    };
    let categories = match state.admin.categories().await {
        Ok(categories) => categories,
        Err(err) => return admin_error_response(err, shell),
    };
    let locations = match state.admin.locations().await {
        Ok(locations) => locations,
        Err(err) => return admin_error_response(err, shell),
    };

    render_template_response(
        AdminPostsTemplate {
            view: LayoutContext::new(shell, AdminPostsContext::new(&page, &categories, &locations)),
        },
        StatusCode::OK,
    )
}

/// The in-place editable columns of one admin post row. Unchecked HTML
/// checkboxes are simply absent from the form payload.
#[derive(Debug, Deserialize)]
struct PostRowForm {
    #[serde(default)]
    is_published: Option<String>,
    #[serde(default)]
    category_id: String,
    #[serde(default)]
    location_id: String,
    #[serde(default)]
    csrf_token: String,
}

fn parse_optional_id(raw: &str) -> Result<Option<uuid::Uuid>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_id(trimmed).map(Some).ok_or(())
}

async fn update_post_row(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
    Form(form): Form<PostRowForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    let (Ok(category_id), Ok(location_id)) = (
        parse_optional_id(&form.category_id),
        parse_optional_id(&form.location_id),
    ) else {
        return render_not_found_response(shell);
    };

    let params = PostFlagsParams {
        id,
        is_published: form.is_published.is_some(),
        category_id,
        location_id,
    };

    match state.admin.update_post_row(params).await {
        Ok(()) => {
            Redirect::to(&format!("/admin/posts/?page={}", query.number())).into_response()
        }
        Err(err) => admin_error_response(err, shell),
    }
}

async fn categories(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);

    match state.admin.categories().await {
        Ok(categories) => {
            let content = AdminCategoriesContext {
                rows: categories
                    .iter()
                    .map(AdminCategoryRowView::from_record)
                    .collect(),
            };
            render_template_response(
                AdminCategoriesTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => admin_error_response(err, shell),
    }
}

#[derive(Debug, Deserialize)]
struct CategoryFormPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    is_published: Option<String>,
    #[serde(default)]
    csrf_token: String,
}

impl CategoryFormPayload {
    fn to_form(&self) -> CategoryForm {
        CategoryForm {
            title: self.title.clone(),
            description: self.description.clone(),
            slug: self.slug.clone(),
            is_published: self.is_published.is_some(),
        }
    }

    fn refill(&self, mut context: AdminCategoryFormContext) -> AdminCategoryFormContext {
        context.title_value = self.title.clone();
        context.description_value = self.description.clone();
        context.slug_value = self.slug.clone();
        context.is_published = self.is_published.is_some();
        context
    }
}

async fn category_create_form(
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    render_template_response(
        AdminCategoryFormTemplate {
            view: LayoutContext::new(shell, AdminCategoryFormContext::create()),
        },
        StatusCode::OK,
    )
}

async fn category_create(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Form(form): Form<CategoryFormPayload>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.admin.create_category(form.to_form()).await {
        Ok(_) => Redirect::to("/admin/categories/").into_response(),
        Err(AdminError::Validation(message)) => {
            let context = form.refill(AdminCategoryFormContext::create()).with_error(message);
            render_template_response(
                AdminCategoryFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            )
        }
        Err(err) => admin_error_response(err, shell),
    }
}

async fn category_edit_form(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<String>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    match state.admin.category(id).await {
        Ok(category) => render_template_response(
            AdminCategoryFormTemplate {
                view: LayoutContext::new(shell, AdminCategoryFormContext::edit(&category)),
            },
            StatusCode::OK,
        ),
        Err(err) => admin_error_response(err, shell),
    }
}

async fn category_update(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Form(form): Form<CategoryFormPayload>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.admin.update_category(id, form.to_form()).await {
        Ok(_) => Redirect::to("/admin/categories/").into_response(),
        Err(AdminError::Validation(message)) => {
            let mut context = AdminCategoryFormContext::create();
            context.heading = "Edit category".to_string();
            context.action = format!("/admin/categories/{id}/edit/");
            let context = form.refill(context).with_error(message);
            render_template_response(
                AdminCategoryFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            )
        }
        Err(err) => admin_error_response(err, shell),
    }
}

#[derive(Debug, Deserialize)]
struct PublishForm {
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    csrf_token: String,
}

async fn category_publish(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Form(form): Form<PublishForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state
        .admin
        .set_category_published(id, form.published.is_some())
        .await
    {
        Ok(()) => Redirect::to("/admin/categories/").into_response(),
        Err(err) => admin_error_response(err, shell),
    }
}

async fn locations(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);

    match state.admin.locations().await {
        Ok(locations) => {
            let content = AdminLocationsContext {
                rows: locations
                    .iter()
                    .map(AdminLocationRowView::from_record)
                    .collect(),
            };
            render_template_response(
                AdminLocationsTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => admin_error_response(err, shell),
    }
}

#[derive(Debug, Deserialize)]
struct LocationFormPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_published: Option<String>,
    #[serde(default)]
    csrf_token: String,
}

impl LocationFormPayload {
    fn to_form(&self) -> LocationForm {
        LocationForm {
            name: self.name.clone(),
            is_published: self.is_published.is_some(),
        }
    }

    fn refill(&self, mut context: AdminLocationFormContext) -> AdminLocationFormContext {
        context.name_value = self.name.clone();
        context.is_published = self.is_published.is_some();
        context
    }
}

async fn location_create_form(
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    render_template_response(
        AdminLocationFormTemplate {
            view: LayoutContext::new(shell, AdminLocationFormContext::create()),
        },
        StatusCode::OK,
    )
}

async fn location_create(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Form(form): Form<LocationFormPayload>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.admin.create_location(form.to_form()).await {
        Ok(_) => Redirect::to("/admin/locations/").into_response(),
        Err(AdminError::Validation(message)) => {
            let context = form.refill(AdminLocationFormContext::create()).with_error(message);
            render_template_response(
                AdminLocationFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            )
        }
        Err(err) => admin_error_response(err, shell),
    }
}

async fn location_edit_form(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<String>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    match state.admin.location(id).await {
        Ok(location) => render_template_response(
            AdminLocationFormTemplate {
                view: LayoutContext::new(shell, AdminLocationFormContext::edit(&location)),
            },
            StatusCode::OK,
        ),
        Err(err) => admin_error_response(err, shell),
    }
}

async fn location_update(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Form(form): Form<LocationFormPayload>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.admin.update_location(id, form.to_form()).await {
        Ok(_) => Redirect::to("/admin/locations/").into_response(),
        Err(AdminError::Validation(message)) => {
            let mut context = AdminLocationFormContext::create();
            context.heading = "Edit location".to_string();
            context.action = format!("/admin/locations/{id}/edit/");
            let context = form.refill(context).with_error(message);
            render_template_response(
                AdminLocationFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            )
        }
        Err(err) => admin_error_response(err, shell),
    }
}

async fn location_publish(
    State(state): State<HttpState>,
    StaffUser(user): StaffUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Form(form): Form<PublishForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state
        .admin
        .set_location_published(id, form.published.is_some())
        .await
    {
        Ok(()) => Redirect::to("/admin/locations/").into_response(),
        Err(err) => admin_error_response(err, shell),
    }
}
