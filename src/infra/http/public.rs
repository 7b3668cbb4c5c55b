//! Read-only public pages: index, category, profile, post detail, uploads.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{error::HttpError, feed::FeedError},
    infra::uploads::UploadStorageError,
    presentation::views::{
        CategoryContext, CategoryTemplate, CommentView, IndexContext, IndexTemplate, LayoutContext,
        PageShell, PaginatorView, PostCardView, PostDetailContext, PostDetailTemplate,
        ProfileContext, ProfileTemplate, build_cards, category_path, profile_path,
        render_not_found_response, render_server_error_response, render_template_response,
    },
};

use super::HttpState;
use super::extract::{CsrfToken, MaybeUser};
use crate::domain::visibility::Viewer;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn number(&self) -> u32 {
        self.page.unwrap_or(1)
    }
}

pub(crate) fn viewer_of(user: &MaybeUser) -> Viewer {
    match &user.0 {
        Some(user) => Viewer::User(user.id),
        None => Viewer::Anonymous,
    }
}

pub(crate) fn feed_error_to_response(err: FeedError, shell: PageShell) -> Response {
    match err {
        FeedError::NotFound => render_not_found_response(shell),
        FeedError::Repo(err) => render_server_error_response(shell, err.to_string()),
    }
}

/// Route parameters arrive as strings so that malformed ids fall through to
/// the not-found page rather than a bare 400.
pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

pub async fn index(
    State(state): State<HttpState>,
    MaybeUser(user): MaybeUser,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<PageQuery>,
) -> Response {
    let shell = PageShell::new(user.as_ref(), csrf);

    match state.feed.index_page(query.number()).await {
        Ok(page) => {
            let now = OffsetDateTime::now_utc();
            let content = IndexContext {
                cards: build_cards(&page, now),
                paginator: PaginatorView::from_page(&page, "/"),
            };
            render_template_response(
                IndexTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, shell),
    }
}

pub async fn category_index(
    State(state): State<HttpState>,
    MaybeUser(user): MaybeUser,
    CsrfToken(csrf): CsrfToken,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let shell = PageShell::new(user.as_ref(), csrf);

    match state.feed.category_page(&slug, query.number()).await {
        Ok(listing) => {
            let now = OffsetDateTime::now_utc();
            let content = CategoryContext {
                title: listing.category.title.clone(),
                description: listing.category.description.clone(),
                cards: build_cards(&listing.page, now),
                paginator: PaginatorView::from_page(
                    &listing.page,
                    &category_path(&listing.category.slug),
                ),
            };
            render_template_response(
                CategoryTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, shell),
    }
}

pub async fn profile(
    State(state): State<HttpState>,
    maybe_user: MaybeUser,
    CsrfToken(csrf): CsrfToken,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = viewer_of(&maybe_user);
    let shell = PageShell::new(maybe_user.0.as_ref(), csrf);

    match state
        .feed
        .profile_page(&username, viewer, query.number())
        .await
    {
        Ok(listing) => {
            let now = OffsetDateTime::now_utc();
            let cards = build_cards(&listing.page, now);
            let paginator =
                PaginatorView::from_page(&listing.page, &profile_path(&listing.owner.username));
            let content =
                ProfileContext::new(&listing.owner, listing.viewer_is_owner, cards, paginator);
            render_template_response(
                ProfileTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, shell),
    }
}

pub async fn post_detail(
    State(state): State<HttpState>,
    maybe_user: MaybeUser,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<String>,
) -> Response {
    let viewer = viewer_of(&maybe_user);
    let shell = PageShell::new(maybe_user.0.as_ref(), csrf);

    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    match state.feed.post_detail(id, viewer).await {
        Ok(detail) => {
            let now = OffsetDateTime::now_utc();
            let content = PostDetailContext {
                card: PostCardView::from_item(&detail.post, now),
                can_edit: detail.viewer_is_author,
                edit_path: format!("/posts/{id}/edit/"),
                delete_path: format!("/posts/{id}/delete/"),
                comments: detail
                    .comments
                    .iter()
                    .map(|comment| CommentView::from_comment(comment, viewer))
                    .collect(),
                comment_action: format!("/posts/{id}/comment/"),
            };
            render_template_response(
                PostDetailTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, shell),
    }
}

pub async fn serve_upload(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    match state.uploads.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Upload not found",
            "The requested upload is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Upload not found",
                "The requested upload is not available",
            )
            .into_response()
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

pub async fn db_health(State(state): State<HttpState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err) => HttpError::from_error(
            "infra::http::public::db_health",
            StatusCode::SERVICE_UNAVAILABLE,
            "Database unavailable",
            &err,
        )
        .into_response(),
    }
}

pub async fn not_found_fallback(
    MaybeUser(user): MaybeUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    render_not_found_response(PageShell::new(user.as_ref(), csrf))
}
