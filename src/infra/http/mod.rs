//! HTTP surface: routers, handlers, extractors, and middleware.

pub mod accounts;
pub mod admin;
pub mod comments;
pub mod extract;
pub mod middleware;
pub mod posts;
pub mod public;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};

use crate::{
    application::{
        accounts::AccountService, admin::AdminService, comments::CommentService,
        feed::FeedService, posts::PostService, repos::SessionsRepo,
    },
    infra::{db::PostgresRepositories, uploads::UploadStorage},
};

use self::middleware::{issue_csrf_cookie, log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub accounts: Arc<AccountService>,
    pub admin: Arc<AdminService>,
    pub sessions: Arc<dyn SessionsRepo>,
    pub uploads: Arc<UploadStorage>,
    pub db: Arc<PostgresRepositories>,
    pub upload_limit_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let upload_limit = state.upload_limit_bytes;

    Router::new()
        .route("/", get(public::index))
        .route(
            "/posts/create/",
            get(posts::create_form).post(posts::create),
        )
        .route("/posts/{id}/", get(public::post_detail))
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::update),
        )
        .route(
            "/posts/{id}/delete/",
            get(posts::delete_confirm).post(posts::delete),
        )
        .route("/posts/{id}/comment/", post(comments::create))
        .route(
            "/posts/{id}/comment/{cid}/edit/",
            get(comments::edit_form).post(comments::update),
        )
        .route(
            "/posts/{id}/comment/{cid}/delete/",
            get(comments::delete_confirm).post(comments::delete),
        )
        .route("/category/{slug}/", get(public::category_index))
        .route("/profile/{username}/", get(public::profile))
        .route(
            "/profile/{username}/edit/",
            get(accounts::profile_edit_form).post(accounts::profile_update),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login),
        )
        .route("/auth/logout/", post(accounts::logout))
        .route(
            "/auth/registration/",
            get(accounts::registration_form).post(accounts::register),
        )
        .route("/uploads/{*path}", get(public::serve_upload))
        .route("/_health/db", get(public::db_health))
        .merge(admin::router())
        .fallback(public::not_found_fallback)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(from_fn(log_responses))
        .layer(from_fn(issue_csrf_cookie))
        .layer(from_fn(set_request_context))
        .with_state(state)
}
