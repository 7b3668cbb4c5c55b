//! End-to-end checks of the post visibility and ownership policy, driven
//! through the real router against per-test databases.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use blogicum::{
    application::{
        accounts::{AccountService, generate_token},
        admin::AdminService,
        comments::CommentService,
        feed::FeedService,
        posts::PostService,
        repos::{
            CategoriesWriteRepo, CategoryParams, CommentsRepo, CommentsWriteRepo,
            NewCommentParams, NewPostParams, NewSessionParams, NewUserParams, PostsRepo,
            PostsWriteRepo, SessionsRepo, UsersWriteRepo,
        },
    },
    domain::entities::{CategoryRecord, PostRecord, UserRecord},
    infra::{
        db::PostgresRepositories,
        http::{self, HttpState},
        uploads::UploadStorage,
    },
};

const PAGE_SIZE: u32 = 10;
const CSRF: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn build_state(pool: PgPool) -> (Arc<PostgresRepositories>, HttpState) {
    let repos = Arc::new(PostgresRepositories::new(pool));

    let feed = Arc::new(FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        PAGE_SIZE,
    ));
    let posts = Arc::new(PostService::new(repos.clone(), repos.clone()));
    let comments = Arc::new(CommentService::new(repos.clone(), repos.clone(), repos.clone()));
    let accounts = Arc::new(AccountService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        Duration::hours(24),
    ));
    let admin = Arc::new(AdminService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        PAGE_SIZE,
    ));

    let uploads_dir = std::env::temp_dir().join("blogicum-policy-tests");
    let uploads = Arc::new(UploadStorage::new(uploads_dir).expect("upload storage"));

    let state = HttpState {
        feed,
        posts,
        comments,
        accounts,
        admin,
        sessions: repos.clone(),
        uploads,
        db: repos.clone(),
        upload_limit_bytes: 1024 * 1024,
    };

    (repos, state)
}

fn router(state: HttpState) -> Router {
    http::build_router(state)
}

async fn seed_user(repos: &Arc<PostgresRepositories>, username: &str) -> UserRecord {
    repos
        .create_user(NewUserParams {
            username: username.to_string(),
            password_hash: "unused".to_string(),
        })
        .await
        .expect("seed user")
}

async fn open_session(repos: &Arc<PostgresRepositories>, user: &UserRecord) -> String {
    let token = generate_token();
    repos
        .create_session(NewSessionParams {
            token: token.clone(),
            user_id: user.id,
            expires_at: OffsetDateTime::now_utc() + Duration::hours(24),
        })
        .await
        .expect("seed session");
    token
}

async fn seed_post(
    repos: &Arc<PostgresRepositories>,
    author: &UserRecord,
    title: &str,
    pub_date: OffsetDateTime,
    is_published: bool,
    category_id: Option<Uuid>,
) -> PostRecord {
    repos
        .create_post(NewPostParams {
            title: title.to_string(),
            text: format!("body of {title}"),
            image_path: None,
            pub_date,
            is_published,
            author_id: author.id,
            category_id,
            location_id: None,
        })
        .await
        .expect("seed post")
}

async fn seed_category(
    repos: &Arc<PostgresRepositories>,
    title: &str,
    slug: &str,
    is_published: bool,
) -> CategoryRecord {
    repos
        .create_category(CategoryParams {
            title: title.to_string(),
            description: String::new(),
            slug: slug.to_string(),
            is_published,
        })
        .await
        .expect("seed category")
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

fn get_as(path: &str, session: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::COOKIE, format!("blogicum_session={session}"))
        .body(Body::empty())
        .expect("request")
}

fn post_form(path: &str, session: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");

    let cookie = match session {
        Some(session) => format!("blogicum_session={session}; blogicum_csrftoken={CSRF}"),
        None => format!("blogicum_csrftoken={CSRF}"),
    };
    builder = builder.header(header::COOKIE, cookie);

    builder.body(Body::from(body)).expect("request")
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

fn location_of(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[sqlx::test(migrations = "./migrations")]
async fn future_dated_post_is_invisible_except_to_its_author(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let session = open_session(&repos, &alice).await;
    let tomorrow = OffsetDateTime::now_utc() + Duration::days(1);
    let post = seed_post(&repos, &alice, "aurora-forecast", tomorrow, true, None).await;

    let index = app.clone().oneshot(get("/")).await.expect("index");
    assert_eq!(index.status(), StatusCode::OK);
    assert!(!body_string(index).await.contains("aurora-forecast"));

    let anon_profile = app
        .clone()
        .oneshot(get("/profile/alice/"))
        .await
        .expect("profile");
    assert_eq!(anon_profile.status(), StatusCode::OK);
    assert!(!body_string(anon_profile).await.contains("aurora-forecast"));

    let own_profile = app
        .clone()
        .oneshot(get_as("/profile/alice/", &session))
        .await
        .expect("own profile");
    assert_eq!(own_profile.status(), StatusCode::OK);
    assert!(body_string(own_profile).await.contains("aurora-forecast"));

    let anon_detail = app
        .clone()
        .oneshot(get(&format!("/posts/{}/", post.id)))
        .await
        .expect("detail");
    assert_eq!(anon_detail.status(), StatusCode::NOT_FOUND);

    let own_detail = app
        .clone()
        .oneshot(get_as(&format!("/posts/{}/", post.id), &session))
        .await
        .expect("own detail");
    assert_eq!(own_detail.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn unpublished_posts_and_categories_are_hidden_from_non_owners(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let session = open_session(&repos, &alice).await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);

    seed_post(&repos, &alice, "draft-notes", yesterday, false, None).await;
    let hidden_category = seed_category(&repos, "Hidden", "hidden", false).await;
    seed_post(
        &repos,
        &alice,
        "buried-in-hidden-category",
        yesterday,
        true,
        Some(hidden_category.id),
    )
    .await;
    seed_post(&repos, &alice, "plainly-visible", yesterday, true, None).await;

    let index = body_string(app.clone().oneshot(get("/")).await.expect("index")).await;
    assert!(index.contains("plainly-visible"));
    assert!(!index.contains("draft-notes"));
    assert!(!index.contains("buried-in-hidden-category"));

    let bob = seed_user(&repos, "bob").await;
    let bob_session = open_session(&repos, &bob).await;
    let foreign_profile = body_string(
        app.clone()
            .oneshot(get_as("/profile/alice/", &bob_session))
            .await
            .expect("foreign profile"),
    )
    .await;
    assert!(foreign_profile.contains("plainly-visible"));
    assert!(!foreign_profile.contains("draft-notes"));

    let own_profile = body_string(
        app.clone()
            .oneshot(get_as("/profile/alice/", &session))
            .await
            .expect("own profile"),
    )
    .await;
    assert!(own_profile.contains("draft-notes"));
    assert!(own_profile.contains("buried-in-hidden-category"));
}

#[sqlx::test(migrations = "./migrations")]
async fn category_listing_requires_a_published_category(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);

    let travel = seed_category(&repos, "Travel", "travel", true).await;
    seed_category(&repos, "Secret", "secret", false).await;
    seed_post(&repos, &alice, "pack-light", yesterday, true, Some(travel.id)).await;

    let listing = app.clone().oneshot(get("/category/travel/")).await.expect("listing");
    assert_eq!(listing.status(), StatusCode::OK);
    assert!(body_string(listing).await.contains("pack-light"));

    let unpublished = app
        .clone()
        .oneshot(get("/category/secret/"))
        .await
        .expect("unpublished listing");
    assert_eq!(unpublished.status(), StatusCode::NOT_FOUND);

    let missing = app
        .clone()
        .oneshot(get("/category/no-such-category/"))
        .await
        .expect("missing listing");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn listings_are_paginated_by_ten_newest_first(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let base = OffsetDateTime::now_utc() - Duration::days(30);
    for index in 0..12 {
        seed_post(
            &repos,
            &alice,
            &format!("chronicle-{index:02}"),
            base + Duration::days(index),
            true,
            None,
        )
        .await;
    }

    let first = body_string(app.clone().oneshot(get("/")).await.expect("page 1")).await;
    assert!(first.contains("chronicle-11"));
    assert!(first.contains("chronicle-02"));
    assert!(!first.contains("chronicle-01"));
    assert!(!first.contains("chronicle-00"));
    assert!(first.contains("Page 1 of 2"));

    let newest = first.find("chronicle-11").expect("newest on page 1");
    let older = first.find("chronicle-02").expect("older on page 1");
    assert!(newest < older, "newest post should render first");

    let second = body_string(
        app.clone()
            .oneshot(get("/?page=2"))
            .await
            .expect("page 2"),
    )
    .await;
    assert!(second.contains("chronicle-01"));
    assert!(second.contains("chronicle-00"));
    assert!(!second.contains("chronicle-05"));

    let out_of_range = app.clone().oneshot(get("/?page=3")).await.expect("page 3");
    assert_eq!(out_of_range.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn non_authors_cannot_edit_or_delete_posts(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let bob = seed_user(&repos, "bob").await;
    let bob_session = open_session(&repos, &bob).await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);
    let post = seed_post(&repos, &alice, "alices-essay", yesterday, true, None).await;

    let edit = app
        .clone()
        .oneshot(get_as(&format!("/posts/{}/edit/", post.id), &bob_session))
        .await
        .expect("edit as non-author");
    assert!(edit.status().is_redirection());
    assert_eq!(location_of(&edit), format!("/posts/{}/", post.id));

    let confirm = app
        .clone()
        .oneshot(get_as(&format!("/posts/{}/delete/", post.id), &bob_session))
        .await
        .expect("delete confirm as non-author");
    assert_eq!(confirm.status(), StatusCode::NOT_FOUND);

    let delete = app
        .clone()
        .oneshot(post_form(
            &format!("/posts/{}/delete/", post.id),
            Some(&bob_session),
            format!("csrf_token={CSRF}"),
        ))
        .await
        .expect("delete as non-author");
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);

    let survived = repos.find_post(post.id).await.expect("lookup");
    assert!(survived.is_some(), "post must survive a foreign delete");
}

#[sqlx::test(migrations = "./migrations")]
async fn unauthenticated_comments_redirect_to_login_without_a_record(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);
    let post = seed_post(&repos, &alice, "open-thread", yesterday, true, None).await;

    let response = app
        .clone()
        .oneshot(post_form(
            &format!("/posts/{}/comment/", post.id),
            None,
            format!("text=hello&csrf_token={CSRF}"),
        ))
        .await
        .expect("anonymous comment");

    assert!(response.status().is_redirection());
    assert!(location_of(&response).starts_with("/auth/login/"));

    let comments = repos.list_comments(post.id).await.expect("comments");
    assert!(comments.is_empty(), "no record may be created");
}

#[sqlx::test(migrations = "./migrations")]
async fn comments_are_mutable_only_by_their_author(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let bob = seed_user(&repos, "bob").await;
    let alice_session = open_session(&repos, &alice).await;
    let bob_session = open_session(&repos, &bob).await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);
    let post = seed_post(&repos, &alice, "open-thread", yesterday, true, None).await;

    let created = app
        .clone()
        .oneshot(post_form(
            &format!("/posts/{}/comment/", post.id),
            Some(&alice_session),
            format!("text=first%21&csrf_token={CSRF}"),
        ))
        .await
        .expect("create comment");
    assert!(created.status().is_redirection());

    let comments = repos.list_comments(post.id).await.expect("comments");
    assert_eq!(comments.len(), 1);
    let comment = &comments[0];

    let edit_path = format!("/posts/{}/comment/{}/edit/", post.id, comment.id);
    let foreign_edit = app
        .clone()
        .oneshot(get_as(&edit_path, &bob_session))
        .await
        .expect("foreign edit");
    assert_eq!(foreign_edit.status(), StatusCode::NOT_FOUND);

    let foreign_delete = app
        .clone()
        .oneshot(post_form(
            &format!("/posts/{}/comment/{}/delete/", post.id, comment.id),
            Some(&bob_session),
            format!("csrf_token={CSRF}"),
        ))
        .await
        .expect("foreign delete");
    assert_eq!(foreign_delete.status(), StatusCode::NOT_FOUND);

    let own_edit = app
        .clone()
        .oneshot(get_as(&edit_path, &alice_session))
        .await
        .expect("own edit");
    assert_eq!(own_edit.status(), StatusCode::OK);

    let updated = app
        .clone()
        .oneshot(post_form(
            &edit_path,
            Some(&alice_session),
            format!("text=revised&csrf_token={CSRF}"),
        ))
        .await
        .expect("own update");
    assert!(updated.status().is_redirection());

    let comments = repos.list_comments(post.id).await.expect("comments");
    assert_eq!(comments[0].text, "revised");
}

#[sqlx::test(migrations = "./migrations")]
async fn csrf_mismatch_renders_the_forbidden_page(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let session = open_session(&repos, &alice).await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);
    let post = seed_post(&repos, &alice, "open-thread", yesterday, true, None).await;

    let response = app
        .clone()
        .oneshot(post_form(
            &format!("/posts/{}/comment/", post.id),
            Some(&session),
            "text=hello&csrf_token=not-the-cookie".to_string(),
        ))
        .await
        .expect("mismatched csrf");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(repos.list_comments(post.id).await.expect("comments").is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn profiles_are_editable_only_by_their_owner(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    seed_user(&repos, "bob").await;
    let session = open_session(&repos, &alice).await;

    let foreign = app
        .clone()
        .oneshot(get_as("/profile/bob/edit/", &session))
        .await
        .expect("foreign profile edit");
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let own = app
        .clone()
        .oneshot(get_as("/profile/alice/edit/", &session))
        .await
        .expect("own profile edit");
    assert_eq!(own.status(), StatusCode::OK);

    let update = app
        .clone()
        .oneshot(post_form(
            "/profile/alice/edit/",
            Some(&session),
            format!(
                "username=alice&first_name=Alice&last_name=Liddell&email=alice%40example.com&csrf_token={CSRF}"
            ),
        ))
        .await
        .expect("profile update");
    assert!(update.status().is_redirection());
    assert_eq!(location_of(&update), "/profile/alice/");
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_post_ids_render_not_found(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);
    let _ = repos;

    let malformed = app
        .clone()
        .oneshot(get("/posts/not-a-uuid/"))
        .await
        .expect("malformed id");
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);

    let missing = app
        .clone()
        .oneshot(get(&format!("/posts/{}/", Uuid::new_v4())))
        .await
        .expect("missing id");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn comments_must_belong_to_the_post_in_the_path(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = router(state);

    let alice = seed_user(&repos, "alice").await;
    let session = open_session(&repos, &alice).await;
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);
    let first = seed_post(&repos, &alice, "first-post", yesterday, true, None).await;
    let second = seed_post(&repos, &alice, "second-post", yesterday, true, None).await;

    let comment = repos
        .create_comment(NewCommentParams {
            post_id: first.id,
            author_id: alice.id,
            text: "on the first post".to_string(),
        })
        .await
        .expect("seed comment");

    let cross_post = app
        .clone()
        .oneshot(get_as(
            &format!("/posts/{}/comment/{}/edit/", second.id, comment.id),
            &session,
        ))
        .await
        .expect("cross-post comment edit");
    assert_eq!(cross_post.status(), StatusCode::NOT_FOUND);
}
