//! Registration, login, post creation, and the staff panel, exercised
//! through the router.

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

use blogicum::{
    application::{
        accounts::{AccountService, generate_token},
        admin::AdminService,
        comments::CommentService,
        feed::FeedService,
        posts::PostService,
        repos::{
            NewPostParams, NewSessionParams, NewUserParams, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersWriteRepo,
        },
    },
    domain::entities::UserRecord,
    infra::{
        db::PostgresRepositories,
        http::{self, HttpState},
        uploads::UploadStorage,
    },
};

const PAGE_SIZE: u32 = 10;
const CSRF: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const BOUNDARY: &str = "xXxBlogicumTestBoundaryxXx";

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

    let uploads_dir = std::env::temp_dir().join("blogicum-account-tests");
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

fn post_form(path: &str, session: Option<&str>, body: String) -> Request<Body> {
    let cookie = match session {
        Some(session) => format!("blogicum_session={session}; blogicum_csrftoken={CSRF}"),
        None => format!("blogicum_csrftoken={CSRF}"),
    };

    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .expect("request")
}

fn get_as(path: &str, session: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::COOKIE, format!("blogicum_session={session}"))
        .body(Body::empty())
        .expect("request")
}

fn multipart_field(name: &str, value: &str) -> String {
    format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
}

fn multipart_post(path: &str, session: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&multipart_field(name, value));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(
            header::COOKIE,
            format!("blogicum_session={session}; blogicum_csrftoken={CSRF}"),
        )
        .body(Body::from(body))
        .expect("request")
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
async fn registration_then_login_opens_a_session(pool: PgPool) {
    let (_repos, state) = build_state(pool);
    let app: Router = http::build_router(state);

    let registered = app
        .clone()
        .oneshot(post_form(
            "/auth/registration/",
            None,
            format!("username=walter&password1=correct-horse&password2=correct-horse&csrf_token={CSRF}"),
        ))
        .await
        .expect("register");
    assert!(registered.status().is_redirection());
    assert_eq!(location_of(&registered), "/auth/login/");

    let logged_in = app
        .clone()
        .oneshot(post_form(
            "/auth/login/",
            None,
            format!("username=walter&password=correct-horse&csrf_token={CSRF}"),
        ))
        .await
        .expect("login");
    assert!(logged_in.status().is_redirection());
    assert_eq!(location_of(&logged_in), "/profile/walter/");

    let session_cookie = logged_in
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("blogicum_session="))
        .expect("session cookie")
        .to_string();
    let token = session_cookie
        .trim_start_matches("blogicum_session=")
        .split(';')
        .next()
        .expect("token")
        .to_string();

    let create_page = app
        .clone()
        .oneshot(get_as("/posts/create/", &token))
        .await
        .expect("create form");
    assert_eq!(create_page.status(), StatusCode::OK);

    let wrong_password = app
        .clone()
        .oneshot(post_form(
            "/auth/login/",
            None,
            format!("username=walter&password=wrong&csrf_token={CSRF}"),
        ))
        .await
        .expect("bad login");
    assert_eq!(wrong_password.status(), StatusCode::OK);
    assert!(body_string(wrong_password).await.contains("Invalid username or password"));
}

#[sqlx::test(migrations = "./migrations")]
async fn anonymous_post_creation_redirects_to_login(pool: PgPool) {
    let (_repos, state) = build_state(pool);
    let app = http::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/posts/create/")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("anonymous create form");

    assert!(response.status().is_redirection());
    assert!(location_of(&response).starts_with("/auth/login/?next=/posts/create/"));
}

#[sqlx::test(migrations = "./migrations")]
async fn authors_create_posts_through_the_form(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = http::build_router(state);

    let alice = seed_user(&repos, "alice").await;
    let session = open_session(&repos, &alice).await;

    let created = app
        .clone()
        .oneshot(multipart_post(
            "/posts/create/",
            &session,
            &[
                ("title", "from-the-form"),
                ("text", "written through the browser"),
                ("pub_date", ""),
                ("csrf_token", CSRF),
            ],
        ))
        .await
        .expect("create post");
    assert!(created.status().is_redirection());
    assert_eq!(location_of(&created), "/profile/alice/");

    let index = body_string(
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("index"),
    )
    .await;
    assert!(index.contains("from-the-form"));

    let blank_title = app
        .clone()
        .oneshot(multipart_post(
            "/posts/create/",
            &session,
            &[
                ("title", "   "),
                ("text", "no title"),
                ("pub_date", ""),
                ("csrf_token", CSRF),
            ],
        ))
        .await
        .expect("invalid create");
    assert_eq!(blank_title.status(), StatusCode::OK);
    assert!(body_string(blank_title).await.contains("title must not be empty"));
}

#[sqlx::test(migrations = "./migrations")]
async fn logout_closes_the_session(pool: PgPool) {
    let (repos, state) = build_state(pool);
    let app = http::build_router(state);

    let alice = seed_user(&repos, "alice").await;
    let session = open_session(&repos, &alice).await;

    let logout = app
        .clone()
        .oneshot(post_form(
            "/auth/logout/",
            Some(&session),
            format!("csrf_token={CSRF}"),
        ))
        .await
        .expect("logout");
    assert!(logout.status().is_redirection());
    assert_eq!(location_of(&logout), "/");

    let after = app
        .clone()
        .oneshot(get_as("/posts/create/", &session))
        .await
        .expect("stale session");
    assert!(after.status().is_redirection());
    assert!(location_of(&after).starts_with("/auth/login/"));
}

#[sqlx::test(migrations = "./migrations")]
async fn the_admin_panel_is_staff_only_and_toggles_published_flags(pool: PgPool) {
    let (repos, state) = build_state(pool.clone());
    let app = http::build_router(state);

    let alice = seed_user(&repos, "alice").await;
    let staff = seed_user(&repos, "editor").await;
    sqlx::query("UPDATE users SET is_staff = TRUE WHERE id = $1")
        .bind(staff.id)
        .execute(&pool)
        .await
        .expect("grant staff");

    let alice_session = open_session(&repos, &alice).await;
    let staff_session = open_session(&repos, &staff).await;

    let hidden = repos
        .create_post(NewPostParams {
            title: "pending-review".to_string(),
            text: "draft".to_string(),
            image_path: None,
            pub_date: OffsetDateTime::now_utc() - Duration::days(1),
            is_published: false,
            author_id: alice.id,
            category_id: None,
            location_id: None,
        })
        .await
        .expect("seed post");

    let non_staff = app
        .clone()
        .oneshot(get_as("/admin/", &alice_session))
        .await
        .expect("non-staff dashboard");
    assert_eq!(non_staff.status(), StatusCode::NOT_FOUND);

    let dashboard = app
        .clone()
        .oneshot(get_as("/admin/", &staff_session))
        .await
        .expect("staff dashboard");
    assert_eq!(dashboard.status(), StatusCode::OK);

    let posts_page = app
        .clone()
        .oneshot(get_as("/admin/posts/", &staff_session))
        .await
        .expect("admin posts");
    assert_eq!(posts_page.status(), StatusCode::OK);
    assert!(body_string(posts_page).await.contains("pending-review"));

    let toggled = app
        .clone()
        .oneshot(post_form(
            &format!("/admin/posts/{}/update/", hidden.id),
            Some(&staff_session),
            format!("is_published=on&category_id=&location_id=&csrf_token={CSRF}"),
        ))
        .await
        .expect("toggle published");
    assert!(toggled.status().is_redirection());

    let reloaded = repos
        .find_post(hidden.id)
        .await
        .expect("lookup")
        .expect("post exists");
    assert!(reloaded.is_published);
}
