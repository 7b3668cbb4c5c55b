use std::{process, sync::Arc};

use blogicum::{
    application::{
        accounts::AccountService,
        admin::AdminService,
        comments::CommentService,
        error::AppError,
        feed::FeedService,
        posts::PostService,
        repos::{
            CategoriesRepo, CategoriesWriteRepo, CommentsRepo, CommentsWriteRepo, LocationsRepo,
            LocationsWriteRepo, PostsRepo, PostsWriteRepo, SessionsRepo, UsersRepo, UsersWriteRepo,
        },
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        uploads::UploadStorage,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "blogicum::server",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write_repo: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let locations_repo: Arc<dyn LocationsRepo> = repositories.clone();
    let locations_write_repo: Arc<dyn LocationsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let comments_write_repo: Arc<dyn CommentsWriteRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let users_write_repo: Arc<dyn UsersWriteRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();

    let page_size = settings.pagination.page_size.get();

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        categories_repo.clone(),
        comments_repo.clone(),
        users_repo.clone(),
        page_size,
    ));
    let posts = Arc::new(PostService::new(posts_repo.clone(), posts_write_repo.clone()));
    let comments = Arc::new(CommentService::new(
        posts_repo.clone(),
        comments_repo.clone(),
        comments_write_repo,
    ));
    let accounts = Arc::new(AccountService::new(
        users_repo.clone(),
        users_write_repo,
        sessions_repo.clone(),
        settings.sessions.ttl,
    ));
    let admin = Arc::new(AdminService::new(
        posts_repo,
        posts_write_repo,
        categories_repo,
        categories_write_repo,
        locations_repo,
        locations_write_repo,
        comments_repo,
        users_repo,
        page_size,
    ));

    let uploads = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    Ok(HttpState {
        feed,
        posts,
        comments,
        accounts,
        admin,
        sessions: sessions_repo,
        uploads,
        db: repositories,
        upload_limit_bytes: settings.uploads.max_request_bytes.get() as usize,
    })
}
