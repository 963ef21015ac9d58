use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use db_pool::{create_pool, DbConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_service::db::{
    KeyValueStore, PgCommentRepository, PgNotificationRepository, PgPostRepository,
    PgQuizRepository, PgUserRepository, RedisStore,
};
use quiz_service::handlers::{self, health};
use quiz_service::middleware::JwtAuthMiddleware;
use quiz_service::security::JwtManager;
use quiz_service::services::oauth::{KakaoProvider, NaverProvider};
use quiz_service::services::{
    AccountService, AdminService, AuthService, CommentService, NotificationService, PostService,
    QuizService, SmtpMailer, UserService,
};
use quiz_service::sse::EmitterRegistry;
use quiz_service::{metrics, AppState, Config};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method()
        .allow_any_header()
        .expose_headers(vec![actix_web::http::header::AUTHORIZATION])
        .supports_credentials()
        .max_age(3600)
}

/// Quiz Service
///
/// Accounts, quizzes, posts and live notifications over one HTTP API.
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    init_tracing(&config.app.log_format);

    tracing::info!(
        env = %config.app.env,
        version = env!("CARGO_PKG_VERSION"),
        "Starting quiz-service"
    );

    let mut db_config = DbConfig::from_env("quiz-service").unwrap_or_default();
    if db_config.database_url.is_empty() {
        db_config.database_url = config.database.url.clone();
    }
    db_config.log_config();
    let pool = create_pool(db_config)
        .await
        .context("failed to create database pool")?;

    if config.app.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    let redis_client =
        redis::Client::open(config.redis.url.as_str()).context("invalid REDIS_URL")?;
    let redis = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("failed to connect to Redis")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(RedisStore::new(redis.clone()));

    let jwt = Arc::new(JwtManager::from_config(&config.jwt).context("invalid JWT keys")?);
    let mailer = Arc::new(SmtpMailer::new(&config.smtp).context("invalid SMTP settings")?);
    if !mailer.is_enabled() {
        tracing::warn!("SMTP_HOST not set; outgoing mail is only logged");
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;
    let kakao = Arc::new(KakaoProvider::new(http.clone(), config.oauth.kakao.clone()));
    let naver = Arc::new(NaverProvider::new(http, config.oauth.naver.clone()));

    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let quizzes = Arc::new(PgQuizRepository::new(pool.clone()));
    let posts = Arc::new(PgPostRepository::new(pool.clone()));
    let comments = Arc::new(PgCommentRepository::new(pool.clone()));
    let notification_repo = Arc::new(PgNotificationRepository::new(pool.clone()));

    let registry = Arc::new(EmitterRegistry::new());
    let eviction = registry.spawn_eviction(
        Duration::from_secs(config.sse.event_cache_ttl_secs),
        Duration::from_secs(config.sse.sweep_interval_secs),
    );
    let notifications = Arc::new(NotificationService::new(
        notification_repo,
        registry.clone(),
        config.sse.clone(),
    ));

    let state = web::Data::new(AppState {
        auth: Arc::new(AuthService::new(
            users.clone(),
            store.clone(),
            jwt.clone(),
            notifications.clone(),
            kakao,
            naver,
        )),
        account: Arc::new(AccountService::new(users.clone(), store.clone(), mailer)),
        users: Arc::new(UserService::new(
            users.clone(),
            store.clone(),
            notifications.clone(),
        )),
        admin: Arc::new(AdminService::new(
            users.clone(),
            posts.clone(),
            store.clone(),
            notifications.clone(),
        )),
        quizzes: Arc::new(QuizService::new(
            quizzes,
            users.clone(),
            notifications.clone(),
        )),
        posts: Arc::new(PostService::new(posts.clone(), comments.clone(), users.clone())),
        comments: Arc::new(CommentService::new(
            comments,
            posts,
            users,
            notifications.clone(),
        )),
        notifications,
        jwt: jwt.clone(),
        store: store.clone(),
        secure_cookie: config.jwt.secure_cookie,
    });
    let health_state = web::Data::new(health::HealthState::new(
        pool.clone(),
        redis,
        registry.clone(),
    ));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let allowed_origins = config.cors.allowed_origins.clone();
    tracing::info!(address = %bind_address, "Starting HTTP server");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(health_state.clone())
            .wrap(build_cors(&allowed_origins))
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .route("/api/v1/health", web::get().to(health::health_summary))
            .route("/api/v1/health/ready", web::get().to(health::readiness))
            .route("/api/v1/health/live", web::get().to(health::liveness))
            .service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(jwt.clone(), store.clone()))
                    .configure(handlers::configure),
            )
    })
    .workers(config.app.workers.max(1))
    .disable_signals()
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run();

    let server_handle = server.handle();
    let server_task = actix_rt::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    // Open event streams end once their emitters are gone
    registry.clear();
    server_handle.stop(true).await;
    eviction.abort();
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server stopped with error"),
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
    }
    pool.close().await;

    tracing::info!("quiz-service shut down");
    Ok(())
}
