mod cache;
mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod repos;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Result, anyhow};
use aws_config::{BehaviorVersion, Region};
use axum::{
    Router,
    http::{self, HeaderValue, Method, header},
};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cache::{ResponseCache, SystemClock},
    config::Config,
    repos::{PgCommentRepo, PgNoteRepo, PgStatusRepo, PgUserRepo, Repos},
    services::{
        Argon2Hasher, AuthFlow, CacheTtls, NoteService, PasswordHasher, S3ObjectStore,
        TokenService,
    },
    state::AppState,
    stores::{RedisRateLimiter, RedisStatusStore, Stores},
};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "Notes API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = envy::prefixed("NOTES_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    // Run migrations via init container only (--migrate flag)
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let redis = redis::Client::open(config.redis_url.as_str())?;

    let aws = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await;
    let storage = S3ObjectStore::new(
        aws_sdk_s3::Client::new(&aws),
        config.bucket_name.clone(),
        config.public_bucket_url(),
    );

    // Build repositories
    let users = Arc::new(PgUserRepo::new(database.clone()));
    let notes = Arc::new(PgNoteRepo::new(database.clone()));
    let repos = Repos {
        users: users.clone(),
        notes: notes.clone(),
        comments: Arc::new(PgCommentRepo::new(database.clone())),
        status: Arc::new(PgStatusRepo::new(database)),
    };

    // Build stores
    let rate_limiter = Arc::new(RedisRateLimiter::new(redis.clone()));
    let stores = Stores {
        rate_limiter: rate_limiter.clone(),
        status: Arc::new(RedisStatusStore::new(redis)),
    };

    // Build services
    let tokens = Arc::new(TokenService::from_config(&config));
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::default());
    let note_service = NoteService::new(
        users.clone(),
        notes,
        ResponseCache::new(Arc::new(SystemClock)),
        CacheTtls::from_config(&config),
    );
    let auth = AuthFlow::new(users, rate_limiter, tokens.clone(), hasher.clone());

    let cors = cors_layer(&config)?;

    let state = AppState {
        config: config.clone(),
        repos,
        stores,
        tokens,
        hasher,
        storage: Arc::new(storage),
        notes: Arc::new(note_service),
        auth: Arc::new(auth),
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .nest("/auth", handlers::auth::router())
        .nest(
            "/notes",
            handlers::notes::router().merge(handlers::comments::router()),
        )
        .nest("/users", handlers::users::router())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1MB limit for JSON routes
        // Image routes carry their own 10MB multipart limit
        .merge(handlers::images::router())
        .with_state(state)
        .layer(cors)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

/// Credentialed CORS for the configured web origins; the refresh cookie
/// only travels cross-site when the origin is listed here.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let origins = config
        .allowed_origins()
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
