//! Bytegate server binary.
//!
//! `bytegate identity` runs the identity service, `bytegate gateway` the edge
//! gateway. Both read the shared signing key at startup and refuse to start
//! without a usable one.

pub use self::error::{Error, Result};

mod cli;
mod error;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use bytegate_api::config::{GatewayConfig, IdentityConfig, TrustModeKind};
use bytegate_api::middleware::edge::EdgeVerifier;
use bytegate_api::middleware::identity::TrustMode;
use bytegate_api::services::proxy::Forwarder;
use bytegate_api::{GatewayState, IdentityState, gateway_router, identity_router};
use bytegate_core::auth::issuer::IdentityIssuer;
use bytegate_core::auth::jwt::TokenCodec;
use bytegate_core::auth::memory::InMemoryCredentialStore;
use bytegate_core::auth::queries::PgCredentialStore;
use bytegate_core::auth::signing_key::resolve_signing_key;
use bytegate_core::auth::store::CredentialStore;
use bytegate_core::guard::{Guard, IdentityOwnership};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands, GatewayArgs, IdentityArgs};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{e}");
        eprintln!("bytegate: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Identity(args) => serve_identity(args).await,
        Commands::Gateway(args) => serve_gateway(args).await,
    }
}

async fn serve_identity(args: IdentityArgs) -> Result<()> {
    let config = IdentityConfig::from_env()?;
    let key = resolve_signing_key()?;
    let codec = Arc::new(TokenCodec::new(&key, config.auth.access_ttl()));
    info!(
        access_ttl_secs = config.auth.access_ttl_secs,
        trust_mode = ?config.trust_mode,
        "starting identity service"
    );
    // Declared for clients; no refresh endpoint consumes it yet.
    info!(refresh_ttl_secs = config.auth.refresh_ttl_secs, "refresh ttl configured");

    let store: Arc<dyn CredentialStore> = if args.in_memory {
        warn!("using in-memory credential store; identities are lost on exit");
        Arc::new(InMemoryCredentialStore::new())
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&args.database_url)
            .await?;
        info!("running database migrations");
        bytegate_api::migrate(&pool).await?;
        Arc::new(PgCredentialStore::new(pool))
    };

    let trust = match config.trust_mode {
        TrustModeKind::Gateway => TrustMode::GatewayHeaders,
        TrustModeKind::Token => TrustMode::VerifyToken(codec.clone()),
    };
    let state = IdentityState {
        issuer: Arc::new(IdentityIssuer::new(store.clone(), codec)),
        guard: Guard::with_ownership(Arc::new(IdentityOwnership::new(store))),
        trust,
    };

    serve(&args.bind, identity_router(state)).await
}

async fn serve_gateway(args: GatewayArgs) -> Result<()> {
    let config = GatewayConfig::from_env()?;
    let key = resolve_signing_key()?;
    let codec = Arc::new(TokenCodec::new(&key, config.auth.access_ttl()));

    for pattern in config.allow_list.patterns() {
        info!(%pattern, "allow-listed");
    }
    for route in config.routes.routes() {
        info!(prefix = %route.prefix, upstream = %route.upstream, "route");
    }

    let state = GatewayState {
        verifier: EdgeVerifier::new(codec, config.allow_list),
        forwarder: Forwarder::new(config.routes),
    };
    serve(&args.bind, gateway_router(state)).await
}

async fn serve(bind: &str, app: axum::Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
