/*
 * Responsibility
 * - tracing / panic hook / Sentry の初期化
 * - Config読み込み → 依存生成 (verifier chain / policy / Slack) → Router 組み立て
 * - Middleware の適用 (request id / trace / limit / timeout)
 * - axum::serve() で起動、シグナルで graceful shutdown (猶予付き)
 */
use std::future::IntoFuture;
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use tokio::sync::oneshot;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, Command, Config, LogFormat, PolicySource};
use crate::middleware::http::HttpLimits;
use crate::services::auth::VerifierChain;
use crate::services::authz::AuthorizationGate;
use crate::services::chat::{ChatClient, SlackClient};
use crate::services::dispatch::MessageDispatcher;
use crate::services::policy::{OpaHttpPolicy, PolicyClient, RegoPolicy};
use crate::services::telemetry;
use crate::state::AppState;
use crate::{api, middleware};

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| anyhow!("invalid log level: {level}"))?;

    // Prefer RUST_LOG if set; otherwise the configured level.
    // Ex:
    // RUST_LOG=info,relayhook=debug,tower_http=debug relayhook serve ...
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},tower_http=info")));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }
    Ok(())
}

fn init_panic_hook() {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panic via tracing so they don't get "lost"
        // (stderr can be hidden depending on how the process is launched.)
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_level, cli.log_format)?;
    init_panic_hook();

    match cli.command {
        Command::Serve(args) => serve(Config::from_args(args)?).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    // Held for the process lifetime; dropping it flushes pending events.
    let _sentry = telemetry::init_sentry(&config.sentry);

    let state = build_state(&config)?;
    tracing::info!(
        addr = %config.addr,
        schemes = ?state.verifiers.schemes(),
        "starting relayhook"
    );

    let app = build_router(state, HttpLimits::from(&config));
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        Ok(()) = signalled_rx => {
            tracing::info!(grace = ?config.shutdown_grace, "draining in-flight requests");
            match tokio::time::timeout(config.shutdown_grace, &mut server).await {
                Ok(res) => res?,
                Err(_) => tracing::warn!("shutdown grace period elapsed; dropping in-flight requests"),
            }
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

fn build_state(config: &Config) -> Result<AppState> {
    // Build process-level services here and inject them into the shared application state.
    let http = reqwest::Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .user_agent(concat!("relayhook/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let verifiers = VerifierChain::from_config(&config.auth, http.clone());

    let policy: Arc<dyn PolicyClient> = match &config.policy {
        PolicySource::Files(paths) => Arc::new(RegoPolicy::from_paths(paths)?),
        PolicySource::Remote(url) => Arc::new(OpaHttpPolicy::new(http.clone(), url.clone())),
    };
    let chat: Arc<dyn ChatClient> = Arc::new(SlackClient::new(http, config.slack_token.clone()));

    Ok(AppState::new(
        verifiers,
        AuthorizationGate::new(policy.clone(), config.auth_err_status),
        MessageDispatcher::new(policy, chat),
    ))
}

fn build_router(state: AppState, limits: HttpLimits) -> Router {
    let router = api::routes(state.clone()).with_state(state);
    middleware::http::apply(router, limits)
}
