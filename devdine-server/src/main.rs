//! devdine-server

use anyhow::{anyhow, Result};
use axum::{routing::get, Router};
use axum_server::Handle;
use clap::Parser;
use devdine_server::{
    app_state::{AppState, AppStateBuilder},
    db,
    metrics::setup_metrics_recorder,
    middleware::runtime,
    models::otp::{OtpPolicy, OtpStore},
    router,
    routes::fallback::notfound_404,
    settings::{AppEnvironment, Settings},
    setups::{
        local::{LocalSetup, MemoryUserStore},
        prod::{LogCodeSender, PgUserStore, ProdSetup},
        ServerSetup,
    },
    sweeper::sweep_otp_store,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{
    future::ready,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    process::exit,
    sync::Arc,
    time::Duration,
};
use tokio::signal::{
    self,
    unix::{signal, SignalKind},
};
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Email verification and user registration service
#[derive(Parser, Debug)]
#[command(name = "devdine-server", version, about)]
struct Cli {
    /// Path to the settings file. Defaults to the bundled `config/settings.toml`.
    #[arg(long)]
    config_path: Option<PathBuf>,
    /// Keep users in memory instead of Postgres. Nothing survives a restart.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (stdout_writer, _stdout_guard) = tracing_appender::non_blocking(io::stdout());

    let settings = Settings::load(cli.config_path)?;

    setup_tracing(stdout_writer, settings.server.environment);

    info!(
        subject = "app_settings",
        category = "init",
        "starting with settings: {:?}",
        settings,
    );

    if settings.echo_codes() {
        warn!(
            subject = "app_settings",
            category = "init",
            "verification codes are returned in responses, never enable this in production"
        );
    }

    let recorder_handle = setup_metrics_recorder()?;
    let cancellation_token = CancellationToken::new();

    let metrics_server = tokio::spawn(serve_metrics(
        recorder_handle,
        settings.clone(),
        cancellation_token.clone(),
    ));

    let app_server = if cli.in_memory {
        info!(
            subject = "app_start",
            category = "init",
            "keeping users in memory"
        );

        let app_state = state_builder::<LocalSetup>(&settings)
            .with_user_store(MemoryUserStore::default())
            .with_verification_code_sender(LogCodeSender)
            .finalize()?;

        tokio::spawn(serve_app(
            settings.clone(),
            app_state,
            cancellation_token.clone(),
        ))
    } else {
        let database_url = settings.database.connection_url();

        if settings.database.run_migrations {
            db::migrations::run(&database_url).await?;
        }

        let db_pool = db::pool(&database_url, settings.database.connect_timeout);

        let app_state = state_builder::<ProdSetup>(&settings)
            .with_user_store(PgUserStore::new(db_pool))
            .with_verification_code_sender(LogCodeSender)
            .finalize()?;

        tokio::spawn(serve_app(
            settings.clone(),
            app_state,
            cancellation_token.clone(),
        ))
    };

    tokio::spawn(async move {
        capture_sigterm().await;

        cancellation_token.cancel();
        println!("\nCtrl+C received, shutting down. Press Ctrl+C again to force shutdown.");

        capture_sigterm().await;

        exit(130)
    });

    let (metrics, app) = tokio::try_join!(metrics_server, app_server)?;

    if let Err(e) = metrics {
        error!("metrics server crashed: {}", e);
    }

    if let Err(e) = app {
        error!("app server crashed: {}", e);
    }

    Ok(())
}

/// An [`AppStateBuilder`] with everything but the setup-specific services.
fn state_builder<S: ServerSetup>(settings: &Settings) -> AppStateBuilder<S> {
    AppStateBuilder::default()
        .with_otp_store(OtpStore::new(OtpPolicy {
            ttl: settings.otp.ttl(),
            max_attempts: settings.otp.max_attempts,
        }))
        .with_email_policy(settings.email.policy())
        .with_echo_codes(settings.echo_codes())
}

async fn serve_metrics(
    recorder_handle: PrometheusHandle,
    settings: Settings,
    token: CancellationToken,
) -> Result<()> {
    let metrics_router = Router::new()
        .route("/metrics", get(move || ready(recorder_handle.render())))
        .fallback(notfound_404);

    let router = metrics_router.layer(CatchPanicLayer::custom(runtime::catch_panic));

    let (server, _) = serve("Metrics", router, settings.server.metrics_port).await?;

    token.cancelled().await;
    server.graceful_shutdown(None);

    Ok(())
}

async fn serve_app<S: ServerSetup>(
    settings: Settings,
    app_state: AppState<S>,
    token: CancellationToken,
) -> Result<()> {
    tokio::spawn(sweep_otp_store(
        Arc::clone(&app_state.otp_store),
        settings.otp.sweep_interval(),
        token.clone(),
    ));

    let router = router::with_service_layers(
        router::setup_app_router(app_state),
        Duration::from_millis(settings.server.timeout_ms),
    );

    let (server, _) = serve("Application", router, settings.server.port).await?;

    token.cancelled().await;
    server.graceful_shutdown(Some(Duration::from_secs(10)));

    Ok(())
}

async fn serve(name: &str, app: Router, port: u16) -> Result<(Handle, SocketAddr)> {
    let bind_addr: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    info!(
        subject = "app_start",
        category = "init",
        "{} server listening on {}",
        name,
        bind_addr
    );

    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        let name = name.to_string();
        async move {
            if let Err(err) = axum_server::bind(bind_addr)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
            {
                error!(subject = "app_start", category = "init", %err, "{name} server failed");
            }
        }
    });

    let addr = handle
        .listening()
        .await
        .ok_or_else(|| anyhow!("{name} server could not bind to {bind_addr}"))?;

    Ok((handle, addr))
}

/// Captures and waits for system signals.
async fn capture_sigterm() {
    #[cfg(unix)]
    let term = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = term => {}
    };
}

/// Setup the [tracing][tracing] subscriber: human readable logs locally,
/// JSON lines everywhere else.
fn setup_tracing(writer: tracing_appender::non_blocking::NonBlocking, environment: AppEnvironment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("devdine_server=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);

    match environment {
        AppEnvironment::Local => registry
            .with(fmt::layer().with_writer(writer).with_target(true))
            .init(),
        _ => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true),
            )
            .init(),
    }
}
