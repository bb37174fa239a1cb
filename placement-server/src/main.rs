//! placement-server - Placement drive registration and check-in service
//!
//! `serve` runs the HTTP API and the notification dispatcher.
//! `issue-token` mints an admin bearer credential for the dashboard.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use placement_common::api::auth::{issue_token, load_shared_secret};
use placement_common::config::{Config, ConfigOverrides};
use placement_common::db::init_database;
use placement_common::time;
use placement_server::notify::{Dispatcher, LogNotifier, Notifier, RelayNotifier};
use placement_server::{build_router, cors_layer, AppState};

/// Command-line arguments for placement-server
#[derive(Parser, Debug)]
#[command(name = "placement-server")]
#[command(about = "Placement drive registration and check-in service")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(short, long)]
        bind: Option<String>,

        /// Submission cutoff (RFC 3339)
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Print an admin bearer credential
    IssueToken {
        #[arg(short, long)]
        username: String,

        /// Hours until the credential expires
        #[arg(long, default_value_t = 12)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "placement_server=info,placement_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut overrides = ConfigOverrides {
        config_path: cli.config,
        database_path: cli.database,
        ..Default::default()
    };

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        deadline: None,
    }) {
        Command::Serve { bind, deadline } => {
            overrides.bind_addr = bind;
            overrides.deadline = deadline;
            serve(overrides).await
        }
        Command::IssueToken {
            username,
            ttl_hours,
        } => print_token(overrides, &username, ttl_hours).await,
    }
}

async fn serve(overrides: ConfigOverrides) -> Result<()> {
    info!("Starting placement-server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::resolve(&overrides).context("Failed to resolve configuration")?;
    info!("Database path: {}", config.database_path.display());
    match config.submission.deadline {
        Some(deadline) => info!("Submission deadline: {}", deadline.to_rfc3339()),
        None => info!("No submission deadline configured (window always open)"),
    }
    if config.queue.strict_transitions {
        info!("Strict interview status transitions enabled");
    }

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let shared_secret = load_shared_secret(&pool)
        .await
        .context("Failed to load credential signing secret")?;
    if shared_secret == 0 {
        info!("Admin authentication disabled (shared_secret = 0)");
    } else {
        info!("✓ Loaded credential signing secret");
    }

    let notifier: Arc<dyn Notifier> = match &config.notifications.relay_url {
        Some(url) => {
            info!("Delivering notifications via relay {}", url);
            Arc::new(RelayNotifier::new(url.clone(), config.notifications.from.clone())?)
        }
        None => {
            info!("No mail relay configured; notifications will be logged");
            Arc::new(LogNotifier)
        }
    };
    let dispatcher = Dispatcher::new(
        pool.clone(),
        notifier,
        config.notifications.max_attempts,
        Duration::from_secs(config.notifications.interval_secs),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher_task = tokio::spawn(dispatcher.run(shutdown_rx));

    let state = AppState::from_config(pool, shared_secret, &config);
    let app = build_router(state)
        .layer(cors_layer(config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    info!("placement-server listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatcher_task.await {
        error!("Dispatcher task failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn print_token(overrides: ConfigOverrides, username: &str, ttl_hours: i64) -> Result<()> {
    anyhow::ensure!(ttl_hours > 0, "--ttl-hours must be positive");

    let config = Config::resolve(&overrides).context("Failed to resolve configuration")?;
    let pool = init_database(&config.database_path).await?;
    let shared_secret = load_shared_secret(&pool).await?;
    if shared_secret == 0 {
        info!("Admin authentication is disabled; the credential will not be checked");
    }

    let expires_at = time::now_millis() + ttl_hours * 60 * 60 * 1000;
    let token = issue_token(username, expires_at, shared_secret)?;
    println!("{}", token);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
