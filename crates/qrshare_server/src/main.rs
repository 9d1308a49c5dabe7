//! QR Share API server entrypoint.

use qrshare_core::DEFAULT_PORT;
use qrshare_server::{
    config::Config, open_share_service, resolve_bind_address, serve_router, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    purge_expired: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            "--purge-expired" => flags.purge_expired = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrshare=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();

    if cli_flags.purge_expired {
        return run_purge(&config);
    }

    let shares = open_share_service(&config)?;
    let state = AppState::new(config.clone(), shares);

    if config.allow_public_access {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = resolve_bind_address(&config);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("QR Share running at http://{}", actual_addr);

    serve_router(listener, state, shutdown_signal()).await?;
    tracing::info!("QR Share stopped");

    Ok(())
}

fn run_purge(config: &Config) -> anyhow::Result<()> {
    if config.ephemeral {
        anyhow::bail!("--purge-expired has nothing to do when EPHEMERAL is set");
    }
    let shares = open_share_service(config)?;
    let purged = shares.purge_expired()?;
    println!("Purged {} expired share(s) from {}", purged, config.db_path);
    Ok(())
}

fn print_help() {
    println!("QR Share Server\n");
    println!("Usage: qrshare [OPTIONS]\n");
    println!("Options:");
    println!("  --purge-expired   Remove expired shares and their images, then exit");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!("  DB_PATH           Database directory (default: ~/.cache/qrshare/db)");
    println!("  BLOB_PATH         Image directory (default: <DB_PATH>/blobs)");
    println!("  PORT              Server port (default: {})", DEFAULT_PORT);
    println!("  MAX_SHARE_SIZE    Maximum publish body size in bytes (default: 5MB)");
    println!("  PUBLIC_URL        Origin used in share links (default: derived from Host)");
    println!("  EPHEMERAL         Keep shares in memory only");
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin and non-loopback binds");
    println!(
        "  BIND              Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
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
    tracing::info!("Shutdown signal received");
}
