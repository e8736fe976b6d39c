use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use davall::backend::Backend;
use davall::{backends, webdav};

/// Serve a file as a read-only WebDAV filesystem, or, with no file given,
/// serve a live snapshot of the host system.
#[derive(Parser)]
#[command(name = "davall")]
#[command(about = "Read-only WebDAV server over archives, databases, documents, and system info", long_about = None)]
struct Cli {
    /// File to serve. Omit to serve a system-info snapshot instead.
    file: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,

    /// Host/interface to bind to.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Force a specific backend instead of detecting one from the file
    /// extension (e.g. "zip", "sqlite", "mailbox").
    #[arg(short = 't', long = "type")]
    backend_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "davall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let backend: Arc<dyn Backend> = match &cli.file {
        Some(path) => backends::load(path, cli.backend_type.as_deref())?.into(),
        None => Arc::new(backends::osinfo_backend::build()),
    };

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    match &cli.file {
        Some(path) => println!("Serving {} on http://{local_addr}/", path.display()),
        None => println!("Serving system info on http://{local_addr}/"),
    }
    println!("Press Ctrl+C to stop.");

    let app = webdav::router(backend);

    tracing::info!(%local_addr, "davall listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("shutting down");
}
