use std::net::SocketAddr;
use std::path::PathBuf;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

mod handlers;
mod logic;
mod presence;
mod sessions;
mod state;

use crate::handlers::{board_handler, ping_handler, root_handler, ws_handler};
use crate::state::{AppState, DEFAULT_COMPACT_AFTER};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    #[arg(long, env = "SYNCBOARD_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,
    /// Compact a board's log after this many entries; 0 disables compaction.
    #[arg(long, env = "SYNCBOARD_COMPACT_AFTER", default_value_t = DEFAULT_COMPACT_AFTER)]
    compact_after: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let state = AppState::new(args.compact_after);

    let public_dir = args
        .public_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
    let index_file = public_dir.join("index.html");

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/ping", get(ping_handler))
        .route("/b/:board_id", get(board_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(axum::Extension(index_file))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!(port = args.port, compact_after = args.compact_after, "syncboard listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server");
    axum::serve(listener, app).await.expect("Server crashed");
}
