//! Web chat front end.

mod handlers;
mod render;
mod session;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

use crate::services::RagEngine;

pub use render::{DocumentEntry, DocumentNotice, PageStatus, escape_html, render_page};
pub use session::{
    ChatEntry, ChatLog, ChatOutcome, MAX_HISTORY, MAX_SESSIONS, SESSION_COOKIE, SessionStore,
};

pub struct AppState {
    pub engine: RagEngine,
    pub sessions: SessionStore,
    /// Held for the duration of each query or rebuild; one runs at a time.
    pub query_gate: Mutex<()>,
    /// Outcome of the last upload, delete or rebuild, shown to every session.
    pub notice: RwLock<Option<DocumentNotice>>,
}

impl AppState {
    pub fn new(engine: RagEngine) -> Self {
        Self {
            engine,
            sessions: SessionStore::new(),
            query_gate: Mutex::new(()),
            notice: RwLock::new(None),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit =
        usize::try_from(state.engine.config().indexing.max_file_size).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ask", post(handlers::ask))
        .route("/clear", post(handlers::clear))
        .route("/reindex", post(handlers::reindex))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/delete", post(handlers::delete_document))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the chat on `bind` until `shutdown` resolves.
pub async fn run_server<F>(engine: RagEngine, bind: &str, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind).await?;
    let state = Arc::new(AppState::new(engine));

    tracing::info!("Web chat listening on http://{}", listener.local_addr()?);
    tracing::info!(
        "Generation model: {} at {}",
        state.engine.generator().model(),
        state.engine.generator().base_url()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Web chat stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
