//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use invoice_types::LedgerRepository;

use super::handlers::{self, AppState};
use crate::InvoiceService;

/// HTTP Server for the Invoice API.
pub struct HttpServer<R: LedgerRepository> {
    state: Arc<AppState<R>>,
}

impl<R: LedgerRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: InvoiceService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/accounts", post(handlers::open_account::<R>))
            .route("/api/accounts/{id}", get(handlers::get_account::<R>))
            .route(
                "/api/accounts/{id}/invoices",
                get(handlers::list_invoices::<R>),
            )
            .route("/api/invoices", post(handlers::create_invoice::<R>))
            .route("/api/invoices/issue", post(handlers::issue_invoice::<R>))
            .route(
                "/api/invoices/{id}",
                get(handlers::get_invoice::<R>).delete(handlers::delete_invoice::<R>),
            )
            .route("/api/invoices/{id}/pay", post(handlers::pay_invoice::<R>))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
