pub mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::post};
use tokio::sync::watch;

use crate::config::Config;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
}

/// Build the full route tree.
///
/// `/v1` requires any active passkey; `/su` requires a superuser one.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/challenge", post(routes::challenge))
        .route("/key", post(routes::key))
        .route("/arsenal/key", post(routes::arsenal_key))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_passkey,
        ));

    let su = Router::new()
        .route("/passkey", post(routes::add_passkey))
        .route("/revoke", post(routes::revoke_passkey))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_superuser,
        ));

    Router::new()
        .nest("/v1", v1)
        .nest("/su", su)
        .with_state(state)
}

/// Run the HTTP server.
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("[server] Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}
