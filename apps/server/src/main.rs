//! Reference authority binary.

use std::sync::Arc;

use promptdeck_server::{router, Authority};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("promptdeck_server=debug,info")),
        )
        .init();

    let bind = std::env::var("PROMPTDECK_BIND")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "127.0.0.1:3001".to_string());

    let authority = Arc::new(Authority::default());
    let app = router(authority);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {bind}: {err}"));
    tracing::info!("promptdeck authority listening on {bind}");
    axum::serve(listener, app)
        .await
        .expect("server terminated unexpectedly");
}
