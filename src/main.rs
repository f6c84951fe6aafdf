use sketch_relay::config::RelayConfig;
use sketch_relay::routes;
use sketch_relay::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env().expect("invalid relay configuration");
    let state = AppState::new(config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind");

    tracing::info!(addr = %config.listen_addr, "sketch-relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
