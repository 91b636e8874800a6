#[macro_use]
extern crate tracing;

use relaychat_proxy::config::ProxyConfig;
use relaychat_proxy::{AppState, router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    info!("starting relay proxy with {config:?}");

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr)
        .await
    {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("failed to bind {}: {err}", config.listen_addr);
            return;
        }
    };
    let state = AppState::new(config);

    if let Err(err) = axum::serve(listener, router(state)).await {
        error!("server error: {err}");
    }
}
