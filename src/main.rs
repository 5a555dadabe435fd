use std::path::PathBuf;

use cam_relay::config::Config;
use cam_relay::server;
use cam_relay::store::FrameStore;
use cam_relay::subscriber::Subscriber;
use tracing::info;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Built-in defaults mirror the reference deployment, so a missing file
    // is fine; an unreadable or malformed one is not.
    let config = if config_path.exists() {
        match Config::load(&config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", config_path.display());
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        broker = %config.mqtt.host,
        broker_port = config.mqtt.port,
        topic = %config.mqtt.topic,
        http_port = config.http.port,
        "starting cam-relay"
    );

    let store = FrameStore::new();

    // The subscriber owns the broker connection for the process lifetime;
    // the HTTP server must come up and serve (stale or empty frames) even
    // while the broker is unreachable.
    let subscriber = Subscriber::new(&config.mqtt, store.clone());
    let subscriber_task = tokio::spawn(subscriber.run());

    let addr = format!("{}:{}", config.http.bind, config.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind to {addr}: {e}");
        std::process::exit(1);
    });
    info!(addr = %addr, "HTTP server listening");

    let app = server::router(store);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("HTTP server error: {e}");
        std::process::exit(1);
    }

    subscriber_task.abort();
    info!("shut down cleanly");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    info!("shutdown signal received, draining HTTP connections");
}
