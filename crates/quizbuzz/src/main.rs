use quizbuzz::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), QuizbuzzError> {
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("failed to load .env: {e}");
        }
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizbuzz=debug,quizbuzz_room=debug,info".into()),
        )
        .with(fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(bind = %config.bind, idle_timeout = ?config.idle_timeout, "starting quizbuzz");

    let server = QuizbuzzServerBuilder::new()
        .config(config)
        .build(DevAuthenticator)
        .await?;
    server.run().await
}
