//! Tasksmith server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasksmith::{api, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasksmith=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting tasksmith v{}", env!("CARGO_PKG_VERSION"));

    api::serve(config).await
}
