use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use xlforge_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xlforge_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    xlforge_server::run_server(config).await
}
