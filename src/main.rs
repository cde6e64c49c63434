use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env next to the binary's working directory
    let dotenv = dotenvy::dotenv().ok();

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "vetsense", "VETSENSE starting: RUST_LOG='{}', dotenv={:?}", rust_log, dotenv);

    let args: Vec<String> = std::env::args().collect();
    let cfg = vetsense::config::ServerConfig::from_env(&args)?;
    vetsense::server::run_with_config(cfg).await
}
