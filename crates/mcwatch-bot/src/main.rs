use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = mcwatch_bot::run().await {
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
