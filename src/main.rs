use anyhow::Context;
use clap::Parser;
use tracing::info;

use myadmin::config::{AppConfig, Args};
use myadmin::{logging, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_format)?;

    let config = AppConfig::try_from(&args)?;
    let listen = config.listen;
    info!(
        strategy = ?config.token_strategy,
        max_limit = config.max_limit,
        static_dir = %config.static_dir.display(),
        "starting myadmin"
    );

    let app = router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;

    info!("listening on {}", listen);
    axum::serve(listener, app).await?;
    Ok(())
}
