/// vc-trust - verifiable credential issuer and verifier service

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vc_trust::{config::DEFAULT_LOG_FILTER, server, AppContext, ServerConfig, VcResult};

#[tokio::main]
async fn main() -> VcResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();
    tracing::info!("Log filter: {}", config.logging.level);

    // Create application context; fails on unreadable keys
    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  __   _____    _______ ___ _   _ ___ _____
  \ \ / / __|__|_   _| _ \ | | / __|_   _|
   \ V / (_|___| | | |   / |_| \__ \ | |
    \_/ \___|    |_| |_|_\\___/|___/ |_|

        Verifiable Credential Trust Service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
