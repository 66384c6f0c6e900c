use dotenv::dotenv;
use entity_app::{AppProperties, AppResult, app, wiring};
use error_stack::fmt::ColorMode;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    match try_main().await {
        Ok(_) => info!("entity service shutting down"),
        Err(e) => {
            error!("entity service exited with error: {e:?}");
        }
    }
}

fn init_logging() {
    error_stack::Report::set_color_mode(ColorMode::None);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("ENTITY_LOG"))
        .init();
}

async fn try_main() -> AppResult<()> {
    init_logging();

    if let Err(e) = dotenv() {
        warn!("failed to load .env file: {e}");
    }

    let properties = AppProperties::from_env()?;
    let routes = wiring::build_routes()?;

    app::run(routes, properties).await
}
