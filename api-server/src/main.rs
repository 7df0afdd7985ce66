mod api;
mod models;
mod validation;

use log::info;
use models::config::Config;
use models::context::{Context, ContextPointer};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::sync::Arc;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    TermLogger::init(
        config.level_filter(),
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let context: ContextPointer = Arc::new(Context::new(config));
    context.start_background_tasks().await;
    info!(
        "Started {} background tasks (log level: {})",
        context.running_tasks().await,
        context.config().log_level()
    );

    info!("Available endpoints:");
    info!("  GET    /health              - Health check");
    info!("  GET    /users/<id>          - Get user by ID");
    info!("  POST   /users               - Create new user");
    info!("  GET    /cache/stats         - Get cache statistics");
    info!("  DELETE /cache               - Clear entire cache");

    api::mount(rocket::build(), context).launch().await?;

    info!("Server stopped");
    Ok(())
}
