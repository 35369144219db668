mod api_doc;
mod auth;
mod error;
mod handlers;
mod middleware;
mod services;
mod setup;
mod state;

use docvault_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load .env in development; ignored when the file is absent.
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
