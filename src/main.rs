use anyhow::Result;
use dotenvy::dotenv;
use tracing::{info, warn};

mod config;
mod llm;
mod studio;
mod ui;
mod utils;

use config::Config;
use llm::GeminiClient;
use studio::prompts::UNCONFIGURED_ERROR;
use studio::session::Session;
use utils::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config.log_dir, &config.log_level);

    info!(
        "Starting tattoo studio (image_model={}, text_model={}, enrich_generations={})",
        config.gemini_image_model, config.gemini_text_model, config.enrich_generations
    );

    if let Err(err) = config.require_api_key() {
        warn!("{}; every request will fail until it is configured", err);
        println!("{UNCONFIGURED_ERROR}\n");
    }

    let client = GeminiClient::new(&config);
    let mut session = Session::new(client, config.enrich_generations);
    ui::repl::run(&mut session, &config.render_dir).await
}
