//! Career Recommender Backend - Main Entry Point
//!
//! Starts the web API server for the career recommender.

use career_recommender::api::run_server;
use career_recommender::config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Career Recommender - survey based career suggestions");

    run_server(Config::from_env()).await
}
