use std::sync::Arc;

use tokio::net::TcpListener;

use rialto::rest::Cache;
use rialto::{AppState, Config, Logger, MemoryStore, WikiError, app};

#[tokio::main]
async fn main() -> Result<(), WikiError> {
    if let Err(e) = Logger::init() {
        eprintln!("Failed to initialise logger: {}", e);
    }

    let config = Config::from_env();
    if !config.theme_dir.is_dir() {
        log::error!("Theme directory {:?} does not exist", config.theme_dir);
        return Err(WikiError::template(&config.layout, "theme directory missing"));
    }

    let state = AppState::build(&config, Arc::new(MemoryStore::new()), Cache::in_memory())?;

    let addr = config.socket_addr();
    log::info!("Wiki listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await.map_err(WikiError::from)
}
