use crate::config::Config;
use crate::error::AppError;
use crate::gemini::{ChatTurn, GeminiClient};
use crate::live::LiveSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gemini: GeminiClient,
    /// Fully-formed live endpoint URL (path plus key query parameter)
    pub live_url: String,
    /// Live sessions by id; entries outlive the conversation so transcripts
    /// stay queryable until the process exits
    pub sessions: Arc<RwLock<HashMap<String, Arc<LiveSession>>>>,
    /// In-memory chat histories by chat id
    pub chats: Arc<RwLock<HashMap<String, Vec<ChatTurn>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let gemini = GeminiClient::new(&config.gemini)?;
        let live_url = format!("{}?key={}", config.gemini.live_url, config.gemini.api_key()?);

        Ok(Self {
            config: Arc::new(config),
            gemini,
            live_url,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            chats: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}
