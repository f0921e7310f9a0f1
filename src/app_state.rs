use std::sync::Arc;
use crate::{config::AppConfig, llm::ChatClient};

/// Estado compartido de sólo lectura: se construye una vez al arrancar.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chat: ChatClient,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let chat = ChatClient::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            chat,
        })
    }
}
