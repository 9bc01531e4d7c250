//! Reply delivery through an Evolution API WhatsApp gateway.

use async_trait::async_trait;
use serde_json::json;

use crate::config::EvolutionConfig;
use crate::error::{Error, Result};

/// Delivers a reply string to the originating conversation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, destination: &str, text: &str) -> Result<()>;
}

/// Evolution API `sendText` client.
pub struct EvolutionNotifier {
    client: reqwest::Client,
    config: EvolutionConfig,
}

impl EvolutionNotifier {
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn send_text_url(&self) -> String {
        format!(
            "{}/message/sendText/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.instance
        )
    }
}

#[async_trait]
impl Notifier for EvolutionNotifier {
    async fn notify(&self, destination: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.send_text_url())
            .header("apikey", &self.config.api_key)
            .json(&json!({ "number": destination, "text": text }))
            .send()
            .await
            .map_err(|error| Error::Notify(error.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "gateway returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
