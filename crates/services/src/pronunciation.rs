use async_trait::async_trait;
use reqwest::Client;

use crate::error::PronunciationError;

/// Produces spoken audio for an answer.
///
/// Consumed by front ends only; scoring never depends on it.
#[async_trait]
pub trait Pronouncer: Send + Sync {
    /// MP3 bytes for `text`, or `None` if audio could not be produced.
    async fn pronounce(&self, text: &str) -> Option<Vec<u8>>;
}

/// Pronouncer used when no text-to-speech endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPronouncer;

#[async_trait]
impl Pronouncer for SilentPronouncer {
    async fn pronounce(&self, _text: &str) -> Option<Vec<u8>> {
        None
    }
}

#[derive(Clone, Debug)]
pub struct PronunciationConfig {
    /// GET endpoint taking `q` (text) and `tl` (language) query parameters.
    pub endpoint: String,
    pub language: String,
}

impl PronunciationConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            language: "fr".into(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Fetches MP3 audio from an HTTP text-to-speech endpoint.
#[derive(Clone)]
pub struct HttpPronouncer {
    client: Client,
    config: PronunciationConfig,
}

impl HttpPronouncer {
    #[must_use]
    pub fn new(config: PronunciationConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn fetch(&self, text: &str) -> Result<Vec<u8>, PronunciationError> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.config.language.as_str()),
                ("q", text),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PronunciationError::HttpStatus(response.status()));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(PronunciationError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Pronouncer for HttpPronouncer {
    async fn pronounce(&self, text: &str) -> Option<Vec<u8>> {
        match self.fetch(text).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                tracing::warn!(error = %e, "could not generate pronunciation audio");
                None
            }
        }
    }
}
