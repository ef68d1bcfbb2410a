//! Language detection and normalization (LibreTranslate-compatible)
//!
//! Both operations are best-effort by contract: detection defaults to English
//! and translation falls back to the input unchanged, so a dead translation
//! service never blocks the answer pipeline.

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::config::TranslationConfig;
use crate::errors::ResumeRagError;
use crate::errors::Result;

/// Language code used when detection is unavailable or fails.
pub const DEFAULT_LANGUAGE: &str = "en";

pub struct Translator {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl Translator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ResumeRagError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Detect the language of `text`, defaulting to `"en"` on any failure.
    pub async fn detect(&self, text: &str) -> String {
        match self.try_detect(text).await {
            Ok(code) => code,
            Err(e) => {
                warn!("Language detection failed, assuming English: {}", e);
                DEFAULT_LANGUAGE.to_string()
            }
        }
    }

    /// Translate `text` to English, returning it unchanged on any failure.
    pub async fn to_english(&self, text: &str) -> String {
        match self.try_translate(text).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation failed, using original text: {}", e);
                text.to_string()
            }
        }
    }

    async fn try_detect(&self, text: &str) -> Result<String> {
        #[derive(Serialize)]
        struct DetectRequest<'a> {
            q: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            api_key: Option<&'a str>,
        }

        #[derive(Deserialize)]
        struct Detection {
            language: String,
        }

        let url = format!("{}/detect", self.endpoint);
        debug!("Calling language detection API: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&DetectRequest {
                q: text,
                api_key: self.api_key.as_deref(),
            })
            .send()
            .await
            .map_err(|e| ResumeRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ResumeRagError::Http(format!(
                "Detection API error: {}",
                response.status()
            )));
        }

        let detections: Vec<Detection> = response
            .json()
            .await
            .map_err(|e| ResumeRagError::Http(e.to_string()))?;

        detections
            .into_iter()
            .next()
            .map(|d| d.language)
            .ok_or_else(|| ResumeRagError::Http("No detection in response".to_string()))
    }

    async fn try_translate(&self, text: &str) -> Result<String> {
        #[derive(Serialize)]
        struct TranslateRequest<'a> {
            q: &'a str,
            source: &'a str,
            target: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            api_key: Option<&'a str>,
        }

        #[derive(Deserialize)]
        struct TranslateResponse {
            #[serde(rename = "translatedText")]
            translated_text: String,
        }

        let url = format!("{}/translate", self.endpoint);
        debug!("Calling translation API: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&TranslateRequest {
                q: text,
                source: "auto",
                target: "en",
                api_key: self.api_key.as_deref(),
            })
            .send()
            .await
            .map_err(|e| ResumeRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ResumeRagError::Http(format!(
                "Translation API error: {}",
                response.status()
            )));
        }

        let result: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ResumeRagError::Http(e.to_string()))?;

        Ok(result.translated_text)
    }
}
