//! Machine translation via the public Google Translate endpoint.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TranslateError;

const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Per-request timeout for translation calls.
pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(15);

/// Maps text from one language to another. Implementations must fail rather
/// than return an empty string, so callers can fall back to the source text.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError>;
}

/// Client for the keyless `translate_a/single` endpoint.
pub struct GoogleTranslator {
    base_url: String,
    client: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self, TranslateError> {
        Self::with_base_url(TRANSLATE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(TRANSLATE_TIMEOUT)
            .build()
            .map_err(|e| TranslateError::Request(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("client", "gtx"),
                ("sl", source_language),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslateError::Timeout(TRANSLATE_TIMEOUT)
                } else {
                    TranslateError::Request(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(TranslateError::Request(format!("HTTP {}", resp.status())));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TranslateError::Malformed(e.to_string()))?;

        extract_translation(&data)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The response looks like `[[["Hello", "Hej", ...], ["world", "värld", ...]], ...]`.
pub fn extract_translation(data: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = data
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::Malformed("missing segment array".into()))?;

    let translated: String = segments
        .iter()
        .filter_map(|part| part.as_array()?.first()?.as_str())
        .filter(|s| !s.is_empty())
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Empty);
    }
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_segments() {
        let data = serde_json::json!([
            [["Cancelled traffic. ", "Inställd trafik. ", null], ["No trains.", "Inga tåg.", null]],
            null,
            "sv"
        ]);
        assert_eq!(extract_translation(&data).unwrap(), "Cancelled traffic. No trains.");
    }

    #[test]
    fn non_array_is_malformed() {
        let data = serde_json::json!({"error": "quota"});
        assert!(matches!(extract_translation(&data), Err(TranslateError::Malformed(_))));
    }

    #[test]
    fn first_element_not_array_is_malformed() {
        let data = serde_json::json!(["oops"]);
        assert!(matches!(extract_translation(&data), Err(TranslateError::Malformed(_))));
    }

    #[test]
    fn no_usable_segments_is_empty() {
        let data = serde_json::json!([[[null, "Hej"], ["", "x"], 7]]);
        assert!(matches!(extract_translation(&data), Err(TranslateError::Empty)));
    }

    #[tokio::test]
    async fn blank_input_skips_the_call() {
        // Unroutable base URL: any real request would fail.
        let translator = GoogleTranslator::with_base_url("http://127.0.0.1:9/translate").unwrap();
        let out = translator.translate("   ", "sv", "en").await.unwrap();
        assert_eq!(out, "   ");
    }
}
