//! Bilingual report summaries with a degrade-to-native translation path.

use std::sync::Arc;

use tracing::warn;

use crate::feed::{Deviation, MessageVariant};
use crate::pipeline::types::Summary;
use crate::translate::Translator;

/// Language tag of the feed's native variant.
pub const NATIVE_LANGUAGE: &str = "sv";

/// Header used when a report has no message variant at all.
pub const FALLBACK_HEADER: &str = "Störning";

/// Caption used when a report names no affected routes.
pub const GENERIC_CAPTION: &str = "Tunnelbana";

/// Native variant, else the preferred-language variant, else the first one.
pub fn pick_variant<'a>(deviation: &'a Deviation, preferred_language: &str) -> Option<&'a MessageVariant> {
    variant_for(deviation, NATIVE_LANGUAGE)
        .or_else(|| variant_for(deviation, preferred_language))
        .or_else(|| deviation.message_variants.first())
}

/// The variant tagged exactly `language`, if any.
pub fn variant_for<'a>(deviation: &'a Deviation, language: &str) -> Option<&'a MessageVariant> {
    deviation
        .message_variants
        .iter()
        .find(|v| v.language == language)
}

fn join_nonempty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Header and body of a variant, trimmed.
pub fn header_and_body(variant: Option<&MessageVariant>) -> String {
    match variant {
        Some(v) => join_nonempty([v.header.as_str(), v.details.as_str()]),
        None => FALLBACK_HEADER.to_string(),
    }
}

/// Header, body, then the valid-until and link lines when present.
pub fn native_original(deviation: &Deviation, variant: Option<&MessageVariant>) -> String {
    let upto = deviation.publish_upto().map(|u| format!("Gäller till: {u}"));
    let link = variant
        .and_then(|v| v.weblink.as_deref())
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!("Link: {l}"));

    let body = header_and_body(variant);
    join_nonempty(
        [Some(body.as_str()), upto.as_deref(), link.as_deref()]
            .into_iter()
            .flatten(),
    )
}

/// Caption for the affected scope: the variant's override, else every
/// affected line's most descriptive name, else a generic label.
pub fn scope_caption(deviation: &Deviation, variant: Option<&MessageVariant>) -> String {
    if let Some(alias) = variant
        .and_then(|v| v.scope_alias.as_deref())
        .filter(|a| !a.trim().is_empty())
    {
        return alias.trim().to_string();
    }

    let lines = deviation.lines();
    if lines.is_empty() {
        return GENERIC_CAPTION.to_string();
    }

    lines
        .iter()
        .map(|l| {
            [l.group_of_lines.as_deref(), l.name.as_deref(), l.designation.as_deref()]
                .into_iter()
                .flatten()
                .find(|s| !s.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| l.id.to_string())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Produces `Summary` values, calling the translator only when the report
/// has no variant in the target language.
pub struct Summarizer {
    translator: Arc<dyn Translator>,
    preferred_language: String,
    target_language: String,
}

impl Summarizer {
    pub fn new(
        translator: Arc<dyn Translator>,
        preferred_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            preferred_language: preferred_language.into(),
            target_language: target_language.into(),
        }
    }

    /// Never fails: translation errors degrade to the native summary.
    pub async fn summarize(&self, deviation: &Deviation) -> Summary {
        let variant = pick_variant(deviation, &self.preferred_language);
        let native_summary = header_and_body(variant);
        let native_original = native_original(deviation, variant);

        let translated_summary = match variant_for(deviation, &self.target_language) {
            Some(target) => header_and_body(Some(target)),
            None => {
                let source = variant.map(|v| v.language.as_str()).unwrap_or(NATIVE_LANGUAGE);
                match self
                    .translator
                    .translate(&native_summary, source, &self.target_language)
                    .await
                {
                    Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                    Ok(_) => {
                        warn!(identity = %deviation.identity(), "Translation came back empty, using native text");
                        native_summary.clone()
                    }
                    Err(e) => {
                        warn!(identity = %deviation.identity(), error = %e, "Translation failed, using native text");
                        native_summary.clone()
                    }
                }
            }
        };

        Summary {
            native_original,
            native_summary,
            translated_summary,
        }
    }
}
