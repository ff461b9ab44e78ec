//! Report classifier: criticality keywords and route-group resolution.
//!
//! Everything here is pure: keyword lists are plain data handed in through
//! `CriticalityRules`, and grouping is driven by `GROUP_ORDER`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::PipelineError;
use crate::feed::Deviation;
use crate::pipeline::types::{Classification, GROUP_ORDER, RouteGroup, Summary};

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Severity keywords matched against the translated summary.
pub const DEFAULT_TRANSLATED_KEYWORDS: &[&str] =
    &["cancel", "cancelled", "suspended", "stopped", "no service"];

/// Severity keywords matched against the native (Swedish) summary.
pub const DEFAULT_NATIVE_KEYWORDS: &[&str] =
    &["inställd", "inställda", "ingen trafik", "trafiken står still"];

/// Importance levels at or below this are critical (lower = more severe).
pub const DEFAULT_CRITICAL_IMPORTANCE: i64 = 2;

/// Inputs to the criticality heuristic.
#[derive(Debug, Clone)]
pub struct CriticalityRules {
    /// Lower-case keywords searched in the translated summary.
    pub translated_keywords: Vec<String>,
    /// Lower-case keywords searched in the native summary.
    pub native_keywords: Vec<String>,
    /// Importance levels `<=` this are critical.
    pub max_critical_importance: i64,
}

impl Default for CriticalityRules {
    fn default() -> Self {
        Self {
            translated_keywords: DEFAULT_TRANSLATED_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            native_keywords: DEFAULT_NATIVE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            max_critical_importance: DEFAULT_CRITICAL_IMPORTANCE,
        }
    }
}

impl CriticalityRules {
    pub fn is_critical(
        &self,
        translated_summary: &str,
        native_summary: &str,
        importance_level: Option<i64>,
    ) -> bool {
        contains_keyword(translated_summary, &self.translated_keywords)
            || contains_keyword(native_summary, &self.native_keywords)
            || importance_level.is_some_and(|level| level <= self.max_critical_importance)
    }
}

/// Case-insensitive substring search for any keyword.
pub fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
}

/// Candidate line numbers: every line id plus every digit run embedded in
/// its short code and display name. Sorted, deduplicated.
pub fn line_numbers(deviation: &Deviation) -> Vec<i64> {
    let mut numbers = BTreeSet::new();
    for line in deviation.lines() {
        numbers.insert(line.id);
        for text in [line.designation.as_deref(), line.name.as_deref()]
            .into_iter()
            .flatten()
        {
            numbers.extend(
                DIGIT_RUN
                    .find_iter(text)
                    .filter_map(|m| m.as_str().parse::<i64>().ok()),
            );
        }
    }
    numbers.into_iter().collect()
}

/// The report's own mode tag, else `default_mode`, upper-cased.
pub fn resolve_transport_mode(deviation: &Deviation, default_mode: &str) -> String {
    deviation
        .transport_mode
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(default_mode)
        .trim()
        .to_uppercase()
}

/// First `GROUP_ORDER` row whose mode matches and whose line set intersects.
pub fn resolve_route_group(mode: &str, lines: &[i64]) -> Result<RouteGroup, PipelineError> {
    GROUP_ORDER
        .iter()
        .find(|spec| {
            spec.mode == mode
                && (spec.lines.is_empty() || spec.lines.iter().any(|l| lines.contains(l)))
        })
        .map(|spec| spec.group)
        .ok_or_else(|| PipelineError::UnmappedRoute {
            mode: mode.to_string(),
            lines: lines.to_vec(),
        })
}

/// Decides criticality, transport mode and route group for a report.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: CriticalityRules,
    default_mode: String,
}

impl Classifier {
    pub fn new(rules: CriticalityRules, default_mode: impl Into<String>) -> Self {
        Self {
            rules,
            default_mode: default_mode.into(),
        }
    }

    /// Fails with `UnmappedRoute` when no grouping rule covers the report.
    pub fn classify(
        &self,
        deviation: &Deviation,
        summary: &Summary,
    ) -> Result<Classification, PipelineError> {
        let transport_mode = resolve_transport_mode(deviation, &self.default_mode);
        let lines = line_numbers(deviation);
        let route_group = resolve_route_group(&transport_mode, &lines)?;
        let is_critical = self.rules.is_critical(
            &summary.translated_summary,
            &summary.native_summary,
            deviation.importance_level(),
        );

        debug!(
            identity = %deviation.identity(),
            mode = %transport_mode,
            group = %route_group,
            critical = is_critical,
            "Classified deviation"
        );

        Ok(Classification {
            is_critical,
            transport_mode,
            route_group,
        })
    }
}
