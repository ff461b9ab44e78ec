//! Report model as delivered by the deviations feed.

use serde::{Deserialize, Serialize};

/// One disruption report. Identified by `(deviation_case_id, version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
    pub deviation_case_id: i64,
    /// Incremented by upstream whenever the report is revised.
    pub version: i64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<Publish>,
    #[serde(default)]
    pub message_variants: Vec<MessageVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Deviation {
    /// Ledger key for this exact revision.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.deviation_case_id, self.version)
    }

    /// Affected lines, empty when the report carries no scope.
    pub fn lines(&self) -> &[AffectedLine] {
        self.scope.as_ref().map(|s| s.lines.as_slice()).unwrap_or(&[])
    }

    /// Publish-until timestamp, if any.
    pub fn publish_upto(&self) -> Option<&str> {
        self.publish
            .as_ref()
            .and_then(|p| p.upto.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn importance_level(&self) -> Option<i64> {
        self.priority.as_ref().and_then(|p| p.importance_level)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Publish {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upto: Option<String>,
}

/// A localized rendering of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageVariant {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub details: String,
    /// Caption override for the affected scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weblink: Option<String>,
    /// Language tag, e.g. "sv" or "en".
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub lines: Vec<AffectedLine>,
    #[serde(default)]
    pub stop_areas: Vec<StopArea>,
}

/// An affected route descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedLine {
    pub id: i64,
    /// Short code, e.g. "17" or "40".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    /// Display name, e.g. "Gröna linjen 17".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Line-group phrase, e.g. "tunnelbanans gröna linje".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_of_lines: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopArea {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Lower `importance_level` means more severe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_level: Option<i64>,
}
