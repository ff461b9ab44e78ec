//! Shared types for the alert pipeline.

use std::fmt;

use serde::Serialize;

use crate::feed::Deviation;

// ── Route groups ────────────────────────────────────────────────────

/// A named bucket of affected routes; digest sections are clustered by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RouteGroup {
    GreenLine,
    Line40,
    Line41,
}

impl RouteGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::GreenLine => "Green Line (17,18,19)",
            Self::Line40 => "Line 40",
            Self::Line41 => "Line 41",
        }
    }
}

impl fmt::Display for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the grouping table.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    /// Upper-case transport mode this row applies to.
    pub mode: &'static str,
    pub group: RouteGroup,
    /// Any of these lines selects the row. Empty matches every line set.
    pub lines: &'static [i64],
    /// Digest section heading.
    pub title: &'static str,
}

/// Grouping rules in digest priority order. Resolution takes the first
/// matching row, and the digest emits sections in this order.
pub const GROUP_ORDER: &[GroupSpec] = &[
    GroupSpec {
        mode: "METRO",
        group: RouteGroup::GreenLine,
        lines: &[],
        title: "🚇 METRO – Green Line (17,18,19)",
    },
    GroupSpec {
        mode: "TRAIN",
        group: RouteGroup::Line40,
        lines: &[40],
        title: "🚆 PENDELTÅG – Line 40",
    },
    GroupSpec {
        mode: "TRAIN",
        group: RouteGroup::Line41,
        lines: &[41],
        title: "🚆 PENDELTÅG – Line 41",
    },
];

// ── Enrichment results ──────────────────────────────────────────────

/// Bilingual text derived from one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Header, body, valid-until and link lines in the native language.
    pub native_original: String,
    /// Header and body only. Fed to translation and keyword scanning.
    pub native_summary: String,
    /// Target-language header and body, or `native_summary` when translation failed.
    pub translated_summary: String,
}

/// Classifier verdict for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_critical: bool,
    pub transport_mode: String,
    pub route_group: RouteGroup,
}

/// A report plus everything derived from it during one cycle. Never persisted.
#[derive(Debug, Clone)]
pub struct ClassifiedReport {
    pub deviation: Deviation,
    pub translated_summary: String,
    pub native_original: String,
    pub is_critical: bool,
    pub transport_mode: String,
    pub route_group: RouteGroup,
}

impl ClassifiedReport {
    pub fn new(deviation: Deviation, summary: Summary, classification: Classification) -> Self {
        Self {
            deviation,
            translated_summary: summary.translated_summary,
            native_original: summary.native_original,
            is_critical: classification.is_critical,
            transport_mode: classification.transport_mode,
            route_group: classification.route_group,
        }
    }

    pub fn identity(&self) -> String {
        self.deviation.identity()
    }
}

// ── Cycle bookkeeping ───────────────────────────────────────────────

/// Phases of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Filtering,
    Enriching,
    Rendering,
    Sending,
    Recording,
}

/// How the batch was delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Delivery {
    /// One grouped digest.
    Grouped,
    /// One message per report, after the grouped attempt failed.
    Fallback { reason: String },
}

/// Counts for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub novel: usize,
    /// Reports dropped because no grouping rule covers them.
    pub unmapped: usize,
    /// Successful chat sends.
    pub sent: usize,
    /// Identities written to the ledger.
    pub recorded: usize,
    /// Last phase reached before returning to idle.
    pub ended_in: Option<CyclePhase>,
    pub delivery: Option<Delivery>,
}

/// Result of asking for a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Ran(CycleReport),
    /// Another cycle was already in flight.
    Skipped,
    /// The cycle aborted at top level (e.g. the feed was unreachable).
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_order_is_metro_then_trains_ascending() {
        let groups: Vec<RouteGroup> = GROUP_ORDER.iter().map(|g| g.group).collect();
        assert_eq!(
            groups,
            vec![RouteGroup::GreenLine, RouteGroup::Line40, RouteGroup::Line41]
        );
    }

    #[test]
    fn delivery_serializes_with_mode_tag() {
        let json = serde_json::to_value(Delivery::Fallback {
            reason: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["mode"], "fallback");
        assert_eq!(json["reason"], "boom");
    }

    #[test]
    fn report_serializes_phase_in_snake_case() {
        let report = CycleReport {
            ended_in: Some(CyclePhase::Filtering),
            ..Default::default()
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["ended_in"], "filtering");
    }
}
