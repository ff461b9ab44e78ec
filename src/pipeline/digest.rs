//! Digest rendering.
//!
//! Two independent paths:
//! - `build()` renders one grouped message from classified reports.
//! - `render_single()` renders one report on its own from the raw feed data.
//!   It is the fallback when the grouped path fails and shares no state with it.

use chrono::NaiveTime;

use crate::feed::Deviation;
use crate::pipeline::summarize::{header_and_body, pick_variant, scope_caption};
use crate::pipeline::types::{ClassifiedReport, GROUP_ORDER, GroupSpec};

const DIGEST_TITLE: &str = "🚨 SL ALERTS";
const CRITICAL_HEADING: &str = "🔥 CRITICAL ISSUES";
const OTHER_HEADING: &str = "⚠️ OTHER ISSUES";
const SINGLE_TITLE: &str = "🚇 SL disruption";

/// Why the grouped digest could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Nothing to render")]
    Empty,

    #[error("Report {identity} ({mode}/{group}) has no digest section")]
    UngroupedItem {
        identity: String,
        mode: String,
        group: String,
    },
}

/// Signature shared by grouped renderers.
pub type DigestRenderer =
    fn(&[ClassifiedReport], &[ClassifiedReport], NaiveTime) -> Result<String, RenderError>;

/// Split into `(critical, other)`, keeping input order within each side.
pub fn partition(items: Vec<ClassifiedReport>) -> (Vec<ClassifiedReport>, Vec<ClassifiedReport>) {
    items.into_iter().partition(|item| item.is_critical)
}

fn section_for(item: &ClassifiedReport) -> Option<&'static GroupSpec> {
    GROUP_ORDER
        .iter()
        .find(|spec| spec.mode == item.transport_mode && spec.group == item.route_group)
}

fn append_groups(lines: &mut Vec<String>, items: &[ClassifiedReport]) {
    for spec in GROUP_ORDER {
        let mut group_items = items
            .iter()
            .filter(|item| item.transport_mode == spec.mode && item.route_group == spec.group)
            .peekable();
        if group_items.peek().is_none() {
            continue;
        }

        lines.push(spec.title.to_string());
        for item in group_items {
            lines.push(format!("• {}", item.translated_summary));
            lines.push(format!("  🇸🇪 {}", item.native_original));
        }
        lines.push(String::new());
    }
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
}

/// Render the grouped digest: critical section first, then the rest, each
/// grouped by route in `GROUP_ORDER`, followed by a "checked at" footer.
///
/// Output depends only on the inputs and `checked_at`.
pub fn build(
    critical: &[ClassifiedReport],
    other: &[ClassifiedReport],
    checked_at: NaiveTime,
) -> Result<String, RenderError> {
    if critical.is_empty() && other.is_empty() {
        return Err(RenderError::Empty);
    }

    if let Some(item) = critical
        .iter()
        .chain(other)
        .find(|item| section_for(item).is_none())
    {
        return Err(RenderError::UngroupedItem {
            identity: item.identity(),
            mode: item.transport_mode.clone(),
            group: item.route_group.to_string(),
        });
    }

    let mut lines = vec![DIGEST_TITLE.to_string(), String::new()];

    for (heading, items) in [(CRITICAL_HEADING, critical), (OTHER_HEADING, other)] {
        if items.is_empty() {
            continue;
        }
        lines.push(heading.to_string());
        lines.push(String::new());
        append_groups(&mut lines, items);
        lines.push(String::new());
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    lines.push(format!("🕒 Checked at: {}", checked_at.format("%H:%M")));
    Ok(lines.join("\n"))
}

/// Render one report as a standalone native-language message.
pub fn render_single(deviation: &Deviation, preferred_language: &str) -> String {
    let variant = pick_variant(deviation, preferred_language);
    let scope = scope_caption(deviation, variant);

    let mut body = format!("🧾 {}", header_and_body(variant));
    if let Some(upto) = deviation.publish_upto() {
        body.push_str(&format!("\nGäller till: {upto}"));
    }
    if let Some(link) = variant
        .and_then(|v| v.weblink.as_deref())
        .filter(|l| !l.trim().is_empty())
    {
        body.push_str(&format!("\nLink: {link}"));
    }

    format!(
        "{SINGLE_TITLE}\n{scope}\n\n{body}\n\nID: {} v{}",
        deviation.deviation_case_id, deviation.version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{AffectedLine, MessageVariant, Publish, Scope};
    use crate::pipeline::types::RouteGroup;

    fn deviation(id: i64) -> Deviation {
        Deviation {
            deviation_case_id: id,
            version: 1,
            created: String::new(),
            modified: String::new(),
            transport_mode: None,
            publish: None,
            message_variants: Vec::new(),
            scope: None,
            priority: None,
        }
    }

    fn item(id: i64, mode: &str, group: RouteGroup, critical: bool) -> ClassifiedReport {
        ClassifiedReport {
            deviation: deviation(id),
            translated_summary: format!("EN {id}"),
            native_original: format!("SV {id}"),
            is_critical: critical,
            transport_mode: mode.into(),
            route_group: group,
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn renders_critical_then_other_grouped_in_fixed_order() {
        let critical = vec![
            item(2, "TRAIN", RouteGroup::Line41, true),
            item(1, "METRO", RouteGroup::GreenLine, true),
        ];
        let other = vec![item(3, "TRAIN", RouteGroup::Line40, false)];

        let text = build(&critical, &other, at(7, 5)).unwrap();
        let expected = [
            "🚨 SL ALERTS",
            "",
            "🔥 CRITICAL ISSUES",
            "",
            "🚇 METRO – Green Line (17,18,19)",
            "• EN 1",
            "  🇸🇪 SV 1",
            "",
            "🚆 PENDELTÅG – Line 41",
            "• EN 2",
            "  🇸🇪 SV 2",
            "",
            "⚠️ OTHER ISSUES",
            "",
            "🚆 PENDELTÅG – Line 40",
            "• EN 3",
            "  🇸🇪 SV 3",
            "🕒 Checked at: 07:05",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn items_within_a_group_keep_input_order() {
        let other = vec![
            item(9, "METRO", RouteGroup::GreenLine, false),
            item(4, "METRO", RouteGroup::GreenLine, false),
        ];
        let text = build(&[], &other, at(12, 0)).unwrap();
        assert!(!text.contains("CRITICAL"));
        let first = text.find("EN 9").unwrap();
        let second = text.find("EN 4").unwrap();
        assert!(first < second);
        assert!(text.ends_with("  🇸🇪 SV 4\n🕒 Checked at: 12:00"));
    }

    #[test]
    fn build_is_deterministic() {
        let critical = vec![item(1, "METRO", RouteGroup::GreenLine, true)];
        let other = vec![item(2, "TRAIN", RouteGroup::Line40, false)];
        let a = build(&critical, &other, at(23, 59)).unwrap();
        let b = build(&critical, &other, at(23, 59)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_batch_is_a_render_error() {
        assert_eq!(build(&[], &[], at(0, 0)), Err(RenderError::Empty));
    }

    #[test]
    fn item_without_section_is_rejected() {
        let other = vec![item(5, "METRO", RouteGroup::Line40, false)];
        assert!(matches!(
            build(&[], &other, at(0, 0)),
            Err(RenderError::UngroupedItem { ref identity, .. }) if identity == "5:1"
        ));
    }

    #[test]
    fn partition_keeps_order() {
        let (critical, other) = partition(vec![
            item(1, "METRO", RouteGroup::GreenLine, false),
            item(2, "METRO", RouteGroup::GreenLine, true),
            item(3, "METRO", RouteGroup::GreenLine, false),
        ]);
        let ids = |v: &[ClassifiedReport]| v.iter().map(|i| i.deviation.deviation_case_id).collect::<Vec<_>>();
        assert_eq!(ids(&critical), vec![2]);
        assert_eq!(ids(&other), vec![1, 3]);
    }

    #[test]
    fn single_message_layout() {
        let mut d = deviation(555);
        d.version = 2;
        d.message_variants = vec![MessageVariant {
            header: "Inställd trafik".into(),
            details: "Ingen trafik mellan Slussen och Gullmarsplan.".into(),
            scope_alias: None,
            weblink: Some("https://sl.se".into()),
            language: "sv".into(),
        }];
        d.publish = Some(Publish {
            from: None,
            upto: Some("2025-01-15T01:00".into()),
        });
        d.scope = Some(Scope {
            lines: vec![AffectedLine {
                id: 17,
                designation: Some("17".into()),
                name: Some("Gröna linjen 17".into()),
                group_of_lines: None,
            }],
            stop_areas: Vec::new(),
        });

        assert_eq!(
            render_single(&d, "sv"),
            "🚇 SL disruption\nGröna linjen 17\n\n🧾 Inställd trafik\nIngen trafik mellan Slussen och Gullmarsplan.\nGäller till: 2025-01-15T01:00\nLink: https://sl.se\n\nID: 555 v2"
        );
    }

    #[test]
    fn single_message_without_variants() {
        let text = render_single(&deviation(7), "sv");
        assert_eq!(text, "🚇 SL disruption\nTunnelbana\n\n🧾 Störning\n\nID: 7 v1");
    }
}
