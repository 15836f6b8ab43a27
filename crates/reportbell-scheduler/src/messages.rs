//! Message formatting — pure functions, decoupled from delivery.
//! A builder must never fail even when the send that follows it does.

use chrono::{FixedOffset, NaiveDateTime};
use reportbell_store::Submission;

/// Slack mention markup for a user ID.
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

fn mention_list(user_ids: &[String]) -> String {
    user_ids
        .iter()
        .map(|id| mention(id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The daily form post: fallback text plus Block Kit blocks with a
/// "Fill Report" button.
pub fn daily_form(date: &str, responsible: &[String]) -> (String, serde_json::Value) {
    let text = format!("🍽️ *Daily Report Form - {date}*");
    let tags = mention_list(responsible);
    let blocks = serde_json::json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "Good morning! Please submit your report for today.\n\n*Responsible Members:* {tags}"
                )
            }
        },
        {
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "text": {"type": "plain_text", "text": "Fill Report"},
                    "style": "primary",
                    "action_id": "open_report_form_button"
                }
            ]
        }
    ]);
    (text, blocks)
}

/// The reminder message, tagging exactly the missing users.
pub fn reminder(missing: &[String], deadline_text: &str) -> String {
    format!(
        "🔔 *Reminder!* The following members have not submitted their report. \
         Submissions close at {deadline_text}.\n{}",
        mention_list(missing)
    )
}

/// Daily completion counters for the status report.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSummary {
    pub total: usize,
    pub submitted: usize,
    pub missing: usize,
    pub completion_rate: f64,
}

impl StatusSummary {
    /// `submitted` counts distinct submitters, never raw submission rows.
    /// Rate is defined as 0% when nobody is responsible.
    pub fn compute(total: usize, submitted: usize) -> Self {
        let completion_rate = if total == 0 {
            0.0
        } else {
            submitted as f64 / total as f64 * 100.0
        };
        Self {
            total,
            submitted,
            missing: total.saturating_sub(submitted),
            completion_rate,
        }
    }
}

/// The status report: counters plus one detail line per submission of the
/// day (already ordered newest first by the store).
pub fn status_report(
    date: &str,
    summary: &StatusSummary,
    submissions: &[Submission],
    offset: FixedOffset,
) -> String {
    let mut text = format!("📊 *Daily Report Status - {date}*\n\n");
    text.push_str(&format!("• *Total Responsible:* {}\n", summary.total));
    text.push_str(&format!("• *Reports Submitted:* {}\n", summary.submitted));
    text.push_str(&format!("• *Missing Reports:* {}\n", summary.missing));
    text.push_str(&format!(
        "• *Completion Rate:* {:.1}%",
        summary.completion_rate
    ));

    if !submissions.is_empty() {
        text.push_str("\n\n📝 *Today's Submissions:*\n");
        for sub in submissions {
            text.push_str(&format!(
                "• {} - {} ({})\n",
                mention(&sub.user_id),
                sub.location_name,
                local_minute(&sub.submitted_at, offset)
            ));
        }
    }
    text
}

/// Render a stored UTC timestamp as local time truncated to the minute.
/// Falls back to the raw prefix if the stored text does not parse.
fn local_minute(submitted_at: &str, offset: FixedOffset) -> String {
    match NaiveDateTime::parse_from_str(submitted_at, "%Y-%m-%d %H:%M:%S") {
        Ok(utc) => (utc + chrono::Duration::seconds(i64::from(offset.local_minus_utc())))
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => submitted_at.chars().take(16).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn daily_form_tags_every_responsible_user() {
        let (text, blocks) = daily_form("2026-03-10", &["U1".into(), "U2".into()]);
        assert!(text.contains("2026-03-10"));
        let section = blocks[0]["text"]["text"].as_str().unwrap();
        assert!(section.contains("<@U1> <@U2>"));
        assert_eq!(blocks[1]["elements"][0]["action_id"], "open_report_form_button");
    }

    #[test]
    fn reminder_tags_exactly_the_missing_set() {
        let text = reminder(&["U2".into(), "U3".into()], "8:00 AM");
        assert!(text.contains("<@U2> <@U3>"));
        assert!(!text.contains("<@U1>"));
        assert!(text.contains("8:00 AM"));
    }

    #[test]
    fn summary_handles_zero_responsible() {
        let summary = StatusSummary::compute(0, 0);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.missing, 0);
        assert_eq!(summary.completion_rate, 0.0);
    }

    #[test]
    fn summary_computes_rate_and_missing() {
        let summary = StatusSummary::compute(3, 1);
        assert_eq!(summary.missing, 2);
        assert!((summary.completion_rate - 33.333).abs() < 0.01);
    }

    #[test]
    fn summary_never_goes_negative_on_overcount() {
        // More submitters than responsible can happen with stale assignments
        let summary = StatusSummary::compute(1, 2);
        assert_eq!(summary.missing, 0);
    }

    #[test]
    fn status_report_lists_submissions_with_local_time() {
        let subs = vec![Submission {
            user_id: "U1".into(),
            location_name: "Main Canteen".into(),
            image_url: None,
            report_text: "ok".into(),
            submitted_at: "2026-03-10 01:30:00".into(),
        }];
        let text = status_report("2026-03-10", &StatusSummary::compute(2, 1), &subs, ist());
        assert!(text.contains("*Total Responsible:* 2"));
        assert!(text.contains("*Completion Rate:* 50.0%"));
        // 01:30 UTC = 07:00 IST
        assert!(text.contains("<@U1> - Main Canteen (2026-03-10 07:00)"));
    }

    #[test]
    fn status_report_omits_detail_section_when_empty() {
        let text = status_report("2026-03-10", &StatusSummary::compute(0, 0), &[], ist());
        assert!(!text.contains("Today's Submissions"));
        assert!(text.contains("*Completion Rate:* 0.0%"));
    }
}
