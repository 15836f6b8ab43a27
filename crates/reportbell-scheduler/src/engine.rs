//! Reconciliation engine — the three scheduled actions.
//!
//! Each action is a pure function of live store state at invocation time:
//! fetch, reconcile, format, send. No caching, no deduplication, no retries.
//! Store failures degrade to an empty set so a broken query turns into
//! "nothing to report" instead of a dead loop iteration.

use chrono::{DateTime, FixedOffset, Utc};
use reportbell_core::error::Result;
use reportbell_notify::Notifier;
use reportbell_store::{DayWindow, ReportStore, Submission};
use std::collections::HashSet;
use std::sync::Arc;

use crate::messages;
use crate::messages::StatusSummary;

/// The reconciliation engine. Generic over the notifier seam so tests can
/// record deliveries instead of hitting Slack.
pub struct ReportEngine<N: Notifier> {
    store: Arc<ReportStore>,
    notifier: N,
    offset: FixedOffset,
    deadline_text: String,
}

impl<N: Notifier> ReportEngine<N> {
    pub fn new(store: Arc<ReportStore>, notifier: N, offset: FixedOffset, deadline_text: &str) -> Self {
        Self {
            store,
            notifier,
            offset,
            deadline_text: deadline_text.to_string(),
        }
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    fn today_window(&self) -> DayWindow {
        DayWindow::for_local_date(self.now_local())
    }

    // Degrading fetch helpers — a query error is logged and becomes empty.

    fn responsible(&self) -> Vec<String> {
        self.store.responsible_users().unwrap_or_else(|e| {
            tracing::warn!("⚠️ Failed to query responsible users: {e}");
            Vec::new()
        })
    }

    fn submitters_today(&self) -> Vec<String> {
        self.store
            .submitters_on(&self.today_window())
            .unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to query today's submitters: {e}");
                Vec::new()
            })
    }

    fn submissions_today(&self) -> Vec<Submission> {
        self.store
            .submissions_on(&self.today_window())
            .unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to query today's submissions: {e}");
                Vec::new()
            })
    }

    /// Post the daily report form, tagging every responsible user.
    /// Always posts — no precondition on the missing set.
    pub async fn post_daily_form(&self) -> Result<()> {
        tracing::info!("📝 Posting daily form");
        let responsible = self.responsible();
        let date = self.now_local().format("%Y-%m-%d").to_string();
        let (text, blocks) = messages::daily_form(&date, &responsible);

        if self.notifier.send(&text, Some(blocks)).await {
            tracing::info!("✅ Daily form posted ({} responsible)", responsible.len());
        } else {
            tracing::warn!("❌ Failed to post daily form");
        }
        Ok(())
    }

    /// Remind exactly the users with no submission today. No-op when
    /// everyone has submitted — the only conditional branch in the three
    /// actions.
    pub async fn send_reminders(&self) -> Result<()> {
        tracing::info!("🔔 Starting reminder check");
        let responsible = self.responsible();
        let submitted: HashSet<String> = self.submitters_today().into_iter().collect();
        let missing: Vec<String> = responsible
            .into_iter()
            .filter(|user| !submitted.contains(user))
            .collect();

        if missing.is_empty() {
            tracing::info!("✅ All reports submitted. No reminder needed.");
            return Ok(());
        }

        let text = messages::reminder(&missing, &self.deadline_text);
        if self.notifier.send(&text, None).await {
            tracing::info!("✅ Reminder sent to {} users", missing.len());
        } else {
            tracing::warn!("❌ Failed to send reminder");
        }
        Ok(())
    }

    /// Post the completion status: counters plus one line per submission of
    /// the day, newest first.
    pub async fn post_status_report(&self) -> Result<()> {
        tracing::info!("📊 Posting status report");
        let responsible = self.responsible();
        let submissions = self.submissions_today();
        let distinct_submitters: HashSet<&str> =
            submissions.iter().map(|s| s.user_id.as_str()).collect();

        let summary = StatusSummary::compute(responsible.len(), distinct_submitters.len());
        let date = self.now_local().format("%Y-%m-%d").to_string();
        let text = messages::status_report(&date, &summary, &submissions, self.offset);

        if self.notifier.send(&text, None).await {
            tracing::info!(
                "✅ Status report posted ({}/{} submitted)",
                summary.submitted,
                summary.total
            );
        } else {
            tracing::warn!("❌ Failed to post status report");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every delivery attempt; configurable success flag.
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, Option<serde_json::Value>)>>,
        succeed: bool,
    }

    impl RecordingNotifier {
        fn new(succeed: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                succeed,
            }
        }

        fn sent(&self) -> Vec<(String, Option<serde_json::Value>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str, blocks: Option<serde_json::Value>) -> bool {
            self.sent.lock().unwrap().push((text.to_string(), blocks));
            self.succeed
        }
    }

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn engine_with(
        seeds: &[(&str, &str)],
        submitted: &[(&str, &str)],
        succeed: bool,
    ) -> ReportEngine<RecordingNotifier> {
        let store = Arc::new(ReportStore::open_in_memory().unwrap());
        let pairs: Vec<(String, String)> = seeds
            .iter()
            .map(|(l, u)| (l.to_string(), u.to_string()))
            .collect();
        store.seed_assignments(&pairs).unwrap();
        for (user, location) in submitted {
            store.record_submission(user, location, None, "done").unwrap();
        }
        ReportEngine::new(store, RecordingNotifier::new(succeed), ist(), "8:00 AM")
    }

    #[tokio::test]
    async fn daily_form_tags_all_responsible_and_always_posts() {
        let engine = engine_with(
            &[("Main Canteen", "U1"), ("North Block", "U2")],
            &[("U1", "Main Canteen"), ("U2", "North Block")],
            true,
        );
        engine.post_daily_form().await.unwrap();
        let sent = engine.notifier.sent();
        assert_eq!(sent.len(), 1);
        let blocks = sent[0].1.as_ref().unwrap();
        let section = blocks[0]["text"]["text"].as_str().unwrap();
        assert!(section.contains("<@U1>"));
        assert!(section.contains("<@U2>"));
    }

    #[tokio::test]
    async fn reminder_targets_exactly_the_missing_set() {
        let engine = engine_with(
            &[("A", "U1"), ("B", "U2"), ("C", "U3")],
            &[("U1", "A")],
            true,
        );
        engine.send_reminders().await.unwrap();
        let sent = engine.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("<@U2>"));
        assert!(sent[0].0.contains("<@U3>"));
        assert!(!sent[0].0.contains("<@U1>"));
    }

    #[tokio::test]
    async fn reminder_is_noop_when_nobody_is_missing() {
        let engine = engine_with(&[("A", "U1")], &[("U1", "A")], true);
        engine.send_reminders().await.unwrap();
        assert!(engine.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn reminder_with_no_assignments_is_noop() {
        let engine = engine_with(&[], &[], true);
        engine.send_reminders().await.unwrap();
        assert!(engine.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn status_report_counts_distinct_submitters() {
        // U1 filed twice; submitted must still be 1
        let engine = engine_with(
            &[("A", "U1"), ("B", "U2"), ("C", "U1")],
            &[("U1", "A"), ("U1", "C")],
            true,
        );
        engine.post_status_report().await.unwrap();
        let sent = engine.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("*Reports Submitted:* 1"));
        assert!(sent[0].0.contains("*Missing Reports:* 1"));
        // Both rows still show up as detail lines
        assert_eq!(sent[0].0.matches("<@U1>").count(), 2);
    }

    #[tokio::test]
    async fn status_report_with_empty_store_has_zero_rate() {
        let engine = engine_with(&[], &[], true);
        engine.post_status_report().await.unwrap();
        let sent = engine.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("*Total Responsible:* 0"));
        assert!(sent[0].0.contains("*Completion Rate:* 0.0%"));
        assert!(!sent[0].0.contains("Today's Submissions"));
    }

    #[tokio::test]
    async fn repeated_invocation_attempts_delivery_twice() {
        // Fire-and-forget: no deduplication across calls
        let engine = engine_with(&[("A", "U1")], &[], true);
        engine.post_daily_form().await.unwrap();
        engine.post_daily_form().await.unwrap();
        assert_eq!(engine.notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_propagate() {
        let engine = engine_with(&[("A", "U1")], &[], false);
        assert!(engine.post_daily_form().await.is_ok());
        assert!(engine.send_reminders().await.is_ok());
        assert!(engine.post_status_report().await.is_ok());
        // All three attempted delivery despite failures
        assert_eq!(engine.notifier.sent().len(), 3);
    }
}
