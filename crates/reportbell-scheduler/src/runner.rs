//! The scheduler loop — single logical task, clock-driven.
//!
//! One tick per minute against the fixed local timezone. An exact HH:MM
//! match fires the corresponding engine action once; minute zero emits a
//! heartbeat. An error from an action is caught here, logged, and followed
//! by a fixed backoff — the loop itself never dies from a failed action.

use chrono::{FixedOffset, Timelike, Utc};
use reportbell_notify::Notifier;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::engine::ReportEngine;
use crate::triggers::{Schedule, TriggerKind};

const TICK_SECS: u64 = 60;

/// Run the trigger loop until the shutdown channel flips.
pub async fn run_loop<N: Notifier>(
    engine: &ReportEngine<N>,
    schedule: &Schedule,
    offset: FixedOffset,
    error_backoff: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("⏰ Scheduler loop started (tick every {TICK_SECS}s)");
    tracing::info!(
        "📅 Next trigger: {}",
        schedule.describe_next(Utc::now().with_timezone(&offset))
    );

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(TICK_SECS));
    // Delay instead of bursting after a stall — a burst of catch-up ticks
    // inside one minute would break at-most-once-per-day firing.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now().with_timezone(&offset);

                if let Some(kind) = schedule.due(now.time()) {
                    tracing::info!("🔔 Trigger fired: {kind} at {}", now.format("%H:%M"));
                    let result = match kind {
                        TriggerKind::DailyForm => engine.post_daily_form().await,
                        TriggerKind::Reminder => engine.send_reminders().await,
                        TriggerKind::StatusReport => engine.post_status_report().await,
                    };
                    if let Err(e) = result {
                        tracing::error!("❌ Scheduler action failed: {e}");
                        if backoff_or_shutdown(error_backoff, &mut shutdown).await {
                            tracing::info!("🛑 Scheduler loop stopping");
                            return;
                        }
                    }
                }

                if now.minute() == 0 {
                    tracing::info!("🕐 Bot running — next: {}", schedule.describe_next(now));
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("🛑 Scheduler loop stopping");
                return;
            }
        }
    }
}

/// Wait out the post-error backoff, unless shutdown arrives first.
/// Returns true when shutdown was requested during the wait.
async fn backoff_or_shutdown(
    backoff: std::time::Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(backoff) => false,
        _ = shutdown.changed() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportbell_core::config::ScheduleConfig;
    use reportbell_store::ReportStore;
    use std::sync::Arc;

    struct NullNotifier;

    #[async_trait::async_trait]
    impl Notifier for NullNotifier {
        async fn send(&self, _text: &str, _blocks: Option<serde_json::Value>) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn backoff_aborts_promptly_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        let start = tokio::time::Instant::now();
        assert!(backoff_or_shutdown(std::time::Duration::from_secs(60), &mut rx).await);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn backoff_runs_to_completion_without_shutdown() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!backoff_or_shutdown(std::time::Duration::from_millis(10), &mut rx).await);
    }

    #[tokio::test]
    async fn loop_exits_on_shutdown_signal() {
        let store = Arc::new(ReportStore::open_in_memory().unwrap());
        let offset = FixedOffset::east_opt(330 * 60).unwrap();
        let engine = ReportEngine::new(store, NullNotifier, offset, "8:00 AM");
        let schedule = Schedule::from_config(&ScheduleConfig::default()).unwrap();
        let (tx, rx) = watch::channel(false);

        let handle = async {
            run_loop(
                &engine,
                &schedule,
                offset,
                std::time::Duration::from_secs(1),
                rx,
            )
            .await
        };
        tx.send(true).unwrap();
        // Must return promptly rather than waiting a full tick
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("loop did not stop on shutdown");
    }
}
