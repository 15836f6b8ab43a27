//! # Reportbell Scheduler
//!
//! The reconciliation engine and the clock-driven trigger loop — the only
//! logic-bearing part of the bot.
//!
//! ## Architecture
//! ```text
//! Loop (tokio interval, 60s tick, fixed local timezone)
//!   ├── 00:01 → post_daily_form     (tag all responsible users)
//!   ├── 07:00 → send_reminders      (tag Missing = Responsible − Submitted)
//!   ├── 08:30 → post_status_report  (totals + per-submission detail)
//!   └── minute == 0 → heartbeat log with time until next trigger
//! ```
//!
//! Each action recomputes its sets from live store state — nothing is
//! cached, submissions arrive asynchronously between triggers. Delivery is
//! fire-and-forget: a failed send is logged and dropped.

pub mod engine;
pub mod messages;
pub mod runner;
pub mod triggers;

pub use engine::ReportEngine;
pub use messages::StatusSummary;
pub use runner::run_loop;
pub use triggers::{Schedule, TriggerKind};
