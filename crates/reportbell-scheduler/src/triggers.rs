//! Trigger schedule — a minimal cron-like set of (time-of-day, action)
//! pairs, checked once per minute by the loop.
//!
//! Matching is exact on HH:MM, which is what gives at-most-once-per-day
//! semantics per target with a 60s tick. A loop delayed past a target
//! minute skips that day's trigger; that behavior is deliberate and kept.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use reportbell_core::config::ScheduleConfig;
use reportbell_core::error::{ReportbellError, Result};

/// The three daily actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    DailyForm,
    Reminder,
    StatusReport,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyForm => write!(f, "daily form"),
            Self::Reminder => write!(f, "reminder"),
            Self::StatusReport => write!(f, "status report"),
        }
    }
}

/// Sorted list of daily triggers in the bot's fixed timezone.
#[derive(Debug, Clone)]
pub struct Schedule {
    entries: Vec<(NaiveTime, TriggerKind)>,
}

impl Schedule {
    /// Build from config. Rejects malformed times and duplicate minutes —
    /// two actions on the same minute would race for one tick.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let mut entries = vec![
            (parse_hhmm(&config.form_at)?, TriggerKind::DailyForm),
            (parse_hhmm(&config.reminder_at)?, TriggerKind::Reminder),
            (parse_hhmm(&config.status_at)?, TriggerKind::StatusReport),
        ];
        entries.sort_by_key(|(time, _)| *time);
        if entries.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(ReportbellError::Config(
                "Schedule times must be distinct minutes".into(),
            ));
        }
        Ok(Self { entries })
    }

    /// The trigger due at this exact minute, if any.
    pub fn due(&self, time: NaiveTime) -> Option<TriggerKind> {
        self.entries
            .iter()
            .find(|(at, _)| at.hour() == time.hour() && at.minute() == time.minute())
            .map(|(_, kind)| *kind)
    }

    /// Next occurrence after `now`: today's remaining targets in order,
    /// else tomorrow's first.
    pub fn next_after(&self, now: DateTime<FixedOffset>) -> (DateTime<FixedOffset>, TriggerKind) {
        let today = now.date_naive();
        for (time, kind) in &self.entries {
            let at = zoned(today, *time, *now.offset());
            if at > now {
                return (at, *kind);
            }
        }
        // All of today's targets have passed — wrap to tomorrow
        let (time, kind) = self.entries[0];
        (zoned(today + Duration::days(1), time, *now.offset()), kind)
    }

    /// Human-readable heartbeat line: "reminder at 07:00 (in 3h 25m)".
    pub fn describe_next(&self, now: DateTime<FixedOffset>) -> String {
        let (at, kind) = self.next_after(now);
        format!(
            "{kind} at {} ({})",
            at.format("%H:%M"),
            humanize_until(at - now)
        )
    }
}

/// Zoned datetime for a local date + time under a fixed offset.
fn zoned(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc_naive = date.and_time(time) - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_naive).with_timezone(&offset)
}

fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| ReportbellError::Config(format!("Invalid schedule time '{s}': {e}")))
}

/// "in 2h 05m" / "in 12m" / "now" for the heartbeat log.
pub fn humanize_until(until: Duration) -> String {
    let minutes = until.num_minutes();
    if minutes <= 0 {
        return "now".into();
    }
    let hours = minutes / 60;
    if hours > 0 {
        format!("in {hours}h {:02}m", minutes % 60)
    } else {
        format!("in {minutes}m")
    }
}
