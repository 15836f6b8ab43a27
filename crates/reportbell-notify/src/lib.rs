//! # Reportbell Notify
//! Outbound message delivery. One channel: Slack `chat.postMessage`.
//!
//! The `Notifier` trait is the seam between the reconciliation engine and
//! the wire — the engine only ever sees a success flag, never an error.

pub mod slack;

pub use slack::SlackNotifier;

/// Fire-and-forget message delivery boundary.
///
/// `send` never raises: transport errors, non-2xx responses, and API-level
/// rejections all collapse to `false` plus a logged reason. No queuing, no
/// retries — a failed send is dropped.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str, blocks: Option<serde_json::Value>) -> bool;
}
