//! Process lifecycle — PID marker and shutdown signaling.
//!
//! One owning context object instead of ambient globals: the `Lifecycle`
//! holds the PID file and the shutdown channel, signal handlers only talk
//! to it, and dropping it cleans the marker up.

use std::path::PathBuf;
use tokio::sync::watch;

/// Lifecycle context passed to the loop and the signal handlers.
pub struct Lifecycle {
    pid_file: PathBuf,
    shutdown_tx: watch::Sender<bool>,
}

impl Lifecycle {
    /// Write the PID marker and arm the shutdown channel.
    pub fn start(pid_file: PathBuf) -> std::io::Result<Self> {
        if let Some(parent) = pid_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&pid_file, std::process::id().to_string())?;
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            pid_file,
            shutdown_tx,
        })
    }

    /// A receiver the loop selects on.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown. Safe to call more than once.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.pid_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("⚠️ Failed to remove PID file: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_marker_written_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("bot.pid");
        {
            let lifecycle = Lifecycle::start(pid_path.clone()).unwrap();
            assert_eq!(
                std::fs::read_to_string(&pid_path).unwrap(),
                std::process::id().to_string()
            );
            lifecycle.shutdown();
        }
        assert!(!pid_path.exists());
    }

    #[tokio::test]
    async fn shutdown_flips_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = Lifecycle::start(dir.path().join("bot.pid")).unwrap();
        let mut rx = lifecycle.subscribe();
        lifecycle.shutdown();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
