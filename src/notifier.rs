//! # Desktop Notification Module
//!
//! Consegna best-effort di notifiche desktop sugli stati terminali dei job.
//! Il meccanismo di consegna è un collaboratore esterno: qui costruiamo solo
//! l'invocazione e ignoriamo gli errori.

use crate::platform::PlatformCommands;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Send a desktop notification with an optional "open this path" action.
///
/// Never fails: a missing notifier tool just drops the notification.
pub async fn send_notification(title: &str, message: &str, open_path: Option<&Path>) {
    let platform = PlatformCommands::new();

    if cfg!(target_os = "macos") {
        if platform.is_command_available("terminal-notifier").await {
            let mut cmd = Command::new("terminal-notifier");
            cmd.args(["-title", title, "-message", message, "-sound", "default"]);
            if let Some(path) = open_path {
                cmd.arg("-open").arg(format!("file://{}", path.display()));
            }
            if let Err(e) = cmd.status().await {
                debug!("terminal-notifier failed: {}", e);
            }
            return;
        }

        // Fallback
        let script = format!(
            r#"tell application "System Events" to display notification "{}" with title "{}" sound name "default""#,
            message, title
        );
        if let Err(e) = Command::new("osascript").arg("-e").arg(script).status().await {
            debug!("osascript notification failed: {}", e);
        }
    } else if cfg!(target_os = "linux") {
        if platform.is_command_available("notify-send").await {
            let _ = Command::new("notify-send").arg(title).arg(message).status().await;
        } else {
            debug!("notify-send not available, dropping notification");
        }
    } else {
        debug!("desktop notifications not supported on {}", std::env::consts::OS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notification_is_best_effort() {
        // must complete without error even when no notifier tool exists
        send_notification("title", "message", Some(Path::new("/out/a.mp4"))).await;
    }
}
