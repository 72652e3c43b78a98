//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica cross-platform per i comandi esterni:
//! risoluzione del nome binario, verifica disponibilità e spostamento dei
//! file nel cestino del sistema operativo.

use anyhow::Result;
use std::path::Path;
use tokio::process::Command;

/// Platform-specific command manager
pub struct PlatformCommands {
    which_command: &'static str,
}

impl PlatformCommands {
    pub fn new() -> Self {
        let which_command = if cfg!(windows) { "where" } else { "which" };
        Self { which_command }
    }

    /// Resolve the platform-specific binary name
    pub fn binary_name(base_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", base_name)
        } else {
            base_name.to_string()
        }
    }

    /// Check if a command is available on the system PATH
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let result = Command::new(self.which_command)
            .arg(Self::binary_name(base_name))
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

impl Default for PlatformCommands {
    fn default() -> Self {
        Self::new()
    }
}

/// Move a file to the platform trash via an external command.
///
/// Best effort by contract: a failure here is logged by the caller and never
/// changes the outcome of a conversion that already succeeded.
pub async fn move_to_trash(path: &Path) -> Result<()> {
    let abs_path = std::fs::canonicalize(path)?;

    let status = if cfg!(target_os = "macos") {
        let script = format!(
            r#"tell application "Finder" to move POSIX file "{}" to trash"#,
            abs_path.display()
        );
        Command::new("osascript").arg("-e").arg(script).status().await?
    } else if cfg!(target_os = "linux") {
        let platform = PlatformCommands::new();
        if !platform.is_command_available("gio").await {
            return Err(anyhow::anyhow!("gio command not found"));
        }
        Command::new("gio").arg("trash").arg(&abs_path).status().await?
    } else if cfg!(windows) {
        let ps_cmd = format!(
            "Add-Type -AssemblyName Microsoft.VisualBasic; \
             [Microsoft.VisualBasic.FileIO.FileSystem]::DeleteFile('{}', \
             [Microsoft.VisualBasic.FileIO.UIOption]::OnlyErrorDialogs, \
             [Microsoft.VisualBasic.FileIO.RecycleOption]::SendToRecycleBin)",
            abs_path.display()
        );
        Command::new("powershell").arg("-Command").arg(ps_cmd).status().await?
    } else {
        return Err(anyhow::anyhow!("unsupported OS: {}", std::env::consts::OS));
    };

    if !status.success() {
        return Err(anyhow::anyhow!("trash command exited with {}", status));
    }
    Ok(())
}
