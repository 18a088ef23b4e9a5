//! Subprocess bridge to the automation host
//!
//! Each call spawns the configured bridge executable, writes one JSON
//! request to its stdin and takes its stdout as the result. The bridge owns
//! the actual browser/OS automation.

use super::{Application, AutomationSurface, Script};
use crate::config::BridgeConfig;
use crate::error::{ReviewError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Extra time allowed for process start-up on top of the script timeout
const SPAWN_GRACE: Duration = Duration::from_secs(5);

pub struct BridgeSurface {
    command: String,
    args: Vec<String>,
    action_timeout: Duration,
}

impl BridgeSurface {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            action_timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    async fn call(&self, request: serde_json::Value, timeout: Duration) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReviewError::Surface(format!("failed to start bridge '{}': {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&request)?;
            stdin.write_all(&payload).await?;
            stdin.write_all(b"\n").await?;
            // dropping stdin closes the pipe so the bridge sees EOF
        }

        let output = tokio::time::timeout(timeout + SPAWN_GRACE, child.wait_with_output())
            .await
            .map_err(|_| ReviewError::SurfaceTimeout(timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let preview: String = stderr.chars().take(200).collect();
            return Err(ReviewError::Surface(format!(
                "bridge failed (code {:?}): {}",
                output.status.code(),
                preview
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl AutomationSurface for BridgeSurface {
    async fn execute(&self, script: Script, timeout: Duration) -> Result<String> {
        let body = match &script {
            Script::Registry(s) => serde_json::to_value(s)?,
            Script::Viewer(s) => serde_json::to_value(s)?,
        };
        let request = json!({
            "target": script.target(),
            "request": body,
            "timeout_ms": timeout.as_millis() as u64,
        });
        self.call(request, timeout).await
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<()> {
        let request = json!({ "action": "double_click", "x": x, "y": y });
        self.call(request, self.action_timeout).await.map(|_| ())
    }

    async fn bring_to_front(&self, app: Application) -> Result<()> {
        let request = json!({ "action": "bring_to_front", "app": app });
        self.call(request, self.action_timeout).await.map(|_| ())
    }
}
