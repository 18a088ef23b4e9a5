use super::{Application, AutomationSurface, RegistryScript, Script, ViewerScript};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Registry script channel.
///
/// The registry tab is a single order-sensitive session shared by the
/// coordinator path and the prefetch task, so every call holds the channel
/// lock until its result is back.
pub struct RegistryChannel {
    surface: Arc<dyn AutomationSurface>,
    lock: Mutex<()>,
    timeout: Duration,
}

impl RegistryChannel {
    pub fn new(surface: Arc<dyn AutomationSurface>, timeout: Duration) -> Self {
        Self {
            surface,
            lock: Mutex::new(()),
            timeout,
        }
    }

    pub async fn run(&self, script: RegistryScript) -> Result<String> {
        let _guard = self.lock.lock().await;
        debug!(script = script.name(), "registry script");
        self.surface.execute(Script::Registry(script), self.timeout).await
    }
}

/// Viewer script channel; only the coordinator path touches it.
pub struct ViewerChannel {
    surface: Arc<dyn AutomationSurface>,
    timeout: Duration,
}

impl ViewerChannel {
    pub fn new(surface: Arc<dyn AutomationSurface>, timeout: Duration) -> Self {
        Self { surface, timeout }
    }

    pub async fn run(&self, script: ViewerScript) -> Result<String> {
        debug!(script = script.name(), "viewer script");
        self.surface.execute(Script::Viewer(script), self.timeout).await
    }

    /// Run a script that answers with a JSON object
    pub async fn run_json(&self, script: ViewerScript) -> Result<serde_json::Value> {
        let raw = self.run(script).await?;
        Ok(serde_json::from_str(raw.trim())?)
    }

    pub async fn double_click(&self, x: i32, y: i32) -> Result<()> {
        self.surface.double_click(x, y).await
    }

    pub async fn activate(&self) -> Result<()> {
        self.surface.bring_to_front(Application::Viewer).await
    }

    pub async fn focus_terminal(&self) -> Result<()> {
        self.surface.bring_to_front(Application::Terminal).await
    }
}
