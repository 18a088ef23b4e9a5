//! Export/download trigger and artifact renaming

use super::{check_error, Viewer};
use crate::config::settle;
use crate::error::Result;
use crate::surface::ViewerScript;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};
use walkdir::WalkDir;

/// What happened to the newest download artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { to: PathBuf },
    /// Nothing matching the artifact prefix in the download directory
    NoArtifact,
    /// An entry named after the record already exists; left untouched
    TargetExists(PathBuf),
    /// Record id cannot be used as a file name
    UnusableName,
    Failed(String),
}

/// Rename the most recent artifact in `dir` whose name starts with `prefix`
/// to `record_id`. Never fails the caller; every problem is reported in the
/// outcome and logged as a warning.
pub fn rename_latest_download(dir: &Path, prefix: &str, record_id: &str) -> RenameOutcome {
    let outcome = rename_inner(dir, prefix, record_id);
    match &outcome {
        RenameOutcome::Renamed { .. } => info!(record_id, "download renamed"),
        RenameOutcome::NoArtifact => warn!(record_id, "no download artifact found"),
        RenameOutcome::TargetExists(_) => warn!(record_id, "download target already exists"),
        RenameOutcome::UnusableName => warn!(record_id, "record id not usable as file name"),
        RenameOutcome::Failed(e) => warn!(record_id, error = %e, "download rename failed"),
    }
    outcome
}

fn rename_inner(dir: &Path, prefix: &str, record_id: &str) -> RenameOutcome {
    if record_id.is_empty() || record_id.contains(['/', '\\']) || record_id == "." || record_id == ".." {
        return RenameOutcome::UnusableName;
    }

    let latest = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1) // direct children only
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, e.into_path()))
        })
        .max();

    let Some((_, source)) = latest else {
        return RenameOutcome::NoArtifact;
    };

    let target = dir.join(record_id);
    if target.exists() {
        return RenameOutcome::TargetExists(target);
    }

    match std::fs::rename(&source, &target) {
        Ok(()) => RenameOutcome::Renamed { to: target },
        Err(e) => RenameOutcome::Failed(e.to_string()),
    }
}

impl Viewer {
    /// Open the export panel, press Download and wait for the transfer.
    ///
    /// There is no completion signal for the download; the configured
    /// settle delay is best-effort.
    pub async fn export_download(&self) -> Result<()> {
        self.activate().await;

        let menu = self.channel.run_json(ViewerScript::OpenExportMenu).await?;
        check_error("export menu", &menu)?;
        settle(self.timing.export_panel_settle_ms).await;

        let download = self.channel.run_json(ViewerScript::ClickDownload).await?;
        check_error("download", &download)?;
        info!("download triggered");

        settle(self.timing.download_settle_ms).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::tempdir;

    const PREFIX: &str = "Nil_downloaded_image_";

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_renames_newest_artifact() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &format!("{}old", PREFIX), 600);
        touch(dir.path(), &format!("{}new", PREFIX), 10);
        touch(dir.path(), "unrelated.zip", 0);

        let outcome = rename_latest_download(dir.path(), PREFIX, "100");
        assert_eq!(
            outcome,
            RenameOutcome::Renamed { to: dir.path().join("100") }
        );
        assert!(dir.path().join(format!("{}old", PREFIX)).exists());
        assert!(!dir.path().join(format!("{}new", PREFIX)).exists());
        assert!(dir.path().join("unrelated.zip").exists());
    }

    #[test]
    fn test_no_artifact() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "something_else", 0);
        assert_eq!(
            rename_latest_download(dir.path(), PREFIX, "100"),
            RenameOutcome::NoArtifact
        );
    }

    #[test]
    fn test_existing_target_left_alone() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &format!("{}a", PREFIX), 0);
        fs::create_dir(dir.path().join("100")).unwrap();

        let outcome = rename_latest_download(dir.path(), PREFIX, "100");
        assert_eq!(outcome, RenameOutcome::TargetExists(dir.path().join("100")));
        assert!(dir.path().join(format!("{}a", PREFIX)).exists());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(
            rename_latest_download(&missing, PREFIX, "100"),
            RenameOutcome::NoArtifact
        );
    }

    #[test]
    fn test_unusable_record_id() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &format!("{}a", PREFIX), 0);
        assert_eq!(
            rename_latest_download(dir.path(), PREFIX, "../x"),
            RenameOutcome::UnusableName
        );
    }
}
