//! Coordinator prompt loop
//!
//! Prints the patient now open in the viewer, reads one classification
//! line, and advances. Identifying values never reach the terminal; only
//! record ids, positions and study descriptions do.

use crate::error::{ReviewError, Result};
use crate::registry::SaveStatus;
use crate::viewer::RenameOutcome;
use crate::workflow::{PatientReady, Step, SubmitOutcome, WorkflowEngine};
use dialoguer::Input;
use std::io::ErrorKind;

/// One line of coordinator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    /// Reprocess the current record
    Redo,
    Quit,
    Selection(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "" => Command::Empty,
        "redo" => Command::Redo,
        "quit" => Command::Quit,
        _ => Command::Selection(trimmed.to_string()),
    }
}

/// Status lines for a loaded record
pub fn ready_lines(step: &Step) -> Vec<String> {
    match step {
        Step::Ready(ready) => {
            let mut lines = vec![format!("Ready: {}", record_line(ready))];
            if let Some(study) = &ready.study {
                lines.push(format!(
                    "Study: {} ({}), {} images",
                    study.desc_prefix, study.modality, study.images
                ));
            }
            lines
        }
        Step::NotFound(ready) => vec![
            format!("Not found: {}", record_line(ready)),
            format!(
                "  {}",
                ready.error.as_deref().unwrap_or("no studies found")
            ),
            "  Open the study manually, then enter the selection (or redo / quit).".to_string(),
        ],
        Step::Exhausted { reason } => vec![format!("Done: {}", reason)],
    }
}

fn record_line(ready: &PatientReady) -> String {
    format!(
        "Record {} ({}){}",
        ready.record_id,
        ready.position,
        if ready.prefetched { " [prefetched]" } else { "" }
    )
}

/// Status lines after a save
pub fn saved_lines(outcome: &SubmitOutcome) -> Vec<String> {
    let save = &outcome.save;
    let mut lines = Vec::new();

    match &outcome.rename {
        Some(RenameOutcome::Renamed { .. }) => lines.push("  ✔ download renamed".to_string()),
        Some(RenameOutcome::NoArtifact) => lines.push("  ! no download found to rename".to_string()),
        Some(RenameOutcome::TargetExists(_)) => {
            lines.push("  ! download target already exists, left as is".to_string())
        }
        Some(_) => lines.push("  ! download rename failed".to_string()),
        None if outcome.selection.has(femoral_review_common::ImageType::Angiogram) => {
            lines.push("  ! export failed, no download".to_string())
        }
        None => {}
    }

    if outcome.returned.map(|r| !r.list_visible).unwrap_or(true) {
        lines.push("  ! study list not confirmed visible".to_string());
    }
    if save.accession_len == 0 {
        lines.push("  ! saved without accession".to_string());
    }

    match save.status {
        SaveStatus::Saved => lines.push(format!(
            "Saved {}: {} [{}]",
            save.record_id,
            outcome.selection,
            save.completion.label()
        )),
        SaveStatus::Unknown => lines.push(format!(
            "Save of {} returned HTTP {}; check the record in the registry.",
            save.record_id, save.http_status
        )),
    }
    lines
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Read one line; EOF counts as quit
async fn prompt() -> Result<Command> {
    let read = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("Selection")
            .allow_empty(true)
            .interact_text()
    })
    .await
    .map_err(|e| ReviewError::Prompt(e.to_string()))?;

    match read {
        Ok(line) => Ok(parse_command(&line)),
        Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::UnexpectedEof => Ok(Command::Quit),
        Err(e) => Err(ReviewError::Prompt(e.to_string())),
    }
}

/// Drive the engine until the dashboard is exhausted or the coordinator quits
pub async fn run_loop(engine: &mut WorkflowEngine, after: Option<String>) -> Result<()> {
    println!("Selection: 0 = no images | <type> <series> <image>, ... (1 needle, 2 angiogram, 3 other)");
    println!("Commands: redo, quit\n");

    let mut step = Some(engine.start(after).await?);

    loop {
        if let Some(current) = step.take() {
            print_lines(&ready_lines(&current));
            if matches!(current, Step::Exhausted { .. }) {
                return Ok(());
            }
        }

        let next = match prompt().await? {
            Command::Empty => continue,
            Command::Quit => {
                println!("Stopped.");
                return Ok(());
            }
            Command::Redo => engine.redo().await,
            Command::Selection(line) => match engine.submit(&line).await {
                Ok(outcome) => {
                    print_lines(&saved_lines(&outcome));
                    println!();
                    engine.advance().await
                }
                Err(ReviewError::Common(e)) => {
                    println!("  ✗ {}", e);
                    continue;
                }
                Err(e) => {
                    println!("  ✗ {} ({})", e, e.kind());
                    continue;
                }
            },
        };

        match next {
            Ok(s) => step = Some(s),
            Err(e) => println!("  ✗ could not load next record: {} (redo to retry)", e),
        }
    }
}
