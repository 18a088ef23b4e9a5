use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "femoral-review")]
#[command(about = "Femoral access imaging review: registry lookup, study selection, classification write-back", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the review loop
    Run {
        /// Resume after this record id (default: first dashboard record)
        last_record_id: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Write defaults to the config file
        #[arg(long)]
        init: bool,
    },

    /// Convert a registry date (MM-DD-YYYY) to the viewer's search format
    Date {
        #[arg(required = true)]
        date: String,
    },

    /// Validate a selection line without touching anything
    Parse {
        #[arg(required = true, num_args = 1..)]
        selection: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_resume_id() {
        let cli = Cli::parse_from(["femoral-review", "run", "100"]);
        match cli.command {
            Commands::Run { last_record_id } => assert_eq!(last_record_id.as_deref(), Some("100")),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_joins_words() {
        let cli = Cli::parse_from(["femoral-review", "-v", "parse", "2", "1", "23,", "1", "1", "5"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Parse { selection } => assert_eq!(selection.join(" "), "2 1 23, 1 1 5"),
            _ => panic!("expected parse"),
        }
    }
}
