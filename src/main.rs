use anyhow::Context;
use clap::Parser;
use femoral_review::{cli, config, interactive, surface, workflow};
use femoral_review_common::{registry_to_viewer, SelectionShorthand};
use cli::{Cli, Commands};
use config::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "femoral_review=debug,femoral_review_common=debug"
    } else {
        "femoral_review=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { last_record_id } => {
            let config = Config::load().context("loading configuration")?;
            println!("femoral-review - imaging review\n");

            let bridge = surface::BridgeSurface::new(&config.bridge);
            let mut engine = workflow::WorkflowEngine::new(Arc::new(bridge), &config);
            info!(resume_after = last_record_id.as_deref(), "starting review loop");

            interactive::run_loop(&mut engine, last_record_id)
                .await
                .context("review loop")?;
        }

        Commands::Config { show, init } => {
            if init {
                let path = Config::config_path()?;
                if path.exists() {
                    println!("Config already exists: {}", path.display());
                } else {
                    Config::default().save().context("writing default configuration")?;
                    println!("✔ Wrote defaults: {}", path.display());
                }
            }

            if show || !init {
                let config = Config::load().context("loading configuration")?;
                println!("Config ({}):", Config::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }

        Commands::Date { date } => match registry_to_viewer(&date) {
            Ok(converted) => println!("{}", converted),
            Err(e) => anyhow::bail!("{}", e),
        },

        Commands::Parse { selection } => {
            let line = selection.join(" ");
            let parsed = SelectionShorthand::parse(&line)?;
            println!("Selection: {}", parsed);
            if let Some(note) = parsed.annotation() {
                println!("Annotation: {}", note);
            }
        }
    }

    Ok(())
}
