//! The `engineo` binary: the playbook workflow against local project files.

mod commands;
mod project;

use clap::{Parser, Subcommand};
use engineo_core::EngineoConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "engineo", version, about = "EngineO playbook engine CLI")]
struct Cli {
    /// Path to the engine configuration file.
    #[arg(long, global = true, default_value = "engineo.yaml")]
    config: PathBuf,

    /// Path to the local project file.
    #[arg(long = "project-file", global = true, default_value = "project.yaml")]
    project_file: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the playbook catalog.
    Playbooks,

    /// Compute the eligibility estimate for a playbook.
    Estimate {
        /// Playbook identifier (e.g. missing_seo_title).
        #[arg(long)]
        playbook: String,

        /// Scope: "all" or "selected".
        #[arg(long, default_value = "all")]
        scope: String,

        /// Comma-separated asset ids for --scope selected.
        #[arg(long)]
        ids: Option<String>,
    },

    /// Generate a bounded before/after preview sample.
    Preview {
        #[arg(long)]
        playbook: String,

        #[arg(long, default_value = "all")]
        scope: String,

        #[arg(long)]
        ids: Option<String>,

        /// Override the configured sample size.
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Fill the draft cache for a scope.
    Drafts {
        #[arg(long)]
        playbook: String,

        #[arg(long, default_value = "all")]
        scope: String,

        #[arg(long)]
        ids: Option<String>,
    },

    /// Run the full workflow: preview, estimate, confirm, apply.
    Apply {
        #[arg(long)]
        playbook: String,

        #[arg(long, default_value = "all")]
        scope: String,

        #[arg(long)]
        ids: Option<String>,

        /// Acknowledge responsibility for the bulk change.
        #[arg(long, default_value_t = false)]
        acknowledge: bool,

        /// The confirmation phrase (type "apply").
        #[arg(long, default_value = "")]
        phrase: String,

        /// Principal performing the run.
        #[arg(long = "as", default_value = "merchant:local")]
        principal: String,
    },

    /// Inspect the audit trail (file backend only).
    Audit {
        /// Filter by run id.
        #[arg(long)]
        run: Option<String>,

        /// Filter by event type (e.g. apply_completed).
        #[arg(long = "type")]
        event_type: Option<String>,

        /// Maximum number of events to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn load_config(path: &PathBuf) -> anyhow::Result<EngineoConfig> {
    if path.exists() {
        Ok(EngineoConfig::load(path)?)
    } else {
        Ok(EngineoConfig::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.cmd {
        Command::Playbooks => commands::playbooks::run(&config),

        Command::Estimate {
            playbook,
            scope,
            ids,
        } => {
            commands::estimate::run(
                &config,
                &cli.project_file,
                &playbook,
                &scope,
                ids.as_deref(),
            )
            .await?
        }

        Command::Preview {
            playbook,
            scope,
            ids,
            samples,
        } => {
            commands::preview::run(
                &config,
                &cli.project_file,
                &playbook,
                &scope,
                ids.as_deref(),
                samples,
            )
            .await?
        }

        Command::Drafts {
            playbook,
            scope,
            ids,
        } => {
            commands::drafts::run(
                &config,
                &cli.project_file,
                &playbook,
                &scope,
                ids.as_deref(),
            )
            .await?
        }

        Command::Apply {
            playbook,
            scope,
            ids,
            acknowledge,
            phrase,
            principal,
        } => {
            commands::apply::run(
                &config,
                &cli.project_file,
                &playbook,
                &scope,
                ids.as_deref(),
                &principal,
                acknowledge,
                &phrase,
            )
            .await?
        }

        Command::Audit {
            run,
            event_type,
            limit,
        } => commands::audit::run(&config, run.as_deref(), event_type.as_deref(), limit)?,
    }

    Ok(())
}
