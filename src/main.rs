use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use certflow_core::config::AppConfig;
use certflow_core::traits::Collaborators;
use certflow_core::types::DocumentRef;
use certflow_gateway::GatewayServer;
use certflow_workflow::{RemoteCollaborators, ValidationRequest, ValidationWorkflow, WorkflowOptions};

#[derive(Parser)]
#[command(name = "certflow", version, about = "Work-risk insurance certificate validation")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "certflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP validation service
    Serve,
    /// Validate a single PDF and print the terminal state as JSON
    Validate {
        /// Certificate to validate
        pdf: PathBuf,
        /// Worker full name or 8-digit DNI
        #[arg(short, long)]
        person: String,
        /// Reference date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("certflow=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "certflow", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Serve => {
            let workflow = Arc::new(build_workflow(&config)?);
            let server = GatewayServer::new(config.server.clone(), workflow);

            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Commands::Validate { pdf, person, date } => {
            let workflow = build_workflow(&config)?;
            let content = tokio::fs::read(&pdf)
                .await
                .with_context(|| format!("reading {}", pdf.display()))?;
            let file_name = pdf
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let state = workflow
                .validate(ValidationRequest {
                    file: DocumentRef::new(file_name, content),
                    person,
                    reference_date: date,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config");
        Ok(AppConfig::load(path)?)
    } else {
        warn!(path = %path.display(), "No config file found, using defaults");
        Ok(AppConfig::default())
    }
}

fn build_workflow(config: &AppConfig) -> anyhow::Result<ValidationWorkflow> {
    let remote = config
        .collaborators
        .as_ref()
        .context("[collaborators] section is required to run validations")?;
    let collaborators = Collaborators::from_single(Arc::new(RemoteCollaborators::new(remote)?));
    Ok(ValidationWorkflow::new(
        collaborators,
        WorkflowOptions::from(&config.workflow),
    )?)
}
