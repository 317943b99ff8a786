use anyhow::Result;
use bbflow::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "bbflow")]
#[command(version, about = "BioBank pipeline manager: submit a subject's pipeline to the batch queue")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to bbflow.toml. Defaults to ./bbflow.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the jobs that would be submitted instead of submitting them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log output format: text, json
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline (or reparcellation only) for a subject
    Run {
        /// Subject folder
        subject: String,

        /// "true" to only reparcellate, "false" for full processing
        #[arg(long, env = "REPARCELLATE", default_value = "false")]
        reparcellate: String,

        /// Parcellation used by reparcellation
        #[arg(long, env = "PARC_NAME")]
        parc_name: Option<String>,

        /// Remove intermediate data from previous runs (keeps rawdata/ and logs/)
        #[arg(long)]
        clean: bool,
    },
    /// Run the functional pipeline for a subject and print the jobs to wait for
    Functional {
        /// Subject folder
        subject: String,

        /// Job token the first stage waits on
        #[arg(long, default_value = "-1")]
        hold: String,
    },
    /// Submit QC report generation for a subject
    Qc {
        /// Subject folder
        subject: String,

        /// Job token QC waits on
        #[arg(long, default_value = "-1")]
        hold: String,
    },
    /// List pipeline stages, rendered for a subject if one is given
    Stages { subject: Option<String> },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            subject,
            reparcellate,
            parc_name,
            clean,
        } => {
            cmd::cmd_run(&cli, subject, reparcellate, parc_name.as_deref(), *clean).await?;
        }
        Commands::Functional { subject, hold } => {
            cmd::cmd_functional(&cli, subject, hold).await?;
        }
        Commands::Qc { subject, hold } => cmd::cmd_qc(&cli, subject, hold).await?,
        Commands::Stages { subject } => cmd::cmd_stages(&cli, subject.as_deref())?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
