//! Submission commands: `bbflow run`, `bbflow functional` and `bbflow qc`.

use anyhow::Result;
use bbflow::config::Config;
use bbflow::job::JobToken;
use bbflow::logging::{self, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;

use super::super::Cli;

/// Resolve the subject and start logging into its log directory.
///
/// Everything that can fail before a submission (missing subject, bad config file)
/// fails here.
fn prepare(cli: &Cli, subject: &str) -> Result<(Config, Option<WorkerGuard>)> {
    let config = Config::new(subject, cli.config.as_deref(), cli.dry_run)?;
    config.ensure_directories()?;

    let guard = logging::init(
        &LoggingConfig::new(cli.verbose, cli.log_format).with_log_dir(&config.log_dir),
    )?;
    if let Some(ref path) = config.config_file {
        tracing::debug!(config = %path.display(), "Loaded configuration");
    }
    Ok((config, guard))
}

pub async fn cmd_run(
    cli: &Cli,
    subject: &str,
    reparcellate: &str,
    parc_name: Option<&str>,
    clean: bool,
) -> Result<()> {
    use bbflow::sequencer::{PipelineOptions, RunMode, run_pipeline};

    let mode: RunMode = reparcellate.parse()?;
    let (config, _guard) = prepare(cli, subject)?;

    let parc_name = parc_name
        .map(str::to_string)
        .or_else(|| config.settings.pipeline.parc_name.clone());
    let parc_name = match (mode, parc_name) {
        (_, Some(name)) => name,
        (RunMode::Reparcellate, None) => anyhow::bail!(
            "Reparcellation needs a parcellation name: set PARC_NAME, --parc-name or pipeline.parc_name"
        ),
        (RunMode::Full, None) => String::new(),
    };

    let options = PipelineOptions {
        mode,
        parc_name,
        clean,
        dry_run: config.dry_run,
    };
    let submitter = config.submitter();
    let token = run_pipeline(&config.subject, &config.settings, submitter.as_ref(), &options).await?;

    println!("{}", token);
    Ok(())
}

pub async fn cmd_functional(cli: &Cli, subject: &str, hold: &str) -> Result<()> {
    use bbflow::files::FileConfiguration;
    use bbflow::sequencer::{StageRunner, run_functional};

    let (config, _guard) = prepare(cli, subject)?;
    let files = FileConfiguration::load(&config.subject.descriptor_file())?;

    let submitter = config.submitter();
    let runner = StageRunner::new(&config.subject, &config.settings, submitter.as_ref());
    let jobs = run_functional(&runner, &files, &JobToken::new(hold)).await?;

    println!("{}", jobs);
    Ok(())
}

pub async fn cmd_qc(cli: &Cli, subject: &str, hold: &str) -> Result<()> {
    use bbflow::sequencer::{StageRunner, run_qc};

    let (config, _guard) = prepare(cli, subject)?;

    let submitter = config.submitter();
    let runner = StageRunner::new(&config.subject, &config.settings, submitter.as_ref());
    let token = run_qc(&runner, &JobToken::new(hold)).await?;

    println!("{}", token);
    Ok(())
}
