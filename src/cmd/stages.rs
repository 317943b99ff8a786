//! `bbflow stages`: list the stage catalog.

use anyhow::Result;
use bbflow::pipeline_config::PipelineToml;
use bbflow::stage::TemplateVars;
use bbflow::subject::Subject;
use console::style;

use super::super::Cli;

pub fn cmd_stages(cli: &Cli, subject: Option<&str>) -> Result<()> {
    let (settings, _) = PipelineToml::load_or_default(cli.config.as_deref())?;
    let subject = subject.map(Subject::resolve).transpose()?;

    println!();
    println!(
        "{:<20} {:<24} {:<20} Command",
        "Stage", "Job name", "Queue"
    );
    println!(
        "{:<20} {:<24} {:<20} -------",
        "--------------------", "------------------------", "--------------------"
    );

    for stage in settings.stages() {
        let (job, command) = match subject {
            Some(ref s) => (stage.job_name(s), stage.render(&TemplateVars::for_subject(s))),
            None => (format!("{}_<subject>", stage.job_prefix), stage.command.clone()),
        };
        let queue = stage
            .queue
            .clone()
            .unwrap_or_else(|| settings.queue.queue.clone());
        println!(
            "{:<20} {:<24} {:<20} {}",
            style(&stage.key).bold(),
            job,
            queue,
            command
        );
    }
    println!();
    Ok(())
}
