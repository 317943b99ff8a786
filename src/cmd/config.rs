//! `bbflow config show` and `bbflow config validate`.

use anyhow::Result;
use bbflow::pipeline_config::PipelineToml;

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let (settings, source) = PipelineToml::load_or_default(cli.config.as_deref())?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("bbflow Configuration");
            println!("====================");
            println!();
            match source {
                Some(ref path) => println!("Config file: {}", path.display()),
                None => println!("No bbflow.toml found. Using default configuration."),
            }
            println!();
            print!("{}", settings.to_toml_string());
            println!();

            println!("Effective values (with env overrides):");
            println!("  submit_cmd = \"{}\"", settings.submit_cmd());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = settings.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }
    Ok(())
}
