use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::models::Config;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration (credentials masked)")]
    Show,
    #[command(about = "Show the configuration file path")]
    Path,
}

pub fn handle_config(cmd: ConfigCommand, config: &Config, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force),
        ConfigCommand::Show => handle_show(config, format),
        ConfigCommand::Path => handle_path(),
    }
}

fn handle_init(force: bool) -> Result<()> {
    let path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save()
        .context("failed to write config file")?;
    println!("Created config at: {}", path.display());
    Ok(())
}

fn handle_show(config: &Config, format: OutputFormat) -> Result<()> {
    let redacted = config.redacted();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Text => {
            if let Some(path) = Config::config_path() {
                let state = if path.exists() { "" } else { " (not found, using defaults)" };
                println!("# Config file: {}{state}", path.display());
                println!();
            }
            print!(
                "{}",
                toml::to_string_pretty(&redacted).context("failed to render config")?
            );
        }
    }
    Ok(())
}

fn handle_path() -> Result<()> {
    let path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}
