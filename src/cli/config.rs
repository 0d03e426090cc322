use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file, environment and defaults)
    Show {
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Get one configuration value, e.g. `trail.window_size`
    Get {
        /// Dotted configuration key
        key: String,
    },

    /// Print the path of the configuration file in use
    Path,

    /// Write the default configuration to the config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let action = args.action.unwrap_or(ConfigAction::Show {
        format: OutputFormat::Yaml,
    });
    match action {
        ConfigAction::Show { format } => {
            print!("{}", format.render(ctx.config())?);
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(ctx.config())?;
            let Some(value) = get_json_value(&json, &key) else {
                bail!("{} not found in configuration", key);
            };
            print!("{}", serde_yaml::to_string(value)?);
        }
        ConfigAction::Path => {
            println!("{}", ctx.config_path().display());
        }
        ConfigAction::Init { force } => {
            let path = ctx.config_path();
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            save_config_file(path, &Config::default()).await?;
            info!("Wrote default configuration to {}", path.display());
            println!("Saved configuration to {}", path.display());
        }
        ConfigAction::Validate => {
            ctx.config().validate()?;
            println!("Configuration is valid ({})", ctx.config_path().display());
        }
    }
    Ok(())
}

fn get_json_value<'a>(root: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    key.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| node.get(segment))
}

async fn save_config_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
