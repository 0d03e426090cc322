use super::config::cmd_config;
use super::demo::cmd_demo;
use super::env::CliArgs;
use super::replay::cmd_replay;
use super::watch::cmd_watch;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Watch(args) => cmd_watch(args, ctx).await,
        Commands::Replay(args) => cmd_replay(args, ctx).await,
        Commands::Demo(args) => cmd_demo(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
