use clap::Subcommand;

use super::config::ConfigArgs;
use super::demo::DemoArgs;
use super::replay::ReplayArgs;
use super::watch::WatchArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Follow a live lifecycle feed and redraw the trail every cycle
    Watch(WatchArgs),

    /// Apply a recorded NDJSON feed and draw a single trail
    Replay(ReplayArgs),

    /// Push the built-in sample crawl through an in-memory queue
    Demo(DemoArgs),

    /// Inspect CrawlTrail configuration
    Config(ConfigArgs),
}
