pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod demo;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod replay;
pub mod runtime;
pub mod session;
pub mod watch;

pub use config::{cmd_config, ConfigArgs};
pub use demo::{cmd_demo, DemoArgs};
pub use replay::{cmd_replay, ReplayArgs};
pub use watch::{cmd_watch, WatchArgs};
