use std::env;
use std::fs as stdfs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;

const LOCAL_ENV_PATH: &str = "config/local.env";
const LOCAL_CONFIG_PATH: &str = "config/crawltrail.yaml";

pub fn load_local_env_overrides() {
    load_env_file(Path::new(LOCAL_ENV_PATH));
}

/// Sets `KEY=VALUE` pairs from `path` for keys not already in the
/// environment. Blank lines and `#` comments are skipped.
pub fn load_env_file(path: &Path) {
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unquote(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let mut policy = trail_observe::current_policy();
    policy.json_logs = json;
    trail_observe::set_policy(policy);

    trail_observe::tracing::init_tracing(&level.to_string())
        .context("Failed to initialise logging")?;
    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        return Ok(path.clone());
    }
    // Priority: ./config/crawltrail.yaml > ~/.config/crawltrail/config.yaml
    let local_config = PathBuf::from(LOCAL_CONFIG_PATH);
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("crawltrail");
    path.push("config.yaml");
    Ok(path)
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = resolve_config_path(config_path)?;

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config = Config::from_yaml(&content)?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        info!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Config::default()
    };

    let applied = config.apply_env_overrides()?;
    if !applied.is_empty() {
        info!(?applied, "Applied environment overrides");
    }
    config.validate()?;

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}

/// Publishes the loaded policies to the process-wide handles and starts
/// the metrics exporter when a port was requested.
pub async fn apply_runtime_overrides(config: &Config, metrics_port: u16) -> Result<()> {
    trail_engine::set_policy(config.trail.clone())?;

    let mut observe = config.observe.clone();
    observe.json_logs = trail_observe::current_policy().json_logs;
    if metrics_port != 0 {
        observe.prom_enable = true;
        observe.prom_bind = SocketAddr::from(([127, 0, 0, 1], metrics_port)).to_string();
    }
    trail_observe::set_policy(observe);

    if let Some(addr) = trail_observe::exporter::ensure_prometheus().await? {
        info!(%addr, "Prometheus exporter listening");
    }
    Ok(())
}

fn unquote(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn env_file_fills_only_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.env");
        let mut file = stdfs::File::create(&path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "CRAWLTRAIL_TEST_FRESH=\"quoted value\"").unwrap();
        writeln!(file, "CRAWLTRAIL_TEST_TAKEN=from-file").unwrap();
        writeln!(file, "not an assignment").unwrap();
        env::set_var("CRAWLTRAIL_TEST_TAKEN", "from-env");

        load_env_file(&path);

        assert_eq!(env::var("CRAWLTRAIL_TEST_FRESH").unwrap(), "quoted value");
        assert_eq!(env::var("CRAWLTRAIL_TEST_TAKEN").unwrap(), "from-env");
    }

    #[test]
    fn explicit_config_path_wins() {
        let explicit = PathBuf::from("/tmp/elsewhere.yaml");
        assert_eq!(resolve_config_path(Some(&explicit)).unwrap(), explicit);
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.trail.title, "crawl");
    }
}
