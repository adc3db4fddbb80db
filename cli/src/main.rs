//! TronGuard CLI: admin entry point for the reputation store.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tronguard_reputation::{Caller, EngineConfig, ReputationEngine};
use tronguard_store_lmdb::LmdbEnvironment;
use tronguard_types::ActorId;
use tronguard_utils::{init_logging, LogFormat};

use crate::commands::Command;

#[derive(Parser)]
#[command(name = "tronguard", about = "TRON resource-lease reputation store")]
pub(crate) struct Cli {
    /// Directory holding the LMDB environment.
    /// When a config file is provided, defaults to the file's value.
    #[arg(long, env = "TRONGUARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "TRONGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TRONGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TRONGUARD_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Run as an administrator.
    #[arg(long, env = "TRONGUARD_ADMIN")]
    admin: bool,

    /// Numeric id of the acting user (the voter for `vote`).
    #[arg(long, default_value_t = 0, env = "TRONGUARD_ACTOR")]
    actor: i64,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn caller(&self) -> Caller {
        let actor = ActorId::new(self.actor);
        if self.admin {
            Caller::Admin(actor)
        } else {
            Caller::Regular(actor)
        }
    }

    /// File config (or defaults) with flag overrides applied.
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_toml_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = match format {
                LogFormat::Human => "human".to_string(),
                LogFormat::Json => "json".to_string(),
            };
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.engine_config()?;

    init_logging(config.log_format()?, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    let env = Arc::new(LmdbEnvironment::open(
        &config.data_dir,
        config.max_dbs,
        config.map_size_bytes(),
    )?);
    let engine = ReputationEngine::new(Arc::clone(&env), &config);

    let caller = cli.caller();
    commands::run(cli.command, &engine, &env, &config, caller)?;

    env.force_sync()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_file_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tronguard.toml");
        std::fs::write(&path, "data_dir = \"/srv/tg\"\nlog_level = \"debug\"\npromotion_threshold = 5\n").unwrap();

        let cli = Cli::parse_from([
            "tronguard",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "warn",
            "purge",
        ]);
        let config = cli.engine_config().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/tg"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.promotion_threshold, 5);
    }

    #[test]
    fn invalid_log_format_in_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tronguard.toml");
        std::fs::write(&path, "log_format = \"xml\"\n").unwrap();
        let cli = Cli::parse_from(["tronguard", "--config", path.to_str().unwrap(), "purge"]);
        assert!(cli.engine_config().is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["tronguard", "--config", "/nonexistent/tg.toml", "purge"]);
        assert!(cli.engine_config().is_err());
    }

    #[test]
    fn admin_flag_selects_caller() {
        let cli = Cli::parse_from(["tronguard", "--admin", "--actor", "42", "purge"]);
        assert_eq!(cli.caller(), Caller::Admin(ActorId::new(42)));
        let cli = Cli::parse_from(["tronguard", "purge"]);
        assert!(!cli.caller().is_admin());
    }
}
