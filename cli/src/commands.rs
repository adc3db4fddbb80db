//! Subcommand definitions and dispatch.

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tronguard_reputation::{
    backup, Caller, ClearMode, EngineConfig, Feedback, ReputationEngine, ReputationError,
    RestoreMode, VerificationReport,
};
use tronguard_store::{BlacklistSource, Expiring};
use tronguard_store_lmdb::{IntegrityReport, LmdbEnvironment};
use tronguard_types::{Role, Timestamp, TronAddress};
use tronguard_utils::describe_expiry;

type Engine = ReputationEngine<Arc<LmdbEnvironment>>;

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Manage blacklist entries.
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    /// Manage single-address whitelist entries.
    Whitelist {
        #[command(subcommand)]
        action: WhitelistAction,
    },
    /// Manage whitelisted provider/payment combinations.
    Combo {
        #[command(subcommand)]
        action: ComboAction,
    },
    /// Provider → payment associations and the propagation toggle.
    Assoc {
        #[command(subcommand)]
        action: AssocAction,
    },
    /// Resolve the trust verdict for a provider/payment pair.
    Resolve {
        provider: TronAddress,
        payment: TronAddress,
    },
    /// Cast feedback on a pair as the acting user.
    ///
    /// FEEDBACK is one of: succeeded, failed, cancel,
    /// provider-only:<whitelist|blacklist>, payment-only:<whitelist|blacklist>.
    Vote {
        provider: TronAddress,
        payment: TronAddress,
        feedback: Feedback,
    },
    /// Delete expired temporary entries and stale votes.
    Purge,
    /// Maintenance: clear, backup, restore, verify.
    Maint {
        #[command(subcommand)]
        action: MaintAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum BlacklistAction {
    Add {
        address: TronAddress,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        reason: String,
        /// "manual" or "temporary".
        #[arg(long, default_value = "manual")]
        source: BlacklistSource,
    },
    Remove {
        address: TronAddress,
        #[arg(long)]
        role: Role,
    },
    Check {
        address: TronAddress,
        #[arg(long)]
        role: Role,
    },
    Stats,
    /// List active entries, newest first.
    List {
        #[arg(long)]
        source: Option<BlacklistSource>,
    },
}

#[derive(Subcommand)]
pub(crate) enum WhitelistAction {
    Add {
        address: TronAddress,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        reason: String,
    },
    Remove {
        address: TronAddress,
        #[arg(long)]
        role: Role,
    },
    Check {
        address: TronAddress,
        #[arg(long)]
        role: Role,
    },
    Stats,
}

#[derive(Subcommand)]
pub(crate) enum ComboAction {
    Add {
        provider: TronAddress,
        payment: TronAddress,
        #[arg(long)]
        reason: String,
    },
    Remove {
        provider: TronAddress,
        payment: TronAddress,
    },
    Check {
        provider: TronAddress,
        payment: TronAddress,
    },
}

#[derive(Subcommand)]
pub(crate) enum AssocAction {
    /// Record an observed provider → payment pair.
    Record {
        provider: TronAddress,
        payment: TronAddress,
    },
    List {
        provider: TronAddress,
    },
    /// Enable propagation to associated payments.
    On,
    /// Disable propagation to associated payments.
    Off,
    Status,
}

#[derive(Subcommand)]
pub(crate) enum MaintAction {
    /// Bulk-clear associations (and auto-associated entries with --mode all).
    Clear {
        /// "all" or "associations-only".
        #[arg(long, default_value = "all")]
        mode: ClearMode,
        #[arg(long)]
        dry_run: bool,
        /// Leave the propagation toggle as it is.
        #[arg(long)]
        keep_toggle: bool,
        /// Where to write the pre-clear backup. Defaults to <data-dir>/backups.
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
    /// Write a JSON snapshot of every table.
    Backup { path: PathBuf },
    /// Load a JSON snapshot.
    Restore {
        path: PathBuf,
        /// "upsert" or "fail".
        #[arg(long, default_value = "upsert")]
        mode: RestoreMode,
        #[arg(long)]
        dry_run: bool,
    },
    /// Summarise state and check database integrity.
    Verify {
        /// Also list the most recent associations and auto entries.
        #[arg(long)]
        detail: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an active entry with its expiry, or "clean".
fn print_check<T: Serialize + Expiring>(found: Option<T>, now: Timestamp) -> anyhow::Result<()> {
    match found {
        Some(entry) => {
            print_json(&entry)?;
            println!("{}", describe_expiry(entry.expires_at(), now));
        }
        None => println!("clean"),
    }
    Ok(())
}

pub(crate) fn run(
    command: Command,
    engine: &Engine,
    env: &LmdbEnvironment,
    config: &EngineConfig,
    caller: Caller,
) -> anyhow::Result<()> {
    match command {
        Command::Blacklist { action } => blacklist(action, engine, caller),
        Command::Whitelist { action } => whitelist(action, engine, caller),
        Command::Combo { action } => combo(action, engine, caller),
        Command::Assoc { action } => assoc(action, engine, caller),
        Command::Resolve { provider, payment } => {
            let verdict = engine.resolve(&provider, &payment)?;
            print_json(&verdict)?;
            if verdict.counterpart_advisory() {
                println!("note: whitelist trust covers one side only, not this exact pair");
            }
            Ok(())
        }
        Command::Vote {
            provider,
            payment,
            feedback,
        } => print_json(&engine.cast(caller, &provider, &payment, feedback)?),
        Command::Purge => print_json(&engine.purge_expired(caller)?),
        Command::Maint { action } => maint(action, engine, env, config, caller),
    }
}

fn blacklist(action: BlacklistAction, engine: &Engine, caller: Caller) -> anyhow::Result<()> {
    match action {
        BlacklistAction::Add {
            address,
            role,
            reason,
            source,
        } => print_json(&engine.blacklist_add(caller, &address, role, &reason, source)?),
        BlacklistAction::Remove { address, role } => {
            print_json(&engine.blacklist_remove(caller, &address, role)?)
        }
        BlacklistAction::Check { address, role } => {
            print_check(engine.blacklist_check(&address, role)?, engine.now())
        }
        BlacklistAction::Stats => print_json(&engine.blacklist_stats()?),
        BlacklistAction::List { source } => print_json(&engine.blacklist_list(source)?),
    }
}

fn whitelist(action: WhitelistAction, engine: &Engine, caller: Caller) -> anyhow::Result<()> {
    match action {
        WhitelistAction::Add {
            address,
            role,
            reason,
        } => print_json(&engine.whitelist_add_single(caller, &address, role, &reason)?),
        WhitelistAction::Remove { address, role } => {
            print_json(&engine.whitelist_remove_single(caller, &address, role)?)
        }
        WhitelistAction::Check { address, role } => {
            print_check(engine.whitelist_check_single(&address, role)?, engine.now())
        }
        WhitelistAction::Stats => print_json(&engine.whitelist_stats()?),
    }
}

fn combo(action: ComboAction, engine: &Engine, caller: Caller) -> anyhow::Result<()> {
    match action {
        ComboAction::Add {
            provider,
            payment,
            reason,
        } => print_json(&engine.whitelist_add_combo(caller, &provider, &payment, &reason)?),
        ComboAction::Remove { provider, payment } => {
            print_json(&engine.whitelist_remove_combo(caller, &provider, &payment)?)
        }
        ComboAction::Check { provider, payment } => {
            print_check(engine.whitelist_check_combo(&provider, &payment)?, engine.now())
        }
    }
}

fn assoc(action: AssocAction, engine: &Engine, caller: Caller) -> anyhow::Result<()> {
    match action {
        AssocAction::Record { provider, payment } => {
            let outcome = engine.record_association(&provider, &payment)?;
            println!("{outcome:?}");
        }
        AssocAction::List { provider } => print_json(&engine.associations_for(&provider)?)?,
        AssocAction::On => {
            engine.set_propagation(caller, true)?;
            println!("association propagation enabled");
        }
        AssocAction::Off => {
            engine.set_propagation(caller, false)?;
            println!("association propagation disabled");
        }
        AssocAction::Status => {
            let state = if engine.propagation_enabled()? {
                "enabled"
            } else {
                "disabled"
            };
            println!("association propagation {state}");
        }
    }
    Ok(())
}

/// State summary plus the storage integrity check.
#[derive(Serialize)]
struct VerifyOutput {
    #[serde(flatten)]
    state: VerificationReport,
    integrity: IntegrityReport,
}

fn maint(
    action: MaintAction,
    engine: &Engine,
    env: &LmdbEnvironment,
    config: &EngineConfig,
    caller: Caller,
) -> anyhow::Result<()> {
    match action {
        MaintAction::Clear {
            mode,
            dry_run,
            keep_toggle,
            backup_dir,
        } => {
            if !dry_run {
                if !caller.is_admin() {
                    return Err(ReputationError::Unauthorized.into());
                }
                let dir = backup_dir.unwrap_or_else(|| config.data_dir.join("backups"));
                let path = write_backup(engine, &dir)?;
                println!("backup written to {}", path.display());
            }
            print_json(&engine.clear(caller, mode, dry_run, !keep_toggle)?)
        }
        MaintAction::Backup { path } => {
            let snapshot = engine.backup()?;
            backup::write_snapshot(&path, &snapshot)?;
            println!(
                "{} records written to {}",
                snapshot.record_count(),
                path.display()
            );
            Ok(())
        }
        MaintAction::Restore {
            path,
            mode,
            dry_run,
        } => {
            let snapshot = backup::read_snapshot(&path)?;
            print_json(&engine.restore(caller, &snapshot, mode, dry_run)?)
        }
        MaintAction::Verify { detail } => {
            let limit = if detail { config.recent_limit } else { 0 };
            let output = VerifyOutput {
                state: engine.verify(limit)?,
                integrity: env.check_integrity()?,
            };
            print_json(&output)?;
            if !output.integrity.is_healthy() {
                anyhow::bail!("integrity check found {} problems", output.integrity.errors.len());
            }
            Ok(())
        }
    }
}

fn write_backup(engine: &Engine, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating backup directory {}", dir.display()))?;
    let snapshot = engine.backup()?;
    let path = dir.join(format!("tronguard-{}.json", snapshot.created_at.as_secs()));
    backup::write_snapshot(&path, &snapshot)?;
    tracing::info!(path = %path.display(), records = snapshot.record_count(), "pre-clear backup written");
    Ok(path)
}
