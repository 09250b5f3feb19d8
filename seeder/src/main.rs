use std::process::ExitCode;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use sprout::bootstrap;
use sprout::error::Result;
use sprout::store::MemoryStore;

use crate::config::Config;
use crate::flags::{Seeder, SeederCmd};

mod config;
mod flags;
mod report;

fn init_logging(verbose: u32) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn run(flags: Seeder) -> Result<()> {
    let config = Config::discover(flags.subcommand.dir(), flags.store.as_deref())?;
    let mut store = MemoryStore::open(&config.store)?;
    tracing::debug!(store = %config.store.display(), "opened store");

    let failures = match flags.subcommand {
        SeederCmd::Content(cmd) => {
            let owner = bootstrap::owner(&store, &cmd.owner)?;
            let globals = &config.settings.globals;
            let summary = bootstrap::content(&mut store, &config.dir, owner, cmd.dry_run, globals)?;
            report::content(&summary, cmd.dry_run);
            if cmd.dry_run {
                return check_failures(summary.instantiated.failures.len(), "no changes were made");
            }

            summary.instantiated.failures.len()
        }
        SeederCmd::Assets(cmd) => {
            let owner = bootstrap::owner(&store, &cmd.owner)?;
            let summary = bootstrap::assets(&mut store, &config.dir, &config.media, owner)?;
            report::assets(&summary);
            0
        }
        SeederCmd::Models(_) => {
            report::models(&bootstrap::models(&mut store, &config.dir)?);
            0
        }
        SeederCmd::Users(_) => {
            report::users(&bootstrap::users(&mut store, &config.dir)?);
            0
        }
    };

    store.persist(&config.store)?;
    check_failures(failures, config.store.display())
}

/// Fails the run when any page could not be created.
fn check_failures(failures: usize, store: impl std::fmt::Display) -> Result<()> {
    if failures > 0 {
        return sprout::err! {
            "some pages could not be created",
            "failures" => failures,
            "store" => store,
        };
    }

    Ok(())
}

pub fn main() -> ExitCode {
    let flags = Seeder::from_env_or_exit();
    init_logging(flags.verbose);
    match run(flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_failures_fail_the_run() {
        assert!(check_failures(0, "store.json").is_ok());
        assert!(check_failures(2, "no changes were made").is_err());
    }

    #[test]
    fn dry_runs_with_failures_fail() {
        let content = tempfile::tempdir().unwrap();
        let root = content.path();
        std::fs::create_dir_all(root.join("pages")).unwrap();
        std::fs::write(root.join("schema.toml"), "[types.\"core.HomePage\"]\nbody = \"scalar\"\n").unwrap();
        std::fs::write(root.join("pages/home.yml"), "---\npath: /\ntype: core.HomePage\n").unwrap();
        std::fs::write(root.join("users.yml"), "- username: admin\n  password: secret\n").unwrap();

        let store = root.join("store.json");
        let store = store.to_str().unwrap();
        let dir = root.to_str().unwrap();
        let users = Seeder::from_vec(vec!["--store".into(), store.into(), "users".into(), dir.into()]).unwrap();
        run(users).unwrap();

        let content = Seeder::from_vec(vec![
            "--store".into(), store.into(),
            "content".into(), dir.into(), "--owner".into(), "admin".into(), "--dry-run".into(),
        ]).unwrap();

        assert!(run(content).is_err());
    }
}
