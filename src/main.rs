use std::env;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bugflow::cli::{Cli, Command};
use bugflow::config::BugflowConfig;
use bugflow::ui::Printer;
use bugflow::{Accounts, JsonFileStore, Resolution, Role, SnapshotStore, StorageError, WorkflowEngine};

const DEMO_CREDENTIAL: &str = "demo";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = BugflowConfig::load()?;
    if let Some(path) = cli.store {
        config.snapshot_path = path;
        config.persist = true;
    }

    match cli.command {
        Command::Demo { description } => run_demo(&config, &description),
        Command::List => list_reports(&config),
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BUGFLOW_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "bugflow=debug,info"
        } else {
            "bugflow=info,warn"
        })
    });

    let format = env::var("BUGFLOW_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn demo_accounts() -> Result<Accounts> {
    let mut accounts = Accounts::new();
    for (name, role) in [
        ("u1", Role::User),
        ("analyst", Role::SystemAnalyst),
        ("dev", Role::Developer),
        ("qa", Role::QualityAssurance),
    ] {
        accounts.register(name, DEMO_CREDENTIAL, role)?;
        accounts.login(name, DEMO_CREDENTIAL)?;
    }
    Ok(accounts)
}

fn run_demo(config: &BugflowConfig, description: &str) -> Result<()> {
    let accounts = demo_accounts()?;
    let mut engine = if config.persist {
        WorkflowEngine::with_store(accounts, JsonFileStore::new(&config.snapshot_path))
    } else {
        WorkflowEngine::new(accounts)
    };
    let printer = Printer::default();

    let submitted = engine.submit_report("u1", description);
    printer.step("u1 submits the report", &submitted);
    let id = submitted?;

    printer.step("u1 tries to confirm it", &engine.confirm("u1", id));
    printer.step("analyst confirms", &engine.confirm("analyst", id));
    printer.step("dev starts development", &engine.start_development("dev", id));
    printer.step(
        "dev marks it fixed",
        &engine.mark_fixed("dev", id, Resolution::Fixed, "patch applied"),
    );
    printer.step("qa approves the fix", &engine.approve_fix("qa", id));

    println!();
    printer.reports(&engine.reports());
    Ok(())
}

fn list_reports(config: &BugflowConfig) -> Result<()> {
    let store = JsonFileStore::new(&config.snapshot_path);
    let printer = Printer::default();
    match store.load() {
        Ok(snapshot) => printer.reports(&snapshot.reports),
        Err(StorageError::NotFound { .. }) => printer.reports(&[]),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
