use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::info;

use super::commands::{Cli, Command};
use crate::config::{Config, ConfigLoader};
use crate::constants::{DEFAULT_PILL, EXIT_SUCCESS};
use crate::control::{ControlBridge, RetryPolicy, SystemBus};
use crate::daemon::{self, DaemonSettings};
use crate::logging::setup_logging;
use crate::manager::{Backends, PillManager};
use crate::process::{current_user_name, OsPriority, SysinfoSource};
use crate::{entry_message, error_message, success_message, warning_message};

const EXIT_FAILURE: i32 = 1;

/// Parses the command line, runs the command and returns the process exit code.
pub fn process_command() -> i32 {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            error_message!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<i32> {
    let _guard = setup_logging(cli.log_file.as_deref(), cli.verbose)?;
    let config_path = ConfigLoader::resolve_path(cli.config.as_deref())?;

    match cli.command.unwrap_or_default() {
        Command::Check => check(&config_path),
        Command::Reset => {
            let config = ConfigLoader::load(&config_path)?;
            let mut manager = build_manager(&config)?;
            manager.reset();
            success_message!("Applied the '{}' pill", DEFAULT_PILL);
            Ok(EXIT_SUCCESS)
        }
        Command::Run => {
            let config = ConfigLoader::load(&config_path)?;
            // connect before the runtime exists: the bus calls are blocking
            let manager = build_manager(&config)?;
            let settings = DaemonSettings {
                scan_interval: config.scan_interval,
                config_path: Some(config_path),
            };
            info!("pillz {} started", env!("CARGO_PKG_VERSION"));
            let runtime =
                tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
            let code = runtime.block_on(daemon::run(manager, settings));
            // an abandoned reset must not keep the process alive
            runtime.shutdown_background();
            code
        }
    }
}

fn check(config_path: &Path) -> Result<i32> {
    let config = ConfigLoader::load(config_path)?;

    success_message!("{} is valid", config_path.display());
    println!("Scan interval: {:?}", config.scan_interval);

    println!("Triggers (first match wins):");
    for (substring, pill) in config.triggers.iter() {
        entry_message!(substring, pill);
        if !config.pills.contains(pill) {
            warning_message!("'{}' is not defined", pill);
        }
    }

    println!("Pills:");
    for pill in config.pills.iter() {
        let settings = pill
            .settings
            .iter()
            .map(|setting| setting.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        entry_message!(pill.name.as_str(), settings);
    }

    if !config.blacklist.is_empty() {
        let mut blacklist: Vec<&str> = config.blacklist.iter().map(String::as_str).collect();
        blacklist.sort_unstable();
        println!("Never matched: {}", blacklist.join(", "));
    }

    Ok(EXIT_SUCCESS)
}

fn build_manager(config: &Config) -> Result<PillManager> {
    let user = current_user_name()?;

    let mut bridge = ControlBridge::new(Box::new(SystemBus), RetryPolicy::default());
    bridge
        .connect()
        .context("Couldn't reach the control services on the system bus")?;

    let backends = Backends {
        source: Box::new(SysinfoSource::new()),
        bridge,
        priority: Box::new(OsPriority),
    };
    Ok(PillManager::new(config, user, backends))
}
