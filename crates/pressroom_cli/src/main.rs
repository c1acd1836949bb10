//! CLI boot probe.
//!
//! `pressroom_cli [config.json]` boots a site and prints what it loaded.
//! Without a config file an in-memory development site is booted.

use pressroom_core::config::ENV_OVERRIDE_VAR;
use pressroom_core::{core_version, init_logging, PressroomConfig, Site};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match PressroomConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("pressroom: cannot load config `{path}`: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => PressroomConfig::for_env(
            std::env::var(ENV_OVERRIDE_VAR).unwrap_or_else(|_| "development".to_string()),
        ),
    };

    if let Err(err) = init_logging(&config.logging) {
        eprintln!("pressroom: logging disabled: {err}");
    }

    let site = match Site::boot(config) {
        Ok(site) => site,
        Err(err) => {
            eprintln!("pressroom: boot failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "event=cli_probe module=cli status=ok settings={}",
        site.cache().len()
    );
    println!("pressroom_core version={}", core_version());
    println!("pressroom env={}", site.config.env);
    println!("pressroom settings={}", site.cache().len());
    ExitCode::SUCCESS
}
