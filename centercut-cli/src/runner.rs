use std::path::Path;

use centercut_lib::EngineSettings;
use clap::ArgMatches;
use log::info;

use crate::cli;
use crate::error::CliError;
use crate::{info, mix, separate};

pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    info!("Starting centercut");
    if let Some(code) = cli::bench::maybe_run_bench(args)? {
        return Ok(code);
    }

    match args.subcommand() {
        Some(("separate", sub)) => separate::run(sub),
        Some(("mix", sub)) => mix::run(sub),
        Some(("info", sub)) => info::run(sub),
        Some(("create", sub)) => run_create(sub),
        _ => Err(CliError::Usage("no command given, see --help".to_string())),
    }
}

fn run_create(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("settings-json", _)) => {
            let json = serde_json::to_string_pretty(&EngineSettings::default())
                .map_err(|err| CliError::Usage(err.to_string()))?;
            println!("{}", json);
            Ok(0)
        }
        _ => Err(CliError::Usage(
            "create needs a payload name, e.g. settings-json".to_string(),
        )),
    }
}

/// Load `--settings` if given, defaults otherwise.
pub fn load_settings(args: &ArgMatches) -> Result<EngineSettings, CliError> {
    match args.get_one::<String>("settings") {
        Some(path) => {
            let json = std::fs::read_to_string(Path::new(path))?;
            let settings = EngineSettings::from_json(&json)?;
            info!("loaded settings from {}", path);
            Ok(settings)
        }
        None => Ok(EngineSettings::default()),
    }
}
