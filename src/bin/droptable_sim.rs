//! Drop table alteration dry runs
//!
//! Loads a JSON scenario (drop tables, rules and holders) and prints what the
//! rules would do to every holder.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use serde::Deserialize;

use droptables::serialization::read_json;
use droptables::{
    AlterationResult, AlterationRule, DropTableDef, DropsConfig, DropsPatcher, InMemoryDropTables,
    InMemoryDropable, ItemId, TargetType,
};

/// Tool configuration
struct Config {
    /// Scenario file
    scenario: PathBuf,
    /// Optional drops config file
    config: Option<PathBuf>,
    /// Apply to the holders and print them afterwards
    live: bool,
    /// Debug logging
    verbose: bool,
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut scenario = None;
    let mut config = None;
    let mut live = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --config requires a value");
                    std::process::exit(1);
                }
            }
            "--live" => {
                live = true;
                i += 1;
            }
            "--verbose" | "-v" => {
                verbose = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("droptable-sim - dry runs for drop table alterations");
                println!();
                println!("USAGE:");
                println!("    droptable-sim [OPTIONS] <SCENARIO>");
                println!();
                println!("OPTIONS:");
                println!("    -c, --config <FILE>       Drops config (JSON)");
                println!("        --live                Apply alterations and print the altered holders");
                println!("    -v, --verbose             Debug logging");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
            path => {
                scenario = Some(PathBuf::from(path));
                i += 1;
            }
        }
    }

    let Some(scenario) = scenario else {
        eprintln!("error: missing scenario file");
        std::process::exit(1);
    };
    Config {
        scenario,
        config,
        live,
        verbose,
    }
}

#[derive(Debug, Deserialize)]
struct HolderGroup {
    target_type: TargetType,
    label: String,
    #[serde(default)]
    dropables: Vec<InMemoryDropable>,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    tables: Vec<DropTableDef>,
    #[serde(default)]
    rules: Vec<AlterationRule>,
    #[serde(default)]
    items: HashMap<i32, String>,
    #[serde(default)]
    holders: Vec<HolderGroup>,
}

fn run(config: &Config) -> AlterationResult<()> {
    let drops_config = match &config.config {
        Some(path) => DropsConfig::load(path)?,
        None => DropsConfig::default(),
    };
    let scenario: Scenario = read_json("scenario", &config.scenario)?;

    let tables: InMemoryDropTables = scenario.tables.into_iter().collect();
    let catalog: HashMap<ItemId, String> = scenario
        .items
        .into_iter()
        .map(|(id, name)| (ItemId(id), name))
        .collect();
    let mut patcher =
        DropsPatcher::new(drops_config, Arc::new(tables)).with_catalog(Arc::new(catalog));

    let active = patcher.load_rules(scenario.rules);
    println!("{active} active alteration rules");
    if let Some(errors) = patcher.validate() {
        println!("Validation errors:");
        for error in errors {
            println!("  - {error}");
        }
    }

    for mut group in scenario.holders {
        if group.target_type == TargetType::Merchant && !config.live {
            for report in patcher.simulate_merchants(&group.dropables) {
                println!("{report}");
            }
            continue;
        }
        let patch = patcher.patch_group(
            group.target_type,
            &group.label,
            &mut group.dropables,
            !config.live,
        );
        if let Some(report) = patch.report {
            println!("{report}");
        } else if !patch.changed {
            println!("Will not update {}", group.label);
        }
        if config.live && patch.changed {
            let json = serde_json::to_string_pretty(&group.dropables)
                .map_err(|e| {
                    droptables::AlterationError::internal(format!("serialize holders: {e}"))
                })?;
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let config = parse_args();

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
