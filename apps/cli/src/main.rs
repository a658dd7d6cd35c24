#![deny(warnings)]

//! Headless CLI that plays a scripted scenario week by week and reports the
//! verdict.

use anyhow::{Context, Result};
use band_chains::ChainCatalog;
use band_goals::goal_percentage;
use band_runtime::{run_weeks, RunScript};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const DEMO_SCRIPT: &str = include_str!("../../../assets/runs/demo.yaml");
const DEFAULT_WEEKS: u32 = 104;

struct Args {
    script: Option<PathBuf>,
    chains: Option<PathBuf>,
    weeks: Option<u32>,
}

fn parse_args() -> Args {
    let mut args = Args {
        script: None,
        chains: None,
        weeks: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--script" => args.script = it.next().map(PathBuf::from),
            "--chains" => args.chains = it.next().map(PathBuf::from),
            "--weeks" => args.weeks = it.next().and_then(|s| s.parse().ok()),
            _ => {}
        }
    }
    args
}

fn load_script(path: Option<&PathBuf>) -> Result<RunScript> {
    let text = match path {
        Some(p) => fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?,
        None => DEMO_SCRIPT.to_string(),
    };
    Ok(RunScript::from_yaml_str(&text)?)
}

fn load_catalog(extra: Option<&PathBuf>) -> Result<ChainCatalog> {
    let mut catalog = ChainCatalog::builtin()?;
    if let Some(p) = extra {
        let text = fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
        catalog.extend(ChainCatalog::from_yaml_str(&text)?)?;
    }
    Ok(catalog)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(script = ?args.script, chains = ?args.chains, weeks = ?args.weeks, "starting CLI");

    let script = load_script(args.script.as_ref())?;
    let catalog = load_catalog(args.chains.as_ref())?;
    let n_chains = catalog.len();
    let summary = run_weeks(&script, catalog, args.weeks.unwrap_or(DEFAULT_WEEKS));

    println!(
        "Scenario {} | weeks: {} | money: ${} | fame: {} | streams: {} | chains: {}/{}",
        script.scenario.display_name(),
        summary.weeks_run,
        summary.final_state.money,
        summary.final_state.fame,
        summary.final_state.total_streams,
        summary.consequences.active_chains.len(),
        n_chains,
    );
    for goal in &script.scenario.goals {
        if let Some(entry) = summary.progress.progress.get(&goal.id) {
            println!("Goal {} | {}%", goal.id, goal_percentage(entry));
        }
    }
    if !summary.featured_events.is_empty() {
        println!("Events | {}", summary.featured_events.join(", "));
    }
    match &summary.verdict {
        Some(verdict) => println!("{}", serde_json::to_string_pretty(verdict)?),
        None => println!("No verdict after {} weeks", summary.weeks_run),
    }

    Ok(())
}
