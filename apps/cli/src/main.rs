// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: evaluate, snap and place parts in a gear-train scene file
//!
//! Usage:
//!   geartrain <command> <scene.json> [options]

mod config;

use std::env;
use std::fs;

use anyhow::{anyhow, bail, Context, Result};
use geartrain_lite_mechanics::{find_free_spot_with, resolve_snap, EngineConfig, PartId, Scene};
use serde_json::Value;

use config::Config;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Evaluate,
    Snap { part: PartId },
    FreeSpot { x: f64, y: f64, radius: f64 },
}

#[derive(Debug, Clone, PartialEq)]
struct Invocation {
    command: Command,
    scene_path: String,
    config_path: Option<String>,
    output_path: Option<String>,
    pretty: bool,
}

fn number<T: std::str::FromStr>(args: &[String], i: usize, what: &str) -> Result<T> {
    let raw = args.get(i).ok_or_else(|| anyhow!("missing {}", what))?;
    raw.parse().map_err(|_| anyhow!("invalid {}: {}", what, raw))
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let name = args.first().map(String::as_str).ok_or_else(|| anyhow!("missing command"))?;

    let (command, mut i) = match name {
        "evaluate" => (Command::Evaluate, 1),
        "snap" => (
            Command::Snap {
                part: number(args, 1, "part id")?,
            },
            2,
        ),
        "free-spot" => (
            Command::FreeSpot {
                x: number(args, 1, "x")?,
                y: number(args, 2, "y")?,
                radius: number(args, 3, "radius")?,
            },
            4,
        ),
        other => bail!("unknown command: {}", other),
    };

    let scene_path = args
        .get(i)
        .cloned()
        .ok_or_else(|| anyhow!("missing scene file"))?;
    i += 1;

    let mut invocation = Invocation {
        command,
        scene_path,
        config_path: None,
        output_path: None,
        pretty: false,
    };

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                invocation.config_path =
                    Some(args.get(i).cloned().ok_or_else(|| anyhow!("--config needs a path"))?);
            }
            "--output" => {
                i += 1;
                invocation.output_path =
                    Some(args.get(i).cloned().ok_or_else(|| anyhow!("--output needs a path"))?);
            }
            "--pretty" => invocation.pretty = true,
            other => bail!("unknown option: {}", other),
        }
        i += 1;
    }

    Ok(invocation)
}

fn run(invocation: &Invocation, engine: &EngineConfig) -> Result<Value> {
    let json = fs::read_to_string(&invocation.scene_path)
        .with_context(|| format!("reading scene {}", invocation.scene_path))?;
    let scene = Scene::from_json(&json)
        .with_context(|| format!("loading scene {}", invocation.scene_path))?;
    tracing::info!(
        parts = scene.parts.len(),
        belts = scene.belts.len(),
        structures = scene.structures.len(),
        "loaded scene"
    );

    let value = match &invocation.command {
        Command::Evaluate => {
            let evaluation = scene.evaluate(engine);
            for train in &evaluation.drivetrains {
                tracing::info!(
                    motor = train.motor,
                    groups = train.axle_groups.len(),
                    jammed = train.jammed,
                    stalled = train.stalled,
                    "drivetrain"
                );
            }
            serde_json::to_value(&evaluation)?
        }
        Command::Snap { part } => {
            let target = scene
                .part(*part)
                .ok_or_else(|| anyhow!("part {} not in scene", part))?;
            let snap = resolve_snap(target, &scene.parts, &scene.structures, &engine.placement);
            tracing::info!(part, rule = ?snap.rule, "snapped");
            serde_json::to_value(snap.apply(target))?
        }
        Command::FreeSpot { x, y, radius } => serde_json::to_value(find_free_spot_with(
            *x,
            *y,
            *radius,
            &scene.parts,
            &scene.structures,
            &engine.placement,
        ))?,
    };
    Ok(value)
}

fn print_usage() {
    println!("GearTrain-Lite scene tool");
    println!();
    println!("Usage: geartrain <command> <scene.json> [options]");
    println!();
    println!("Commands:");
    println!("  evaluate                   Recompute connections and kinematics");
    println!("  snap <part-id>             Print the snapped pose of a part");
    println!("  free-spot <x> <y> <radius> Print a free spot near (x, y)");
    println!();
    println!("Options:");
    println!("  --config <path>   Engine tolerances (JSON, overrides GEARTRAIN_CONFIG)");
    println!("  --output <path>   Write the result to a file instead of stdout");
    println!("  --pretty          Pretty-print JSON");
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_usage();
        return Ok(());
    }

    let config = Config::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let invocation = parse_args(&args)?;
    let engine = config.engine_config(invocation.config_path.as_deref())?;
    let value = run(&invocation, &engine)?;

    let rendered = if invocation.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };

    match &invocation.output_path {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {}", path))?;
            tracing::info!(path = %path, "wrote result");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
