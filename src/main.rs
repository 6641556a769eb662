// main.rs
// Command-line driver: generate tubes, run single cascades, pulses or interactive frames

use std::env;
use std::process::ExitCode;

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use pmt_sim::interactive::FrameStats;
use pmt_sim::pulse::{simulate_pulse, Tube};
use pmt_sim::scenario::Scenario;
use pmt_sim::{PmtError, Result};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let rest = &args[2..];
    let outcome = match args[1].as_str() {
        "generate" => generate(rest),
        "cascade" => cascade(rest),
        "pulse" => pulse(rest),
        "frames" => frames(rest),
        other => Err(PmtError::InvalidScenario(format!("unknown command `{}`", other))),
    };

    #[cfg(feature = "profiling")]
    pmt_sim::PROFILER.lock().log_and_clear();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Usage: pmt_sim <command> [options]\n");
    println!("Commands:");
    println!("  generate <out.toml> [dinodes] [spacing_mm] [voltage_step]");
    println!("                                        Write a straight-tube scenario");
    println!("  cascade <scenario.toml> [--energy EV] [--along F] [--seed S] [--json]");
    println!("                                        One photoelectron through the exact engine");
    println!("  pulse <scenario.toml> [--photons N] [--seed S] [--json]");
    println!("                                        Many photoelectrons in parallel");
    println!("  frames <scenario.toml> [--frames N] [--photons N] [--seed S] [--json]");
    println!("                                        Run the interactive engine headless\n");
    println!("Set RUST_LOG=debug for per-strike detail.");
}

/// Value following `--name`, parsed.
fn flag<T: std::str::FromStr>(args: &[String], name: &str) -> Result<Option<T>> {
    match args.iter().position(|a| a == name) {
        None => Ok(None),
        Some(i) => {
            let raw = args
                .get(i + 1)
                .ok_or_else(|| PmtError::InvalidScenario(format!("{} needs a value", name)))?;
            raw.parse()
                .map(Some)
                .map_err(|_| PmtError::InvalidScenario(format!("bad value `{}` for {}", raw, name)))
        }
    }
}

fn positional<T: std::str::FromStr>(args: &[String], index: usize, default: T) -> Result<T> {
    match args.get(index) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| PmtError::InvalidScenario(format!("bad argument `{}`", raw))),
    }
}

fn scenario_path(args: &[String]) -> Result<&str> {
    args.first()
        .map(|s| s.as_str())
        .ok_or_else(|| PmtError::InvalidScenario("missing scenario file".into()))
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn generate(args: &[String]) -> Result<()> {
    let out = scenario_path(args)?;
    let dinodes = positional(args, 1, 8usize)?;
    let spacing = positional(args, 2, 10.0f64)?;
    let step = positional(args, 3, 100.0f64)?;
    let scenario = Scenario::linear(dinodes, spacing, step);
    scenario.validate()?;
    scenario.save(out)?;
    info!("wrote {}-dinode tube to {}", dinodes, out);
    Ok(())
}

#[derive(Serialize)]
struct CascadeSummary {
    termination: String,
    terminal_gain: f64,
    arrival_time: Option<f64>,
    dynode_hits: Vec<usize>,
    generations: usize,
    total_steps: usize,
    samples: usize,
}

fn cascade(args: &[String]) -> Result<()> {
    let scenario = Scenario::load(scenario_path(args)?)?;
    let energy = flag(args, "--energy")?.unwrap_or(scenario.pulse.energy_ev);
    let along = flag(args, "--along")?.unwrap_or(0.5);
    let seed = flag(args, "--seed")?.unwrap_or(scenario.pulse.seed);

    let components = scenario.components();
    let field = scenario.exact_field(&components);
    let tube = Tube::new(&components, &field, &scenario.exact)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let result = tube.launch(along, energy, &mut rng);

    if args.iter().any(|a| a == "--json") {
        return emit(&result);
    }
    let summary = CascadeSummary {
        termination: format!("{:?}", result.termination),
        terminal_gain: result.terminal_gain,
        arrival_time: result.arrival_time,
        dynode_hits: result.dynode_hits().collect(),
        generations: result.generations,
        total_steps: result.total_steps,
        samples: result.positions.len(),
    };
    emit(&summary)
}

fn pulse(args: &[String]) -> Result<()> {
    let scenario = Scenario::load(scenario_path(args)?)?;
    let mut settings = scenario.pulse.clone();
    if let Some(n) = flag(args, "--photons")? {
        settings.photons = n;
    }
    if let Some(s) = flag(args, "--seed")? {
        settings.seed = s;
    }

    let components = scenario.components();
    let field = scenario.exact_field(&components);
    let tube = Tube::new(&components, &field, &scenario.exact)?;
    let report = simulate_pulse(&tube, &settings);

    if args.iter().any(|a| a == "--json") {
        return emit(&report);
    }
    println!("photoelectrons       {}", report.photons());
    println!("collection           {:.1}%", report.collection_efficiency * 100.0);
    println!("mean gain            {:.4e}", report.mean_gain);
    println!("gain std             {:.4e}", report.gain_variance.sqrt());
    println!("mean transit         {:.4e} s", report.mean_transit_time);
    println!("transit spread       {:.4e} s", report.transit_time_spread);
    println!("anode charge         {:.4e} C", report.anode_charge);
    println!("dinode strikes       {:?}", report.dynode_strikes);
    println!("step / depth capped  {} / {}", report.step_capped, report.depth_capped);
    Ok(())
}

#[derive(Serialize)]
struct FrameRun {
    frames: Vec<FrameStats>,
    anode_current: u64,
}

fn frames(args: &[String]) -> Result<()> {
    let scenario = Scenario::load(scenario_path(args)?)?;
    let count = flag(args, "--frames")?.unwrap_or(600usize);
    let photons = flag(args, "--photons")?.unwrap_or(30usize);
    let seed = flag(args, "--seed")?.unwrap_or(scenario.pulse.seed);

    let mut sim = scenario.interactive_sim(seed)?;
    sim.start();
    let mut run = FrameRun {
        frames: Vec::with_capacity(count),
        anode_current: 0,
    };
    for frame in 0..count {
        if frame < photons {
            sim.emit_photon();
        }
        if let Some(stats) = sim.tick() {
            run.frames.push(stats);
        }
    }
    sim.stop();
    run.anode_current = sim.anode_current;

    if args.iter().any(|a| a == "--json") {
        return emit(&run);
    }
    let peak = run.frames.iter().map(|s| s.electrons).max().unwrap_or(0);
    let strikes: usize = run.frames.iter().map(|s| s.dinode_strikes).sum();
    let dropped: usize = run.frames.iter().map(|s| s.dropped).sum();
    println!("frames               {}", run.frames.len());
    println!("anode current        {}", run.anode_current);
    println!("dinode strikes       {}", strikes);
    println!("peak electrons       {}", peak);
    println!("dropped at cap       {}", dropped);
    Ok(())
}
