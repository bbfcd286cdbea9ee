#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Ridge Defence battle without a scene.

mod config;
mod headless;

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ridge_defence_core::{CellCoord, Event, GameStatus, MapDefinition, UnitCatalog};
use ridge_defence_system_session::{Session, SessionError, Timeline};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Action, Overrides, RunConfig, Settings},
    headless::HeadlessFactory,
};

/// Runs a battle headlessly and prints every simulation event.
#[derive(Debug, Parser)]
#[command(name = "ridge-defence", version)]
struct Args {
    /// Map definition (JSON).
    #[arg(long)]
    map: PathBuf,
    /// Unit catalogue (JSON).
    #[arg(long)]
    units: PathBuf,
    /// Run configuration with loop parameters and scripted actions (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Nominal frame interval in milliseconds.
    #[arg(long)]
    frame_ms: Option<f32>,
    /// Timeline limit in seconds.
    #[arg(long)]
    max_seconds: Option<f32>,
    /// Seed of the frame jitter generator.
    #[arg(long)]
    seed: Option<u64>,
    /// Relative frame jitter in `[0, 1)`.
    #[arg(long)]
    jitter: Option<f32>,
}

/// Entry point for the Ridge Defence command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let map: MapDefinition = load_json(&args.map, "map definition")?;
    let catalog: UnitCatalog = load_json(&args.units, "unit catalogue")?;
    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let settings = config.settings(Overrides {
        frame_ms: args.frame_ms,
        max_seconds: args.max_seconds,
        seed: args.seed,
        jitter: args.jitter,
    })?;

    let factory = HeadlessFactory::new(&map, &catalog);
    let session = Session::new(map, catalog, factory).context("failed to build the battle")?;
    let status = run(session, config.into_script(), settings)?;
    info!(?status, "run complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {what} {}", path.display()))
}

fn run(
    mut session: Session<HeadlessFactory>,
    mut script: VecDeque<Action>,
    settings: Settings,
) -> Result<GameStatus> {
    let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
    let mut events = Vec::new();
    let mut status = session.start(&mut events);
    report(session.timeline(), &mut events);

    while !status.is_terminal() && session.timeline().elapsed() < settings.max_seconds {
        let jitter = rng.gen_range(-settings.jitter..=settings.jitter);
        let interval = settings.frame * (1.0 + jitter);
        status = session
            .advance(interval, &mut events)
            .with_context(|| format!("simulation fault at {}", session.timeline()))?;

        while script
            .front()
            .map_or(false, |action| action.at() <= session.timeline().elapsed())
        {
            if let Some(action) = script.pop_front() {
                perform(&mut session, action, &mut events)?;
            }
        }
        report(session.timeline(), &mut events);
    }

    if status.is_terminal() {
        println!("{} battle finished: {status:?}", session.timeline());
    } else {
        println!("{} time limit reached", session.timeline());
    }
    let economy = session.economy();
    println!(
        "life {} / enemies left {} / cost {:.1}",
        economy.life_points(),
        economy.remaining_enemies(),
        economy.cost()
    );
    Ok(status)
}

fn perform(
    session: &mut Session<HeadlessFactory>,
    action: Action,
    events: &mut Vec<Event>,
) -> Result<()> {
    let outcome = match action {
        Action::Deploy {
            operator,
            x,
            z,
            facing,
            ..
        } => session
            .deploy_operator(&operator, CellCoord::new(x, z), facing, events)
            .map(|_| ()),
        Action::Withdraw { operator, .. } => {
            session.withdraw_operator(&operator, events).map(|_| ())
        }
    };
    match outcome {
        Ok(()) => Ok(()),
        Err(SessionError::Simulation(fault)) => {
            Err(fault).context("scripted action hit an integrity fault")
        }
        Err(rejection) => {
            warn!(%rejection, "scripted action skipped");
            Ok(())
        }
    }
}

fn report(timeline: &Timeline, events: &mut Vec<Event>) {
    for event in events.drain(..) {
        println!("{timeline} {}", describe(&event));
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::EnemySpawned {
            enemy, name, cell, ..
        } => format!("enemy #{} `{name}` spawned on {cell}", enemy.get()),
        Event::WaypointReached { enemy, cell } => {
            format!("enemy #{} reached {cell}", enemy.get())
        }
        Event::EnemyLeaked { enemy, name, .. } => {
            format!("enemy #{} `{name}` leaked", enemy.get())
        }
        Event::OperatorDeployed {
            name,
            cell,
            facing,
            remaining_slots,
        } => format!(
            "operator `{name}` deployed on {cell} facing {facing:?}, {remaining_slots} slots left"
        ),
        Event::OperatorWithdrawn {
            name,
            refund,
            next_cost,
            ..
        } => format!(
            "operator `{name}` withdrawn, refunded {refund}, next cost {next_cost}"
        ),
        Event::StatusChanged { status } => format!("status {status:?}"),
    }
}
