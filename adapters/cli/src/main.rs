#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Hellguard campaign headlessly.

mod autopilot;
mod presenter;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use hellguard_core::{Campaign, Command, Event};
use hellguard_rendering::Choreographer;
use hellguard_system_adversary::{self as adversary, Adversary};
use hellguard_system_level_setup::{self as level_setup, LevelSetup};
use hellguard_system_player_control::PlayerControl;
use hellguard_world::{self as world, World};

use crate::{autopilot::Autopilot, presenter::LogPresenter};

/// Runs a campaign with a scripted player and logs what happens.
#[derive(Debug, Parser)]
#[command(name = "hellguard", about = "Headless Hellguard campaign runner")]
struct Cli {
    /// Campaign TOML file. The built-in campaign is played when omitted.
    #[arg(long)]
    campaign: Option<PathBuf>,
    /// Seed shared by every random decision of the run.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of simulated frames after which the run stops.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u32,
    /// Length of a simulated frame in milliseconds.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Log every decision and presentation request.
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the Hellguard command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let campaign = match &cli.campaign {
        Some(path) => load_campaign(path)?,
        None => Campaign::default(),
    }
    .validate()
    .context("campaign is not playable")?;

    let mut session = Session::new(campaign, cli.seed);
    let dt = Duration::from_millis(cli.tick_ms.max(1));
    let ticks = session.run(cli.max_ticks, dt)?;

    if session.setup.is_complete() {
        println!("campaign complete after {ticks} ticks");
    } else {
        println!(
            "stopped after {ticks} ticks on level {}",
            session.setup.current_level() + 1
        );
    }
    println!(
        "presented {} tweens and {} cues",
        session.presenter.tweens(),
        session.presenter.cues()
    );
    Ok(())
}

fn load_campaign(path: &Path) -> Result<Campaign> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read campaign at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse campaign toml at {}", path.display()))
}

/// World plus every system, pumped one frame at a time.
struct Session {
    world: World,
    setup: LevelSetup,
    player: PlayerControl,
    adversary: Adversary,
    autopilot: Autopilot,
    choreographer: Choreographer,
    presenter: LogPresenter,
}

impl Session {
    fn new(campaign: Campaign, seed: u64) -> Self {
        Self {
            world: World::new(),
            setup: LevelSetup::new(level_setup::Config::new(seed), campaign),
            player: PlayerControl::default(),
            adversary: Adversary::new(adversary::Config::new(seed.wrapping_add(1))),
            autopilot: Autopilot::new(seed.wrapping_add(2)),
            choreographer: Choreographer::new(),
            presenter: LogPresenter::default(),
        }
    }

    /// Plays until the campaign completes or `max_ticks` frames elapsed.
    /// Returns the number of frames simulated.
    fn run(&mut self, max_ticks: u32, dt: Duration) -> Result<u32> {
        let mut commands = Vec::new();
        self.setup.begin(&mut commands);
        self.pump(commands)?;

        let mut ticks = 0;
        while ticks < max_ticks && !self.setup.is_complete() {
            let mut commands = Vec::new();
            self.autopilot.decide(&self.world, &self.player, &mut commands);
            commands.push(Command::Tick { dt });
            self.pump(commands)?;
            ticks += 1;
        }
        Ok(ticks)
    }

    fn pump(&mut self, mut commands: Vec<Command>) -> Result<()> {
        while !commands.is_empty() {
            let mut events: Vec<Event> = Vec::new();
            for command in std::mem::take(&mut commands) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.choreographer
                .present(&events, &self.world, &mut self.presenter)
                .context("presentation failed")?;
            self.setup.handle(&events, &self.world, &mut commands);
            self.player.handle(&events, &self.world, &mut commands);
            self.adversary.handle(&events, &self.world, &mut commands);
        }
        Ok(())
    }
}
