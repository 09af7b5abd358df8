use std::{fs, path::PathBuf};

use anyhow::Context;
use blockfall_engine::{
    GameConfig, GameState, GravityOutcome, LockResult, PieceSeed, RotationDirection, TSpin,
};
use clap::ValueEnum;
use rand::Rng as _;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Piece seed as 32 hex digits (random if omitted)
    #[arg(long, conflicts_with = "resume")]
    seed: Option<PieceSeed>,
    /// Game configuration JSON file
    #[arg(long, conflicts_with = "resume")]
    config: Option<PathBuf>,
    /// Snapshot file to resume instead of starting a new game
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Whitespace-separated actions, applied after those of `--actions-file`
    #[arg(long)]
    actions: Option<String>,
    /// File with whitespace-separated actions (`#` starts a comment)
    #[arg(long)]
    actions_file: Option<PathBuf>,
    /// Output snapshot file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    Left,
    Right,
    SoftDrop,
    HardDrop,
    RotateCw,
    RotateCcw,
    #[value(name = "rotate180")]
    Rotate180,
    Hold,
    Gravity,
}

#[derive(Debug, Default)]
struct Summary {
    applied: usize,
    rejected: usize,
    locks: usize,
    lines_cleared: usize,
    t_spins: usize,
}

impl Summary {
    fn record_lock(&mut self, result: LockResult) {
        self.locks += 1;
        self.lines_cleared += result.lines_cleared;
        if result.t_spin == TSpin::Full && result.lines_cleared > 0 {
            self.t_spins += 1;
        }
    }
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let mut game = match &arg.resume {
        Some(path) => util::load_game(path)?,
        None => new_game(arg)?,
    };

    let mut actions = vec![];
    if let Some(path) = &arg.actions_file {
        let script = fs::read_to_string(path)
            .with_context(|| format!("Failed to read actions file: {}", path.display()))?;
        actions.extend(
            parse_actions(&script)
                .with_context(|| format!("Invalid actions file: {}", path.display()))?,
        );
    }
    if let Some(script) = &arg.actions {
        actions.extend(parse_actions(script).context("Invalid --actions")?);
    }

    eprintln!("Applying {} actions...", actions.len());
    let mut summary = Summary::default();
    for (i, &action) in actions.iter().enumerate() {
        if game.is_game_over() {
            eprintln!(
                "Game over after {i} actions, skipping the remaining {}",
                actions.len() - i
            );
            break;
        }
        apply(&mut game, action, &mut summary);
    }
    eprintln!(
        "Applied {} actions ({} rejected): {} pieces locked, {} lines cleared, {} T-spins",
        summary.applied, summary.rejected, summary.locks, summary.lines_cleared, summary.t_spins
    );
    eprintln!(
        "Score {}, level {}, lines {}",
        game.stats().score(),
        game.stats().level(),
        game.stats().lines()
    );

    util::save_game(&game, arg.output.as_deref())?;
    Ok(())
}

fn new_game(arg: &SimulateArg) -> anyhow::Result<GameState> {
    let config = match &arg.config {
        Some(path) => util::load_config(path)?,
        None => GameConfig::default(),
    };
    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    eprintln!("Starting new game with seed {seed}");
    GameState::new(config, seed).context("Invalid game configuration")
}

fn parse_actions(script: &str) -> anyhow::Result<Vec<Action>> {
    script
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(code, _)| code))
        .flat_map(str::split_whitespace)
        .map(|token| {
            <Action as ValueEnum>::from_str(token, true)
                .map_err(|_| anyhow::anyhow!("unknown action: {token:?}"))
        })
        .collect()
}

fn apply(game: &mut GameState, action: Action, summary: &mut Summary) {
    let accepted = match action {
        Action::Left => game.try_move(-1, 0).is_ok(),
        Action::Right => game.try_move(1, 0).is_ok(),
        Action::SoftDrop => game.soft_drop().is_ok(),
        Action::HardDrop => game.hard_drop().map(|r| summary.record_lock(r)).is_ok(),
        Action::RotateCw => game.try_rotate(RotationDirection::Clockwise).is_ok(),
        Action::RotateCcw => game
            .try_rotate(RotationDirection::CounterClockwise)
            .is_ok(),
        Action::Rotate180 => game.try_rotate(RotationDirection::Half).is_ok(),
        Action::Hold => game.hold_swap().is_ok(),
        Action::Gravity => game
            .step_gravity()
            .map(|outcome| {
                if let GravityOutcome::Locked(r) = outcome {
                    summary.record_lock(r);
                }
            })
            .is_ok(),
    };
    if accepted {
        summary.applied += 1;
    } else {
        summary.rejected += 1;
    }
}
