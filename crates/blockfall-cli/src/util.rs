use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::Context;
use blockfall_engine::{GameConfig, GameSnapshot, GameState};

/// Writes the game's snapshot as pretty JSON to `path`, or to stdout.
pub fn save_game(game: &GameState, path: Option<&Path>) -> anyhow::Result<()> {
    let snapshot = game.snapshot();
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create snapshot file: {}", path.display()))?;
            write_snapshot(&snapshot, BufWriter::new(file))
                .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
            eprintln!("Snapshot saved to {}", path.display());
        }
        None => write_snapshot(&snapshot, io::stdout().lock())
            .context("Failed to write snapshot to stdout")?,
    }
    Ok(())
}

fn write_snapshot<W>(snapshot: &GameSnapshot, mut writer: W) -> anyhow::Result<()>
where
    W: Write,
{
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a snapshot file and rebuilds the game it describes.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed, or if the stored state
/// is inconsistent
pub fn load_game<P>(path: P) -> anyhow::Result<GameState>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    eprintln!("Loading snapshot from {}...", path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot file: {}", path.display()))?;
    let game = read_game(BufReader::new(file))
        .with_context(|| format!("Invalid snapshot file: {}", path.display()))?;
    eprintln!("Snapshot loaded");
    Ok(game)
}

fn read_game<R>(reader: R) -> anyhow::Result<GameState>
where
    R: Read,
{
    let snapshot: GameSnapshot = serde_json::from_reader(reader)?;
    Ok(GameState::restore(snapshot)?)
}

/// Reads a game configuration file. Missing fields take their defaults.
pub fn load_config<P>(path: P) -> anyhow::Result<GameConfig>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
