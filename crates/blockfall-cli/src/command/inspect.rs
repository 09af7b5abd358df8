use std::{fmt, path::PathBuf};

use blockfall_engine::{GameState, SPAWN_ROW};

use crate::util;

const ACTIVE_CELL: char = '@';
const GHOST_CELL: char = '+';

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Snapshot file to inspect
    path: PathBuf,
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let game = util::load_game(&arg.path)?;
    let mut text = String::new();
    render(&game, &mut text)?;
    print!("{text}");
    Ok(())
}

fn render<W>(game: &GameState, out: &mut W) -> fmt::Result
where
    W: fmt::Write,
{
    let stats = game.stats();
    writeln!(out, "Score:        {}", stats.score())?;
    writeln!(out, "Level:        {}", stats.level())?;
    writeln!(out, "Lines:        {}", stats.lines())?;
    writeln!(out, "Combo:        {}", stats.combo())?;
    writeln!(
        out,
        "Back-to-back: {}",
        if stats.back_to_back() { "yes" } else { "no" }
    )?;
    writeln!(out, "Pieces:       {}", stats.completed_pieces())?;
    let counter = stats.line_cleared_counter();
    writeln!(
        out,
        "Clears:       single {}, double {}, triple {}, tetris {}",
        counter[1], counter[2], counter[3], counter[4]
    )?;
    write!(out, "Hold:         ")?;
    match game.held_piece() {
        Some(kind) => write!(out, "{kind}")?,
        None => write!(out, "-")?,
    }
    writeln!(out, "{}", if game.can_hold() { "" } else { " (used)" })?;
    write!(out, "Next:        ")?;
    for kind in game.next_pieces() {
        write!(out, " {kind}")?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Status:       {}",
        if game.is_game_over() {
            "game over"
        } else {
            "playing"
        }
    )?;
    writeln!(out)?;
    render_board(game, out)
}

/// Draws the board with the hidden spawn rows on top, the active piece as `@`
/// and its landing pose as `+`.
fn render_board<W>(game: &GameState, out: &mut W) -> fmt::Result
where
    W: fmt::Write,
{
    let board = game.board();
    let active: Vec<(i32, i32)> = game
        .active_piece()
        .map(|piece| piece.cells().collect())
        .unwrap_or_default();
    let ghost: Vec<(i32, i32)> = game
        .ghost()
        .map(|piece| piece.cells().collect())
        .unwrap_or_default();
    let cols = i32::try_from(board.cols()).map_err(|_| fmt::Error)?;
    let rows = i32::try_from(board.rows()).map_err(|_| fmt::Error)?;

    for y in SPAWN_ROW..rows {
        let wall = if y < 0 { ' ' } else { '|' };
        write!(out, "{wall}")?;
        for x in 0..cols {
            let c = if active.contains(&(x, y)) {
                ACTIVE_CELL
            } else if ghost.contains(&(x, y)) {
                GHOST_CELL
            } else if y < 0 {
                ' '
            } else {
                board.cell(x, y).map_or(' ', |cell| cell.as_char())
            };
            write!(out, "{c}")?;
        }
        writeln!(out, "{wall}")?;
    }
    writeln!(out, "+{}+", "-".repeat(board.cols()))
}
