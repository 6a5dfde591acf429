//! Fixed 10x10 maze shipped with the game.

use maze_runner_core::Cell;

use crate::{Maze, MazeBuilder, Theme};

/// Name attached to the built-in maze.
pub const CLASSIC_NAME: &str = "fixed-10x10-v1";

const SIZE: i32 = 10;

/// Columns with an opening between row `r` and row `r + 1`, indexed by `r`.
///
/// Every row is a fully open horizontal corridor.
const VERTICAL_OPENINGS: [&[i32]; 9] = [
    &[0, 1, 3, 5, 7, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
    &[0, 2, 4, 6, 8, 9],
];

/// Builds the built-in maze: start `(0,0)`, goal `(9,9)`.
#[must_use]
pub fn classic() -> Maze {
    let mut builder = MazeBuilder::new(10, 10, Cell::new(0, 0), Cell::new(9, 9))
        .with_name(CLASSIC_NAME)
        .with_theme(Theme {
            start: Some("Home".to_owned()),
            goal: Some("Forest".to_owned()),
        });

    for row in 0..SIZE {
        for column in 0..SIZE - 1 {
            builder.connect(Cell::new(row, column), Cell::new(row, column + 1));
        }
    }
    for (row, openings) in (0..).zip(VERTICAL_OPENINGS) {
        for &column in openings {
            builder.connect(Cell::new(row, column), Cell::new(row + 1, column));
        }
    }

    builder
        .build()
        .expect("built-in maze satisfies every structural invariant")
}
