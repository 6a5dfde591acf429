//! Cached set of cells a player is allowed to stand on.

use std::collections::BTreeSet;

use maze_runner_core::Cell;

use crate::{Maze, MazeId};

/// Cells considered part of the intended route through a maze.
///
/// The set always contains the start and goal. It is tied to the maze it was
/// derived from so that stale constraints can be detected after a map switch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathConstraints {
    maze: MazeId,
    cells: BTreeSet<Cell>,
    start: Cell,
    goal: Cell,
}

impl PathConstraints {
    /// Every graph cell with at least one neighbor, plus start and goal.
    #[must_use]
    pub fn derive(maze: &Maze) -> Self {
        Self::restricted_to(maze, maze.path_cells())
    }

    /// Authored corridor: the provided cells plus start and goal.
    ///
    /// Use this to forbid detours through cycles the adjacency graph would
    /// otherwise allow.
    #[must_use]
    pub fn restricted_to(maze: &Maze, cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut cells: BTreeSet<Cell> = cells.into_iter().collect();
        let _ = cells.insert(maze.start());
        let _ = cells.insert(maze.goal());
        Self {
            maze: maze.id(),
            cells,
            start: maze.start(),
            goal: maze.goal(),
        }
    }

    /// Reports whether a player may stand on the cell.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Reports whether these constraints were derived from `maze`.
    #[must_use]
    pub fn belongs_to(&self, maze: &Maze) -> bool {
        self.maze == maze.id()
    }

    /// Start cell captured from the maze.
    #[must_use]
    pub const fn start(&self) -> Cell {
        self.start
    }

    /// Goal cell captured from the maze.
    #[must_use]
    pub const fn goal(&self) -> Cell {
        self.goal
    }

    /// Number of permitted cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no cell is permitted. Never true for a built maze.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MazeBuilder;

    fn square() -> Maze {
        let mut builder = MazeBuilder::new(2, 2, Cell::new(0, 0), Cell::new(1, 1));
        builder.connect(Cell::new(0, 0), Cell::new(0, 1));
        builder.connect(Cell::new(0, 1), Cell::new(1, 1));
        builder.connect(Cell::new(0, 0), Cell::new(1, 0));
        builder.connect(Cell::new(1, 0), Cell::new(1, 1));
        builder.build().expect("square builds")
    }

    #[test]
    fn derived_constraints_cover_every_path_cell() {
        let maze = square();
        let constraints = PathConstraints::derive(&maze);
        assert_eq!(constraints.len(), 4);
        assert!(constraints.belongs_to(&maze));
    }

    #[test]
    fn restricted_constraints_always_keep_markers() {
        let maze = square();
        let constraints = PathConstraints::restricted_to(&maze, [Cell::new(0, 1)]);
        assert!(constraints.contains(Cell::new(0, 0)));
        assert!(constraints.contains(Cell::new(1, 1)));
        assert!(constraints.contains(Cell::new(0, 1)));
        assert!(!constraints.contains(Cell::new(1, 0)));
    }

    #[test]
    fn constraints_are_bound_to_their_maze() {
        let constraints = PathConstraints::derive(&square());
        assert!(!constraints.belongs_to(&square()));
    }
}
