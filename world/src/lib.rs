#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative maze model for Maze Runner.
//!
//! A [`Maze`] is an undirected adjacency graph laid over a bounded grid.
//! Walls are implicit: a cell is traversable only while it has at least one
//! neighbor, and a move is legal only along an edge. Mazes are assembled
//! through [`MazeBuilder`], which inserts every edge in both directions and
//! checks the structural invariants before handing out an immutable value.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write as _,
    sync::atomic::{AtomicU64, Ordering},
};

use maze_runner_core::{Cell, CellKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod builtin;
mod constraints;

pub use builtin::{classic, CLASSIC_NAME};
pub use constraints::PathConstraints;

static NEXT_MAZE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity allocated to every maze when it is built.
///
/// Identifiers are never reused within a process, so caches keyed by them
/// cannot confuse two mazes that happen to share coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MazeId(u64);

impl MazeId {
    fn allocate() -> Self {
        Self(NEXT_MAZE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Retrieves the numeric generation counter.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Optional display labels for the start and goal cells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Label rendered on the start cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Label rendered on the goal cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

/// Structural problems detected while building a maze.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MazeError {
    /// Width or height was zero.
    #[error("maze dimensions {width}x{height} must both be positive")]
    EmptyDimensions {
        /// Requested width in cells.
        width: u32,
        /// Requested height in cells.
        height: u32,
    },
    /// Start or goal lies outside the grid.
    #[error("{role} cell {cell} lies outside the {width}x{height} grid")]
    MarkerOutOfBounds {
        /// Either `"start"` or `"goal"`.
        role: &'static str,
        /// Offending cell.
        cell: Cell,
        /// Grid width in cells.
        width: u32,
        /// Grid height in cells.
        height: u32,
    },
    /// Start and goal share a cell.
    #[error("start and goal must be different cells, both are {0}")]
    StartIsGoal(Cell),
    /// Start or goal has no neighbors.
    #[error("{role} cell {cell} is not connected to any path cell")]
    MarkerUnreachable {
        /// Either `"start"` or `"goal"`.
        role: &'static str,
        /// Offending cell.
        cell: Cell,
    },
    /// A graph cell lies outside the grid.
    #[error("path cell {0} lies outside the maze bounds")]
    CellOutOfBounds(Cell),
    /// An edge joins two cells that are not orthogonally adjacent.
    #[error("edge {from} -> {to} does not join orthogonally adjacent cells")]
    NonAdjacentEdge {
        /// First endpoint.
        from: Cell,
        /// Second endpoint.
        to: Cell,
    },
}

/// Incrementally assembles a [`Maze`], keeping the adjacency symmetric.
#[derive(Clone, Debug)]
pub struct MazeBuilder {
    width: u32,
    height: u32,
    start: Cell,
    goal: Cell,
    name: Option<String>,
    theme: Option<Theme>,
    graph: BTreeMap<Cell, BTreeSet<Cell>>,
}

impl MazeBuilder {
    /// Starts a maze of the given dimensions with the provided markers.
    #[must_use]
    pub fn new(width: u32, height: u32, start: Cell, goal: Cell) -> Self {
        Self {
            width,
            height,
            start,
            goal,
            name: None,
            theme: None,
            graph: BTreeMap::new(),
        }
    }

    /// Attaches a human readable name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches display labels for the markers.
    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Ensures the cell has an adjacency entry, even if it stays empty.
    pub fn insert_cell(&mut self, cell: Cell) {
        let _ = self.graph.entry(cell).or_default();
    }

    /// Connects two cells in both directions.
    pub fn connect(&mut self, a: Cell, b: Cell) {
        let _ = self.graph.entry(a).or_default().insert(b);
        let _ = self.graph.entry(b).or_default().insert(a);
    }

    /// Validates the invariants and freezes the maze.
    pub fn build(self) -> Result<Maze, MazeError> {
        let Self {
            width,
            height,
            start,
            goal,
            name,
            theme,
            graph,
        } = self;

        if width == 0 || height == 0 {
            return Err(MazeError::EmptyDimensions { width, height });
        }

        let in_bounds = |cell: Cell| within(cell, width, height);
        for (role, cell) in [("start", start), ("goal", goal)] {
            if !in_bounds(cell) {
                return Err(MazeError::MarkerOutOfBounds {
                    role,
                    cell,
                    width,
                    height,
                });
            }
        }
        if start == goal {
            return Err(MazeError::StartIsGoal(start));
        }

        for (&cell, neighbors) in &graph {
            if !in_bounds(cell) {
                return Err(MazeError::CellOutOfBounds(cell));
            }
            if let Some(&far) = neighbors.iter().find(|n| cell.manhattan_distance(**n) != 1) {
                return Err(MazeError::NonAdjacentEdge {
                    from: cell,
                    to: far,
                });
            }
        }

        for (role, cell) in [("start", start), ("goal", goal)] {
            if graph.get(&cell).map_or(true, BTreeSet::is_empty) {
                return Err(MazeError::MarkerUnreachable { role, cell });
            }
        }

        Ok(Maze {
            id: MazeId::allocate(),
            name,
            width,
            height,
            start,
            goal,
            theme,
            graph,
        })
    }
}

/// Immutable maze graph shared by every system during a session.
#[derive(Clone, Debug)]
pub struct Maze {
    id: MazeId,
    name: Option<String>,
    width: u32,
    height: u32,
    start: Cell,
    goal: Cell,
    theme: Option<Theme>,
    graph: BTreeMap<Cell, BTreeSet<Cell>>,
}

impl Maze {
    /// Identity allocated when the maze was built.
    #[must_use]
    pub const fn id(&self) -> MazeId {
        self.id
    }

    /// Human readable name, if the layout supplied one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell every player starts on.
    #[must_use]
    pub const fn start(&self) -> Cell {
        self.start
    }

    /// Cell players race to reach.
    #[must_use]
    pub const fn goal(&self) -> Cell {
        self.goal
    }

    /// Display labels, if the layout supplied any.
    #[must_use]
    pub fn theme(&self) -> Option<&Theme> {
        self.theme.as_ref()
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        within(cell, self.width, self.height)
    }

    /// Neighbors of the cell in row-major order; empty for unknown cells.
    #[must_use]
    pub fn neighbors(&self, cell: Cell) -> Vec<Cell> {
        self.graph
            .get(&cell)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Reports whether an edge joins `from` and `to`.
    #[must_use]
    pub fn is_connected(&self, from: Cell, to: Cell) -> bool {
        self.graph.get(&from).is_some_and(|set| set.contains(&to))
    }

    /// Reports whether the cell is part of the traversable path.
    #[must_use]
    pub fn is_path_cell(&self, cell: Cell) -> bool {
        self.graph.get(&cell).is_some_and(|set| !set.is_empty())
    }

    /// Classifies the cell; start and goal take precedence over path.
    #[must_use]
    pub fn cell_kind(&self, cell: Cell) -> CellKind {
        if !self.in_bounds(cell) {
            CellKind::Wall
        } else if cell == self.start {
            CellKind::Start
        } else if cell == self.goal {
            CellKind::Goal
        } else if self.is_path_cell(cell) {
            CellKind::Path
        } else {
            CellKind::Wall
        }
    }

    /// Reports whether the cell is the goal.
    #[must_use]
    pub fn is_goal(&self, cell: Cell) -> bool {
        cell == self.goal
    }

    /// Reports whether the cell is the start.
    #[must_use]
    pub fn is_start(&self, cell: Cell) -> bool {
        cell == self.start
    }

    /// Reports whether the cell has exactly one way out.
    #[must_use]
    pub fn is_dead_end(&self, cell: Cell) -> bool {
        self.graph.get(&cell).is_some_and(|set| set.len() == 1)
    }

    /// Every cell with at least one neighbor, in row-major order.
    pub fn path_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.graph
            .iter()
            .filter(|(_, neighbors)| !neighbors.is_empty())
            .map(|(cell, _)| *cell)
    }

    /// Every undirected edge once, smaller endpoint first.
    pub fn edges(&self) -> impl Iterator<Item = (Cell, Cell)> + '_ {
        self.graph.iter().flat_map(|(&from, neighbors)| {
            neighbors
                .iter()
                .filter(move |to| from < **to)
                .map(move |&to| (from, to))
        })
    }

    /// Every in-bounds cell of the requested kind, in row-major order.
    #[must_use]
    pub fn cells_of_kind(&self, kind: CellKind) -> Vec<Cell> {
        self.grid_cells()
            .filter(|cell| self.cell_kind(*cell) == kind)
            .collect()
    }

    /// Renders the graph as text: `S` start, `G` goal, `#` path, `.` wall.
    #[must_use]
    pub fn render_ascii(&self) -> String {
        let mut out = String::new();
        for row in 0..self.height_i32() {
            for column in 0..self.width_i32() {
                let glyph = match self.cell_kind(Cell::new(row, column)) {
                    CellKind::Start => 'S',
                    CellKind::Goal => 'G',
                    CellKind::Path => '#',
                    CellKind::Wall => '.',
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }

    /// Writes a short human readable summary of the maze.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({}x{})",
            self.name().unwrap_or("unnamed maze"),
            self.width,
            self.height
        );
        let _ = writeln!(out, "start {}  goal {}", self.start, self.goal);
        let _ = writeln!(out, "path cells {}", self.path_cells().count());
        out
    }

    fn grid_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let width = self.width_i32();
        (0..self.height_i32())
            .flat_map(move |row| (0..width).map(move |column| Cell::new(row, column)))
    }

    fn width_i32(&self) -> i32 {
        i32::try_from(self.width).unwrap_or(i32::MAX)
    }

    fn height_i32(&self) -> i32 {
        i32::try_from(self.height).unwrap_or(i32::MAX)
    }
}

fn within(cell: Cell, width: u32, height: u32) -> bool {
    u32::try_from(cell.row()).is_ok_and(|row| row < height)
        && u32::try_from(cell.column()).is_ok_and(|column| column < width)
}

/// Read-only helpers mirroring the maze queries used by adapters.
pub mod query {
    use maze_runner_core::{Cell, CellKind};

    use super::Maze;

    /// Reports whether the cell lies inside the maze grid.
    #[must_use]
    pub fn in_bounds(maze: &Maze, cell: Cell) -> bool {
        maze.in_bounds(cell)
    }

    /// Decoded neighbor list of the cell.
    #[must_use]
    pub fn neighbors(maze: &Maze, cell: Cell) -> Vec<Cell> {
        maze.neighbors(cell)
    }

    /// Classification of the cell.
    #[must_use]
    pub fn cell_type(maze: &Maze, cell: Cell) -> CellKind {
        maze.cell_kind(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> MazeBuilder {
        let mut builder = MazeBuilder::new(3, 2, Cell::new(0, 0), Cell::new(0, 2));
        builder.connect(Cell::new(0, 0), Cell::new(0, 1));
        builder.connect(Cell::new(0, 1), Cell::new(0, 2));
        builder
    }

    #[test]
    fn builder_connects_both_directions() {
        let maze = corridor().build().expect("corridor builds");
        assert_eq!(maze.neighbors(Cell::new(0, 0)), vec![Cell::new(0, 1)]);
        assert_eq!(
            maze.neighbors(Cell::new(0, 1)),
            vec![Cell::new(0, 0), Cell::new(0, 2)]
        );
        assert_eq!(maze.neighbors(Cell::new(0, 2)), vec![Cell::new(0, 1)]);
        assert!(maze.neighbors(Cell::new(1, 1)).is_empty());
    }

    #[test]
    fn cell_kind_prefers_markers_over_path() {
        let maze = corridor().build().expect("corridor builds");
        assert_eq!(maze.cell_kind(Cell::new(0, 0)), CellKind::Start);
        assert_eq!(maze.cell_kind(Cell::new(0, 2)), CellKind::Goal);
        assert_eq!(maze.cell_kind(Cell::new(0, 1)), CellKind::Path);
        assert_eq!(maze.cell_kind(Cell::new(1, 0)), CellKind::Wall);
        assert_eq!(maze.cell_kind(Cell::new(-1, 0)), CellKind::Wall);
        assert_eq!(maze.cell_kind(Cell::new(0, 3)), CellKind::Wall);
    }

    #[test]
    fn empty_adjacency_entry_is_a_wall() {
        let mut builder = corridor();
        builder.insert_cell(Cell::new(1, 1));
        let maze = builder.build().expect("corridor builds");
        assert_eq!(maze.cell_kind(Cell::new(1, 1)), CellKind::Wall);
        assert!(!maze.is_path_cell(Cell::new(1, 1)));
    }

    #[test]
    fn bounds_are_half_open() {
        let maze = corridor().build().expect("corridor builds");
        assert!(maze.in_bounds(Cell::new(1, 2)));
        assert!(!maze.in_bounds(Cell::new(2, 0)));
        assert!(!maze.in_bounds(Cell::new(0, -1)));
    }

    #[test]
    fn every_build_receives_a_fresh_identity() {
        let first = corridor().build().expect("corridor builds");
        let second = corridor().build().expect("corridor builds");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn build_rejects_unreachable_goal() {
        let mut builder = MazeBuilder::new(3, 3, Cell::new(0, 0), Cell::new(2, 2));
        builder.connect(Cell::new(0, 0), Cell::new(0, 1));
        assert_eq!(
            builder.build().unwrap_err(),
            MazeError::MarkerUnreachable {
                role: "goal",
                cell: Cell::new(2, 2),
            }
        );
    }

    #[test]
    fn build_rejects_diagonal_edges() {
        let mut builder = corridor();
        builder.connect(Cell::new(0, 1), Cell::new(1, 2));
        assert!(matches!(
            builder.build(),
            Err(MazeError::NonAdjacentEdge { .. })
        ));
    }

    #[test]
    fn build_rejects_shared_marker() {
        let builder = MazeBuilder::new(2, 2, Cell::new(1, 1), Cell::new(1, 1));
        assert_eq!(
            builder.build().unwrap_err(),
            MazeError::StartIsGoal(Cell::new(1, 1))
        );
    }

    #[test]
    fn build_rejects_markers_outside_grid() {
        let builder = MazeBuilder::new(2, 2, Cell::new(0, 0), Cell::new(5, 0));
        assert!(matches!(
            builder.build(),
            Err(MazeError::MarkerOutOfBounds { role: "goal", .. })
        ));
    }

    #[test]
    fn edges_are_listed_once() {
        let maze = corridor().build().expect("corridor builds");
        let edges: Vec<_> = maze.edges().collect();
        assert_eq!(
            edges,
            vec![
                (Cell::new(0, 0), Cell::new(0, 1)),
                (Cell::new(0, 1), Cell::new(0, 2)),
            ]
        );
    }

    #[test]
    fn dead_ends_have_one_exit() {
        let maze = corridor().build().expect("corridor builds");
        assert!(maze.is_dead_end(Cell::new(0, 0)));
        assert!(maze.is_dead_end(Cell::new(0, 2)));
        assert!(!maze.is_dead_end(Cell::new(0, 1)));
        assert!(!maze.is_dead_end(Cell::new(1, 0)));
    }

    #[test]
    fn ascii_render_marks_every_cell() {
        let maze = corridor().build().expect("corridor builds");
        assert_eq!(maze.render_ascii(), "S#G\n...\n");
        assert_eq!(maze.cells_of_kind(CellKind::Wall).len(), 3);
    }
}
