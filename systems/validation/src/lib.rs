#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Side-effect free validation of whole command programs.
//!
//! Validators expand every token into unit steps and walk them with the same
//! step simulator the executor replays, so a program reported valid here
//! plays back without surprises and a rejected program fails at exactly the
//! reported step.

use std::{fmt, str::FromStr};

use maze_runner_core::{Cell, CommandToken, Direction, StepResult};
use maze_runner_system_simulation::{Direct, Simulator};
use maze_runner_world::{Maze, PathConstraints};
use serde::{Deserialize, Serialize};

/// How strictly moves are checked before a program runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    /// Only walls and maze bounds reject a move.
    WallsOnly,
    /// Moves must additionally stay on the authored route.
    #[default]
    PathConstrained,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "walls" | "walls-only" => Ok(Self::WallsOnly),
            "path" | "path-constrained" => Ok(Self::PathConstrained),
            other => Err(format!(
                "unknown strictness '{other}', expected 'walls' or 'path'"
            )),
        }
    }
}

/// Why a unit step was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// The destination is not part of the authored route.
    OffPath,
    /// The destination lies outside the grid.
    OutOfBounds,
    /// No edge joins the current cell and the destination.
    WallCollision,
}

impl FailureReason {
    /// Stable machine-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OffPath => "off-path",
            Self::OutOfBounds => "out-of-bounds",
            Self::WallCollision => "wall-collision",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First rejected step of a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    /// 1-based index of the step, counted across the whole program.
    pub step: u32,
    /// Classification of the rejection.
    pub reason: FailureReason,
    /// Cell the rejected step tried to enter.
    pub attempted: Cell,
}

/// Result of walking a program without side effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueValidation {
    /// Last cell reached: the goal, the end of the program, or the cell
    /// occupied just before the failing step.
    pub final_position: Cell,
    /// Indicates whether the walk stopped on the goal.
    pub reached_goal: bool,
    /// First rejected step, if any.
    pub failure: Option<ValidationFailure>,
}

impl QueueValidation {
    /// Reports whether the whole program can execute.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    /// 1-based index of the first rejected step.
    #[must_use]
    pub fn failed_at_step(&self) -> Option<u32> {
        self.failure.map(|failure| failure.step)
    }
}

/// Validates a program against walls and bounds only.
#[must_use]
pub fn validate_queue(maze: &Maze, from: Cell, tokens: &[CommandToken]) -> QueueValidation {
    walls_only(&Direct, maze, from, tokens)
}

/// Validates a program, rejecting any move that leaves the authored route.
///
/// The route check runs before the wall check, so a destination outside the
/// route is always reported as [`FailureReason::OffPath`].
#[must_use]
pub fn validate_queue_with_path_constraints(
    maze: &Maze,
    constraints: &PathConstraints,
    from: Cell,
    tokens: &[CommandToken],
) -> QueueValidation {
    path_constrained(&Direct, maze, constraints, from, tokens)
}

/// Validates a program with the requested strictness.
#[must_use]
pub fn validate(
    maze: &Maze,
    constraints: &PathConstraints,
    from: Cell,
    tokens: &[CommandToken],
    strictness: Strictness,
) -> QueueValidation {
    validate_using(&Direct, maze, constraints, from, tokens, strictness)
}

/// Validates a program with the requested strictness, resolving every move
/// through `simulator`.
#[must_use]
pub fn validate_using<S>(
    simulator: &S,
    maze: &Maze,
    constraints: &PathConstraints,
    from: Cell,
    tokens: &[CommandToken],
    strictness: Strictness,
) -> QueueValidation
where
    S: Simulator + ?Sized,
{
    match strictness {
        Strictness::WallsOnly => walls_only(simulator, maze, from, tokens),
        Strictness::PathConstrained => {
            path_constrained(simulator, maze, constraints, from, tokens)
        }
    }
}

/// Reports whether the program ends on the goal.
#[must_use]
pub fn would_reach_goal(maze: &Maze, from: Cell, tokens: &[CommandToken]) -> bool {
    validate_queue(maze, from, tokens).reached_goal
}

/// Cell the program would leave the player on.
#[must_use]
pub fn final_position(maze: &Maze, from: Cell, tokens: &[CommandToken]) -> Cell {
    validate_queue(maze, from, tokens).final_position
}

/// Lower bound on the steps needed to reach the goal, ignoring walls.
#[must_use]
pub fn estimate_steps_to_goal(maze: &Maze, from: Cell) -> u32 {
    from.manhattan_distance(maze.goal())
}

fn walls_only<S>(simulator: &S, maze: &Maze, from: Cell, tokens: &[CommandToken]) -> QueueValidation
where
    S: Simulator + ?Sized,
{
    walk(from, tokens, |current, direction| {
        checked_step(simulator, maze, current, direction)
    })
}

fn path_constrained<S>(
    simulator: &S,
    maze: &Maze,
    constraints: &PathConstraints,
    from: Cell,
    tokens: &[CommandToken],
) -> QueueValidation
where
    S: Simulator + ?Sized,
{
    debug_assert!(
        constraints.belongs_to(maze),
        "path constraints were derived from a different maze"
    );
    walk(from, tokens, |current, direction| {
        if !constraints.contains(direction.apply(current)) {
            return Err(FailureReason::OffPath);
        }
        checked_step(simulator, maze, current, direction)
    })
}

fn checked_step<S>(
    simulator: &S,
    maze: &Maze,
    current: Cell,
    direction: Direction,
) -> Result<StepResult, FailureReason>
where
    S: Simulator + ?Sized,
{
    let result = simulator.resolve(maze, current, direction);
    if result.ok {
        Ok(result)
    } else if maze.in_bounds(result.next) {
        Err(FailureReason::WallCollision)
    } else {
        Err(FailureReason::OutOfBounds)
    }
}

fn walk<F>(from: Cell, tokens: &[CommandToken], mut attempt: F) -> QueueValidation
where
    F: FnMut(Cell, Direction) -> Result<StepResult, FailureReason>,
{
    let mut current = from;
    let mut step_index = 0_u32;

    for direction in tokens.iter().flat_map(CommandToken::expand) {
        step_index += 1;
        match attempt(current, direction) {
            Err(reason) => {
                return QueueValidation {
                    final_position: current,
                    reached_goal: false,
                    failure: Some(ValidationFailure {
                        step: step_index,
                        reason,
                        attempted: direction.apply(current),
                    }),
                };
            }
            Ok(result) => {
                current = result.next;
                if result.reached_goal {
                    return QueueValidation {
                        final_position: current,
                        reached_goal: true,
                        failure: None,
                    };
                }
            }
        }
    }

    QueueValidation {
        final_position: current,
        reached_goal: false,
        failure: None,
    }
}
