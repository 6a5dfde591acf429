#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Runner engine.
//!
//! This crate defines the value types that connect adapters, the maze world,
//! and the pure systems. Players assemble [`CommandToken`] values into a
//! [`CommandQueue`], systems expand each token into unit moves along a
//! [`Direction`], and every unit move resolves into a [`StepResult`] that
//! describes where the move would land and whether it was allowed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Maze Runner.";

/// Location of a single maze cell expressed as row and column coordinates.
///
/// Coordinates are signed so that attempted moves past the top or left edge
/// can still be reported, e.g. `(0, -1)` when stepping left from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "r")]
    row: i32,
    #[serde(rename = "c")]
    column: i32,
}

impl Cell {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Canonical `"<row>,<col>"` key used by authored layouts.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Returns the cell displaced by the provided row and column deltas.
    #[must_use]
    pub const fn offset(self, rows: i32, columns: i32) -> Self {
        Self::new(self.row.saturating_add(rows), self.column.saturating_add(columns))
    }

    /// Computes the Manhattan distance between two cells.
    #[must_use]
    pub fn manhattan_distance(self, other: Cell) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.column)
    }
}

/// Raised when a cell key does not match `<digits>,<digits>`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cell key '{0}' must look like '<row>,<col>' with non-negative integers")]
pub struct CellKeyError(pub String);

impl FromStr for Cell {
    type Err = CellKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || CellKeyError(value.to_owned());
        let (row, column) = value.split_once(',').ok_or_else(malformed)?;
        let row = parse_coordinate(row).ok_or_else(malformed)?;
        let column = parse_coordinate(column).ok_or_else(malformed)?;
        Ok(Self::new(row, column))
    }
}

fn parse_coordinate(text: &str) -> Option<i32> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Cardinal movement directions available to players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Every direction in the order the controls present them.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Row and column delta applied by a single unit step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
        }
    }

    /// Cell reached by moving one unit from `cell` in this direction.
    #[must_use]
    pub const fn apply(self, cell: Cell) -> Cell {
        let (rows, columns) = self.offset();
        cell.offset(rows, columns)
    }

    /// Single-letter symbol used in program text.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Up => 'U',
            Self::Down => 'D',
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'U' => Some(Self::Up),
            'D' => Some(Self::Down),
            'L' => Some(Self::Left),
            'R' => Some(Self::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// Raised when a direction name cannot be recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown direction '{0}'")]
pub struct DirectionParseError(pub String);

impl FromStr for Direction {
    type Err = DirectionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut chars = trimmed.chars();
        if let (Some(symbol), None) = (chars.next(), chars.next()) {
            if let Some(direction) = Self::from_symbol(symbol) {
                return Ok(direction);
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(DirectionParseError(value.to_owned())),
        }
    }
}

/// Repeat count of a command token, always within `1..=10`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Magnitude(u8);

impl Magnitude {
    /// Smallest permitted repeat count.
    pub const MIN: u8 = 1;
    /// Largest permitted repeat count.
    pub const MAX: u8 = 10;
    /// A single unit step.
    pub const ONE: Magnitude = Magnitude(1);

    /// Creates a magnitude, rejecting values outside `1..=10`.
    pub fn new(value: u8) -> Result<Self, MagnitudeError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(MagnitudeError(u32::from(value)))
        }
    }

    /// Retrieves the numeric repeat count.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Magnitude {
    type Error = MagnitudeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Magnitude> for u8 {
    fn from(value: Magnitude) -> Self {
        value.0
    }
}

/// Raised when a repeat count falls outside `1..=10`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("magnitude {0} is outside the permitted range 1..=10")]
pub struct MagnitudeError(pub u32);

/// Queued instruction to move `magnitude` cells in `direction`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandToken {
    direction: Direction,
    magnitude: Magnitude,
}

impl CommandToken {
    /// Creates a new command token.
    #[must_use]
    pub const fn new(direction: Direction, magnitude: Magnitude) -> Self {
        Self {
            direction,
            magnitude,
        }
    }

    /// Creates a token from a raw repeat count, validating the magnitude.
    pub fn repeat(direction: Direction, count: u8) -> Result<Self, MagnitudeError> {
        Ok(Self::new(direction, Magnitude::new(count)?))
    }

    /// Direction of travel for every unit step of the token.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Repeat count of the token.
    #[must_use]
    pub const fn magnitude(&self) -> Magnitude {
        self.magnitude
    }

    /// Number of unit steps the token expands into.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.magnitude.get() as u32
    }

    /// Expands the token into its individual unit steps.
    pub fn expand(&self) -> impl Iterator<Item = Direction> {
        std::iter::repeat(self.direction).take(usize::from(self.magnitude.get()))
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.symbol(), self.magnitude.get())
    }
}

/// Raised when program text cannot be parsed into a command token.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TokenParseError {
    /// The token text was empty.
    #[error("command token is empty")]
    Empty,
    /// The leading character is not one of `U`, `D`, `L` or `R`.
    #[error("command token '{0}' does not start with U, D, L or R")]
    UnknownDirection(String),
    /// The repeat count is not a number.
    #[error("command token '{0}' has a non-numeric repeat count")]
    InvalidCount(String),
    /// The repeat count is outside the permitted range.
    #[error(transparent)]
    Magnitude(#[from] MagnitudeError),
}

impl FromStr for CommandToken {
    type Err = TokenParseError;

    /// Parses tokens such as `R3` or `u10`. A bare direction means one step.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let mut chars = trimmed.chars();
        let symbol = chars.next().ok_or(TokenParseError::Empty)?;
        let direction = Direction::from_symbol(symbol)
            .ok_or_else(|| TokenParseError::UnknownDirection(trimmed.to_owned()))?;
        let count = chars.as_str();
        if count.is_empty() {
            return Ok(Self::new(direction, Magnitude::ONE));
        }
        let count: u32 = count
            .parse()
            .map_err(|_| TokenParseError::InvalidCount(trimmed.to_owned()))?;
        let count = u8::try_from(count).map_err(|_| MagnitudeError(count))?;
        Ok(Self::new(direction, Magnitude::new(count)?))
    }
}

/// Parses whitespace or comma separated program text such as `"R3 D2 L1"`.
pub fn parse_program(text: &str) -> Result<Vec<CommandToken>, TokenParseError> {
    text.split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// Sums the unit steps of every token in the provided sequence.
#[must_use]
pub fn total_steps(tokens: &[CommandToken]) -> u32 {
    tokens.iter().map(CommandToken::steps).sum()
}

/// Ordered program assembled by a player before execution.
///
/// The queue only grows at the tail; editing is limited to undoing the most
/// recent token, clearing everything, or consuming the head unit step after
/// a single-step execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandQueue {
    tokens: Vec<CommandToken>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Appends a token to the tail of the queue.
    pub fn push(&mut self, token: CommandToken) {
        self.tokens.push(token);
    }

    /// Removes and returns the most recently appended token.
    pub fn undo(&mut self) -> Option<CommandToken> {
        self.tokens.pop()
    }

    /// Removes every queued token.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Drops one unit step from the head token, removing it once exhausted.
    pub fn consume_step(&mut self) -> Option<Direction> {
        let head = self.tokens.first_mut()?;
        let direction = head.direction;
        match head.magnitude.get() {
            1 => {
                let _ = self.tokens.remove(0);
            }
            remaining => head.magnitude = Magnitude(remaining - 1),
        }
        Some(direction)
    }

    /// Tokens in execution order.
    #[must_use]
    pub fn tokens(&self) -> &[CommandToken] {
        &self.tokens
    }

    /// Number of queued tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Reports whether the queue holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of unit steps the whole queue expands into.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        total_steps(&self.tokens)
    }
}

impl FromIterator<CommandToken> for CommandQueue {
    fn from_iter<I: IntoIterator<Item = CommandToken>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

/// Classification of a maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Cell that cannot be entered.
    Wall,
    /// Cell where every player begins.
    Start,
    /// Cell players race to reach.
    Goal,
    /// Traversable corridor cell.
    Path,
}

/// Outcome of attempting a single unit move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepResult {
    /// Cell the move lands on, or would have landed on when blocked.
    pub next: Cell,
    /// Indicates whether the move was permitted.
    pub ok: bool,
    /// Indicates whether the permitted move arrived at the goal.
    pub reached_goal: bool,
}

impl StepResult {
    /// Describes a permitted move.
    #[must_use]
    pub const fn moved(next: Cell, reached_goal: bool) -> Self {
        Self {
            next,
            ok: true,
            reached_goal,
        }
    }

    /// Describes a move rejected by a wall or the maze bounds.
    #[must_use]
    pub const fn blocked(next: Cell) -> Self {
        Self {
            next,
            ok: false,
            reached_goal: false,
        }
    }
}

/// Unique identifier assigned to a local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u8);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.0)
    }
}

/// High-level status surfaced to presentation layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Nothing is queued or running.
    #[default]
    Idle,
    /// The current player is assembling a program.
    Editing,
    /// A program is playing back.
    Executing,
    /// The last program bumped into a wall.
    HitWall,
    /// The last program arrived at the goal.
    ReachedGoal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn cell_key_matches_layout_format() {
        let cell = Cell::new(3, 7);
        assert_eq!(cell.key(), "3,7");
        assert_eq!("3,7".parse::<Cell>(), Ok(cell));
    }

    #[test]
    fn cell_key_rejects_malformed_text() {
        for text in ["", "3", "3,", ",7", "-1,2", "a,b", "3,7,1", " 3,7"] {
            assert!(text.parse::<Cell>().is_err(), "accepted '{text}'");
        }
    }

    #[test]
    fn cell_serializes_with_short_field_names() {
        let json = serde_json::to_string(&Cell::new(9, 2)).expect("serialize");
        assert_eq!(json, r#"{"r":9,"c":2}"#);
    }

    #[test]
    fn direction_offsets_move_one_cell() {
        let origin = Cell::new(4, 4);
        assert_eq!(Direction::Up.apply(origin), Cell::new(3, 4));
        assert_eq!(Direction::Down.apply(origin), Cell::new(5, 4));
        assert_eq!(Direction::Left.apply(origin), Cell::new(4, 3));
        assert_eq!(Direction::Right.apply(origin), Cell::new(4, 5));
        assert_eq!(Direction::Left.apply(Cell::new(0, 0)), Cell::new(0, -1));
    }

    #[test]
    fn magnitude_rejects_out_of_range_counts() {
        assert_eq!(Magnitude::new(0), Err(MagnitudeError(0)));
        assert_eq!(Magnitude::new(11), Err(MagnitudeError(11)));
        assert_eq!(Magnitude::new(10).map(|m| m.get()), Ok(10));
    }

    #[test]
    fn magnitude_deserialization_enforces_range() {
        assert!(serde_json::from_str::<Magnitude>("0").is_err());
        assert_eq!(
            serde_json::from_str::<Magnitude>("4").map(|m| m.get()).ok(),
            Some(4)
        );
    }

    #[test]
    fn program_text_parses_into_tokens() {
        let tokens = parse_program("R3, d2 L").expect("program parses");
        let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["R3", "D2", "L1"]);
        assert_eq!(total_steps(&tokens), 6);
    }

    #[test]
    fn program_text_reports_bad_tokens() {
        assert_eq!(
            parse_program("X2"),
            Err(TokenParseError::UnknownDirection("X2".to_owned()))
        );
        assert_eq!(
            parse_program("R11"),
            Err(TokenParseError::Magnitude(MagnitudeError(11)))
        );
        assert_eq!(
            parse_program("R999"),
            Err(TokenParseError::Magnitude(MagnitudeError(999)))
        );
        assert_eq!(
            parse_program("Rx"),
            Err(TokenParseError::InvalidCount("Rx".to_owned()))
        );
    }

    #[test]
    fn token_expands_into_unit_steps() {
        let token = CommandToken::repeat(Direction::Down, 3).expect("valid token");
        let steps: Vec<_> = token.expand().collect();
        assert_eq!(steps, vec![Direction::Down; 3]);
    }

    #[test]
    fn queue_consumes_head_steps_one_at_a_time() {
        let mut queue: CommandQueue = parse_program("R2 D1")
            .expect("program parses")
            .into_iter()
            .collect();

        assert_eq!(queue.consume_step(), Some(Direction::Right));
        assert_eq!(queue.tokens()[0].to_string(), "R1");
        assert_eq!(queue.consume_step(), Some(Direction::Right));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.consume_step(), Some(Direction::Down));
        assert!(queue.is_empty());
        assert_eq!(queue.consume_step(), None);
    }

    #[test]
    fn queue_undo_and_clear() {
        let mut queue = CommandQueue::new();
        queue.push(CommandToken::new(Direction::Up, Magnitude::ONE));
        queue.push(CommandToken::repeat(Direction::Left, 4).expect("valid token"));
        assert_eq!(queue.total_steps(), 5);

        let undone = queue.undo().expect("token removed");
        assert_eq!(undone.to_string(), "L4");
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn command_token_round_trips_through_bincode() {
        let token = CommandToken::repeat(Direction::Right, 7).expect("valid token");
        assert_round_trip(&token);
    }

    #[test]
    fn cell_round_trips_through_bincode() {
        assert_round_trip(&Cell::new(-1, 12));
    }

    #[test]
    fn game_status_round_trips_through_bincode() {
        assert_round_trip(&GameStatus::ReachedGoal);
    }
}
