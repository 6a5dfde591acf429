#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn-based game state for local multiplayer maze races.
//!
//! A [`Session`] owns the maze, every player's position, trail and program,
//! the turn order and the game status. Programs are validated before they
//! play, so a rejected program never moves its player.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
    sync::Arc,
    time::Duration,
};

use maze_runner_core::{total_steps, Cell, CommandToken, GameStatus, Magnitude, PlayerId};
use maze_runner_system_execution::{
    CancelSignal, Clock, ExecutionError, ExecutionHooks, Executor, PlaybackRequest, RunOutcome,
    Speed,
};
use maze_runner_system_simulation::SharedStepCache;
use maze_runner_system_validation::{validate_using, Strictness, ValidationFailure};
use maze_runner_world::{Maze, PathConstraints};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod player;

pub use player::PlayerState;

/// Tunables chosen before or between rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Playback pace.
    pub speed: Speed,
    /// How strictly programs are validated.
    pub strictness: Strictness,
    /// Safety cutoff for a single run.
    pub max_run: Option<Duration>,
}

/// What the executor is currently doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Nothing is playing.
    #[default]
    Idle,
    /// A whole program is playing.
    Running,
    /// A single unit step is playing.
    Stepping,
}

/// Progress of the most recent playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Current activity.
    pub mode: ExecutionMode,
    /// Steps played so far.
    pub current_step: u32,
    /// Steps in the program being played.
    pub total_steps: u32,
    /// Pace of the playback.
    pub speed: Speed,
}

/// How a player's turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Validation refused the program; the player did not move.
    Rejected(ValidationFailure),
    /// The program played back.
    Played(RunOutcome),
}

impl TurnOutcome {
    /// Reports whether the turn counted as a crash.
    #[must_use]
    pub const fn is_crash(&self) -> bool {
        matches!(
            self,
            Self::Rejected(_) | Self::Played(RunOutcome::HitWall { .. })
        )
    }
}

/// Operations refused by a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A session needs at least one player.
    #[error("a session needs at least one player")]
    NoPlayers,
    /// The player is not part of the session.
    #[error("{0} is not part of this session")]
    UnknownPlayer(PlayerId),
    /// The player already takes turns.
    #[error("{0} is already playing")]
    AlreadyActive(PlayerId),
    /// Removing the player would leave nobody to take turns.
    #[error("{0} is the last active player")]
    LastPlayer(PlayerId),
    /// The current player has nothing queued.
    #[error("{0} has no commands queued")]
    EmptyQueue(PlayerId),
    /// The round is over until `play_again` or a new maze.
    #[error("the round was won by {winner}")]
    RoundOver {
        /// Player who reached the goal.
        winner: PlayerId,
    },
    /// The executor refused the run.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Complete state of a local game.
#[derive(Debug)]
pub struct Session {
    maze: Arc<Maze>,
    constraints: PathConstraints,
    players: BTreeMap<PlayerId, PlayerState>,
    active: BTreeSet<PlayerId>,
    current: PlayerId,
    status: GameStatus,
    winner: Option<PlayerId>,
    settings: SessionSettings,
    execution: ExecutionState,
    executor: Executor,
    cancel: CancelSignal,
    steps: SharedStepCache,
}

impl Session {
    /// Starts a session on `maze` with the given players.
    ///
    /// Turns rotate in ascending id order; the lowest id moves first.
    pub fn new(
        maze: Arc<Maze>,
        players: impl IntoIterator<Item = PlayerId>,
        settings: SessionSettings,
    ) -> Result<Self, SessionError> {
        let active: BTreeSet<PlayerId> = players.into_iter().collect();
        let current = *active.first().ok_or(SessionError::NoPlayers)?;
        let players = active
            .iter()
            .map(|id| (*id, PlayerState::spawn(maze.start())))
            .collect();
        Ok(Self {
            constraints: PathConstraints::derive(&maze),
            maze,
            players,
            active,
            current,
            status: GameStatus::Idle,
            winner: None,
            settings,
            execution: ExecutionState {
                speed: settings.speed,
                ..ExecutionState::default()
            },
            executor: Executor::new(),
            cancel: CancelSignal::new(),
            steps: SharedStepCache::default(),
        })
    }

    /// Maze being played.
    #[must_use]
    pub fn maze(&self) -> &Arc<Maze> {
        &self.maze
    }

    /// Route constraints derived from the current maze.
    #[must_use]
    pub fn constraints(&self) -> &PathConstraints {
        &self.constraints
    }

    /// State of a single player, including deactivated ones.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    /// Players taking turns, in turn order.
    pub fn active_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.active.iter().copied()
    }

    /// Player whose turn it is.
    #[must_use]
    pub const fn current_player(&self) -> PlayerId {
        self.current
    }

    /// Status surfaced to presentation layers.
    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// Winner of the current round, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Progress of the most recent playback.
    #[must_use]
    pub const fn execution(&self) -> ExecutionState {
        self.execution
    }

    /// Active tunables.
    #[must_use]
    pub const fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Handle that cancels the ongoing run from another thread or a hook.
    ///
    /// A cancel raised while nothing plays is discarded when the next run
    /// starts.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Step memo shared by validation and playback for the current maze.
    #[must_use]
    pub fn step_cache(&self) -> &SharedStepCache {
        &self.steps
    }

    /// Adds a player at the start cell, or reactivates a removed one.
    pub fn add_player(&mut self, id: PlayerId) -> Result<(), SessionError> {
        if !self.active.insert(id) {
            return Err(SessionError::AlreadyActive(id));
        }
        let start = self.maze.start();
        let _ = self
            .players
            .entry(id)
            .and_modify(|player| player.reset(start))
            .or_insert_with(|| PlayerState::spawn(start));
        tracing::info!(%id, "player joined");
        Ok(())
    }

    /// Takes a player out of the turn order while keeping their scores.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), SessionError> {
        if !self.active.contains(&id) {
            return Err(SessionError::UnknownPlayer(id));
        }
        if self.active.len() == 1 {
            return Err(SessionError::LastPlayer(id));
        }
        if self.current == id {
            self.current = self.next_after(id);
        }
        let _ = self.active.remove(&id);
        tracing::info!(%id, "player left");
        Ok(())
    }

    /// Appends a token to the current player's program.
    pub fn append_token(&mut self, token: CommandToken) -> Result<(), SessionError> {
        self.ensure_round_open()?;
        self.current_state_mut()?.queue.push(token);
        self.status = GameStatus::Editing;
        Ok(())
    }

    /// Removes the most recent token of the current player's program.
    pub fn undo(&mut self) -> Result<Option<CommandToken>, SessionError> {
        let player = self.current_state_mut()?;
        let removed = player.queue.undo();
        let empty = player.queue.is_empty();
        self.status = if empty {
            GameStatus::Idle
        } else {
            GameStatus::Editing
        };
        Ok(removed)
    }

    /// Empties the current player's program.
    pub fn clear_queue(&mut self) -> Result<(), SessionError> {
        self.current_state_mut()?.queue.clear();
        self.status = GameStatus::Idle;
        Ok(())
    }

    /// Sends a player back to the start with an empty trail and program.
    pub fn reset_player(&mut self, id: PlayerId) -> Result<(), SessionError> {
        let start = self.maze.start();
        self.players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))?
            .reset(start);
        Ok(())
    }

    /// Hands the turn to the next active player, discarding the outgoing
    /// player's unplayed program.
    pub fn switch_turn(&mut self) -> PlayerId {
        if let Some(player) = self.players.get_mut(&self.current) {
            player.queue.clear();
        }
        self.current = self.next_after(self.current);
        if self.winner.is_none() {
            self.status = GameStatus::Idle;
        }
        tracing::debug!(player = %self.current, "turn switched");
        self.current
    }

    /// Switches to another maze and starts a fresh round on it.
    pub fn load_maze(&mut self, maze: Arc<Maze>) {
        tracing::info!(
            maze = maze.name().unwrap_or("unnamed"),
            width = maze.width(),
            height = maze.height(),
            "maze loaded"
        );
        self.steps.forget_maze(self.maze.id());
        self.constraints = PathConstraints::derive(&maze);
        self.maze = maze;
        self.play_again();
    }

    /// Changes the playback pace for subsequent runs.
    pub fn set_speed(&mut self, speed: Speed) {
        self.settings.speed = speed;
        self.execution.speed = speed;
    }

    /// Changes how strictly subsequent programs are validated.
    pub fn set_strictness(&mut self, strictness: Strictness) {
        self.settings.strictness = strictness;
    }

    /// Starts a new round on the same maze.
    ///
    /// Wins carry over; crash counts start again from zero.
    pub fn play_again(&mut self) {
        let start = self.maze.start();
        for player in self.players.values_mut() {
            player.reset(start);
            player.crashes = 0;
        }
        self.winner = None;
        self.status = GameStatus::Idle;
        self.execution = ExecutionState {
            speed: self.settings.speed,
            ..ExecutionState::default()
        };
        if let Some(first) = self.active.first() {
            self.current = *first;
        }
    }

    /// Validates and plays the current player's whole program.
    ///
    /// Blocks on `clock` between steps. A program that fails validation is
    /// reported through `on_error` and counts as a crash without moving the
    /// player.
    pub fn run<C, H>(&mut self, clock: &mut C, hooks: &mut H) -> Result<TurnOutcome, SessionError>
    where
        C: Clock + ?Sized,
        H: ExecutionHooks + ?Sized,
    {
        self.play(ExecutionMode::Running, clock, hooks)
    }

    /// Validates and plays one unit step from the head of the current
    /// player's program, consuming it on success.
    pub fn step<C, H>(&mut self, clock: &mut C, hooks: &mut H) -> Result<TurnOutcome, SessionError>
    where
        C: Clock + ?Sized,
        H: ExecutionHooks + ?Sized,
    {
        self.play(ExecutionMode::Stepping, clock, hooks)
    }

    fn play<C, H>(
        &mut self,
        mode: ExecutionMode,
        clock: &mut C,
        hooks: &mut H,
    ) -> Result<TurnOutcome, SessionError>
    where
        C: Clock + ?Sized,
        H: ExecutionHooks + ?Sized,
    {
        self.ensure_round_open()?;
        self.cancel.reset();
        let id = self.current;
        let player = self.current_state_mut()?;
        let from = player.position;
        let tokens = player.queue.tokens().to_vec();
        let Some(head) = tokens.first().copied() else {
            return Err(SessionError::EmptyQueue(id));
        };

        let checked = match mode {
            ExecutionMode::Stepping => vec![CommandToken::new(head.direction(), Magnitude::ONE)],
            ExecutionMode::Running | ExecutionMode::Idle => tokens.clone(),
        };
        let report = validate_using(
            &self.steps,
            &self.maze,
            &self.constraints,
            from,
            &checked,
            self.settings.strictness,
        );
        if let Some(failure) = report.failure {
            tracing::info!(
                player = %id,
                step = failure.step,
                reason = %failure.reason,
                attempted = %failure.attempted,
                "program rejected"
            );
            hooks.on_error(failure.step, failure.attempted);
            self.record_crash(id)?;
            return Ok(TurnOutcome::Rejected(failure));
        }

        let mut request = PlaybackRequest::new(
            Arc::clone(&self.maze),
            from,
            tokens,
            self.settings.speed.tick_interval(),
        )
        .with_cancel(self.cancel.clone())
        .with_step_cache(self.steps.clone());
        request.max_duration = self.settings.max_run;

        self.status = GameStatus::Executing;
        self.execution = ExecutionState {
            mode,
            current_step: 0,
            total_steps: match mode {
                ExecutionMode::Stepping => 1,
                ExecutionMode::Running | ExecutionMode::Idle => total_steps(&checked),
            },
            speed: self.settings.speed,
        };

        let player = self
            .players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))?;
        let mut recorder = Recorder {
            player,
            execution: &mut self.execution,
            outer: hooks,
        };
        let played = match mode {
            ExecutionMode::Stepping => self.executor.step(request, clock, &mut recorder),
            ExecutionMode::Running | ExecutionMode::Idle => {
                self.executor.run(request, clock, &mut recorder)
            }
        };
        self.execution.mode = ExecutionMode::Idle;
        let outcome = played?;

        self.settle(id, mode, outcome)?;
        Ok(TurnOutcome::Played(outcome))
    }

    fn settle(
        &mut self,
        id: PlayerId,
        mode: ExecutionMode,
        outcome: RunOutcome,
    ) -> Result<(), SessionError> {
        tracing::info!(player = %id, ?outcome, "turn played");
        self.cancel.reset();
        let player = self
            .players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))?;

        self.status = match outcome {
            RunOutcome::ReachedGoal { .. } => {
                player.queue.clear();
                player.wins += 1;
                self.winner = Some(id);
                GameStatus::ReachedGoal
            }
            RunOutcome::HitWall { .. } => {
                player.crashes += 1;
                GameStatus::HitWall
            }
            RunOutcome::Completed { .. } if mode == ExecutionMode::Stepping => {
                let _ = player.queue.consume_step();
                if player.queue.is_empty() {
                    GameStatus::Idle
                } else {
                    GameStatus::Editing
                }
            }
            RunOutcome::Completed { .. } => {
                player.queue.clear();
                GameStatus::Idle
            }
            RunOutcome::Cancelled { .. } | RunOutcome::TimedOut { .. } => {
                if mode == ExecutionMode::Running {
                    player.queue.clear();
                }
                GameStatus::Idle
            }
        };
        Ok(())
    }

    fn record_crash(&mut self, id: PlayerId) -> Result<(), SessionError> {
        self.players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))?
            .crashes += 1;
        self.status = GameStatus::HitWall;
        Ok(())
    }

    fn ensure_round_open(&self) -> Result<(), SessionError> {
        match self.winner {
            Some(winner) => Err(SessionError::RoundOver { winner }),
            None => Ok(()),
        }
    }

    fn current_state_mut(&mut self) -> Result<&mut PlayerState, SessionError> {
        let id = self.current;
        self.players
            .get_mut(&id)
            .ok_or(SessionError::UnknownPlayer(id))
    }

    fn next_after(&self, id: PlayerId) -> PlayerId {
        self.active
            .range((Bound::Excluded(id), Bound::Unbounded))
            .next()
            .or_else(|| self.active.first())
            .copied()
            .unwrap_or(id)
    }
}

/// Mirrors committed moves into the session while forwarding every callback.
struct Recorder<'a, H: ?Sized> {
    player: &'a mut PlayerState,
    execution: &'a mut ExecutionState,
    outer: &'a mut H,
}

impl<H> ExecutionHooks for Recorder<'_, H>
where
    H: ExecutionHooks + ?Sized,
{
    fn on_token_start(&mut self, token: &CommandToken, index: usize) {
        self.outer.on_token_start(token, index);
    }

    fn on_step(&mut self, cell: Cell, step_index: u32) {
        self.player.advance(cell);
        self.execution.current_step = step_index;
        self.outer.on_step(cell, step_index);
    }

    fn on_token_end(&mut self, token: &CommandToken, index: usize) {
        self.outer.on_token_end(token, index);
    }

    fn on_error(&mut self, step_index: u32, attempted: Cell) {
        self.execution.current_step = step_index;
        self.outer.on_error(step_index, attempted);
    }

    fn on_goal(&mut self, cell: Cell) {
        self.outer.on_goal(cell);
    }

    fn on_done(&mut self) {
        self.outer.on_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_runner_core::{parse_program, Direction};
    use maze_runner_system_execution::{ManualClock, PlaybackEvent};
    use maze_runner_world::classic;

    const ONE: PlayerId = PlayerId::new(1);
    const TWO: PlayerId = PlayerId::new(2);

    fn session() -> Session {
        Session::new(Arc::new(classic()), [ONE, TWO], SessionSettings::default())
            .expect("two players")
    }

    fn queue(session: &mut Session, program: &str) {
        for token in parse_program(program).expect("program parses") {
            session.append_token(token).expect("round open");
        }
    }

    #[test]
    fn new_session_requires_players() {
        let error = Session::new(Arc::new(classic()), Vec::new(), SessionSettings::default())
            .unwrap_err();
        assert_eq!(error, SessionError::NoPlayers);
    }

    #[test]
    fn editing_updates_status() {
        let mut session = session();
        queue(&mut session, "R2 D1");
        assert_eq!(session.status(), GameStatus::Editing);
        assert_eq!(
            session.undo().expect("current player exists"),
            Some(CommandToken::repeat(Direction::Down, 1).expect("valid count"))
        );
        session.clear_queue().expect("current player exists");
        assert_eq!(session.status(), GameStatus::Idle);
        assert!(session.player(ONE).expect("player one").queue.is_empty());
    }

    #[test]
    fn switch_turn_cycles_and_discards_unplayed_programs() {
        let mut session = session();
        queue(&mut session, "R1");
        assert_eq!(session.switch_turn(), TWO);
        assert!(session.player(ONE).expect("player one").queue.is_empty());
        assert_eq!(session.switch_turn(), ONE);
    }

    #[test]
    fn turns_follow_player_ids() {
        let mut session = Session::new(Arc::new(classic()), [TWO, ONE], SessionSettings::default())
            .expect("two players");
        assert_eq!(session.current_player(), ONE);
        assert_eq!(session.active_players().collect::<Vec<_>>(), vec![ONE, TWO]);
        assert_eq!(session.switch_turn(), TWO);
    }

    #[test]
    fn removing_the_current_player_passes_the_turn() {
        let mut session = session();
        session.remove_player(ONE).expect("two players active");
        assert_eq!(session.current_player(), TWO);
        assert_eq!(session.remove_player(TWO), Err(SessionError::LastPlayer(TWO)));
        assert_eq!(session.add_player(TWO), Err(SessionError::AlreadyActive(TWO)));
        session.add_player(ONE).expect("player one rejoins");
        assert_eq!(session.active_players().collect::<Vec<_>>(), vec![ONE, TWO]);
    }

    #[test]
    fn rejected_program_counts_a_crash_without_moving() {
        let mut session = session();
        queue(&mut session, "R2 D1 R4");
        let mut events = Vec::new();

        let outcome = session
            .run(&mut ManualClock::new(), &mut events)
            .expect("turn plays");

        assert!(outcome.is_crash());
        assert_eq!(session.status(), GameStatus::HitWall);
        let player = session.player(ONE).expect("player one");
        assert_eq!(player.position, Cell::new(0, 0));
        assert_eq!(player.crashes, 1);
        assert_eq!(
            events,
            vec![PlaybackEvent::Blocked {
                step_index: 3,
                attempted: Cell::new(1, 2),
            }]
        );
    }

    #[test]
    fn valid_program_moves_and_records_the_trail() {
        let mut session = session();
        queue(&mut session, "R1 D1");
        let mut events = Vec::new();

        let outcome = session
            .run(&mut ManualClock::new(), &mut events)
            .expect("turn plays");

        assert_eq!(
            outcome,
            TurnOutcome::Played(RunOutcome::Completed {
                position: Cell::new(1, 1),
            })
        );
        let player = session.player(ONE).expect("player one");
        assert_eq!(
            player.trail,
            vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 1)]
        );
        assert!(player.queue.is_empty());
        assert_eq!(session.status(), GameStatus::Idle);
        assert_eq!(session.execution().current_step, 2);
        assert_eq!(session.execution().mode, ExecutionMode::Idle);
    }

    #[test]
    fn stepping_consumes_one_unit_at_a_time() {
        let mut session = session();
        queue(&mut session, "R2");
        let mut events = Vec::new();
        let mut clock = ManualClock::new();

        let _ = session.step(&mut clock, &mut events).expect("step plays");
        let player = session.player(ONE).expect("player one");
        assert_eq!(player.position, Cell::new(0, 1));
        assert_eq!(player.queue.total_steps(), 1);
        assert_eq!(session.status(), GameStatus::Editing);

        let _ = session.step(&mut clock, &mut events).expect("step plays");
        let player = session.player(ONE).expect("player one");
        assert_eq!(player.position, Cell::new(0, 2));
        assert!(player.queue.is_empty());
        assert_eq!(session.status(), GameStatus::Idle);

        assert_eq!(
            session.step(&mut clock, &mut events),
            Err(SessionError::EmptyQueue(ONE))
        );
    }

    #[test]
    fn reaching_the_goal_closes_the_round() {
        let mut session = session();
        queue(&mut session, "R9 D9");
        let mut events = Vec::new();

        let _ = session
            .run(&mut ManualClock::new(), &mut events)
            .expect("turn plays");

        assert_eq!(session.status(), GameStatus::ReachedGoal);
        assert_eq!(session.winner(), Some(ONE));
        assert_eq!(session.player(ONE).expect("player one").wins, 1);
        assert_eq!(
            session.append_token(CommandToken::repeat(Direction::Left, 1).expect("valid count")),
            Err(SessionError::RoundOver { winner: ONE })
        );

        session.play_again();
        assert_eq!(session.winner(), None);
        let player = session.player(ONE).expect("player one");
        assert_eq!(player.position, Cell::new(0, 0));
        assert_eq!(player.wins, 1);
        assert_eq!(player.crashes, 0);
    }

    #[test]
    fn play_again_forgets_crashes_but_keeps_wins() {
        let mut session = session();
        let mut clock = ManualClock::new();
        let mut events: Vec<PlaybackEvent> = Vec::new();
        queue(&mut session, "R2 D1");
        let _ = session.run(&mut clock, &mut events).expect("turn plays");
        assert_eq!(session.player(ONE).expect("player one").crashes, 1);
        let _ = session.switch_turn();
        queue(&mut session, "R9 D9");
        let _ = session.run(&mut clock, &mut events).expect("turn plays");

        session.play_again();

        let one = session.player(ONE).expect("player one");
        let two = session.player(TWO).expect("player two");
        assert_eq!((one.wins, one.crashes), (0, 0));
        assert_eq!((two.wins, two.crashes), (1, 0));
        assert_eq!(session.current_player(), ONE);
    }

    #[test]
    fn speed_changes_flow_into_the_execution_state() {
        let mut session = session();
        session.set_speed(Speed::Slow);
        assert_eq!(session.execution().speed, Speed::Slow);
        assert_eq!(session.settings().speed, Speed::Slow);
    }
}
