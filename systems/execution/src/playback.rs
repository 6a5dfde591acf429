//! Tick-driven state machine that replays a program one unit step at a time.

use std::{sync::Arc, time::Duration};

use maze_runner_core::{total_steps, Cell, CommandToken, Direction, Magnitude, StepResult};
use maze_runner_system_simulation::{step, SharedStepCache, Simulator};
use maze_runner_world::Maze;

use crate::hooks::{CancelSignal, ExecutionHooks};

/// Everything required to play a program.
#[derive(Clone, Debug)]
pub struct PlaybackRequest {
    /// Program to play, in order.
    pub tokens: Vec<CommandToken>,
    /// Cell the player starts from.
    pub from: Cell,
    /// Maze the program runs against.
    pub maze: Arc<Maze>,
    /// Pause between successive unit steps.
    pub tick_interval: Duration,
    /// Safety cutoff measured from the first tick; zero means no cutoff.
    pub max_duration: Option<Duration>,
    /// Cooperative cancellation flag.
    pub cancel: CancelSignal,
    /// Memo consulted before simulating a step.
    pub step_cache: Option<SharedStepCache>,
}

impl PlaybackRequest {
    /// Creates a request with no cutoff and a fresh cancellation signal.
    #[must_use]
    pub fn new(
        maze: Arc<Maze>,
        from: Cell,
        tokens: Vec<CommandToken>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            tokens,
            from,
            maze,
            tick_interval,
            max_duration: None,
            cancel: CancelSignal::new(),
            step_cache: None,
        }
    }

    /// Request that plays only the first unit step of the first token.
    #[must_use]
    pub fn single_step(
        maze: Arc<Maze>,
        from: Cell,
        tokens: &[CommandToken],
        tick_interval: Duration,
    ) -> Self {
        Self::new(maze, from, tokens.to_vec(), tick_interval).into_single_step()
    }

    /// Keeps only the first unit step of the first token.
    #[must_use]
    pub fn into_single_step(mut self) -> Self {
        self.tokens = self
            .tokens
            .first()
            .map(|head| vec![CommandToken::new(head.direction(), Magnitude::ONE)])
            .unwrap_or_default();
        self
    }

    /// Attaches a safety cutoff.
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Attaches an externally controlled cancellation signal.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolves steps through a shared memo.
    #[must_use]
    pub fn with_step_cache(mut self, cache: SharedStepCache) -> Self {
        self.step_cache = Some(cache);
        self
    }
}

/// Terminal state of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every token played without reaching the goal.
    Completed {
        /// Final player position.
        position: Cell,
    },
    /// A step arrived at the goal; the rest of the program was abandoned.
    ReachedGoal {
        /// Goal cell.
        position: Cell,
        /// Number of unit steps played.
        steps: u32,
    },
    /// A step was blocked.
    HitWall {
        /// 1-based index of the blocked step.
        step_index: u32,
        /// Cell the blocked step tried to enter.
        attempted: Cell,
        /// Last valid position.
        position: Cell,
    },
    /// The cancellation signal fired.
    Cancelled {
        /// Position when the run stopped.
        position: Cell,
    },
    /// The safety cutoff elapsed.
    TimedOut {
        /// Position when the run stopped.
        position: Cell,
    },
}

impl RunOutcome {
    /// Position the player holds after the run.
    #[must_use]
    pub const fn position(&self) -> Cell {
        match *self {
            Self::Completed { position }
            | Self::ReachedGoal { position, .. }
            | Self::HitWall { position, .. }
            | Self::Cancelled { position }
            | Self::TimedOut { position } => position,
        }
    }

    /// Reports whether the run stopped quietly through `on_done`.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::TimedOut { .. }
        )
    }
}

/// What the driver should do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Call [`Playback::tick`] again once this much time has passed.
    Wait(Duration),
    /// The run is over.
    Finished(RunOutcome),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    TokenStart { token: usize },
    Stepping { token: usize, completed: u32 },
    Finished(RunOutcome),
}

/// One run of a program.
///
/// The playback owns its position accumulator; callers learn about committed
/// moves only through [`ExecutionHooks::on_step`].
#[derive(Debug)]
pub struct Playback {
    tokens: Vec<CommandToken>,
    maze: Arc<Maze>,
    tick_interval: Duration,
    max_duration: Option<Duration>,
    cancel: CancelSignal,
    step_cache: Option<SharedStepCache>,
    position: Cell,
    step_index: u32,
    total_steps: u32,
    started_at: Option<Duration>,
    phase: Phase,
}

impl Playback {
    /// Prepares a run; nothing happens until the first [`Playback::tick`].
    #[must_use]
    pub fn new(request: PlaybackRequest) -> Self {
        let PlaybackRequest {
            tokens,
            from,
            maze,
            tick_interval,
            max_duration,
            cancel,
            step_cache,
        } = request;
        let total_steps = total_steps(&tokens);
        Self {
            tokens,
            maze,
            tick_interval,
            max_duration: max_duration.filter(|limit| !limit.is_zero()),
            cancel,
            step_cache,
            position: from,
            step_index: 0,
            total_steps,
            started_at: None,
            phase: Phase::TokenStart { token: 0 },
        }
    }

    /// Advances the run by one unit step or one token boundary.
    ///
    /// `now` is measured on the same clock for every call. Once finished, the
    /// outcome is returned again without firing any callback.
    pub fn tick<H>(&mut self, now: Duration, hooks: &mut H) -> Tick
    where
        H: ExecutionHooks + ?Sized,
    {
        let started_at = *self.started_at.get_or_insert(now);

        loop {
            let phase = self.phase;
            match phase {
                Phase::Finished(outcome) => return Tick::Finished(outcome),
                Phase::TokenStart { token } => {
                    if let Some(outcome) = self.interruption(now, started_at) {
                        return self.finish_quietly(outcome, hooks);
                    }
                    let Some(current) = self.tokens.get(token).copied() else {
                        let outcome = RunOutcome::Completed {
                            position: self.position,
                        };
                        return self.finish_quietly(outcome, hooks);
                    };
                    hooks.on_token_start(&current, token);
                    self.phase = Phase::Stepping {
                        token,
                        completed: 0,
                    };
                }
                Phase::Stepping { token, completed } => {
                    if let Some(outcome) = self.interruption(now, started_at) {
                        return self.finish_quietly(outcome, hooks);
                    }
                    let Some(current) = self.tokens.get(token).copied() else {
                        self.phase = Phase::TokenStart { token };
                        continue;
                    };
                    if completed >= current.steps() {
                        hooks.on_token_end(&current, token);
                        self.phase = Phase::TokenStart { token: token + 1 };
                        return self.schedule(self.tick_interval / 2, now, started_at, hooks);
                    }

                    self.step_index += 1;
                    let result = self.resolve(current.direction());
                    if !result.ok {
                        tracing::debug!(
                            step = self.step_index,
                            attempted = %result.next,
                            "playback blocked"
                        );
                        hooks.on_error(self.step_index, result.next);
                        return self.conclude(RunOutcome::HitWall {
                            step_index: self.step_index,
                            attempted: result.next,
                            position: self.position,
                        });
                    }

                    self.position = result.next;
                    tracing::debug!(
                        step = self.step_index,
                        total = self.total_steps,
                        cell = %self.position,
                        "playback advanced"
                    );
                    hooks.on_step(self.position, self.step_index);
                    self.phase = Phase::Stepping {
                        token,
                        completed: completed + 1,
                    };

                    if result.reached_goal {
                        hooks.on_goal(self.position);
                        return self.conclude(RunOutcome::ReachedGoal {
                            position: self.position,
                            steps: self.step_index,
                        });
                    }
                    return self.schedule(self.tick_interval, now, started_at, hooks);
                }
            }
        }
    }

    /// Requests cancellation; the next tick fires `on_done`.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Handle that cancels this run from elsewhere.
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Position committed by the most recent step.
    #[must_use]
    pub const fn position(&self) -> Cell {
        self.position
    }

    /// Number of unit steps attempted so far.
    #[must_use]
    pub const fn current_step(&self) -> u32 {
        self.step_index
    }

    /// Number of unit steps in the whole program.
    #[must_use]
    pub const fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Terminal outcome, once the run is over.
    #[must_use]
    pub fn outcome(&self) -> Option<RunOutcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Reports whether the run is over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    fn resolve(&self, direction: Direction) -> StepResult {
        match &self.step_cache {
            Some(cache) => cache.resolve(&self.maze, self.position, direction),
            None => step(&self.maze, self.position, direction),
        }
    }

    fn interruption(&self, now: Duration, started_at: Duration) -> Option<RunOutcome> {
        let position = self.position;
        if self.cancel.is_cancelled() {
            return Some(RunOutcome::Cancelled { position });
        }
        let elapsed = now.saturating_sub(started_at);
        match self.max_duration {
            Some(limit) if elapsed >= limit => Some(RunOutcome::TimedOut { position }),
            _ => None,
        }
    }

    fn schedule<H>(
        &mut self,
        wait: Duration,
        now: Duration,
        started_at: Duration,
        hooks: &mut H,
    ) -> Tick
    where
        H: ExecutionHooks + ?Sized,
    {
        match self.interruption(now, started_at) {
            Some(outcome) => self.finish_quietly(outcome, hooks),
            None => Tick::Wait(wait),
        }
    }

    fn finish_quietly<H>(&mut self, outcome: RunOutcome, hooks: &mut H) -> Tick
    where
        H: ExecutionHooks + ?Sized,
    {
        hooks.on_done();
        self.conclude(outcome)
    }

    fn conclude(&mut self, outcome: RunOutcome) -> Tick {
        tracing::info!(?outcome, steps = self.step_index, "playback finished");
        self.phase = Phase::Finished(outcome);
        Tick::Finished(outcome)
    }
}
