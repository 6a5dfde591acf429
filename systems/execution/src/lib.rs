#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cancelable, tick-paced playback of command programs.
//!
//! A [`Playback`] is a pure state machine: each call to [`Playback::tick`]
//! performs one unit step (or one token boundary), fires the matching
//! [`ExecutionHooks`], and tells the driver how long to wait before the next
//! tick. Drivers supply time through a [`Clock`]; [`run_queue`] blocks on the
//! caller's thread while an [`Executor`] lets an event loop poll the run.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod clock;
mod hooks;
mod playback;

pub use clock::{Clock, ManualClock, SystemClock};
pub use hooks::{CancelSignal, ExecutionHooks, PlaybackEvent};
pub use playback::{Playback, PlaybackRequest, RunOutcome, Tick};

/// Playback pace chosen by the players.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Speed {
    /// Relaxed pace for younger players.
    Slow,
    /// Standard pace.
    #[default]
    Medium,
}

impl Speed {
    /// Pause between unit steps at this pace.
    #[must_use]
    pub const fn tick_interval(self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(400),
            Self::Medium => Duration::from_millis(300),
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slow => f.write_str("slow"),
            Self::Medium => f.write_str("medium"),
        }
    }
}

impl FromStr for Speed {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Self::Slow),
            "medium" | "med" => Ok(Self::Medium),
            other => Err(format!("unknown speed '{other}', expected 'slow' or 'medium'")),
        }
    }
}

/// Misuse of an [`Executor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// A run was started while another one was still active.
    #[error("a run is already active on this executor")]
    Busy,
}

/// Plays a program to completion on the calling thread.
///
/// The first tick happens immediately; the clock is slept on between ticks.
pub fn run_queue<C, H>(request: PlaybackRequest, clock: &mut C, hooks: &mut H) -> RunOutcome
where
    C: Clock + ?Sized,
    H: ExecutionHooks + ?Sized,
{
    let mut playback = Playback::new(request);
    loop {
        match playback.tick(clock.now(), hooks) {
            Tick::Wait(wait) => clock.sleep(wait),
            Tick::Finished(outcome) => return outcome,
        }
    }
}

/// Single-flight playback slot owned by one player.
#[derive(Debug, Default)]
pub struct Executor {
    active: Option<Playback>,
    wake_at: Duration,
}

impl Executor {
    /// Creates an idle executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a run whose first tick is due at `now`.
    ///
    /// Returns the run's cancellation handle.
    pub fn start(
        &mut self,
        request: PlaybackRequest,
        now: Duration,
    ) -> Result<CancelSignal, ExecutionError> {
        if self.is_active() {
            return Err(ExecutionError::Busy);
        }
        let playback = Playback::new(request);
        let cancel = playback.cancel_signal();
        self.active = Some(playback);
        self.wake_at = now;
        Ok(cancel)
    }

    /// Plays a whole program, blocking on `clock` until it ends.
    pub fn run<C, H>(
        &mut self,
        request: PlaybackRequest,
        clock: &mut C,
        hooks: &mut H,
    ) -> Result<RunOutcome, ExecutionError>
    where
        C: Clock + ?Sized,
        H: ExecutionHooks + ?Sized,
    {
        let _cancel = self.start(request, clock.now())?;
        self.drive(clock, hooks).ok_or(ExecutionError::Busy)
    }

    /// Plays only the first unit step of the request's program.
    pub fn step<C, H>(
        &mut self,
        request: PlaybackRequest,
        clock: &mut C,
        hooks: &mut H,
    ) -> Result<RunOutcome, ExecutionError>
    where
        C: Clock + ?Sized,
        H: ExecutionHooks + ?Sized,
    {
        self.run(request.into_single_step(), clock, hooks)
    }

    /// Ticks the active run if it is due, returning its outcome once over.
    pub fn poll<H>(&mut self, now: Duration, hooks: &mut H) -> Option<RunOutcome>
    where
        H: ExecutionHooks + ?Sized,
    {
        if now < self.wake_at {
            return None;
        }
        let playback = self.active.as_mut()?;
        match playback.tick(now, hooks) {
            Tick::Wait(wait) => {
                self.wake_at = now.saturating_add(wait);
                None
            }
            Tick::Finished(outcome) => {
                self.active = None;
                Some(outcome)
            }
        }
    }

    /// Drives the active run to completion with the provided clock.
    pub fn drive<C, H>(&mut self, clock: &mut C, hooks: &mut H) -> Option<RunOutcome>
    where
        C: Clock + ?Sized,
        H: ExecutionHooks + ?Sized,
    {
        while self.is_active() {
            let now = clock.now();
            if now < self.wake_at {
                clock.sleep(self.wake_at - now);
                continue;
            }
            if let Some(outcome) = self.poll(now, hooks) {
                return Some(outcome);
            }
        }
        None
    }

    /// Cancels the active run and settles it immediately.
    ///
    /// Fires `on_done` for a running program; does nothing when idle.
    pub fn stop<H>(&mut self, now: Duration, hooks: &mut H) -> Option<RunOutcome>
    where
        H: ExecutionHooks + ?Sized,
    {
        let mut playback = self.active.take()?;
        playback.stop();
        match playback.tick(now, hooks) {
            Tick::Finished(outcome) => Some(outcome),
            Tick::Wait(_) => None,
        }
    }

    /// Reports whether a run is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Time at which the active run expects its next tick.
    #[must_use]
    pub fn next_wake(&self) -> Option<Duration> {
        self.active.as_ref().map(|_| self.wake_at)
    }

    /// Steps attempted and total steps of the active run.
    #[must_use]
    pub fn progress(&self) -> Option<(u32, u32)> {
        self.active
            .as_ref()
            .map(|playback| (playback.current_step(), playback.total_steps()))
    }
}
