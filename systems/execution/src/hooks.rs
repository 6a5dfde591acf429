//! Lifecycle callbacks invoked while a program plays back.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use maze_runner_core::{Cell, CommandToken};

/// Cooperative cancellation flag shared between a run and its controllers.
///
/// Clones observe the same flag. Cancelling is idempotent and sticky until
/// [`CancelSignal::reset`].
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Withdraws a pending request so the signal can guard another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Callbacks fired by the executor in strict step order.
///
/// `on_done` fires exactly once for runs that finish the program, are
/// cancelled, or time out. Runs that hit a wall or reach the goal end with
/// `on_error` or `on_goal` instead.
pub trait ExecutionHooks {
    /// A token is about to play.
    fn on_token_start(&mut self, _token: &CommandToken, _index: usize) {}

    /// A unit step moved the player onto `cell`.
    fn on_step(&mut self, cell: Cell, step_index: u32);

    /// Every unit step of a token played.
    fn on_token_end(&mut self, _token: &CommandToken, _index: usize) {}

    /// Step `step_index` was blocked while trying to enter `attempted`.
    fn on_error(&mut self, step_index: u32, attempted: Cell);

    /// The player arrived at the goal on `cell`.
    fn on_goal(&mut self, cell: Cell);

    /// The run stopped without an error or a goal.
    fn on_done(&mut self);
}

/// Callback captured by the `Vec<PlaybackEvent>` implementation of
/// [`ExecutionHooks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A token started.
    TokenStarted {
        /// Token about to play.
        token: CommandToken,
        /// Zero-based position of the token in the program.
        index: usize,
    },
    /// A unit step completed.
    Stepped {
        /// Cell the player now occupies.
        cell: Cell,
        /// 1-based index of the step across the program.
        step_index: u32,
    },
    /// A token finished.
    TokenEnded {
        /// Token that finished.
        token: CommandToken,
        /// Zero-based position of the token in the program.
        index: usize,
    },
    /// A unit step was blocked.
    Blocked {
        /// 1-based index of the blocked step.
        step_index: u32,
        /// Cell the step tried to enter.
        attempted: Cell,
    },
    /// The goal was reached.
    ReachedGoal {
        /// Goal cell.
        cell: Cell,
    },
    /// The run stopped quietly.
    Done,
}

impl ExecutionHooks for Vec<PlaybackEvent> {
    fn on_token_start(&mut self, token: &CommandToken, index: usize) {
        self.push(PlaybackEvent::TokenStarted {
            token: *token,
            index,
        });
    }

    fn on_step(&mut self, cell: Cell, step_index: u32) {
        self.push(PlaybackEvent::Stepped { cell, step_index });
    }

    fn on_token_end(&mut self, token: &CommandToken, index: usize) {
        self.push(PlaybackEvent::TokenEnded {
            token: *token,
            index,
        });
    }

    fn on_error(&mut self, step_index: u32, attempted: Cell) {
        self.push(PlaybackEvent::Blocked {
            step_index,
            attempted,
        });
    }

    fn on_goal(&mut self, cell: Cell) {
        self.push(PlaybackEvent::ReachedGoal { cell });
    }

    fn on_done(&mut self) {
        self.push(PlaybackEvent::Done);
    }
}
