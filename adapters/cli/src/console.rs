use maze_runner_core::{Cell, CommandToken};
use maze_runner_system_execution::ExecutionHooks;

/// Prints every playback callback on its own line.
#[derive(Debug, Default)]
pub(crate) struct ConsoleHooks;

impl ExecutionHooks for ConsoleHooks {
    fn on_token_start(&mut self, token: &CommandToken, index: usize) {
        println!("  token {}: {token}", index + 1);
    }

    fn on_step(&mut self, cell: Cell, step_index: u32) {
        println!("    step {step_index:>3} -> {cell}");
    }

    fn on_error(&mut self, step_index: u32, attempted: Cell) {
        println!("    step {step_index:>3} blocked trying to enter {attempted}");
    }

    fn on_goal(&mut self, cell: Cell) {
        println!("  goal reached at {cell}");
    }

    fn on_done(&mut self) {
        println!("  done");
    }
}
