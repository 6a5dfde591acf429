use maze_runner_core::{Cell, CommandQueue};
use serde::{Deserialize, Serialize};

/// Everything the session tracks for one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Cell the player currently occupies.
    pub position: Cell,
    /// Cells visited since the last reset, starting with the spawn cell.
    pub trail: Vec<Cell>,
    /// Program being assembled for the player's next turn.
    pub queue: CommandQueue,
    /// Programs that ended against a wall.
    pub crashes: u32,
    /// Rounds won by reaching the goal.
    pub wins: u32,
}

impl PlayerState {
    pub(crate) fn spawn(start: Cell) -> Self {
        Self {
            position: start,
            trail: vec![start],
            queue: CommandQueue::new(),
            crashes: 0,
            wins: 0,
        }
    }

    /// Returns the player to `start` and forgets the trail and queue.
    ///
    /// Wins and crashes are left to the session.
    pub(crate) fn reset(&mut self, start: Cell) {
        self.position = start;
        self.trail.clear();
        self.trail.push(start);
        self.queue.clear();
    }

    pub(crate) fn advance(&mut self, cell: Cell) {
        self.position = cell;
        self.trail.push(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_runner_core::{CommandToken, Direction};

    #[test]
    fn reset_keeps_scores() {
        let mut player = PlayerState::spawn(Cell::new(0, 0));
        player.advance(Cell::new(0, 1));
        player.queue.push(CommandToken::repeat(Direction::Right, 2).expect("valid count"));
        player.wins = 2;
        player.crashes = 1;

        player.reset(Cell::new(0, 0));

        assert_eq!(player.position, Cell::new(0, 0));
        assert_eq!(player.trail, vec![Cell::new(0, 0)]);
        assert!(player.queue.is_empty());
        assert_eq!((player.wins, player.crashes), (2, 1));
    }
}
