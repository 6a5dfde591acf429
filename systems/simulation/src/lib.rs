#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure step simulator that resolves single unit moves against a maze.
//!
//! [`step`] is the only source of movement truth: the validator walks whole
//! programs with it and the executor replays programs with it, so both agree
//! on every outcome. [`StepCache`] memoises results per maze identity without
//! ever changing what [`step`] would have returned, and [`SharedStepCache`]
//! lets a validator and a concurrently driven playback share one memo.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use maze_runner_core::{Cell, Direction, StepResult};
use maze_runner_world::{Maze, MazeId};

/// Default number of memoised steps kept by [`StepCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
/// Default lifetime of a memoised step.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Attempts a single unit move from `from` toward `direction`.
///
/// The returned `next` cell is always the attempted destination, even when
/// the move is blocked, so callers can point at the wall that was hit.
#[must_use]
pub fn step(maze: &Maze, from: Cell, direction: Direction) -> StepResult {
    let next = direction.apply(from);
    if !maze.in_bounds(next) || !maze.is_connected(from, next) {
        return StepResult::blocked(next);
    }
    StepResult::moved(next, maze.is_goal(next))
}

/// Source of unit-move outcomes used by validators and playbacks.
pub trait Simulator {
    /// Resolves one unit move; must agree with [`step`].
    fn resolve(&self, maze: &Maze, from: Cell, direction: Direction) -> StepResult;
}

/// Resolves every move with [`step`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Direct;

impl Simulator for Direct {
    fn resolve(&self, maze: &Maze, from: Cell, direction: Direction) -> StepResult {
        step(maze, from, direction)
    }
}

/// Directions that lead somewhere from `from`, in control order.
#[must_use]
pub fn valid_moves(maze: &Maze, from: Cell) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|direction| step(maze, from, *direction).ok)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct StepKey {
    maze: MazeId,
    from: Cell,
    direction: Direction,
}

#[derive(Clone, Copy, Debug)]
struct CachedStep {
    result: StepResult,
    stored_at: Instant,
    generation: u64,
}

/// Bounded, expiring memo of [`step`] results keyed by maze identity.
#[derive(Debug)]
pub struct StepCache {
    entries: HashMap<StepKey, CachedStep>,
    order: VecDeque<(StepKey, u64)>,
    capacity: usize,
    ttl: Duration,
    next_generation: u64,
    hits: u64,
    misses: u64,
}

impl StepCache {
    /// Creates a cache holding at most `capacity` entries for `ttl` each.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            ttl,
            next_generation: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Resolves a step, serving a memoised result when one is still fresh.
    pub fn step(
        &mut self,
        maze: &Maze,
        from: Cell,
        direction: Direction,
        now: Instant,
    ) -> StepResult {
        let key = StepKey {
            maze: maze.id(),
            from,
            direction,
        };

        if let Some(cached) = self.entries.get(&key) {
            if now.saturating_duration_since(cached.stored_at) < self.ttl {
                self.hits += 1;
                return cached.result;
            }
            let _ = self.entries.remove(&key);
        }

        self.misses += 1;
        let result = step(maze, from, direction);
        self.store(key, result, now);
        result
    }

    /// Drops every entry that belongs to the provided maze.
    pub fn forget_maze(&mut self, maze: MazeId) {
        self.entries.retain(|key, _| key.maze != maze);
        self.order.retain(|(key, _)| key.maze != maze);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups served from memory.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of lookups that had to simulate.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    fn store(&mut self, key: StepKey, result: StepResult, now: Instant) {
        while self.entries.len() >= self.capacity {
            let Some((oldest, generation)) = self.order.pop_front() else {
                break;
            };
            if self
                .entries
                .get(&oldest)
                .is_some_and(|entry| entry.generation == generation)
            {
                let _ = self.entries.remove(&oldest);
                tracing::trace!(
                    maze = oldest.maze.get(),
                    cell = %oldest.from,
                    "evicted cached step"
                );
            }
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        let _ = self.entries.insert(
            key,
            CachedStep {
                result,
                stored_at: now,
                generation,
            },
        );
        self.order.push_back((key, generation));

        if self.order.len() > self.capacity * 2 {
            let entries = &self.entries;
            self.order.retain(|(key, generation)| {
                entries
                    .get(key)
                    .is_some_and(|entry| entry.generation == *generation)
            });
        }
    }
}

impl Default for StepCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

/// [`StepCache`] behind a lock, cloned into every run that should use it.
#[derive(Clone, Debug, Default)]
pub struct SharedStepCache {
    inner: Arc<Mutex<StepCache>>,
}

impl SharedStepCache {
    /// Wraps a cache built with explicit limits.
    #[must_use]
    pub fn new(cache: StepCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Drops every entry that belongs to the provided maze.
    pub fn forget_maze(&self, maze: MazeId) {
        self.lock().forget_maze(maze);
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Reports whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of lookups served from memory.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.lock().hits()
    }

    /// Number of lookups that had to simulate.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.lock().misses()
    }

    fn lock(&self) -> MutexGuard<'_, StepCache> {
        // A panic while holding the lock cannot leave a wrong entry behind.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Simulator for SharedStepCache {
    fn resolve(&self, maze: &Maze, from: Cell, direction: Direction) -> StepResult {
        self.lock().step(maze, from, direction, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_runner_world::MazeBuilder;

    fn corridor() -> Maze {
        let mut builder = MazeBuilder::new(3, 2, Cell::new(0, 0), Cell::new(0, 2));
        builder.connect(Cell::new(0, 0), Cell::new(0, 1));
        builder.connect(Cell::new(0, 1), Cell::new(0, 2));
        builder.build().expect("corridor builds")
    }

    #[test]
    fn step_follows_edges() {
        let maze = corridor();
        let result = step(&maze, Cell::new(0, 0), Direction::Right);
        assert_eq!(result, StepResult::moved(Cell::new(0, 1), false));
    }

    #[test]
    fn step_flags_goal_arrival() {
        let maze = corridor();
        let result = step(&maze, Cell::new(0, 1), Direction::Right);
        assert_eq!(result, StepResult::moved(Cell::new(0, 2), true));
    }

    #[test]
    fn step_reports_attempted_cell_on_collision() {
        let maze = corridor();
        assert_eq!(
            step(&maze, Cell::new(0, 1), Direction::Down),
            StepResult::blocked(Cell::new(1, 1))
        );
        assert_eq!(
            step(&maze, Cell::new(0, 0), Direction::Up),
            StepResult::blocked(Cell::new(-1, 0))
        );
    }

    #[test]
    fn valid_moves_lists_open_directions() {
        let maze = corridor();
        assert_eq!(
            valid_moves(&maze, Cell::new(0, 1)),
            vec![Direction::Left, Direction::Right]
        );
    }

    #[test]
    fn cache_serves_repeated_lookups() {
        let maze = corridor();
        let mut cache = StepCache::default();
        let now = Instant::now();

        let first = cache.step(&maze, Cell::new(0, 0), Direction::Right, now);
        let second = cache.step(&maze, Cell::new(0, 0), Direction::Right, now);

        assert_eq!(first, second);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn cache_separates_mazes_with_equal_coordinates() {
        let open = corridor();
        let mut builder = MazeBuilder::new(3, 2, Cell::new(0, 0), Cell::new(0, 2));
        builder.connect(Cell::new(0, 0), Cell::new(1, 0));
        builder.connect(Cell::new(1, 0), Cell::new(1, 1));
        builder.connect(Cell::new(1, 1), Cell::new(1, 2));
        builder.connect(Cell::new(1, 2), Cell::new(0, 2));
        let detour = builder.build().expect("detour builds");

        let mut cache = StepCache::default();
        let now = Instant::now();
        assert!(cache.step(&open, Cell::new(0, 0), Direction::Right, now).ok);
        assert!(!cache.step(&detour, Cell::new(0, 0), Direction::Right, now).ok);
    }

    #[test]
    fn cache_expires_entries_after_ttl() {
        let maze = corridor();
        let mut cache = StepCache::new(8, Duration::from_millis(10));
        let now = Instant::now();

        let _ = cache.step(&maze, Cell::new(0, 0), Direction::Right, now);
        let later = now + Duration::from_millis(20);
        let _ = cache.step(&maze, Cell::new(0, 0), Direction::Right, later);

        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_never_exceeds_capacity() {
        let maze = corridor();
        let mut cache = StepCache::new(2, DEFAULT_CACHE_TTL);
        let now = Instant::now();

        for direction in Direction::ALL {
            let expected = step(&maze, Cell::new(0, 1), direction);
            assert_eq!(cache.step(&maze, Cell::new(0, 1), direction, now), expected);
            assert!(cache.len() <= 2);
        }
    }

    #[test]
    fn forgetting_a_maze_drops_its_entries() {
        let maze = corridor();
        let mut cache = StepCache::default();
        let _ = cache.step(&maze, Cell::new(0, 0), Direction::Right, Instant::now());
        cache.forget_maze(maze.id());
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_cache_agrees_with_direct_steps() {
        let maze = corridor();
        let shared = SharedStepCache::default();
        let handle = shared.clone();

        for direction in Direction::ALL {
            let expected = Direct.resolve(&maze, Cell::new(0, 1), direction);
            assert_eq!(shared.resolve(&maze, Cell::new(0, 1), direction), expected);
            assert_eq!(handle.resolve(&maze, Cell::new(0, 1), direction), expected);
        }

        assert_eq!(handle.misses(), 4);
        assert_eq!(handle.hits(), 4);
        handle.forget_maze(maze.id());
        assert!(shared.is_empty());
    }
}
