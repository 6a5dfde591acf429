use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use maze_runner_core::PlayerId;
use maze_runner_system_execution::Speed;
use maze_runner_system_session::SessionSettings;
use maze_runner_system_validation::Strictness;
use serde::Deserialize;

/// Largest number of local players sharing one maze.
pub(crate) const MAX_PLAYERS: u8 = 4;

/// Settings read from a TOML file; command-line flags take precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunnerConfig {
    /// Playback pace.
    pub(crate) speed: Speed,
    /// Validation strictness applied before a run.
    pub(crate) strictness: Strictness,
    /// Safety cutoff for a single run, in milliseconds.
    pub(crate) max_run_ms: Option<u64>,
    /// Number of players taking turns in a race.
    pub(crate) players: u8,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            speed: Speed::default(),
            strictness: Strictness::default(),
            max_run_ms: None,
            players: 2,
        }
    }
}

impl RunnerConfig {
    /// Reads and checks a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse config toml")?;
        if !(1..=MAX_PLAYERS).contains(&config.players) {
            bail!(
                "players must be between 1 and {MAX_PLAYERS}, got {}",
                config.players
            );
        }
        Ok(config)
    }

    /// Session tunables derived from the configuration.
    pub(crate) fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            speed: self.speed,
            strictness: self.strictness,
            max_run: self.max_run_ms.map(Duration::from_millis),
        }
    }

    /// Player identifiers in turn order.
    pub(crate) fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        (1..=self.players).map(PlayerId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = RunnerConfig::parse("").expect("empty config parses");
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.session_settings().max_run, None);
    }

    #[test]
    fn reads_every_field() {
        let config = RunnerConfig::parse(
            r#"
            speed = "slow"
            strictness = "walls-only"
            max_run_ms = 5000
            players = 3
            "#,
        )
        .expect("config parses");

        assert_eq!(config.speed, Speed::Slow);
        assert_eq!(config.strictness, Strictness::WallsOnly);
        assert_eq!(
            config.session_settings().max_run,
            Some(Duration::from_millis(5000))
        );
        assert_eq!(
            config.player_ids().collect::<Vec<_>>(),
            vec![PlayerId::new(1), PlayerId::new(2), PlayerId::new(3)]
        );
    }

    #[test]
    fn rejects_unknown_keys_and_player_counts() {
        assert!(RunnerConfig::parse("tempo = 3").is_err());
        assert!(RunnerConfig::parse("players = 0").is_err());
        assert!(RunnerConfig::parse("players = 5").is_err());
    }
}
