#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that loads mazes, checks programs and plays them.

mod config;
mod console;

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maze_runner_core::{parse_program, Cell, CommandToken, WELCOME_BANNER};
use maze_runner_system_execution::{
    run_queue, Clock, ManualClock, PlaybackRequest, RunOutcome, Speed, SystemClock,
};
use maze_runner_system_layout::load_layout;
use maze_runner_system_session::{Session, TurnOutcome};
use maze_runner_system_validation::{validate, Strictness};
use maze_runner_world::{classic, Maze, PathConstraints};
use tracing_subscriber::EnvFilter;

use crate::{config::RunnerConfig, console::ConsoleHooks};

#[derive(Parser, Debug)]
#[command(name = "maze-runner", about = "Plan and replay command programs through a maze")]
struct Cli {
    /// TOML file with speed, strictness, max_run_ms and players.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enables debug logging unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints the maze.
    Show {
        /// Layout JSON file; the built-in maze is used when omitted.
        #[arg(long)]
        layout: Option<PathBuf>,
    },
    /// Checks a program without playing it.
    Validate {
        /// Layout JSON file; the built-in maze is used when omitted.
        #[arg(long)]
        layout: Option<PathBuf>,
        /// Starting cell as `row,col`; defaults to the maze start.
        #[arg(long)]
        from: Option<Cell>,
        /// `walls` or `path`.
        #[arg(long)]
        strictness: Option<Strictness>,
        /// Tokens such as `R2 D1 R4`.
        #[arg(required = true)]
        program: Vec<String>,
    },
    /// Plays a program step by step.
    Run {
        /// Layout JSON file; the built-in maze is used when omitted.
        #[arg(long)]
        layout: Option<PathBuf>,
        /// Starting cell as `row,col`; defaults to the maze start.
        #[arg(long)]
        from: Option<Cell>,
        /// `slow` or `medium`.
        #[arg(long)]
        speed: Option<Speed>,
        /// Safety cutoff in milliseconds.
        #[arg(long = "max-run-ms")]
        max_run_ms: Option<u64>,
        /// Skips the pauses between steps.
        #[arg(long)]
        instant: bool,
        /// Tokens such as `R2 D1 R4`.
        #[arg(required = true)]
        program: Vec<String>,
    },
    /// Takes turns between players, one quoted program per turn, until someone
    /// reaches the goal.
    Race {
        /// Layout JSON file; the built-in maze is used when omitted.
        #[arg(long)]
        layout: Option<PathBuf>,
        /// `slow` or `medium`.
        #[arg(long)]
        speed: Option<Speed>,
        /// Skips the pauses between steps.
        #[arg(long)]
        instant: bool,
        /// Programs in turn order, for example `"R2 D1" "R9 D9"`.
        #[arg(required = true)]
        turns: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };

    match cli.command {
        Command::Show { layout } => show(layout),
        Command::Validate {
            layout,
            from,
            strictness,
            program,
        } => check(layout, from, strictness.unwrap_or(config.strictness), &program),
        Command::Run {
            layout,
            from,
            speed,
            max_run_ms,
            instant,
            program,
        } => {
            let speed = speed.unwrap_or(config.speed);
            let max_run = max_run_ms.or(config.max_run_ms).map(Duration::from_millis);
            play(layout, from, speed, max_run, instant, &program)
        }
        Command::Race {
            layout,
            speed,
            instant,
            turns,
        } => {
            let mut config = config;
            if let Some(speed) = speed {
                config.speed = speed;
            }
            race(layout, &config, instant, &turns)
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_maze(layout: Option<PathBuf>) -> Result<Arc<Maze>> {
    match layout {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading layout");
            load_layout(&path)
                .with_context(|| format!("failed to load layout {}", path.display()))
        }
        None => Ok(Arc::new(classic())),
    }
}

fn read_program(words: &[String]) -> Result<Vec<CommandToken>> {
    let text = words.join(" ");
    parse_program(&text).with_context(|| format!("invalid program '{text}'"))
}

fn make_clock(instant: bool) -> Box<dyn Clock> {
    if instant {
        Box::new(ManualClock::new())
    } else {
        Box::new(SystemClock::new())
    }
}

fn show(layout: Option<PathBuf>) -> Result<ExitCode> {
    let maze = load_maze(layout)?;
    println!("{WELCOME_BANNER}");
    print!("{}", maze.describe());
    print!("{}", maze.render_ascii());
    Ok(ExitCode::SUCCESS)
}

fn check(
    layout: Option<PathBuf>,
    from: Option<Cell>,
    strictness: Strictness,
    program: &[String],
) -> Result<ExitCode> {
    let maze = load_maze(layout)?;
    let tokens = read_program(program)?;
    let from = from.unwrap_or_else(|| maze.start());
    let constraints = PathConstraints::derive(&maze);

    let report = validate(&maze, &constraints, from, &tokens, strictness);
    match report.failure {
        Some(failure) => {
            println!(
                "invalid: step {} ({}) tried to enter {}, stopping at {}",
                failure.step, failure.reason, failure.attempted, report.final_position
            );
            Ok(ExitCode::FAILURE)
        }
        None if report.reached_goal => {
            println!("valid: reaches the goal at {}", report.final_position);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("valid: ends at {}", report.final_position);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn play(
    layout: Option<PathBuf>,
    from: Option<Cell>,
    speed: Speed,
    max_run: Option<Duration>,
    instant: bool,
    program: &[String],
) -> Result<ExitCode> {
    let maze = load_maze(layout)?;
    let tokens = read_program(program)?;
    let from = from.unwrap_or_else(|| maze.start());

    let mut request = PlaybackRequest::new(Arc::clone(&maze), from, tokens, speed.tick_interval());
    request.max_duration = max_run;
    let mut clock = make_clock(instant);

    println!("playing from {from} at {speed} speed");
    let outcome = run_queue(request, clock.as_mut(), &mut ConsoleHooks);
    println!("{}", describe_outcome(&outcome));

    Ok(match outcome {
        RunOutcome::HitWall { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn race(
    layout: Option<PathBuf>,
    config: &RunnerConfig,
    instant: bool,
    turns: &[String],
) -> Result<ExitCode> {
    let maze = load_maze(layout)?;
    let mut session = Session::new(maze, config.player_ids(), config.session_settings())?;
    let mut clock = make_clock(instant);

    for (round, turn) in turns.iter().enumerate() {
        let player = session.current_player();
        let tokens = read_program(std::slice::from_ref(turn))?;
        for token in tokens {
            session.append_token(token)?;
        }

        println!("turn {}: {player} plays {turn}", round + 1);
        match session.run(clock.as_mut(), &mut ConsoleHooks)? {
            TurnOutcome::Rejected(failure) => println!(
                "  rejected: step {} ({}) would enter {}",
                failure.step, failure.reason, failure.attempted
            ),
            TurnOutcome::Played(outcome) => println!("  {}", describe_outcome(&outcome)),
        }

        if let Some(winner) = session.winner() {
            println!("{winner} wins");
            break;
        }
        let _ = session.switch_turn();
    }

    for id in session.active_players() {
        if let Some(player) = session.player(id) {
            println!(
                "{id}: at {}, {} wins, {} crashes",
                player.position, player.wins, player.crashes
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn describe_outcome(outcome: &RunOutcome) -> String {
    match *outcome {
        RunOutcome::Completed { position } => format!("finished at {position}"),
        RunOutcome::ReachedGoal { position, steps } => {
            format!("reached the goal at {position} in {steps} steps")
        }
        RunOutcome::HitWall {
            step_index,
            attempted,
            position,
        } => format!("hit a wall at step {step_index} entering {attempted}, stopped at {position}"),
        RunOutcome::Cancelled { position } => format!("cancelled at {position}"),
        RunOutcome::TimedOut { position } => format!("stopped by the safety cutoff at {position}"),
    }
}
