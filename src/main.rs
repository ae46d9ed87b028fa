//! baduk-rust: play Go against a GTP engine and keep SGF records.
//!
//! ## Usage
//!
//! - `baduk-rust play` - Play a game in the terminal
//! - `baduk-rust play --resume FILE` - Continue a recorded game
//! - `baduk-rust list` - List recorded games, newest first
//! - `baduk-rust show FILE` - Print the final position of a record
//! - `baduk-rust config` - Print the effective configuration

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use baduk_rust::board::Color;
use baduk_rust::config::{Config, GameConfig};
use baduk_rust::constants::UNDO_PLIES;
use baduk_rust::coords::{Vertex, from_vertex, move_to_vertex};
use baduk_rust::error::RecordError;
use baduk_rust::planning::PlanningSession;
use baduk_rust::reader;
use baduk_rust::record::GameRecord;
use baduk_rust::session::EngineSession;
use baduk_rust::state::BoardState;

/// baduk-rust: play Go against a GTP engine
#[derive(Parser)]
#[command(name = "baduk-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game against the engine
    Play(PlayArgs),
    /// List recorded games, newest first
    List {
        /// History directory to list instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Replay a record and print the final position
    Show { file: PathBuf },
    /// Print the effective configuration
    Config,
}

#[derive(Args, Default)]
struct PlayArgs {
    /// Board size
    #[arg(long)]
    size: Option<usize>,
    /// Komi
    #[arg(long)]
    komi: Option<f64>,
    /// Engine level
    #[arg(long)]
    level: Option<u8>,
    /// Play as white
    #[arg(long)]
    white: bool,
    /// Engine binary
    #[arg(long)]
    engine: Option<String>,
    /// Continue a recorded game
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Do not write a game record
    #[arg(long)]
    no_record: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    match cli.command {
        Some(Commands::Play(args)) => run_play(&config, args),
        Some(Commands::List { dir }) => run_list(&dir.unwrap_or_else(|| config.history_dir())),
        Some(Commands::Show { file }) => run_show(&file),
        Some(Commands::Config) => run_config(&config),
        None => run_play(&config, PlayArgs::default()),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_list(dir: &Path) -> Result<()> {
    let games = reader::list_games(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?;
    if games.is_empty() {
        println!("No games in {}", dir.display());
        return Ok(());
    }
    for g in games {
        let result = if g.result.is_empty() { "-" } else { &g.result };
        println!(
            "{:<32} {:>2}x{:<2} {:>4} moves  {:>6}  {} vs {}",
            g.file_name, g.board_size, g.board_size, g.move_count, result, g.player_black,
            g.player_white
        );
    }
    Ok(())
}

fn run_show(file: &Path) -> Result<()> {
    let replay = reader::replay_to_end(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let info = &replay.info;
    println!("{} (B) vs {} (W)", info.player_black, info.player_white);
    println!(
        "Size {}  Komi {}  Date {}  Result {}",
        info.board_size,
        info.komi,
        if info.date.is_empty() { "?" } else { &info.date },
        if info.result.is_empty() { "?" } else { &info.result },
    );
    println!("{} moves, {} to play\n", replay.move_count, replay.next_color);
    print!("{}", replay.board);
    Ok(())
}

fn run_config(config: &Config) -> Result<()> {
    if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }
    println!("# history: {}", config.history_dir().display());
    print!("{}", toml::to_string_pretty(config).context("failed to render configuration")?);
    Ok(())
}

// =============================================================================
// Interactive play
// =============================================================================

type SharedRecord = Arc<Mutex<Option<GameRecord>>>;

fn lock(record: &SharedRecord) -> MutexGuard<'_, Option<GameRecord>> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` on the record; on failure the recorder is dropped and the game
/// goes on.
fn with_record(record: &SharedRecord, f: impl FnOnce(&mut GameRecord) -> Result<(), RecordError>) {
    let mut guard = lock(record);
    if let Some(r) = guard.as_mut() {
        if let Err(e) = f(r) {
            warn!(error = %e, "recording stopped");
            eprintln!("Recording stopped: {e}");
            *guard = None;
        }
    }
}

fn game_config(config: &Config, args: &PlayArgs) -> Result<GameConfig> {
    let mut game = match &args.resume {
        Some(path) => {
            let info = reader::parse_header(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            GameConfig::for_saved_game(config, &info)
        }
        None => {
            let mut game = GameConfig::from_config(config);
            if let Some(size) = args.size {
                game.board_size = size;
            }
            if let Some(komi) = args.komi {
                game.komi = komi;
            }
            if args.white {
                game.human_color = Color::White;
            }
            game
        }
    };
    if let Some(level) = args.level {
        game.level = level;
    }
    if let Some(engine) = &args.engine {
        game.engine_path = engine.clone();
    }
    game.validate().context("invalid game settings")?;
    Ok(game)
}

fn open_record(config: &Config, args: &PlayArgs, game: &GameConfig) -> Option<GameRecord> {
    if !config.recording.enabled || args.no_record {
        return None;
    }
    let opened = match &args.resume {
        Some(path) => GameRecord::open(path),
        None => GameRecord::create(
            &config.history_dir(),
            game.board_size,
            game.komi,
            game.human_color,
            game.level,
        ),
    };
    match opened {
        Ok(record) => {
            println!("Recording to {}", record.path().display());
            Some(record)
        }
        Err(e) => {
            warn!(error = %e, "recording disabled");
            eprintln!("Not recording: {e}");
            None
        }
    }
}

fn print_state(state: &BoardState) {
    print!("{}", state.board);
    match &state.outcome {
        Some(outcome) => println!("Game over: {outcome}"),
        None => println!("Move {}, {} to play", state.move_number, state.to_move),
    }
}

/// `"3 4"` (zero-based x y) or a GTP vertex such as `D4`.
fn parse_point(input: &str, size: usize) -> Option<(usize, usize)> {
    let mut parts = input.split_whitespace();
    if let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) {
        return Some((a.parse().ok()?, b.parse().ok()?));
    }
    match from_vertex(input, size) {
        Ok(Vertex::Point(x, y)) => Some((x, y)),
        _ => None,
    }
}

fn run_play(config: &Config, args: PlayArgs) -> Result<()> {
    let game = game_config(config, &args)?;
    let size = game.board_size;
    let record: SharedRecord = Arc::new(Mutex::new(open_record(config, &args, &game)));
    let session = EngineSession::new(game);

    session.on_move({
        let record = Arc::clone(&record);
        move |event| {
            let vertex = move_to_vertex(event.mv.point(), event.state.size())
                .unwrap_or_else(|_| "?".to_string());
            println!("{} plays {vertex}", event.color);
            with_record(&record, |r| r.add_move(event.mv, event.color));
        }
    });
    session.on_game_end({
        let record = Arc::clone(&record);
        move |outcome| {
            println!("Game over: {outcome}");
            with_record(&record, |r| {
                r.set_result(outcome)?;
                r.close();
                Ok(())
            });
        }
    });
    session.on_engine_error(|e| eprintln!("Engine error: {e} (type 'retry')"));

    session.connect().context("failed to start engine")?;
    session.wait_for_engine();
    print_state(&session.board_state());
    println!("Commands: x y | vertex | pass | undo | resign | plan | retry | quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let Some(line) = lines.next().transpose().context("failed to read input")? else {
            break;
        };
        let cmd = line.trim();

        let outcome = match cmd {
            "" => continue,
            "quit" | "q" | "exit" => break,
            "board" => Ok(()),
            "pass" => session.pass(),
            "resign" => session.resign(),
            "retry" => session.request_engine_move(),
            "undo" => session.undo().map(|()| {
                with_record(&record, |r| r.undo_moves(UNDO_PLIES));
            }),
            "plan" => {
                run_planning(&session, &record, &mut lines)?;
                Ok(())
            }
            _ => match parse_point(cmd, size) {
                Some((x, y)) => session.play_move(x, y),
                None => {
                    println!("Unknown command: {cmd}");
                    continue;
                }
            },
        };
        if let Err(e) = outcome {
            println!("{e}");
        }
        session.wait_for_engine();
        print_state(&session.board_state());
    }

    session.close();
    with_record(&record, |r| {
        r.close();
        Ok(())
    });
    Ok(())
}

fn run_planning(
    session: &EngineSession,
    record: &SharedRecord,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<()> {
    if !session.is_my_turn() {
        println!("Planning is only possible on your turn");
        return Ok(());
    }
    let mut plan = PlanningSession::from_session(session);
    let size = plan.board().size();
    println!("Planning. Commands: x y | pass | back | fwd [n] | next | prev | commit | cancel");

    loop {
        print!("{}", plan.board());
        println!(
            "Plan depth {}, variation {}/{}, {} to play",
            plan.path_moves().len(),
            plan.tree().variation_index() + 1,
            plan.tree().num_variations(),
            plan.to_move()
        );
        print!("plan> ");
        io::stdout().flush().ok();
        let Some(line) = lines.next().transpose().context("failed to read input")? else {
            return Ok(());
        };
        let cmd = line.trim();
        match cmd {
            "cancel" | "quit" => return Ok(()),
            "pass" => plan.pass(),
            "back" => {
                plan.back();
            }
            "next" => {
                plan.next_variation();
            }
            "prev" => {
                plan.prev_variation();
            }
            "commit" => {
                let mut guard = lock(record);
                match plan.commit(session, guard.as_mut()) {
                    Ok(()) => println!("Plan committed"),
                    Err(e) => println!("{e}"),
                }
                return Ok(());
            }
            _ if cmd.starts_with("fwd") => {
                let index = cmd[3..].trim().parse().unwrap_or(0);
                if !plan.forward(index) {
                    println!("No such continuation");
                }
            }
            _ => match parse_point(cmd, size) {
                Some((x, y)) => {
                    if let Err(e) = plan.play(x, y) {
                        println!("{e}");
                    }
                }
                None => println!("Unknown command: {cmd}"),
            },
        }
    }
}
