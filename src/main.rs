// ritmo: terminal metronome trainer.
//
// Enter taps along with the printed clicks; the result goes to the leaderboard.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use ritmo::app::SessionRunner;
use ritmo::config::{AppConfig, CONFIG_FILE, Level, SessionConfig};
use ritmo::database::{Leaderboard, SubmitTask};
use ritmo::play::{SessionController, SessionEvent, SessionResult, SessionView, Tendency};
use ritmo::traits::{ChannelTaps, SystemClock, TapEvent};
use ritmo::util::init_logging;

#[derive(Parser, Debug)]
#[command(name = "ritmo", about = "Metronome rhythm trainer", version)]
struct Args {
    /// Path to the app config JSON file.
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Leaderboard database (overrides the config file).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Show debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily file in this directory.
    #[arg(long, global = true, env = "RITMO_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a session in the terminal.
    Play(PlayArgs),
    /// Print the best scores.
    Leaderboard {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(ClapArgs, Debug)]
struct PlayArgs {
    /// Starting tempo.
    #[arg(long)]
    bpm: Option<f64>,

    /// Beats per measure.
    #[arg(long, value_parser = clap::value_parser!(u32).range(3..=4))]
    signature: Option<u32>,

    /// Built-in level (1-5). Overrides --bpm and --signature.
    #[arg(long, conflicts_with_all = ["bpm", "signature"])]
    level: Option<u32>,

    /// Name shown on the leaderboard.
    #[arg(long)]
    name: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_dir.as_deref(), args.verbose)?;

    let mut app_config = AppConfig::load_from(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&app_config.leaderboard_path));

    match args.command {
        Command::Play(play) => {
            let config = build_session_config(&app_config, &play)?;
            let result = play_session(config.clone(), &db_path)?;
            print_result(&result);

            app_config.player_name = config.player_name.clone();
            app_config.last_bpm = config.starting_bpm;
            app_config.last_time_signature = config.time_signature;
            if let Err(e) = app_config.save_to(&args.config) {
                tracing::warn!("failed to save {}: {e}", args.config.display());
            }
            print_leaderboard(&db_path, 5)?;
        }
        Command::Leaderboard { limit } => print_leaderboard(&db_path, limit)?,
    }
    Ok(())
}

fn build_session_config(app_config: &AppConfig, play: &PlayArgs) -> Result<SessionConfig> {
    let base = match &app_config.session_config_path {
        Some(path) => SessionConfig::load_from(path)?,
        None => SessionConfig::default(),
    };

    let mut config = match play.level {
        Some(id) => {
            let Some(level) = Level::by_id(id) else {
                bail!("unknown level {id}");
            };
            info!(level = level.name, "level selected");
            println!("{}: {}", level.name, level.description);
            level.session_config(&base)
        }
        None => SessionConfig {
            starting_bpm: play.bpm.unwrap_or(app_config.last_bpm),
            time_signature: play.signature.unwrap_or(app_config.last_time_signature),
            ..base
        },
    };
    config.player_name = play
        .name
        .clone()
        .unwrap_or_else(|| app_config.player_name.clone());
    config.validate()?;
    Ok(config)
}

fn play_session(config: SessionConfig, db_path: &Path) -> Result<SessionResult> {
    let task = SubmitTask::start(db_path.to_path_buf());
    let interval = Duration::from_millis(config.tick_interval_ms);

    if config.starting_bpm < config.minimum_qualifying_bpm {
        println!(
            "Practice mode: below {} BPM no points are awarded.",
            config.minimum_qualifying_bpm
        );
    }
    println!("Press Enter on every beat. Type q and Enter to stop.");

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") || tx.send(TapEvent).is_err() {
                break;
            }
        }
    });

    let result = {
        let mut session = SessionController::new(SystemClock::new(), config)
            .with_sink(Box::new(task.sink()));
        let mut runner = SessionRunner::new(ChannelTaps::new(rx), interval);
        runner.run(&mut session, |session, events| {
            for click in session.clock_mut().take_due_clicks() {
                println!("{}", if click.accent { "TICK" } else { "tick" });
            }
            for event in events {
                print_event(event);
            }
            if let Some(view) = session.view_if_changed() {
                print_view(&view);
            }
        })?
    };

    let stats = task.shutdown();
    if stats.failed > 0 {
        println!("The result could not be saved to the leaderboard.");
    }
    Ok(result)
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Judged(outcome) => {
            if outcome.source_beat_time.is_some() && !outcome.is_miss() {
                println!("  {} ({:+.0} ms)", outcome.rating.label(), outcome.signed_offset_ms);
            } else {
                println!("  {}", outcome.rating.label());
            }
        }
        SessionEvent::SpeedUp { bpm } => println!("  SPEED UP! {bpm:.0} BPM"),
        SessionEvent::TimeAdded { seconds } if *seconds > 0.0 => println!("  +{seconds:.1}s"),
        SessionEvent::TimeAdded { seconds } => println!("  {seconds:.1}s"),
        SessionEvent::BeatScheduled(_) | SessionEvent::Finished(_) => {}
    }
}

fn print_view(view: &SessionView) {
    println!(
        "[{:>2}s] combo {:>3}  points {:>7.2}  {:.0} BPM",
        view.seconds_left, view.combo, view.points, view.bpm
    );
}

fn print_result(result: &SessionResult) {
    println!();
    println!("== {} ==", result.player_name);
    println!("score      {:.2}", result.score);
    println!("accuracy   {:.0}%", result.accuracy);
    println!("max combo  {}", result.max_combo);
    println!("tempo      {:.0} -> {:.0} BPM", result.starting_bpm, result.bpm);
    println!("survived   {:.1}s", result.survival_seconds);
    let tendency = match result.tendency {
        Tendency::Rushing => "rushing ahead of the beat",
        Tendency::Dragging => "dragging behind the beat",
        Tendency::Steady => "steady",
    };
    println!(
        "tendency   {tendency} ({} early, {} late)",
        result.early_count, result.late_count
    );
    if result.practice {
        println!("(practice session, not ranked)");
    }
}

fn print_leaderboard(db_path: &Path, limit: usize) -> Result<()> {
    let db = Leaderboard::open(&db_path.to_string_lossy())
        .with_context(|| format!("opening leaderboard {}", db_path.display()))?;
    let entries = db.top(limit)?;
    println!();
    if entries.is_empty() {
        println!("No scores yet.");
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>2}. {:<16} {:>8.2}  {:>3.0}% acc  {:>4} combo  {:.0} BPM",
            i + 1,
            entry.player_name,
            entry.score,
            entry.accuracy,
            entry.max_combo,
            entry.bpm
        );
    }
    Ok(())
}
