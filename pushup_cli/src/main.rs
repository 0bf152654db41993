use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pushup_core::*;
use pushup_core::export::export_csv;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pushup")]
#[command(about = "Two-week pushup challenge reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 instant (for testing)
    #[arg(long, global = true, hide = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current screen (default)
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the challenge
    Start,

    /// Record the result of today's max test
    MaxTest {
        /// Pushups done in one set
        #[arg(allow_negative_numbers = true)]
        reps: i64,
    },

    /// Start training for the day
    Begin,

    /// Pause the reminder countdown
    Pause,

    /// Resume the reminder countdown
    Resume,

    /// Stop reminders until tomorrow morning
    Done,

    /// Erase all progress
    Stop {
        /// Skip the confirmation step
        #[arg(long)]
        yes: bool,
    },

    /// Erase all progress and start a new cycle
    Restart,

    /// Show pushups logged per day
    Progress {
        /// Also export the history to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run the reminder loop in the foreground
    Run {
        /// Stop after this many seconds
        #[arg(long)]
        ticks: Option<u64>,

        /// Auto-complete (for testing) - answer every reminder with done
        #[arg(long, conflicts_with = "auto_skip")]
        auto_complete: bool,

        /// Auto-skip (for testing) - answer every reminder with skip
        #[arg(long, conflicts_with = "auto_complete")]
        auto_skip: bool,
    },
}

/// Wall clock, or a simulated one when `--now` is given
#[derive(Clone)]
enum HostClock {
    System(SystemClock),
    Simulated(ManualClock),
}

impl Clock for HostClock {
    fn now(&self) -> DateTime<Utc> {
        match self {
            HostClock::System(clock) => clock.now(),
            HostClock::Simulated(clock) => clock.now(),
        }
    }
}

type Engine = ChallengeEngine<JsonFileStore, HostClock>;

fn main() -> Result<()> {
    // Initialize logging
    pushup_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    let reference = config.reference_time()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    std::fs::create_dir_all(&config.data.data_dir)?;

    let clock = match cli.now {
        Some(now) => HostClock::Simulated(ManualClock::new(now)),
        None => HostClock::System(SystemClock),
    };
    let store = JsonFileStore::open(config.settings_path());
    let mut engine = ChallengeEngine::open(store, clock.clone(), reference);

    match cli.command.unwrap_or(Commands::Status { json: false }) {
        Commands::Status { json } => cmd_status(&engine, json)?,
        Commands::Start => {
            engine.start_challenge();
            show_screen(&engine);
        }
        Commands::MaxTest { reps } => {
            if let Err(e) = engine.submit_max_test(reps) {
                eprintln!("✗ {}", e);
                return Err(e);
            }
            println!("✓ Baseline recorded: {} pushups", engine.baseline());
            show_screen(&engine);
        }
        Commands::Begin => {
            engine.begin_day();
            show_screen(&engine);
        }
        Commands::Pause => {
            engine.pause_timer();
            show_screen(&engine);
        }
        Commands::Resume => {
            engine.resume_timer();
            show_screen(&engine);
        }
        Commands::Done => {
            engine.mark_done_for_today();
            show_screen(&engine);
        }
        Commands::Stop { yes } => cmd_stop(&mut engine, yes),
        Commands::Restart => {
            engine.restart_challenge();
            println!("✓ Started a new cycle");
            show_screen(&engine);
        }
        Commands::Progress { csv } => cmd_progress(&engine, csv)?,
        Commands::Run {
            ticks,
            auto_complete,
            auto_skip,
        } => cmd_run(&mut engine, &clock, ticks, auto_complete, auto_skip)?,
    }

    Ok(())
}

fn cmd_status(engine: &Engine, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&engine.status())?);
    } else {
        show_screen(engine);
    }
    Ok(())
}

fn cmd_stop(engine: &mut Engine, yes: bool) {
    engine.request_stop();
    if engine.ui_mode() != UiMode::ConfirmingStop {
        println!("Nothing to stop.");
        return;
    }

    if !yes {
        engine.cancel_stop();
        println!("⚠ This erases your baseline and all logged pushups.");
        println!("  Run `pushup stop --yes` to confirm.");
        return;
    }

    engine.stop_and_reset();
    println!("✓ Challenge stopped and progress cleared");
}

fn cmd_progress(engine: &Engine, csv: Option<PathBuf>) -> Result<()> {
    let history = engine.progress_history();
    if history.is_empty() {
        println!("No pushups logged yet.");
    } else {
        println!("Date        Pushups");
        for entry in &history {
            println!("{}  {:>7}", entry.day, entry.total);
        }
        println!("Total       {:>7}", engine.grand_total());
    }

    if let Some(path) = csv {
        let count = export_csv(&path, &history)?;
        println!("✓ Exported {} days to {}", count, path.display());
    }
    Ok(())
}

fn cmd_run(
    engine: &mut Engine,
    clock: &HostClock,
    ticks: Option<u64>,
    auto_complete: bool,
    auto_skip: bool,
) -> Result<()> {
    if matches!(clock, HostClock::Simulated(_)) && ticks.is_none() {
        return Err(Error::Config("--ticks is required with --now".into()));
    }

    let mut sink: Box<dyn ReminderSink> = if auto_complete {
        Box::new(FixedAnswer(true))
    } else if auto_skip {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(TerminalSink)
    };

    show_screen(engine);
    let mut mode = engine.ui_mode();
    let mut elapsed = 0u64;

    while ticks.map_or(true, |limit| elapsed < limit) {
        match clock {
            HostClock::Simulated(manual) => manual.advance(chrono::Duration::seconds(1)),
            HostClock::System(_) => std::thread::sleep(Duration::from_secs(1)),
        }
        elapsed += 1;

        match engine.tick_with(sink.as_mut()) {
            Some(true) => println!(
                "✓ Logged {} pushups ({} today)",
                engine.current_target(),
                engine.today_total()
            ),
            Some(false) => println!("Skipped"),
            None => {}
        }

        if engine.ui_mode() != mode {
            mode = engine.ui_mode();
            show_screen(engine);
        }
    }

    engine.checkpoint();
    Ok(())
}

fn show_screen(engine: &Engine) {
    let status = engine.status();
    match status.mode {
        UiMode::Welcome => {
            println!("Welcome to the 2-week pushup challenge!");
            println!("  Run `pushup start` to begin.");
        }
        UiMode::AwaitingMaxTest => {
            println!("Max test day");
            println!("  Do as many pushups as you can in one set,");
            println!("  then run `pushup max-test <REPS>`.");
        }
        UiMode::DoneForToday => {
            println!("Done for today");
            if let Some(at) = status.resume_at {
                let local = at.with_timezone(&engine.reference_time().tz);
                println!("  Reminders resume {}", local.format("%Y-%m-%d %H:%M %Z"));
            }
        }
        UiMode::NextDay => {
            println!("Week {}, day {} is ready", status.week, status.day);
            println!("  Run `pushup begin` to start training.");
        }
        UiMode::Completed => {
            println!("Challenge complete! 🎉");
            println!("  Run `pushup restart` for another cycle.");
        }
        UiMode::Active => {
            println!("Week {}, day {}", status.week, status.day);
            println!(
                "  Target: {} pushups every {} minutes",
                status.target_reps, status.interval_minutes
            );
            println!("  Next reminder in {}", status.time_remaining);
            if engine.is_timer_paused() {
                println!("  Timer paused");
            }
            println!("  Today: {} pushups", status.today_total);
        }
        UiMode::ConfirmingStop => {
            println!("Stop the challenge? Progress will be erased.");
        }
    }
}

/// Asks on the terminal whether the set was done
struct TerminalSink;

impl ReminderSink for TerminalSink {
    fn confirm(&mut self, reminder: &Reminder) -> bool {
        println!("\n╭─────────────────────────────────────────╮");
        println!("│  {}", reminder.title);
        println!("╰─────────────────────────────────────────╯");
        println!("  {}", reminder.body);
        println!("Press Enter when done");
        println!("  's' + Enter to skip");
        print!("> ");

        if let Err(e) = io::stdout().flush() {
            tracing::warn!("Failed to flush prompt: {}", e);
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(_) => input.trim().to_lowercase() != "s",
            Err(e) => {
                tracing::warn!("Failed to read answer: {}", e);
                false
            }
        }
    }
}
