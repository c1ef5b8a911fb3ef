use std::io::{self, stdin};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use kata::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::Corpus,
    export::{self, ExportFormat},
    lesson,
    logging,
    runtime::{CrosstermEventSource, KataEvent, Runner},
    ui::{key_label, Theme, THEME_NAMES},
    App, AppAction, AppSettings, LessonGenerator, LessonKind, LessonSource, StatsDb, Trainer,
};

const TICK_RATE_MS: u64 = 100;
const RECENT_SESSIONS: usize = 5;
const WEAKEST_KEYS: usize = 10;

/// typing practice for programmers that drills your weakest keys
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Typing practice built from programming-language vocabulary. Every keystroke feeds a per-key ledger, and a spaced-repetition schedule decides which keys come back in the next weakness lesson."
)]
pub struct Cli {
    /// statistics database to use instead of the configured one
    #[clap(long)]
    db: Option<PathBuf>,

    /// colour theme: default, dracula, nord or gruvbox
    #[clap(long)]
    theme: Option<String>,

    /// hide live stats while typing
    #[clap(long)]
    zen: bool,

    /// print a statistics summary and exit
    #[clap(long)]
    stats: bool,

    /// practice the contents of a file (takes precedence over `practice`)
    #[clap(long)]
    file: Option<PathBuf>,

    /// corpus to draw lessons from
    #[clap(short = 'l', long)]
    language: Option<String>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// start a practice run of the given kind
    Practice {
        #[clap(value_enum)]
        kind: LessonKind,
    },
    /// write sessions and key statistics to a file
    Export {
        #[clap(value_enum)]
        format: ExportFormat,
        file: PathBuf,
    },
}

impl Cli {
    fn db_path(&self, config: &Config) -> PathBuf {
        self.db.clone().unwrap_or_else(|| config.resolved_db_path())
    }

    fn lesson_source(&self) -> anyhow::Result<LessonSource> {
        if let Some(path) = &self.file {
            let text = lesson::from_file(path)
                .with_context(|| format!("reading practice file {}", path.display()))?;
            return Ok(LessonSource::Fixed(text));
        }
        Ok(match &self.command {
            Some(Command::Practice { kind }) => LessonSource::Generated(*kind),
            _ => LessonSource::Generated(LessonKind::Weaknesses),
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = FileConfigStore::new().load();

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(err) = logging::init(&log_path, "warn") {
            eprintln!("kata: logging disabled: {err}");
        }
    }

    let db_path = cli.db_path(&config);

    if cli.stats {
        let db = open_store(&db_path)?;
        return print_stats(&db);
    }

    if let Some(Command::Export { format, file }) = &cli.command {
        let db = open_store(&db_path)?;
        export::export(&db, *format, file)
            .with_context(|| format!("exporting {format} to {}", file.display()))?;
        println!("exported statistics to {}", file.display());
        return Ok(());
    }

    let theme_name = cli.theme.clone().unwrap_or_else(|| config.theme.clone());
    let Some(theme) = Theme::named(&theme_name) else {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::InvalidValue,
            format!("unknown theme `{theme_name}`, expected one of {}", THEME_NAMES.join(", ")),
        )
        .exit();
    };

    let language = cli.language.clone().unwrap_or_else(|| config.language.clone());
    let corpus = Corpus::load(&language).with_context(|| {
        format!(
            "loading corpus `{language}` (available: {})",
            Corpus::available().join(", ")
        )
    })?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let settings = AppSettings {
        lesson_length: config.lesson_length.max(1),
        weakness_limit: config.weakness_limit.max(1),
        zen_mode: cli.zen || config.zen_mode,
        theme,
    };

    let mut app = App::new(
        Trainer::open(&db_path),
        corpus,
        cli.lesson_source()?,
        settings,
        LessonGenerator::new(),
    )
    .context("preparing the first lesson")?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn open_store(path: &Path) -> anyhow::Result<StatsDb> {
    StatsDb::open(path).with_context(|| format!("opening statistics database {}", path.display()))
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            KataEvent::Key(key) => {
                if app.on_key(key)? == AppAction::Quit {
                    break;
                }
            }
            // ticks redraw the live stats line
            KataEvent::Resize | KataEvent::Tick => {}
        }
    }

    Ok(())
}

fn print_stats(db: &StatsDb) -> anyhow::Result<()> {
    println!("sessions:      {}", db.session_count()?);
    println!("average wpm:   {:.1}", db.average_wpm()?);

    let recent = db.recent_sessions(RECENT_SESSIONS)?;
    if !recent.is_empty() {
        println!("\nrecent sessions:");
        for s in &recent {
            println!(
                "  {}  {:>6.1} wpm  {:>5.1}% acc  {:>3} errors",
                s.timestamp.format("%Y-%m-%d %H:%M"),
                s.wpm,
                s.accuracy,
                s.error_count
            );
        }
    }

    let weakest = db.weakest_keys(WEAKEST_KEYS)?;
    if !weakest.is_empty() {
        println!("\nweakest keys:");
        for k in &weakest {
            println!(
                "  {:<3} {:>5.1}% miss  {:>5} attempts",
                key_label(k.key),
                k.error_rate() * 100.0,
                k.attempts()
            );
        }
    }

    let due = db.due_keys(Local::now(), usize::MAX)?;
    println!("\nkeys due for review: {}", due.len());

    Ok(())
}
