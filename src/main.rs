pub mod app_dirs;
pub mod config;
pub mod runtime;
pub mod score;
pub mod session;
pub mod text_source;
pub mod ui;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{AppEvent, CrosstermEventSource, EventSource},
    score::{ScoreDb, ScoreRecord, SubmitReceipt},
    session::{Mode, Phase, Session, DURATIONS},
    text_source::{Catalog, FixedSource, Passage, TextSource},
};
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 1000;

/// terminal typing speed trainer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing speed trainer: race a 15/30/60 second countdown against random words or real code snippets, with live wpm/accuracy and a local score history."
)]
pub struct Cli {
    /// practice mode
    #[clap(short = 'm', long, value_enum)]
    mode: Option<ModeArg>,

    /// seconds on the countdown (15, 30 or 60)
    #[clap(short = 's', long, value_parser = parse_duration)]
    seconds: Option<u32>,

    /// number of words in a plain passage
    #[clap(short = 'w', long)]
    number_of_words: Option<usize>,

    /// custom passage to type instead of a generated one
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// print the score history as CSV and exit
    #[clap(long)]
    export_history: bool,
}

fn parse_duration(s: &str) -> Result<u32, String> {
    let secs: u32 = s
        .parse()
        .map_err(|_| String::from("seconds must be a number"))?;
    if DURATIONS.contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("seconds must be one of {:?}", DURATIONS))
    }
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum ModeArg {
    Plain,
    Code,
}

impl ModeArg {
    fn as_mode(&self) -> Mode {
        match self {
            ModeArg::Plain => Mode::Plain,
            ModeArg::Code => Mode::Code,
        }
    }
}

/// Effective per-run settings: persisted defaults overridden by flags.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub mode: Mode,
    pub duration_secs: u32,
    pub number_of_words: usize,
}

impl Settings {
    fn resolve(cli: &Cli, cfg: &Config) -> Self {
        Self {
            mode: cli
                .mode
                .map(|m| m.as_mode())
                .unwrap_or_else(|| Mode::from_name(&cfg.mode)),
            duration_secs: cli.seconds.unwrap_or(cfg.duration_secs),
            number_of_words: cli.number_of_words.unwrap_or(cfg.number_of_words),
        }
    }

    fn to_config(self) -> Config {
        Config {
            mode: self.mode.as_str().to_string(),
            duration_secs: self.duration_secs,
            number_of_words: self.number_of_words,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Typing,
    Results,
    History,
}

/// Outcome of handing the finished session to the score sink.
#[derive(Debug, Clone)]
pub enum SaveStatus {
    Saved(SubmitReceipt),
    Failed(String),
}

pub struct App {
    pub settings: Settings,
    pub session: Session,
    pub state: AppState,
    pub save_status: Option<SaveStatus>,
    pub history: Vec<ScoreRecord>,
    pub high_score: Option<u32>,
    text_source: Box<dyn TextSource>,
    sink: Option<ScoreDb>,
    config_store: FileConfigStore,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let config_store = FileConfigStore::new();
        let settings = Settings::resolve(&cli, &config_store.load());
        let text_source: Box<dyn TextSource> = match cli.prompt {
            Some(prompt) => Box::new(FixedSource::new(prompt)),
            None => Box::new(Catalog::new(settings.number_of_words)),
        };
        let sink = ScoreDb::new().ok();
        Self::assemble(settings, text_source, sink, config_store)
    }

    fn assemble(
        settings: Settings,
        text_source: Box<dyn TextSource>,
        sink: Option<ScoreDb>,
        config_store: FileConfigStore,
    ) -> Self {
        let session = Session::new(
            text_source.passage(settings.mode),
            settings.mode,
            settings.duration_secs,
        );
        Self {
            settings,
            session,
            state: AppState::Typing,
            save_status: None,
            history: vec![],
            high_score: None,
            text_source,
            sink,
            config_store,
        }
    }

    /// Replace the session: with the given passage (retry), or a fresh
    /// one from the text source. Any countdown still ticking for the old
    /// session dies with it - ticks only reach the current session.
    pub fn reset(&mut self, passage: Option<Passage>) {
        let passage = passage.unwrap_or_else(|| self.text_source.passage(self.settings.mode));
        self.session = Session::new(passage, self.settings.mode, self.settings.duration_secs);
        self.state = AppState::Typing;
        self.save_status = None;
    }

    pub fn current_passage(&self) -> Passage {
        Passage {
            text: self.session.target.clone(),
            title: self.session.title.clone(),
        }
    }

    /// Submit the finished session once and move to the results screen.
    fn finalize_session(&mut self) {
        if let Some(db) = self.sink.as_mut() {
            if let Some(result) = self.session.finalize(db) {
                self.save_status = Some(match result {
                    Ok(receipt) => SaveStatus::Saved(receipt),
                    Err(e) => SaveStatus::Failed(e.to_string()),
                });
            }
        }
        self.state = AppState::Results;
    }

    fn load_history(&mut self) {
        if let Some(db) = self.sink.as_ref() {
            self.history = db.history(20).unwrap_or_default();
            self.high_score = db.high_score().ok().flatten();
        }
        self.state = AppState::History;
    }

    fn cycle_mode(&mut self) {
        self.settings.mode = match self.settings.mode {
            Mode::Plain => Mode::Code,
            Mode::Code => Mode::Plain,
        };
        let _ = self.config_store.save(&self.settings.to_config());
    }

    fn cycle_duration(&mut self) {
        let next = match DURATIONS.iter().position(|&d| d == self.settings.duration_secs) {
            Some(i) => DURATIONS[(i + 1) % DURATIONS.len()],
            None => DURATIONS[0],
        };
        self.settings.duration_secs = next;
        let _ = self.config_store.save(&self.settings.to_config());
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.export_history {
        let db = ScoreDb::new()?;
        db.export_csv(io::stdout())?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let events = CrosstermEventSource::new(Duration::from_millis(TICK_RATE_MS));
    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

#[derive(Debug)]
enum ExitType {
    Restart,
    New,
    Quit,
}

fn run_app<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &E,
) -> Result<(), Box<dyn Error>> {
    loop {
        let mut exit_type = ExitType::Quit;
        terminal.draw(|f| ui(app, f))?;

        loop {
            let event = match events.next() {
                Some(event) => event,
                None => return Ok(()),
            };

            match event {
                AppEvent::Tick => {
                    if app.session.phase() == Phase::Running {
                        app.session.on_tick();
                        if app.session.has_finished() {
                            app.finalize_session();
                        }
                        terminal.draw(|f| ui(app, f))?;
                    }
                }
                AppEvent::Resize => {
                    terminal.draw(|f| ui(app, f))?;
                }
                AppEvent::Key(key) => {
                    match handle_key(app, key) {
                        KeyAction::Continue => {}
                        KeyAction::Exit(et) => {
                            exit_type = et;
                            break;
                        }
                    }
                    terminal.draw(|f| ui(app, f))?;
                }
            }
        }

        match exit_type {
            ExitType::Restart => app.reset(Some(app.current_passage())),
            ExitType::New => app.reset(None),
            ExitType::Quit => break,
        }
    }

    Ok(())
}

enum KeyAction {
    Continue,
    Exit(ExitType),
}

fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    if key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
    {
        return KeyAction::Exit(ExitType::Quit);
    }

    match app.state {
        AppState::Typing => match key.code {
            KeyCode::Backspace => {
                app.session.backspace();
            }
            KeyCode::Left => return KeyAction::Exit(ExitType::Restart),
            KeyCode::Right => return KeyAction::Exit(ExitType::New),
            KeyCode::Enter => {
                app.session.type_char('\n');
                if app.session.has_finished() {
                    app.finalize_session();
                }
            }
            KeyCode::Char(c) => {
                app.session.type_char(c);
                if app.session.has_finished() {
                    app.finalize_session();
                }
            }
            _ => {}
        },
        AppState::Results => match key.code {
            KeyCode::Char('r') => return KeyAction::Exit(ExitType::Restart),
            KeyCode::Char('n') => return KeyAction::Exit(ExitType::New),
            KeyCode::Char('h') => app.load_history(),
            KeyCode::Char('m') => {
                app.cycle_mode();
                return KeyAction::Exit(ExitType::New);
            }
            KeyCode::Char('d') => {
                app.cycle_duration();
                return KeyAction::Exit(ExitType::New);
            }
            KeyCode::Char('t') => {
                if Browser::is_available() {
                    webbrowser::open(&format!(
                        "https://twitter.com/intent/tweet?text={}%20wpm%20%2F%20{}%25%20acc",
                        app.session.wpm(),
                        app.session.accuracy()
                    ))
                    .unwrap_or_default();
                }
            }
            _ => {}
        },
        AppState::History => match key.code {
            KeyCode::Char('b') | KeyCode::Backspace => app.state = AppState::Results,
            KeyCode::Char('r') => return KeyAction::Exit(ExitType::Restart),
            KeyCode::Char('n') => return KeyAction::Exit(ExitType::New),
            _ => {}
        },
    }

    KeyAction::Continue
}

fn ui(app: &mut App, f: &mut Frame) {
    match app.state {
        AppState::Typing | AppState::Results => {
            f.render_widget(&*app, f.area());
        }
        AppState::History => {
            ui::history::render_history(app, f);
        }
    }
}
