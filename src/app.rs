use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::corpus::Corpus;
use crate::error::Result;
use crate::lesson::{LessonGenerator, LessonKind};
use crate::runtime::keystroke_for;
use crate::session::{SessionHandle, Trainer};
use crate::stats::Session;
use crate::ui::Theme;

/// Snippets joined into one code lesson
const CODE_SNIPPETS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
    KeyStats,
}

/// Where the next lesson's text comes from
#[derive(Debug, Clone, PartialEq)]
pub enum LessonSource {
    Generated(LessonKind),
    Fixed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub lesson_length: usize,
    pub weakness_limit: usize,
    pub zen_mode: bool,
    pub theme: Theme,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            lesson_length: 20,
            weakness_limit: 10,
            zen_mode: false,
            theme: Theme::default(),
        }
    }
}

/// Interactive practice state: one active run plus the screen being shown
#[derive(Debug)]
pub struct App {
    pub trainer: Trainer,
    pub handle: SessionHandle,
    pub screen: Screen,
    pub settings: AppSettings,
    pub source: LessonSource,
    pub record_error: Option<String>,
    corpus: Corpus,
    generator: LessonGenerator,
}

impl App {
    pub fn new(
        trainer: Trainer,
        corpus: Corpus,
        source: LessonSource,
        settings: AppSettings,
        mut generator: LessonGenerator,
    ) -> Result<Self> {
        let text = lesson_text(&source, &trainer, &mut generator, &corpus, &settings);
        Ok(Self {
            handle: trainer.create_session(text.trim_end())?,
            trainer,
            screen: Screen::Typing,
            settings,
            source,
            record_error: None,
            corpus,
            generator,
        })
    }

    fn start(&mut self, text: &str) -> Result<()> {
        self.handle = self.trainer.create_session(text)?;
        self.screen = Screen::Typing;
        self.record_error = None;
        Ok(())
    }

    /// Start a fresh lesson from the configured source
    pub fn new_lesson(&mut self) -> Result<()> {
        let text = lesson_text(
            &self.source,
            &self.trainer,
            &mut self.generator,
            &self.corpus,
            &self.settings,
        );
        self.start(text.trim_end())
    }

    /// Retry the current text from scratch
    pub fn restart(&mut self) -> Result<()> {
        let text = self.handle.state().target_text();
        self.start(&text)
    }

    fn finish(&mut self) {
        self.record_error = self
            .trainer
            .record_outcome(&mut self.handle)
            .err()
            .map(|err| err.to_string());
        self.screen = Screen::Results;
    }

    /// The finished run as it was recorded, once recording has succeeded
    pub fn last_session(&self) -> Option<&Session> {
        self.handle.recorded()
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Result<AppAction> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(AppAction::Quit);
        }

        match self.screen {
            Screen::Typing => match key.code {
                // abandoning a run discards it without touching the ledger
                KeyCode::Esc => return Ok(AppAction::Quit),
                KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.settings.zen_mode = !self.settings.zen_mode;
                }
                _ => {
                    self.trainer
                        .apply_keystroke(&mut self.handle, keystroke_for(&key));
                    if self.trainer.is_finished(&self.handle) {
                        self.finish();
                    }
                }
            },
            Screen::Results => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(AppAction::Quit),
                KeyCode::Char('r') => self.restart()?,
                KeyCode::Char('n') => self.new_lesson()?,
                KeyCode::Char('s') => self.screen = Screen::KeyStats,
                // retry a failed write; recording is idempotent once it succeeds
                KeyCode::Char('w') if self.record_error.is_some() => self.finish(),
                _ => {}
            },
            Screen::KeyStats => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(AppAction::Quit),
                KeyCode::Char('b') | KeyCode::Backspace => self.screen = Screen::Results,
                KeyCode::Char('r') => self.restart()?,
                KeyCode::Char('n') => self.new_lesson()?,
                _ => {}
            },
        }

        Ok(AppAction::Continue)
    }
}

fn lesson_text(
    source: &LessonSource,
    trainer: &Trainer,
    generator: &mut LessonGenerator,
    corpus: &Corpus,
    settings: &AppSettings,
) -> String {
    match source {
        LessonSource::Fixed(text) => text.clone(),
        LessonSource::Generated(LessonKind::Weaknesses) => trainer.build_weakness_lesson(
            generator,
            corpus,
            settings.lesson_length,
            settings.weakness_limit,
        ),
        // code lessons are counted in snippets, not tokens
        LessonSource::Generated(LessonKind::Code) => {
            generator.generate(LessonKind::Code, corpus, CODE_SNIPPETS)
        }
        LessonSource::Generated(kind) => generator.generate(*kind, corpus, settings.lesson_length),
    }
}
