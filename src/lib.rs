// Library surface for the binary, headless runtime tests and integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod export;
pub mod lesson;
pub mod logging;
pub mod recorder;
pub mod runtime;
pub mod session;
pub mod sm2;
pub mod stats;
pub mod ui;

pub use app::{App, AppAction, AppSettings, LessonSource, Screen};
pub use engine::{DiffState, Keystroke, LiveStats, Outcome};
pub use error::{KataError, Result};
pub use lesson::{LessonGenerator, LessonKind, WeakKey};
pub use session::{SessionHandle, Trainer};
pub use stats::{KeyStat, Session, StatsDb};
