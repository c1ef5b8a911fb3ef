pub mod charting;
pub mod heatmap;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Widget, Wrap,
    },
};

use crate::app::{App, LessonSource, Screen};
use crate::engine::{DiffState, Outcome};
use crate::stats::{KeyStat, Session};
use charting::{format_label, ProgressSeries};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Rows shown in the key statistics table
const KEY_TABLE_ROWS: usize = 10;
/// Sessions plotted in the progress chart
const GRAPH_SESSIONS: usize = 20;
const CHART_HEIGHT: u16 = 10;
// keyboard rows, blank line, legend and borders
const HEATMAP_HEIGHT: u16 = 8;

pub const THEME_NAMES: [&str; 4] = ["default", "dracula", "nord", "gruvbox"];

/// Colours used by every screen. Passed around by value, never global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub correct: Color,
    pub incorrect: Color,
    pub pending: Color,
    pub cursor: Color,
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            correct: Color::Green,
            incorrect: Color::Red,
            pending: Color::Gray,
            cursor: Color::White,
            accent: Color::Magenta,
        }
    }
}

impl Theme {
    pub fn named(name: &str) -> Option<Self> {
        let theme = match name.to_ascii_lowercase().as_str() {
            "default" => Self::default(),
            "dracula" => Self {
                correct: Color::Rgb(80, 250, 123),
                incorrect: Color::Rgb(255, 85, 85),
                pending: Color::Rgb(98, 114, 164),
                cursor: Color::Rgb(248, 248, 242),
                accent: Color::Rgb(189, 147, 249),
            },
            "nord" => Self {
                correct: Color::Rgb(163, 190, 140),
                incorrect: Color::Rgb(191, 97, 106),
                pending: Color::Rgb(76, 86, 106),
                cursor: Color::Rgb(236, 239, 244),
                accent: Color::Rgb(136, 192, 208),
            },
            "gruvbox" => Self {
                correct: Color::Rgb(184, 187, 38),
                incorrect: Color::Rgb(251, 73, 52),
                pending: Color::Rgb(146, 131, 116),
                cursor: Color::Rgb(235, 219, 178),
                accent: Color::Rgb(250, 189, 47),
            },
            _ => return None,
        };
        Some(theme)
    }

    fn bold(color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn correct_style(&self) -> Style {
        Self::bold(self.correct)
    }

    fn incorrect_style(&self) -> Style {
        Self::bold(self.incorrect)
    }

    fn pending_style(&self) -> Style {
        Self::bold(self.pending).add_modifier(Modifier::DIM)
    }

    fn cursor_style(&self) -> Style {
        Self::bold(self.cursor).add_modifier(Modifier::UNDERLINED)
    }

    fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }
}

/// Printable label for a key in statistics output
pub fn key_label(key: char) -> String {
    match key {
        '\n' => "↵".to_string(),
        '\t' => "⭾".to_string(),
        ' ' => "␣".to_string(),
        c => c.to_string(),
    }
}

fn target_glyph(c: char) -> String {
    match c {
        '\n' => "↵".to_string(),
        '\t' => "    ".to_string(),
        c => c.to_string(),
    }
}

fn typed_glyph(c: char) -> String {
    match c {
        ' ' => "·".to_string(),
        c => target_glyph(c),
    }
}

/// Target text coloured by outcome, one [`Line`] per target line
fn target_lines(state: &DiffState, theme: &Theme) -> Vec<Line<'static>> {
    let target = state.target();
    let input = state.input();
    let outcomes = state.outcomes();

    let mut lines = Vec::new();
    let mut spans = Vec::new();

    for (idx, &expected) in target.iter().enumerate() {
        let span = match outcomes.get(idx) {
            Some(Outcome::Correct) => Span::styled(target_glyph(expected), theme.correct_style()),
            // a mistyped newline position still has to break the line
            Some(Outcome::Incorrect) if expected != '\n' => {
                Span::styled(typed_glyph(input[idx]), theme.incorrect_style())
            }
            Some(Outcome::Incorrect) => Span::styled(target_glyph(expected), theme.incorrect_style()),
            None if idx == input.len() => Span::styled(target_glyph(expected), theme.cursor_style()),
            None => Span::styled(target_glyph(expected), theme.pending_style()),
        };
        spans.push(span);

        if expected == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }

    for &extra in input.iter().skip(target.len()) {
        spans.push(Span::styled(typed_glyph(extra), theme.incorrect_style()));
    }
    lines.push(Line::from(spans));

    lines
}

fn lesson_label(source: &LessonSource) -> String {
    match source {
        LessonSource::Generated(kind) => kind.to_string(),
        LessonSource::Fixed(_) => "file".to_string(),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Results => render_results(self, area, buf),
            Screen::KeyStats => render_key_stats(self, area, buf),
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let theme = &app.settings.theme;
    let state = app.handle.state();
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // lesson label
            Constraint::Length(1),
            Constraint::Min(1), // text
            Constraint::Length(1), // live stats
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(lesson_label(&app.source), theme.accent_style()))
        .render(chunks[0], buf);

    Paragraph::new(target_lines(state, theme))
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    if !state.has_started() {
        Paragraph::new(Span::styled("start typing to begin", italic_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    } else if !app.settings.zen_mode {
        let live = app.trainer.live_stats(&app.handle);
        Paragraph::new(Span::styled(
            format!(
                "{:.0} wpm   {:.0}% acc   {} errors",
                live.wpm,
                live.accuracy,
                state.error_count()
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    Paragraph::new(Span::styled("(esc)ape / (ctrl+z) zen", italic_style))
        .render(chunks[4], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let theme = &app.settings.theme;
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // text
            Constraint::Length(1), // stats
            Constraint::Length(1), // storage status
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(target_lines(app.handle.state(), theme))
        .wrap(Wrap { trim: false })
        .render(chunks[0], buf);

    let summary = match app.last_session() {
        Some(s) => format!(
            "{:.0} wpm   {:.0}% acc   {:.1}s   {} errors",
            s.wpm, s.accuracy, s.duration_secs, s.error_count
        ),
        None => {
            let live = app.trainer.live_stats(&app.handle);
            format!(
                "{:.0} wpm   {:.0}% acc   {:.1}s   {} errors",
                live.wpm,
                live.accuracy,
                live.duration_secs,
                app.handle.state().error_count()
            )
        }
    };
    Paragraph::new(Span::styled(summary, bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let status = match (&app.record_error, app.trainer.stats_enabled()) {
        (Some(err), _) => Some(Span::styled(
            format!("stats not saved: {err} (w to retry)"),
            theme.incorrect_style(),
        )),
        (None, false) => Some(Span::styled(
            "stats disabled",
            Style::default().fg(theme.pending).add_modifier(Modifier::ITALIC),
        )),
        (None, true) => None,
    };
    if let Some(status) = status {
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (s)tats / (esc)ape",
        italic_style,
    ))
    .render(chunks[4], buf);
}

fn key_row(stat: &KeyStat, theme: &Theme) -> Row<'static> {
    let rate = stat.error_rate() * 100.0;
    let rate_color = if rate == 0.0 {
        theme.correct
    } else if rate < 10.0 {
        Color::Yellow
    } else {
        theme.incorrect
    };

    Row::new(vec![
        Cell::from(key_label(stat.key)),
        Cell::from(format!("{rate:.1}")).style(Style::default().fg(rate_color)),
        Cell::from(stat.attempts().to_string()),
        Cell::from(format!("{}d", stat.interval)),
        Cell::from(format!("{:.2}", stat.ease_factor)),
        Cell::from(stat.last_practiced.format("%Y-%m-%d %H:%M").to_string()),
    ])
}

fn render_progress(sessions: &[Session], theme: &Theme, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title(" Progress ");
    let series = ProgressSeries::from_sessions(sessions);
    if series.is_empty() {
        Paragraph::new(Span::styled(
            "No sessions yet",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .block(block)
        .render(area, buf);
        return;
    }

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let (session_count, ceiling) = series.bounds();

    let datasets = vec![
        Dataset::default()
            .name("wpm")
            .marker(Marker::Braille)
            .style(theme.accent_style())
            .graph_type(GraphType::Line)
            .data(&series.wpm),
        Dataset::default()
            .name("acc %")
            .marker(Marker::Braille)
            .style(Style::default().fg(theme.correct))
            .graph_type(GraphType::Line)
            .data(&series.accuracy),
    ];

    Chart::new(datasets)
        .block(block)
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
        .x_axis(
            Axis::default()
                .title("session")
                .bounds([1.0, session_count])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(format_label(session_count), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, ceiling])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(format_label(ceiling), bold_style),
                ]),
        )
        .render(area, buf);
}

fn render_key_stats(app: &App, area: Rect, buf: &mut Buffer) {
    let theme = &app.settings.theme;
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // summary
            Constraint::Length(1),
            Constraint::Length(CHART_HEIGHT),
            Constraint::Min(3), // table
            Constraint::Length(HEATMAP_HEIGHT),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(store) = app.trainer.store() else {
        Paragraph::new(Span::styled("stats disabled", italic_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);
        Paragraph::new(Span::styled("(b)ack / (r)etry / (n)ew / (esc)ape", italic_style))
            .render(chunks[5], buf);
        return;
    };

    let average = store.average_wpm().unwrap_or_default();
    let sessions = store.session_count().unwrap_or_default();
    let due = app.trainer.due_keys(usize::MAX).map(|d| d.len()).unwrap_or_default();
    Paragraph::new(Span::styled(
        format!("{average:.1} avg wpm   {sessions} sessions   {due} keys due"),
        theme.accent_style(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let history = store.sessions_for_graph(GRAPH_SESSIONS).unwrap_or_default();
    render_progress(&history, theme, chunks[2], buf);

    let weakest = app.trainer.weakest_keys(KEY_TABLE_ROWS).unwrap_or_default();
    if weakest.is_empty() {
        Paragraph::new(Span::styled("No key statistics yet", italic_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    } else {
        let header = Row::new(vec!["Key", "Miss %", "Attempts", "Interval", "Ease", "Last practiced"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let widths = [
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Min(16),
        ];
        Table::new(weakest.iter().map(|s| key_row(s, theme)), widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(" Weakest keys "))
            .render(chunks[3], buf);
    }

    let ledger = store.all_key_stats().unwrap_or_default();
    if !ledger.is_empty() {
        Paragraph::new(heatmap::heatmap_lines(&ledger))
            .block(Block::default().borders(Borders::ALL).title(" Keyboard "))
            .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled("(b)ack / (r)etry / (n)ew / (esc)ape", italic_style))
        .render(chunks[5], buf);
}
