use std::collections::HashMap;

use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

use crate::stats::KeyStat;

/// Unshifted QWERTY rows, top to bottom
pub const KEYBOARD_ROWS: [&str; 4] = ["`1234567890-=", "qwertyuiop[]\\", "asdfghjkl;'", "zxcvbnm,./"];

/// Error-rate band a key falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heat {
    NoData,
    Excellent,
    Good,
    Okay,
    NeedsWork,
    Problem,
}

impl Heat {
    pub fn for_rate(rate: Option<f64>) -> Self {
        match rate {
            None => Heat::NoData,
            Some(r) if r < 0.05 => Heat::Excellent,
            Some(r) if r < 0.15 => Heat::Good,
            Some(r) if r < 0.25 => Heat::Okay,
            Some(r) if r < 0.40 => Heat::NeedsWork,
            Some(_) => Heat::Problem,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Heat::NoData => Color::Indexed(240),
            Heat::Excellent => Color::Rgb(166, 227, 161),
            Heat::Good => Color::Rgb(148, 226, 213),
            Heat::Okay => Color::Rgb(249, 226, 175),
            Heat::NeedsWork => Color::Rgb(250, 179, 135),
            Heat::Problem => Color::Rgb(243, 139, 168),
        }
    }

    fn legend(self) -> &'static str {
        match self {
            Heat::NoData => "no data",
            Heat::Excellent => "<5%",
            Heat::Good => "<15%",
            Heat::Okay => "<25%",
            Heat::NeedsWork => "<40%",
            Heat::Problem => "40%+",
        }
    }
}

const LEGEND_ORDER: [Heat; 6] = [
    Heat::Excellent,
    Heat::Good,
    Heat::Okay,
    Heat::NeedsWork,
    Heat::Problem,
    Heat::NoData,
];

/// Error rate per key, upper and lower case folded together
pub fn key_rates(ledger: &[KeyStat]) -> HashMap<char, f64> {
    let mut counts: HashMap<char, (u64, u64)> = HashMap::new();
    for stat in ledger {
        let entry = counts.entry(stat.key.to_ascii_lowercase()).or_default();
        entry.0 += stat.errors;
        entry.1 += stat.attempts();
    }

    counts
        .into_iter()
        .filter(|&(_, (_, attempts))| attempts > 0)
        .map(|(key, (errors, attempts))| (key, errors as f64 / attempts as f64))
        .collect()
}

/// Keyboard rows coloured by error rate, followed by a blank line and the legend
pub fn heatmap_lines(ledger: &[KeyStat]) -> Vec<Line<'static>> {
    let rates = key_rates(ledger);

    let mut lines: Vec<Line<'static>> = KEYBOARD_ROWS
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut spans = vec![Span::raw(" ".repeat(row_idx * 2))];
            spans.extend(row.chars().map(|key| {
                let heat = Heat::for_rate(rates.get(&key).copied());
                Span::styled(format!(" {key} "), Style::default().fg(heat.color()))
            }));
            Line::from(spans)
        })
        .collect();

    lines.push(Line::default());

    let mut legend = Vec::new();
    for heat in LEGEND_ORDER {
        legend.push(Span::styled("● ", Style::default().fg(heat.color())));
        legend.push(Span::raw(format!("{}  ", heat.legend())));
    }
    lines.push(Line::from(legend));

    lines
}
