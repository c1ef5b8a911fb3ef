use crate::stats::Session;

/// WPM and accuracy per session, x being the 1-based session number
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressSeries {
    pub wpm: Vec<(f64, f64)>,
    pub accuracy: Vec<(f64, f64)>,
}

impl ProgressSeries {
    /// `sessions` must already be in chronological order
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let point = |idx: usize, y: f64| ((idx + 1) as f64, y);
        Self {
            wpm: sessions.iter().enumerate().map(|(i, s)| point(i, s.wpm)).collect(),
            accuracy: sessions
                .iter()
                .enumerate()
                .map(|(i, s)| point(i, s.accuracy))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wpm.is_empty()
    }

    /// Upper X (session count, at least 2) and Y (next multiple of 10 over both series) bounds
    pub fn bounds(&self) -> (f64, f64) {
        let sessions = self.wpm.len().max(2) as f64;

        let highest = self
            .wpm
            .iter()
            .chain(self.accuracy.iter())
            .map(|&(_, y)| y)
            .fold(0.0, f64::max);
        let ceiling = ((highest / 10.0).ceil() * 10.0).max(10.0);

        (sessions, ceiling)
    }
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
