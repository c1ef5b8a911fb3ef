use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::stats::{KeyStat, Session, StatsDb};

/// Upper bound on sessions included in an export
pub const EXPORT_SESSION_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
pub struct ExportData {
    pub export_date: DateTime<Local>,
    pub average_wpm: f64,
    pub sessions: Vec<Session>,
    pub key_statistics: Vec<KeyStat>,
}

pub fn gather(db: &StatsDb) -> Result<ExportData> {
    Ok(ExportData {
        export_date: Local::now(),
        average_wpm: db.average_wpm()?,
        sessions: db.recent_sessions(EXPORT_SESSION_LIMIT)?,
        key_statistics: db.all_key_stats()?,
    })
}

pub fn export(db: &StatsDb, format: ExportFormat, path: &Path) -> Result<()> {
    match format {
        ExportFormat::Json => to_json(db, path),
        ExportFormat::Csv => to_csv(db, path),
    }
}

pub fn to_json(db: &StatsDb, path: &Path) -> Result<()> {
    let data = gather(db)?;
    fs::write(path, serde_json::to_vec_pretty(&data)?)?;
    Ok(())
}

pub fn to_csv(db: &StatsDb, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["ID", "Timestamp", "WPM", "Accuracy", "Duration", "ErrorCount"])?;

    for s in db.recent_sessions(EXPORT_SESSION_LIMIT)? {
        writer.write_record([
            s.id.map(|id| id.to_string()).unwrap_or_default(),
            s.timestamp.to_rfc3339(),
            format!("{:.2}", s.wpm),
            format!("{:.2}", s.accuracy),
            format!("{:.2}", s.duration_secs),
            s.error_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
