use crate::app_dirs::AppDirs;
use crate::session::Mode;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One finished session's statistics, as handed to the sink.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoreRecord {
    pub timestamp: DateTime<Local>,
    pub wpm: u32,
    pub accuracy: u32,
    pub mode: Mode,
    pub duration_secs: u32,
}

/// What the sink reports back after accepting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub high_score: u32,
    pub is_new_high_score: bool,
}

/// Accepts a finished session's statistics. Implementations may fail;
/// failure is non-fatal to the session that produced the record.
pub trait ScoreSink {
    fn submit(&mut self, record: &ScoreRecord) -> Result<SubmitReceipt>;
}

/// Score history and high-score tracking over a local SQLite database.
#[derive(Debug)]
pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("keydash_scores.db"));
        Self::open_at(&db_path)
    }

    /// Open (and initialize) the database at an explicit path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                mode TEXT NOT NULL,
                duration_secs INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_timestamp ON scores(timestamp)",
            [],
        )?;

        Ok(ScoreDb { conn })
    }

    /// Best wpm on record, if any session has been saved.
    pub fn high_score(&self) -> Result<Option<u32>> {
        self.conn
            .query_row("SELECT MAX(wpm) FROM scores", [], |row| row.get(0))
    }

    /// Most recent records first.
    pub fn history(&self, limit: usize) -> Result<Vec<ScoreRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, wpm, accuracy, mode, duration_secs
             FROM scores ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = limit.min(i64::MAX as usize) as i64;
        let rows = stmt.query_map(params![limit], |row| {
            let timestamp: String = row.get(0)?;
            let mode: String = row.get(3)?;
            Ok(ScoreRecord {
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .map(|t| t.with_timezone(&Local))
                    .unwrap_or_else(|_| Local::now()),
                wpm: row.get(1)?,
                accuracy: row.get(2)?,
                mode: Mode::from_name(&mode),
                duration_secs: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    /// Write the full history as CSV, newest first.
    pub fn export_csv<W: Write>(&self, out: W) -> Result<()> {
        let records = self.history(usize::MAX)?;
        let mut writer = csv::Writer::from_writer(out);
        for record in records {
            writer.serialize(&record).map_err(csv_to_sql_error)?;
        }
        writer.flush().map_err(|e| csv_to_sql_error(e.into()))?;
        Ok(())
    }
}

fn csv_to_sql_error(e: csv::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

impl ScoreSink for ScoreDb {
    /// Append the record and bump the high score when it is beaten.
    fn submit(&mut self, record: &ScoreRecord) -> Result<SubmitReceipt> {
        let previous_best: Option<u32> = self.high_score()?;

        self.conn.execute(
            r#"
            INSERT INTO scores (timestamp, wpm, accuracy, mode, duration_secs)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.timestamp.to_rfc3339(),
                record.wpm,
                record.accuracy,
                record.mode.as_str(),
                record.duration_secs,
            ],
        )?;

        let previous_best = previous_best.unwrap_or(0);
        let is_new_high_score = record.wpm > previous_best && record.wpm > 0;
        Ok(SubmitReceipt {
            high_score: record.wpm.max(previous_best),
            is_new_high_score,
        })
    }
}
