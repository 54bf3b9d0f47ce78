use crate::app_dirs::AppDirs;
use crate::challenge::RoundResult;
use crate::remote::{
    protocol::{ResultsPayload, ScoreRecord},
    PuzzleAuthority, RemoteSession, RemoteStatus,
};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

pub const BUBBLES_GAME: &str = "bubbles";
pub const GRID_GAME: &str = "grid";

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("results store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("results encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("results store path error: {0}")]
    Io(#[from] std::io::Error),
}

/// A payload that could not be uploaded, kept for a later attempt
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResults {
    pub id: i64,
    pub payload: ResultsPayload,
    pub stored_at: DateTime<Local>,
}

/// Local fallback for result uploads
#[derive(Debug)]
pub struct ResultsDb {
    conn: Connection,
}

impl ResultsDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ResultsError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS pending_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                stored_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }

    pub fn store(&self, payload: &ResultsPayload) -> Result<i64, ResultsError> {
        let json = serde_json::to_string(payload)?;
        self.conn.execute(
            "INSERT INTO pending_results (payload, stored_at) VALUES (?1, ?2)",
            params![json, Local::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn pending(&self) -> Result<Vec<StoredResults>, ResultsError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, payload, stored_at FROM pending_results ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut stored = Vec::new();
        for row in rows {
            let (id, payload, stored_at) = row?;
            let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "stored_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            stored.push(StoredResults {
                id,
                payload: serde_json::from_str(&payload)?,
                stored_at,
            });
        }
        Ok(stored)
    }

    pub fn remove(&self, id: i64) -> Result<(), ResultsError> {
        self.conn
            .execute("DELETE FROM pending_results WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Posted {
        id: Option<String>,
        message: Option<String>,
    },
    StoredLocally {
        row: i64,
        path: PathBuf,
    },
    Dropped {
        reason: String,
    },
}

/// Uploads results, falling back to the local store. Never fails outward.
pub struct ResultsReporter<'a> {
    authority: &'a dyn PuzzleAuthority,
    fallback: PathBuf,
}

impl<'a> ResultsReporter<'a> {
    pub fn new(authority: &'a dyn PuzzleAuthority, fallback: PathBuf) -> Self {
        Self {
            authority,
            fallback,
        }
    }

    pub fn with_default_store(authority: &'a dyn PuzzleAuthority) -> Self {
        Self::new(authority, AppDirs::results_db_path())
    }

    pub fn report(&self, payload: &ResultsPayload) -> ReportOutcome {
        match self.authority.post_results(payload) {
            Ok(ack) => {
                info!(id = ?ack.id, "results uploaded");
                ReportOutcome::Posted {
                    id: ack.id,
                    message: ack.message,
                }
            }
            Err(err) => {
                warn!(error = %err, "results upload failed, storing locally");
                match ResultsDb::open(&self.fallback).and_then(|db| db.store(payload)) {
                    Ok(row) => ReportOutcome::StoredLocally {
                        row,
                        path: self.fallback.clone(),
                    },
                    Err(store_err) => {
                        error!(error = %store_err, "results could not be stored locally");
                        ReportOutcome::Dropped {
                            reason: format!("{err}; {store_err}"),
                        }
                    }
                }
            }
        }
    }

    /// Retry payloads left behind by earlier runs. Returns how many went up.
    pub fn resend_pending(&self) -> Result<usize, ResultsError> {
        let db = ResultsDb::open(&self.fallback)?;
        let mut sent = 0;
        for stored in db.pending()? {
            match self.authority.post_results(&stored.payload) {
                Ok(_) => {
                    db.remove(stored.id)?;
                    sent += 1;
                }
                Err(err) => {
                    warn!(id = stored.id, error = %err, "stored results still not accepted");
                    break;
                }
            }
        }
        Ok(sent)
    }
}

pub fn score_records(game: &str, results: &[RoundResult]) -> Vec<ScoreRecord> {
    results
        .iter()
        .map(|r| ScoreRecord {
            game: game.to_string(),
            round_index: r.round_index,
            correct: r.correct,
            incorrect: r.incorrect,
            net_score: r.net_score,
            elapsed_seconds: r.elapsed_seconds,
            completed_before_timeout: r.completed_before_timeout,
        })
        .collect()
}

/// Grid outcome as a single record; `None` until the grid reached a terminal state
pub fn grid_record(session: &RemoteSession) -> Option<ScoreRecord> {
    if !session.status().is_terminal() {
        return None;
    }
    let won = session.status() == RemoteStatus::Won;
    let correct = u32::from(won);
    let incorrect = session.submit_attempts();
    Some(ScoreRecord {
        game: GRID_GAME.to_string(),
        round_index: 1,
        correct,
        incorrect,
        net_score: i64::from(correct) - i64::from(incorrect),
        elapsed_seconds: session.countdown().elapsed().as_secs_f64(),
        completed_before_timeout: won,
    })
}
