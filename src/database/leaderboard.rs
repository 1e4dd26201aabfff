use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::play::SessionResult;

/// One player's best run.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: f64,
    pub accuracy: f64,
    pub max_combo: u32,
    pub bpm: f64,
    pub play_count: u32,
    /// Unix seconds of the best run.
    pub date: i64,
}

impl LeaderboardEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            player_name: row.get("player_name")?,
            score: row.get("score")?,
            accuracy: row.get("accuracy")?,
            max_combo: row.get("max_combo")?,
            bpm: row.get("bpm")?,
            play_count: row.get("play_count")?,
            date: row.get("date")?,
        })
    }
}

/// Leaderboard store using SQLite. Keeps the best score per player.
pub struct Leaderboard {
    conn: Connection,
}

impl Leaderboard {
    /// Open or create a leaderboard database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ranking (
                player_name TEXT NOT NULL,
                score REAL NOT NULL DEFAULT 0,
                accuracy REAL NOT NULL DEFAULT 0,
                max_combo INTEGER NOT NULL DEFAULT 0,
                bpm REAL NOT NULL DEFAULT 0,
                play_count INTEGER NOT NULL DEFAULT 0,
                date INTEGER NOT NULL DEFAULT 0,
                UNIQUE(player_name)
            );
            CREATE INDEX IF NOT EXISTS idx_ranking_score ON ranking(score DESC);",
        )?;
        Ok(())
    }

    /// Insert a result, or update the player's row if it beats their best.
    /// Unranked results (no points) are skipped and `false` is returned.
    pub fn record(&self, result: &SessionResult) -> Result<bool> {
        if !result.is_ranked() {
            return Ok(false);
        }
        let now = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO ranking (player_name, score, accuracy, max_combo, bpm, play_count, date)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
             ON CONFLICT(player_name) DO UPDATE SET
                play_count = play_count + 1,
                accuracy = CASE WHEN excluded.score > score THEN excluded.accuracy ELSE accuracy END,
                max_combo = CASE WHEN excluded.score > score THEN excluded.max_combo ELSE max_combo END,
                bpm = CASE WHEN excluded.score > score THEN excluded.bpm ELSE bpm END,
                date = CASE WHEN excluded.score > score THEN excluded.date ELSE date END,
                score = MAX(score, excluded.score)",
            params![
                result.player_name,
                result.score,
                result.accuracy,
                result.max_combo,
                result.bpm,
                now
            ],
        )?;
        Ok(true)
    }

    /// Best runs ordered by score, highest first.
    pub fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM ranking ORDER BY score DESC, date ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], LeaderboardEntry::from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn get(&self, player_name: &str) -> Result<Option<LeaderboardEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT * FROM ranking WHERE player_name = ?1",
                params![player_name],
                LeaderboardEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ranking", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
