//! SQLite dialogue store
//!
//! One row per dialogue, list fields stored as JSON. Predicates are evaluated
//! in-process after loading rows in id order.

use super::{DialogueStats, DialogueStore, Expr};
use crate::core::types::{Dialogue, DialogueFlags, DialogueId, DialoguePatch};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const COLUMNS: &str = "id, question, original, answer, flag, prob_s, prob_a, writer, guilds, \
                       predecessors, successor_timeout, start_time, end_time";

pub struct SqliteStore {
    db_path: Option<PathBuf>,
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        Self::init(conn, Some(db_path))
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS dialogue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                original TEXT NOT NULL,
                answer TEXT NOT NULL,
                flag INTEGER NOT NULL DEFAULT 0,
                prob_s REAL NOT NULL DEFAULT 1,
                prob_a REAL NOT NULL DEFAULT 0,
                writer TEXT NOT NULL DEFAULT '',
                guilds TEXT NOT NULL DEFAULT '[]',
                predecessors TEXT NOT NULL DEFAULT '[]',
                successor_timeout INTEGER NOT NULL DEFAULT 0,
                start_time INTEGER NOT NULL DEFAULT 0,
                end_time INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_dialogue_question ON dialogue(question)",
            [],
        )?;

        Ok(Self {
            db_path,
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn load_all(conn: &Connection) -> Result<Vec<Dialogue>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM dialogue ORDER BY id"))?;
        let rows = stmt
            .query_map([], from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().collect()
    }

    fn load_one(conn: &Connection, id: DialogueId) -> Result<Option<Dialogue>> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM dialogue WHERE id = ?1"),
            params![id as i64],
            from_row,
        )
        .optional()?
        .transpose()
    }

    fn write(conn: &Connection, dialogue: &Dialogue) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO dialogue ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                dialogue.id as i64,
                &dialogue.question,
                &dialogue.original,
                &dialogue.answer,
                dialogue.flag.bits(),
                dialogue.prob_s,
                dialogue.prob_a,
                &dialogue.writer,
                serde_json::to_string(&dialogue.guilds)?,
                serde_json::to_string(&dialogue.predecessors)?,
                dialogue.successor_timeout as i64,
                dialogue.start_time,
                dialogue.end_time,
            ],
        )?;
        Ok(())
    }
}

/// Row decoding is split so JSON errors surface as `anyhow` errors
fn from_row(row: &Row<'_>) -> rusqlite::Result<Result<Dialogue>> {
    let guilds: String = row.get(8)?;
    let predecessors: String = row.get(9)?;
    let id: i64 = row.get(0)?;
    let successor_timeout: i64 = row.get(10)?;
    let base = Dialogue {
        id: id as DialogueId,
        question: row.get(1)?,
        original: row.get(2)?,
        answer: row.get(3)?,
        flag: DialogueFlags::from_bits(row.get(4)?),
        prob_s: row.get(5)?,
        prob_a: row.get(6)?,
        writer: row.get(7)?,
        successor_timeout: successor_timeout.max(0) as u64,
        start_time: row.get(11)?,
        end_time: row.get(12)?,
        ..Default::default()
    };
    Ok(decode_lists(&guilds, &predecessors).map(|(guilds, predecessors)| Dialogue {
        guilds,
        predecessors,
        ..base
    }))
}

fn decode_lists(guilds: &str, predecessors: &str) -> Result<(Vec<String>, Vec<DialogueId>)> {
    Ok((
        serde_json::from_str(guilds).context("Corrupt guild list")?,
        serde_json::from_str(predecessors).context("Corrupt predecessor list")?,
    ))
}

#[async_trait]
impl DialogueStore for SqliteStore {
    async fn query(&self, expr: &Expr) -> Result<Vec<Dialogue>> {
        let conn = self.db.lock().unwrap();
        Ok(Self::load_all(&conn)?
            .into_iter()
            .filter(|dialogue| expr.matches(dialogue))
            .collect())
    }

    async fn get(&self, ids: &[DialogueId]) -> Result<Vec<Dialogue>> {
        let conn = self.db.lock().unwrap();
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut found = Vec::new();
        for id in sorted {
            if let Some(dialogue) = Self::load_one(&conn, id)? {
                found.push(dialogue);
            }
        }
        Ok(found)
    }

    async fn create(&self, dialogue: Dialogue) -> Result<Dialogue> {
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO dialogue (question, original, answer, flag, prob_s, prob_a, writer,
                                   guilds, predecessors, successor_timeout, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                &dialogue.question,
                &dialogue.original,
                &dialogue.answer,
                dialogue.flag.bits(),
                dialogue.prob_s,
                dialogue.prob_a,
                &dialogue.writer,
                serde_json::to_string(&dialogue.guilds)?,
                serde_json::to_string(&dialogue.predecessors)?,
                dialogue.successor_timeout as i64,
                dialogue.start_time,
                dialogue.end_time,
            ],
        )?;
        let id = conn.last_insert_rowid() as DialogueId;
        Ok(Dialogue {
            id,
            ..dialogue.snapshot()
        })
    }

    async fn upsert(&self, patches: Vec<DialoguePatch>) -> Result<()> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction()?;
        for patch in patches {
            let mut row = Self::load_one(&tx, patch.id)?.unwrap_or_else(|| Dialogue {
                id: patch.id,
                ..Default::default()
            });
            patch.apply_to(&mut row);
            Self::write(&tx, &row)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, ids: &[DialogueId]) -> Result<()> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM dialogue WHERE id = ?1", params![*id as i64])?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn stats(&self) -> Result<DialogueStats> {
        let conn = self.db.lock().unwrap();
        let (dialogues, questions): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT question) FROM dialogue",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DialogueStats {
            questions: questions as usize,
            dialogues: dialogues as usize,
        })
    }
}
