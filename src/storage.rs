//! SQLite persistence for button names and served mugs.
//! Both tables are append-only; the latest name of a button wins.

use crate::types::{ButtonId, Totals};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user (
    button_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS mug (
    button_id INTEGER NOT NULL,
    volume_ml REAL NOT NULL,
    served_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_user_button ON user (button_id);
CREATE INDEX IF NOT EXISTS idx_mug_button ON mug (button_id);
";

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub button_id: ButtonId,
    pub name: String,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MugRecord {
    pub button_id: ButtonId,
    pub volume_ml: f64,
    pub served_at: DateTime<Local>,
}

/// Whose mugs to list: one button, or every button that ever carried a name.
#[derive(Debug, Clone, PartialEq)]
pub enum MugOwner {
    Button(ButtonId),
    Name(String),
}

pub trait Store: Send + Sync {
    fn add_user(&self, button_id: ButtonId, name: &str, created_at: DateTime<Local>) -> Result<()>;

    fn add_mug(
        &self,
        button_id: ButtonId,
        volume_ml: f64,
        served_at: DateTime<Local>,
    ) -> Result<()>;

    /// Record several mugs at once; either all rows land or none does.
    fn add_mugs(&self, mugs: &[(ButtonId, f64)], served_at: DateTime<Local>) -> Result<()>;

    /// Most recent name of the button, or its id as text.
    fn get_name(&self, button_id: ButtonId) -> Result<String>;

    fn get_mugs(&self, owner: &MugOwner, today_only: bool) -> Result<Vec<MugRecord>>;

    fn get_totals(&self) -> Result<Totals>;
}

fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Local))
        .with_context(|| format!("failed to parse {field}"))
}

fn to_button_id(value: i64) -> Result<ButtonId> {
    ButtonId::try_from(value).map_err(|_| anyhow!("button_id {value} out of range"))
}

fn day_prefix(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        info!("Opened database {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("failed to create tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    fn query_mugs(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<MugRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).context("failed to prepare mug query")?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query mugs")?;

        let mut mugs = Vec::new();
        for row in rows {
            let (button_id, volume_ml, served_at) = row.context("failed to read mug row")?;
            mugs.push(MugRecord {
                button_id: to_button_id(button_id)?,
                volume_ml,
                served_at: parse_datetime(&served_at, "mug.served_at")?,
            });
        }
        Ok(mugs)
    }

    /// Name history of a button, oldest first.
    pub fn get_users(&self, button_id: ButtonId) -> Result<Vec<UserRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT button_id, name, created_at FROM user
                 WHERE button_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )
            .context("failed to prepare user query")?;
        let rows = stmt
            .query_map(params![button_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query users")?;

        let mut users = Vec::new();
        for row in rows {
            let (button_id, name, created_at) = row.context("failed to read user row")?;
            users.push(UserRecord {
                button_id: to_button_id(button_id)?,
                name,
                created_at: parse_datetime(&created_at, "user.created_at")?,
            });
        }
        Ok(users)
    }
}

impl Store for SqliteStore {
    fn add_user(&self, button_id: ButtonId, name: &str, created_at: DateTime<Local>) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO user (button_id, name, created_at) VALUES (?1, ?2, ?3)",
                params![button_id, name, created_at.to_rfc3339()],
            )
            .with_context(|| format!("failed to save name of button {button_id}"))?;
        info!("Button {} is now '{}'", button_id, name);
        Ok(())
    }

    fn add_mug(
        &self,
        button_id: ButtonId,
        volume_ml: f64,
        served_at: DateTime<Local>,
    ) -> Result<()> {
        self.add_mugs(&[(button_id, volume_ml)], served_at)
    }

    fn add_mugs(&self, mugs: &[(ButtonId, f64)], served_at: DateTime<Local>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to open mug transaction")?;
        let served_at = served_at.to_rfc3339();
        for (button_id, volume_ml) in mugs {
            tx.execute(
                "INSERT INTO mug (button_id, volume_ml, served_at) VALUES (?1, ?2, ?3)",
                params![button_id, volume_ml, served_at],
            )
            .with_context(|| format!("failed to save mug of button {button_id}"))?;
        }
        tx.commit().context("failed to commit mugs")?;
        debug!("Saved {} mug record(s)", mugs.len());
        Ok(())
    }

    fn get_name(&self, button_id: ButtonId) -> Result<String> {
        let name: Option<String> = self
            .conn()?
            .query_row(
                "SELECT name FROM user WHERE button_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![button_id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to look up name of button {button_id}"))?;
        Ok(name.unwrap_or_else(|| button_id.to_string()))
    }

    fn get_mugs(&self, owner: &MugOwner, today_only: bool) -> Result<Vec<MugRecord>> {
        let today = day_prefix(Local::now().date_naive());
        match owner {
            MugOwner::Button(button_id) => self.query_mugs(
                "SELECT button_id, volume_ml, served_at FROM mug
                 WHERE button_id = ?1
                   AND (?2 = 0 OR substr(served_at, 1, 10) = ?3)
                 ORDER BY served_at, rowid",
                params![button_id, today_only, today],
            ),
            MugOwner::Name(name) => self.query_mugs(
                "SELECT button_id, volume_ml, served_at FROM mug
                 WHERE button_id IN (SELECT button_id FROM user WHERE name = ?1)
                   AND (?2 = 0 OR substr(served_at, 1, 10) = ?3)
                 ORDER BY served_at, rowid",
                params![name, today_only, today],
            ),
        }
    }

    fn get_totals(&self) -> Result<Totals> {
        let conn = self.conn()?;
        let (count, volume_ml) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(volume_ml), 0.0) FROM mug",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
            )
            .context("failed to compute totals")?;
        Ok(Totals {
            count: u64::try_from(count).map_err(|_| anyhow!("negative mug count {count}"))?,
            volume_ml,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_unknown_button_name_is_its_id() {
        assert_eq!(store().get_name(7).unwrap(), "7");
    }

    #[test]
    fn test_latest_name_wins() {
        let store = store();
        let now = Local::now();
        store.add_user(3, "ALICE", now - Duration::hours(1)).unwrap();
        store.add_user(3, "ALI", now).unwrap();
        assert_eq!(store.get_name(3).unwrap(), "ALI");
        assert_eq!(store.get_users(3).unwrap().len(), 2);
    }

    #[test]
    fn test_same_timestamp_uses_insertion_order() {
        let store = store();
        let now = Local::now();
        store.add_user(1, "A", now).unwrap();
        store.add_user(1, "B", now).unwrap();
        assert_eq!(store.get_name(1).unwrap(), "B");
    }

    #[test]
    fn test_mugs_by_button_and_day() {
        let store = store();
        let now = Local::now();
        store.add_mug(2, 120.0, now).unwrap();
        store.add_mug(2, 80.0, now - Duration::days(2)).unwrap();
        store.add_mug(4, 60.0, now).unwrap();

        let all = store.get_mugs(&MugOwner::Button(2), false).unwrap();
        assert_eq!(all.len(), 2);
        let today = store.get_mugs(&MugOwner::Button(2), true).unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].volume_ml, 120.0);
    }

    #[test]
    fn test_mugs_by_name_cover_every_button_of_that_name() {
        let store = store();
        let now = Local::now();
        store.add_user(1, "BOB", now).unwrap();
        store.add_user(9, "BOB", now).unwrap();
        store.add_mugs(&[(1, 50.0), (9, 50.0), (2, 50.0)], now).unwrap();

        let mugs = store.get_mugs(&MugOwner::Name("BOB".into()), true).unwrap();
        let buttons: Vec<_> = mugs.iter().map(|m| m.button_id).collect();
        assert_eq!(buttons, vec![1, 9]);
    }

    #[test]
    fn test_totals() {
        let store = store();
        assert_eq!(store.get_totals().unwrap(), Totals::default());
        let now = Local::now();
        store.add_mugs(&[(1, 60.0), (2, 60.0)], now).unwrap();
        store.add_mug(3, 250.0, now).unwrap();
        let totals = store.get_totals().unwrap();
        assert_eq!(totals.count, 3);
        assert_eq!(totals.volume_ml, 370.0);
    }

    #[test]
    fn test_timestamps_round_trip() {
        let store = store();
        let now = Local::now();
        store.add_mug(5, 33.0, now).unwrap();
        let mugs = store.get_mugs(&MugOwner::Button(5), false).unwrap();
        assert_eq!(mugs[0].served_at.timestamp(), now.timestamp());
    }
}
