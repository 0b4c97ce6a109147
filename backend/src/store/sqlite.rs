use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::models::UserRecord;
use crate::otp::OtpChallenge;

/// SQLite-backed user record store.
pub struct UserStore {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

const SELECT_USER: &str = "SELECT id, email, name, is_verified, otp_code_hash, otp_salt,
        otp_expires_at, otp_attempts, send_account_created_next_login,
        first_login_at, last_login_at, verified_at, created_at
     FROM users WHERE id = ?1";

impl UserStore {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
            Connection::open(path)?
        };

        // OTP digest and expiry are written and cleared together
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT,
                is_verified INTEGER NOT NULL DEFAULT 0,
                otp_code_hash TEXT,
                otp_salt TEXT,
                otp_expires_at TEXT,
                otp_attempts INTEGER NOT NULL DEFAULT 0,
                send_account_created_next_login INTEGER NOT NULL DEFAULT 0,
                first_login_at TEXT,
                last_login_at TEXT,
                verified_at TEXT,
                created_at TEXT NOT NULL,
                CHECK ((otp_code_hash IS NULL) = (otp_expires_at IS NULL)),
                CHECK ((otp_code_hash IS NULL) = (otp_salt IS NULL))
            )",
            [],
        )?;

        tracing::info!("User store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Cheap connectivity probe for health checks.
    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub fn get(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.lock()?;
        read_user(&conn, uid)
    }

    /// Atomically read, modify and write one user record.
    ///
    /// `f` receives the current record (or `None`) and may change it in
    /// place, including creating it. The whole sequence runs inside one
    /// immediate transaction while the connection is held, so concurrent
    /// updates to the same user are serialized.
    ///
    /// Changes made by `f` are committed even when `f` returns an error;
    /// failure bookkeeping such as attempt counters must survive the
    /// rejected call. Records are never deleted through this path.
    pub fn update<T, E, F>(&self, uid: &str, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Option<UserRecord>) -> Result<T, E>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let before = read_user(&tx, uid)?;
        let mut slot = before.clone();
        let outcome = f(&mut slot);

        if let Some(record) = slot.as_ref() {
            if record.id != uid {
                return Err(StoreError::CorruptRecord {
                    id: uid.to_string(),
                    reason: format!("id changed to {}", record.id),
                }
                .into());
            }
            if before.as_ref() != Some(record) {
                write_user(&tx, record)?;
            }
        }

        tx.commit().map_err(StoreError::from)?;
        outcome
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }
}

fn read_user(conn: &Connection, uid: &str) -> Result<Option<UserRecord>, StoreError> {
    let row = conn
        .query_row(SELECT_USER, params![uid], RawUser::from_row)
        .optional()?;
    row.map(RawUser::into_record).transpose()
}

fn write_user(conn: &Connection, record: &UserRecord) -> Result<(), StoreError> {
    let otp = record.otp.as_ref();
    conn.execute(
        "INSERT INTO users (id, email, name, is_verified, otp_code_hash, otp_salt,
            otp_expires_at, otp_attempts, send_account_created_next_login,
            first_login_at, last_login_at, verified_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            email = excluded.email,
            name = excluded.name,
            is_verified = excluded.is_verified,
            otp_code_hash = excluded.otp_code_hash,
            otp_salt = excluded.otp_salt,
            otp_expires_at = excluded.otp_expires_at,
            otp_attempts = excluded.otp_attempts,
            send_account_created_next_login = excluded.send_account_created_next_login,
            first_login_at = excluded.first_login_at,
            last_login_at = excluded.last_login_at,
            verified_at = excluded.verified_at",
        params![
            record.id,
            record.email,
            record.name,
            record.is_verified,
            otp.map(|c| c.code_hash.as_str()),
            otp.map(|c| c.salt.as_str()),
            otp.map(|c| c.expires_at.to_rfc3339()),
            otp.map(|c| c.attempts).unwrap_or(0),
            record.send_account_created_next_login,
            record.first_login_at.map(|t| t.to_rfc3339()),
            record.last_login_at.map(|t| t.to_rfc3339()),
            record.verified_at.map(|t| t.to_rfc3339()),
            record.created_at.to_rfc3339(),
        ],
    )?;
    tracing::debug!("Wrote user record: {}", record.id);
    Ok(())
}

/// Row as stored, before timestamp parsing.
struct RawUser {
    id: String,
    email: String,
    name: Option<String>,
    is_verified: bool,
    otp_code_hash: Option<String>,
    otp_salt: Option<String>,
    otp_expires_at: Option<String>,
    otp_attempts: u32,
    send_account_created_next_login: bool,
    first_login_at: Option<String>,
    last_login_at: Option<String>,
    verified_at: Option<String>,
    created_at: String,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            is_verified: row.get(3)?,
            otp_code_hash: row.get(4)?,
            otp_salt: row.get(5)?,
            otp_expires_at: row.get(6)?,
            otp_attempts: row.get(7)?,
            send_account_created_next_login: row.get(8)?,
            first_login_at: row.get(9)?,
            last_login_at: row.get(10)?,
            verified_at: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<UserRecord, StoreError> {
        let id = self.id;
        let parse = |value: &str| parse_timestamp(&id, value);
        let parse_opt = |value: Option<String>| value.as_deref().map(parse).transpose();

        let otp = match (self.otp_code_hash, self.otp_salt, self.otp_expires_at) {
            (Some(code_hash), Some(salt), Some(expires_at)) => Some(OtpChallenge {
                code_hash,
                salt,
                expires_at: parse(&expires_at)?,
                attempts: self.otp_attempts,
            }),
            (None, None, None) => None,
            _ => {
                return Err(StoreError::CorruptRecord {
                    id: id.clone(),
                    reason: "partial OTP fields".to_string(),
                })
            }
        };

        Ok(UserRecord {
            email: self.email,
            name: self.name,
            is_verified: self.is_verified,
            otp,
            send_account_created_next_login: self.send_account_created_next_login,
            first_login_at: parse_opt(self.first_login_at)?,
            last_login_at: parse_opt(self.last_login_at)?,
            verified_at: parse_opt(self.verified_at)?,
            created_at: parse(&self.created_at)?,
            id,
        })
    }
}

fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord {
            id: id.to_string(),
            reason: format!("bad timestamp {:?}: {}", value, e),
        })
}
