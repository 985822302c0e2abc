//! SQLite-backed registry store
//!
//! Every [`WriteBatch`] runs inside a single SQLite transaction, so a failed
//! write rolls back everything staged alongside it.
//!
//! Ids, sequence numbers and counters are `u64`. SQLite integers are `i64`,
//! so they are stored bit-for-bit as `i64` and cast back on read. Values
//! above `i64::MAX` appear negative in raw SQL but round-trip exactly.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use super::schema;
use super::{RegistryStore, Write, WriteBatch};
use crate::context::Principal;
use crate::error::{RegistryError, Result};
use crate::models::{ActivityLogEntry, MemberId, MemberRecord, ReputationScore, VisibilityGrant};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the registry database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening registry database at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| RegistryError::Database(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| RegistryError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory registry database");

        let conn = Connection::open_in_memory().map_err(|e| {
            RegistryError::Database(format!("Failed to open in-memory SQLite: {}", e))
        })?;

        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RegistryError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RegistryError::Database(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Insert or replace a reputation row. No registry transition writes
    /// reputation; hosts that compute scores externally load them here.
    pub fn put_reputation(&self, score: &ReputationScore) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO reputation (member_id, score, endorsements, last_updated)
                 VALUES (?, ?, ?, ?)",
                params![
                    to_sql_int(score.member_id),
                    to_sql_int(score.score),
                    to_sql_int(score.endorsements),
                    to_sql_int(score.last_updated),
                ],
            )?;
            Ok(())
        })
    }
}

fn to_sql_int(value: u64) -> i64 {
    value as i64
}

fn from_sql_int(value: i64) -> u64 {
    value as u64
}

const INSERT_MEMBER: &str = "INSERT INTO members
    (member_id, nickname, owner, registered_at, bio, preferences_json)
    VALUES (?, ?, ?, ?, ?, ?)";

const UPSERT_MEMBER: &str = "INSERT OR REPLACE INTO members
    (member_id, nickname, owner, registered_at, bio, preferences_json)
    VALUES (?, ?, ?, ?, ?, ?)";

fn write_member(conn: &Connection, sql: &str, record: &MemberRecord) -> Result<()> {
    let preferences_json = serde_json::to_string(&record.preferences)?;
    let result = conn.execute(
        sql,
        params![
            to_sql_int(record.member_id),
            record.nickname,
            record.owner.as_str(),
            to_sql_int(record.registered_at),
            record.bio,
            preferences_json,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(RegistryError::DuplicateMember(record.member_id))
        }
        Err(e) => Err(e.into()),
    }
}

fn apply_write(conn: &Connection, write: Write) -> Result<()> {
    match write {
        Write::InsertMember(record) => write_member(conn, INSERT_MEMBER, &record)?,
        Write::PutMember(record) => write_member(conn, UPSERT_MEMBER, &record)?,
        Write::DeleteMember(member_id) => {
            conn.execute(
                "DELETE FROM members WHERE member_id = ?",
                params![to_sql_int(member_id)],
            )?;
        }
        Write::PutGrant(grant) => {
            conn.execute(
                "INSERT OR REPLACE INTO visibility_grants (member_id, viewer, granted)
                 VALUES (?, ?, ?)",
                params![
                    to_sql_int(grant.member_id),
                    grant.viewer.as_str(),
                    grant.granted
                ],
            )?;
        }
        Write::DeleteGrants(member_id) => {
            conn.execute(
                "DELETE FROM visibility_grants WHERE member_id = ?",
                params![to_sql_int(member_id)],
            )?;
        }
        Write::PutActivity(entry) => {
            conn.execute(
                "INSERT OR REPLACE INTO activity_log
                 (member_id, last_login, total_logins, last_action)
                 VALUES (?, ?, ?, ?)",
                params![
                    to_sql_int(entry.member_id),
                    to_sql_int(entry.last_login),
                    to_sql_int(entry.total_logins),
                    entry.last_action,
                ],
            )?;
        }
        Write::DeleteActivity(member_id) => {
            conn.execute(
                "DELETE FROM activity_log WHERE member_id = ?",
                params![to_sql_int(member_id)],
            )?;
        }
        Write::DeleteReputation(member_id) => {
            conn.execute(
                "DELETE FROM reputation WHERE member_id = ?",
                params![to_sql_int(member_id)],
            )?;
        }
        Write::SetCounter(counter) => {
            conn.execute(
                "UPDATE registry_counter SET last_member_id = ? WHERE id = 1",
                params![to_sql_int(counter)],
            )?;
        }
    }
    Ok(())
}

impl RegistryStore for SqliteStore {
    fn counter(&self) -> Result<MemberId> {
        self.with_conn(|conn| {
            let counter: i64 = conn.query_row(
                "SELECT last_member_id FROM registry_counter WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(from_sql_int(counter))
        })
    }

    fn member(&self, member_id: MemberId) -> Result<Option<MemberRecord>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT nickname, owner, registered_at, bio, preferences_json
                     FROM members WHERE member_id = ?",
                    params![to_sql_int(member_id)],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;

            match row {
                Some((nickname, owner, registered_at, bio, preferences_json)) => {
                    Ok(Some(MemberRecord {
                        member_id,
                        nickname,
                        owner: Principal::new(owner),
                        registered_at: from_sql_int(registered_at),
                        bio,
                        preferences: serde_json::from_str(&preferences_json)?,
                    }))
                }
                None => Ok(None),
            }
        })
    }

    fn grant(&self, member_id: MemberId, viewer: &Principal) -> Result<Option<VisibilityGrant>> {
        self.with_conn(|conn| {
            let granted: Option<bool> = conn
                .query_row(
                    "SELECT granted FROM visibility_grants WHERE member_id = ? AND viewer = ?",
                    params![to_sql_int(member_id), viewer.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(granted.map(|granted| VisibilityGrant {
                member_id,
                viewer: viewer.clone(),
                granted,
            }))
        })
    }

    fn activity(&self, member_id: MemberId) -> Result<Option<ActivityLogEntry>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT last_login, total_logins, last_action
                     FROM activity_log WHERE member_id = ?",
                    params![to_sql_int(member_id)],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.map(|(last_login, total_logins, last_action)| ActivityLogEntry {
                member_id,
                last_login: from_sql_int(last_login),
                total_logins: from_sql_int(total_logins),
                last_action,
            }))
        })
    }

    fn reputation(&self, member_id: MemberId) -> Result<Option<ReputationScore>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT score, endorsements, last_updated FROM reputation WHERE member_id = ?",
                    params![to_sql_int(member_id)],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.map(|(score, endorsements, last_updated)| ReputationScore {
                member_id,
                score: from_sql_int(score),
                endorsements: from_sql_int(endorsements),
                last_updated: from_sql_int(last_updated),
            }))
        })
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        let writes = batch.len();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for write in batch {
                apply_write(&tx, write)?;
            }
            tx.commit()?;
            debug!(writes, "Committed batch to registry database");
            Ok(())
        })
    }
}
