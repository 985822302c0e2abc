//! Storage backends for registry state
//!
//! The registry treats storage as a key-value map with point reads and an
//! atomic batch write. Each transition reads committed state, stages its
//! writes in a [`WriteBatch`], and hands the whole batch to
//! [`RegistryStore::apply`] only after every check has passed.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - `BTreeMap` tables, snapshot to JSON
//! - [`SqliteStore`] - SQLite file or in-memory database

pub mod memory;
pub mod schema;
pub mod sqlite;

use crate::context::Principal;
use crate::error::Result;
use crate::models::{ActivityLogEntry, MemberId, MemberRecord, ReputationScore, VisibilityGrant};

pub use memory::{MemoryStore, StoreSnapshot};
pub use sqlite::SqliteStore;

/// A single staged write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Create a member; fails with `DuplicateMember` if the id is taken
    InsertMember(MemberRecord),
    /// Create or replace a member
    PutMember(MemberRecord),
    DeleteMember(MemberId),
    PutGrant(VisibilityGrant),
    /// Delete every grant row keyed by this member
    DeleteGrants(MemberId),
    PutActivity(ActivityLogEntry),
    DeleteActivity(MemberId),
    DeleteReputation(MemberId),
    SetCounter(MemberId),
}

/// Ordered writes committed together or not at all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Write> {
        self.writes.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = Write;
    type IntoIter = std::vec::IntoIter<Write>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// Backing store for the registry tables and id counter
pub trait RegistryStore {
    /// Last assigned member id (0 before the first registration)
    fn counter(&self) -> Result<MemberId>;

    fn member(&self, member_id: MemberId) -> Result<Option<MemberRecord>>;

    fn grant(&self, member_id: MemberId, viewer: &Principal) -> Result<Option<VisibilityGrant>>;

    fn activity(&self, member_id: MemberId) -> Result<Option<ActivityLogEntry>>;

    fn reputation(&self, member_id: MemberId) -> Result<Option<ReputationScore>>;

    /// Commit every write in `batch`, or none of them
    fn apply(&mut self, batch: WriteBatch) -> Result<()>;
}

/// Writes staged by the current operation against a store
///
/// Dropping a transaction without
/// calling [`Transaction::commit`] discards its writes.
pub struct Transaction<'a, S: RegistryStore> {
    store: &'a mut S,
    batch: WriteBatch,
}

impl<'a, S: RegistryStore> Transaction<'a, S> {
    pub fn begin(store: &'a mut S) -> Self {
        Self {
            store,
            batch: WriteBatch::new(),
        }
    }

    pub fn stage(&mut self, write: Write) {
        self.batch.push(write);
    }

    pub fn commit(self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.store.apply(self.batch)
    }
}
