//! In-memory registry store

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RegistryStore, Write, WriteBatch};
use crate::context::Principal;
use crate::error::{RegistryError, Result};
use crate::models::{ActivityLogEntry, MemberId, MemberRecord, ReputationScore, VisibilityGrant};

/// `BTreeMap`-backed store. Inserts are checked before any write lands, so
/// `apply` is atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    counter: MemberId,
    members: BTreeMap<MemberId, MemberRecord>,
    grants: BTreeMap<(MemberId, Principal), bool>,
    activity: BTreeMap<MemberId, ActivityLogEntry>,
    reputation: BTreeMap<MemberId, ReputationScore>,
}

/// Serializable copy of every table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub counter: MemberId,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
    #[serde(default)]
    pub grants: Vec<VisibilityGrant>,
    #[serde(default)]
    pub activity: Vec<ActivityLogEntry>,
    #[serde(default)]
    pub reputation: Vec<ReputationScore>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            counter: self.counter,
            members: self.members.values().cloned().collect(),
            grants: self
                .grants
                .iter()
                .map(|((member_id, viewer), granted)| VisibilityGrant {
                    member_id: *member_id,
                    viewer: viewer.clone(),
                    granted: *granted,
                })
                .collect(),
            activity: self.activity.values().cloned().collect(),
            reputation: self.reputation.values().cloned().collect(),
        }
    }

    /// Rebuild a store from a snapshot, rejecting a counter behind existing ids
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        if let Some(max_id) = snapshot.members.iter().map(|m| m.member_id).max() {
            if max_id > snapshot.counter {
                return Err(RegistryError::Config(format!(
                    "snapshot counter {} is behind member id {}",
                    snapshot.counter, max_id
                )));
            }
        }

        let mut store = Self {
            counter: snapshot.counter,
            ..Self::default()
        };
        for member in snapshot.members {
            if store.members.insert(member.member_id, member.clone()).is_some() {
                return Err(RegistryError::DuplicateMember(member.member_id));
            }
        }
        for grant in snapshot.grants {
            store.grants.insert((grant.member_id, grant.viewer), grant.granted);
        }
        for entry in snapshot.activity {
            store.activity.insert(entry.member_id, entry);
        }
        for score in snapshot.reputation {
            store.reputation.insert(score.member_id, score);
        }
        Ok(store)
    }

    /// Reject the batch up front if an insert would collide with a stored
    /// member or an earlier insert in the same batch
    fn check_inserts(&self, batch: &WriteBatch) -> Result<()> {
        let mut inserted = BTreeSet::new();
        for write in batch.iter() {
            if let Write::InsertMember(record) = write {
                let id = record.member_id;
                if self.members.contains_key(&id) || !inserted.insert(id) {
                    return Err(RegistryError::DuplicateMember(id));
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }
}

impl RegistryStore for MemoryStore {
    fn counter(&self) -> Result<MemberId> {
        Ok(self.counter)
    }

    fn member(&self, member_id: MemberId) -> Result<Option<MemberRecord>> {
        Ok(self.members.get(&member_id).cloned())
    }

    fn grant(&self, member_id: MemberId, viewer: &Principal) -> Result<Option<VisibilityGrant>> {
        Ok(self
            .grants
            .get(&(member_id, viewer.clone()))
            .map(|granted| VisibilityGrant {
                member_id,
                viewer: viewer.clone(),
                granted: *granted,
            }))
    }

    fn activity(&self, member_id: MemberId) -> Result<Option<ActivityLogEntry>> {
        Ok(self.activity.get(&member_id).cloned())
    }

    fn reputation(&self, member_id: MemberId) -> Result<Option<ReputationScore>> {
        Ok(self.reputation.get(&member_id).cloned())
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<()> {
        debug!(writes = batch.len(), "Applying batch to memory store");
        self.check_inserts(&batch)?;
        for write in batch {
            match write {
                Write::InsertMember(record) | Write::PutMember(record) => {
                    self.members.insert(record.member_id, record);
                }
                Write::DeleteMember(member_id) => {
                    self.members.remove(&member_id);
                }
                Write::PutGrant(grant) => {
                    self.grants.insert((grant.member_id, grant.viewer), grant.granted);
                }
                Write::DeleteGrants(member_id) => {
                    self.grants.retain(|(id, _), _| *id != member_id);
                }
                Write::PutActivity(entry) => {
                    self.activity.insert(entry.member_id, entry);
                }
                Write::DeleteActivity(member_id) => {
                    self.activity.remove(&member_id);
                }
                Write::DeleteReputation(member_id) => {
                    self.reputation.remove(&member_id);
                }
                Write::SetCounter(counter) => {
                    self.counter = counter;
                }
            }
        }
        Ok(())
    }
}
