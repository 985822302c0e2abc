//! Membership registry state machine
//!
//! Every public operation is one atomic transition:
//!
//! 1. Read committed state (lookups, counter)
//! 2. Authorize the caller
//! 3. Validate inputs
//! 4. Stage writes and commit them as a single batch
//!
//! Any failure in steps 1-3 returns before a write is staged, and a failed
//! commit leaves the store untouched, so callers never observe a partial
//! transition. Mutating operations take `&mut self`, which serializes them.

use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::context::{CallContext, Principal};
use crate::error::{RegistryError, Result};
use crate::models::{
    ActivityLogEntry, MemberId, MemberRecord, NewMember, ProfileUpdate, ReputationScore,
    VisibilityGrant,
};
use crate::store::{MemoryStore, RegistryStore, SqliteStore, Transaction, Write};

/// Grounds on which a caller may mutate a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Caller owns the record
    Owner,
    /// Caller is the configured registry admin
    Admin,
}

pub struct MembershipRegistry<S: RegistryStore> {
    store: S,
    config: RegistryConfig,
}

impl MembershipRegistry<MemoryStore> {
    /// Registry over a fresh in-memory store with default config
    pub fn in_memory() -> Self {
        Self {
            store: MemoryStore::new(),
            config: RegistryConfig::default(),
        }
    }
}

impl MembershipRegistry<SqliteStore> {
    /// Open the SQLite database named by `config.database_path`, or an
    /// in-memory database when none is set
    pub fn open(config: RegistryConfig) -> Result<Self> {
        let store = match &config.database_path {
            Some(path) => SqliteStore::open(path)?,
            None => SqliteStore::open_in_memory()?,
        };
        Self::with_config(store, config)
    }
}

impl<S: RegistryStore> MembershipRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: RegistryConfig::default(),
        }
    }

    pub fn with_config(store: S, config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Identity & counter
    // =========================================================================

    /// Last assigned member id (0 before the first registration)
    pub fn current_counter(&self) -> Result<MemberId> {
        self.store.counter()
    }

    /// Id the next registration will receive. Does not reserve it.
    pub fn next_id(&self) -> Result<MemberId> {
        let counter = self.store.counter()?;
        counter
            .checked_add(1)
            .ok_or_else(|| RegistryError::Database("member id counter exhausted".to_string()))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new member owned by the caller and return its id
    pub fn register(&mut self, ctx: &CallContext, input: NewMember) -> Result<MemberId> {
        if let Err(e) = self.config.limits.validate_new_member(&input) {
            debug!(caller = %ctx.caller, error = %e, "Rejected registration");
            return Err(e);
        }

        let member_id = self.next_id()?;
        if self.store.member(member_id)?.is_some() {
            warn!(member_id, "Counter points at an occupied member id");
            return Err(RegistryError::DuplicateMember(member_id));
        }

        let record = MemberRecord {
            member_id,
            nickname: input.nickname,
            owner: ctx.caller.clone(),
            registered_at: ctx.now,
            bio: input.bio,
            preferences: input.preferences,
        };

        let mut txn = Transaction::begin(&mut self.store);
        txn.stage(Write::InsertMember(record));
        txn.stage(Write::PutGrant(VisibilityGrant {
            member_id,
            viewer: ctx.caller.clone(),
            granted: true,
        }));
        txn.stage(Write::SetCounter(member_id));
        txn.commit()?;

        info!(member_id, owner = %ctx.caller, at = ctx.now, "Registered member");
        Ok(member_id)
    }

    // =========================================================================
    // Profile mutation
    // =========================================================================

    /// Apply a partial profile update as the record owner
    pub fn update_profile(
        &mut self,
        ctx: &CallContext,
        member_id: MemberId,
        update: ProfileUpdate,
    ) -> Result<()> {
        let mut record = self.require_member(member_id)?;
        self.require_owner(&record, &ctx.caller)?;

        if let Err(e) = self.config.limits.validate_update(&update) {
            debug!(member_id, error = %e, "Rejected profile update");
            return Err(e);
        }

        if update.is_empty() {
            debug!(member_id, "Empty profile update, nothing to write");
            return Ok(());
        }

        update.apply_to(&mut record);

        let mut txn = Transaction::begin(&mut self.store);
        txn.stage(Write::PutMember(record));
        txn.commit()?;

        info!(member_id, "Updated member profile");
        Ok(())
    }

    pub fn update_bio(
        &mut self,
        ctx: &CallContext,
        member_id: MemberId,
        bio: impl Into<String>,
    ) -> Result<()> {
        self.update_profile(ctx, member_id, ProfileUpdate::bio(bio))
    }

    pub fn update_nickname(
        &mut self,
        ctx: &CallContext,
        member_id: MemberId,
        nickname: impl Into<String>,
    ) -> Result<()> {
        self.update_profile(ctx, member_id, ProfileUpdate::nickname(nickname))
    }

    pub fn update_preferences(
        &mut self,
        ctx: &CallContext,
        member_id: MemberId,
        preferences: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<()> {
        self.update_profile(ctx, member_id, ProfileUpdate::preferences(preferences))
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Remove a member. The owner may always remove; the configured admin
    /// may remove any member.
    pub fn remove(&mut self, ctx: &CallContext, member_id: MemberId) -> Result<Authority> {
        let record = self.require_member(member_id)?;
        let authority = self.removal_authority(&record, &ctx.caller)?;

        let mut txn = Transaction::begin(&mut self.store);
        txn.stage(Write::DeleteMember(member_id));
        if self.config.cascade_on_remove {
            txn.stage(Write::DeleteGrants(member_id));
            txn.stage(Write::DeleteActivity(member_id));
            txn.stage(Write::DeleteReputation(member_id));
        }
        txn.commit()?;

        info!(
            member_id,
            caller = %ctx.caller,
            ?authority,
            cascade = self.config.cascade_on_remove,
            "Removed member"
        );
        Ok(authority)
    }

    fn removal_authority(&self, record: &MemberRecord, caller: &Principal) -> Result<Authority> {
        if record.is_owned_by(caller) {
            Ok(Authority::Owner)
        } else if self.config.is_admin(caller) {
            Ok(Authority::Admin)
        } else {
            debug!(member_id = record.member_id, caller = %caller, "Rejected removal by non-owner");
            Err(forbidden(record, caller))
        }
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Look up the grant for `(member_id, viewer)`. A missing row is
    /// `NotFound`, not `false`.
    pub fn check_visibility(&self, member_id: MemberId, viewer: &Principal) -> Result<bool> {
        self.store
            .grant(member_id, viewer)?
            .map(|grant| grant.granted)
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "visibility grant for member {} and viewer {}",
                    member_id, viewer
                ))
            })
    }

    /// Grant or revoke `viewer`'s visibility into the caller's own record
    pub fn set_visibility(
        &mut self,
        ctx: &CallContext,
        member_id: MemberId,
        viewer: &Principal,
        granted: bool,
    ) -> Result<()> {
        let record = self.require_member(member_id)?;
        self.require_owner(&record, &ctx.caller)?;

        let mut txn = Transaction::begin(&mut self.store);
        txn.stage(Write::PutGrant(VisibilityGrant {
            member_id,
            viewer: viewer.clone(),
            granted,
        }));
        txn.commit()?;

        info!(member_id, viewer = %viewer, granted, "Set visibility grant");
        Ok(())
    }

    /// Full record, readable only by its owner
    pub fn get_profile_secure(
        &self,
        ctx: &CallContext,
        member_id: MemberId,
    ) -> Result<MemberRecord> {
        let record = self.require_member(member_id)?;
        if !record.is_owned_by(&ctx.caller) {
            debug!(member_id, caller = %ctx.caller, "Rejected profile read by non-owner");
            return Err(RegistryError::Unauthorized {
                member_id,
                caller: ctx.caller.to_string(),
            });
        }
        Ok(record)
    }

    // =========================================================================
    // Activity & reputation
    // =========================================================================

    /// Record a login for an existing member at `ctx.now`. Any caller may
    /// record a login.
    pub fn record_login(&mut self, ctx: &CallContext, member_id: MemberId) -> Result<()> {
        self.require_member(member_id)?;

        let entry = self
            .store
            .activity(member_id)?
            .unwrap_or_else(|| ActivityLogEntry::empty(member_id))
            .with_login(ctx.now);
        let total_logins = entry.total_logins;

        let mut txn = Transaction::begin(&mut self.store);
        txn.stage(Write::PutActivity(entry));
        txn.commit()?;

        debug!(member_id, total_logins, at = ctx.now, "Recorded login");
        Ok(())
    }

    pub fn get_activity(&self, member_id: MemberId) -> Result<ActivityLogEntry> {
        self.store
            .activity(member_id)?
            .ok_or_else(|| RegistryError::NotFound(format!("activity for member {}", member_id)))
    }

    pub fn get_reputation(&self, member_id: MemberId) -> Result<ReputationScore> {
        self.store
            .reputation(member_id)?
            .ok_or_else(|| RegistryError::NotFound(format!("reputation for member {}", member_id)))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_member(&self, member_id: MemberId) -> Result<MemberRecord> {
        self.store
            .member(member_id)?
            .ok_or_else(|| RegistryError::member_not_found(member_id))
    }

    fn require_owner(&self, record: &MemberRecord, caller: &Principal) -> Result<()> {
        if record.is_owned_by(caller) {
            return Ok(());
        }
        debug!(member_id = record.member_id, caller = %caller, "Rejected mutation by non-owner");
        Err(forbidden(record, caller))
    }
}

fn forbidden(record: &MemberRecord, caller: &Principal) -> RegistryError {
    RegistryError::Forbidden {
        member_id: record.member_id,
        caller: caller.to_string(),
    }
}
