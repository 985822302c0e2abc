//! Registry records and transition inputs
//!
//! ## Tables
//!
//! - `members` - Profile records keyed by `member_id`
//! - `visibility_grants` - Permission rows keyed by `(member_id, viewer)`
//! - `activity_log` - Login activity keyed by `member_id`
//! - `reputation` - Reputation scores keyed by `member_id` (read-only)
//!
//! Side-table rows reference a `member_id` weakly: they may outlive the
//! profile they point at and are never used to decide ownership.

use serde::{Deserialize, Serialize};

use crate::context::Principal;

/// Sequentially assigned member identifier, starting at 1
pub type MemberId = u64;

/// `last_action` value of an activity row that has never been written
pub const NO_ACTION: &str = "None";

/// `last_action` value written by a login
pub const LOGIN_ACTION: &str = "login";

// =============================================================================
// Records
// =============================================================================

/// Member profile record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub member_id: MemberId,
    pub nickname: String,
    pub owner: Principal,
    pub registered_at: u64,
    pub bio: String,
    pub preferences: Vec<String>,
}

impl MemberRecord {
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        &self.owner == principal
    }
}

/// Permission row: whether `viewer` may see `member_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityGrant {
    pub member_id: MemberId,
    pub viewer: Principal,
    pub granted: bool,
}

/// Login activity for a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub member_id: MemberId,
    pub last_login: u64,
    pub total_logins: u64,
    pub last_action: String,
}

impl ActivityLogEntry {
    /// Row used when a member has no recorded activity yet
    pub fn empty(member_id: MemberId) -> Self {
        Self {
            member_id,
            last_login: 0,
            total_logins: 0,
            last_action: NO_ACTION.to_string(),
        }
    }

    /// Apply one login at sequence `now`
    pub fn with_login(mut self, now: u64) -> Self {
        self.last_login = now;
        self.total_logins = self.total_logins.saturating_add(1);
        self.last_action = LOGIN_ACTION.to_string();
        self
    }
}

/// Reputation score for a member. No transition writes this table yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub member_id: MemberId,
    pub score: u64,
    pub endorsements: u64,
    pub last_updated: u64,
}

// =============================================================================
// Inputs
// =============================================================================

/// Input for registering a new member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub nickname: String,
    #[serde(default)]
    pub bio: String,
    pub preferences: Vec<String>,
}

impl NewMember {
    pub fn new(
        nickname: impl Into<String>,
        bio: impl Into<String>,
        preferences: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            bio: bio.into(),
            preferences: preferences.into_iter().map(Into::into).collect(),
        }
    }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn nickname(nickname: impl Into<String>) -> Self {
        Self {
            nickname: Some(nickname.into()),
            ..Self::default()
        }
    }

    pub fn bio(bio: impl Into<String>) -> Self {
        Self {
            bio: Some(bio.into()),
            ..Self::default()
        }
    }

    pub fn preferences(preferences: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            preferences: Some(preferences.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nickname.is_none() && self.bio.is_none() && self.preferences.is_none()
    }

    /// Copy the targeted fields onto `record`; identity fields are never touched
    pub(crate) fn apply_to(self, record: &mut MemberRecord) {
        if let Some(nickname) = self.nickname {
            record.nickname = nickname;
        }
        if let Some(bio) = self.bio {
            record.bio = bio;
        }
        if let Some(preferences) = self.preferences {
            record.preferences = preferences;
        }
    }
}
