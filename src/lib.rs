//! Membership Registry - owner-gated member profiles
//!
//! A single-tenant registry of member profiles keyed by sequential ids.
//! The host environment supplies the calling principal and a sequence
//! counter with every call; the registry validates, authorizes, and applies
//! each operation as one atomic transition.
//!
//! ## Tables
//!
//! | Table | Key | Written by |
//! |-------|-----|------------|
//! | members | `member_id` | register, update_*, remove |
//! | visibility_grants | `(member_id, viewer)` | register, set_visibility |
//! | activity_log | `member_id` | record_login |
//! | reputation | `member_id` | (host only) |
//!
//! ## Example
//!
//! ```
//! use membership_registry::{CallContext, MembershipRegistry, NewMember};
//!
//! let mut registry = MembershipRegistry::in_memory();
//! let alice = CallContext::new("alice", 1);
//!
//! let id = registry.register(&alice, NewMember::new("alice", "hi", ["coding"])).unwrap();
//! registry.update_nickname(&alice, id, "alice2").unwrap();
//!
//! let profile = registry.get_profile_secure(&alice, id).unwrap();
//! assert_eq!(profile.nickname, "alice2");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;
pub mod validation;

// Re-exports
pub use config::RegistryConfig;
pub use context::{CallContext, Principal};
pub use error::{ErrorKind, RegistryError, Result};
pub use models::{
    ActivityLogEntry, MemberId, MemberRecord, NewMember, ProfileUpdate, ReputationScore,
    VisibilityGrant,
};
pub use registry::{Authority, MembershipRegistry};
pub use store::{MemoryStore, RegistryStore, SqliteStore, StoreSnapshot};
pub use validation::FieldLimits;
