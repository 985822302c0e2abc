//! Registry transition tests, run against both storage backends

use membership_registry::store::{Write, WriteBatch};
use membership_registry::{
    CallContext, ErrorKind, MembershipRegistry, MemoryStore, NewMember, Principal, ProfileUpdate,
    RegistryStore, SqliteStore,
};

fn memory() -> MembershipRegistry<MemoryStore> {
    MembershipRegistry::in_memory()
}

fn sqlite() -> MembershipRegistry<SqliteStore> {
    MembershipRegistry::new(SqliteStore::open_in_memory().expect("in-memory sqlite"))
}

fn owner() -> CallContext {
    CallContext::new("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7", 42)
}

fn stranger() -> CallContext {
    CallContext::new("SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE", 43)
}

fn register_alice<S: RegistryStore>(registry: &mut MembershipRegistry<S>) -> u64 {
    registry
        .register(&owner(), NewMember::new("alice", "hi", ["coding"]))
        .expect("valid registration")
}

// =============================================================================
// Scenarios
// =============================================================================

fn register_then_read_back<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let input = NewMember::new("alice", "likes rust", ["coding", "hiking", "tea"]);
    let id = registry.register(&owner(), input.clone()).unwrap();

    let record = registry.get_profile_secure(&owner().at(99), id).unwrap();
    assert_eq!(record.member_id, id);
    assert_eq!(record.nickname, input.nickname);
    assert_eq!(record.bio, input.bio);
    assert_eq!(record.preferences, input.preferences);
    assert_eq!(record.owner, owner().caller);
    assert_eq!(record.registered_at, 42);
}

fn nickname_bounds<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    for bad in [String::new(), "n".repeat(51), "n".repeat(80)] {
        let err = registry
            .register(&owner(), NewMember::new(bad, "", ["x"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    assert_eq!(registry.current_counter().unwrap(), 0);

    let short = registry
        .register(&owner(), NewMember::new("a", "", ["x"]))
        .unwrap();
    let long = registry
        .register(&owner(), NewMember::new("n".repeat(50), "", ["x"]))
        .unwrap();
    assert_eq!((short, long), (1, 2));
}

fn bio_and_preference_bounds_on_register<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let err = registry
        .register(&owner(), NewMember::new("alice", "b".repeat(161), ["x"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = registry
        .register(&owner(), NewMember::new("alice", "", ["x".repeat(31)]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let id = registry
        .register(&owner(), NewMember::new("alice", "b".repeat(160), ["x".repeat(30)]))
        .unwrap();
    assert_eq!(id, 1);
}

fn update_bio_by_non_owner<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);

    let err = registry.update_bio(&stranger(), id, "pwned").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(registry.get_profile_secure(&owner(), id).unwrap().bio, "hi");

    registry.update_bio(&owner(), id, "").unwrap();
    assert_eq!(registry.get_profile_secure(&owner(), id).unwrap().bio, "");
}

fn update_preferences_bounds<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);

    let err = registry
        .update_preferences(&owner(), id, Vec::<String>::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = registry
        .update_preferences(&owner(), id, ["a", "b", "c", "d", "e", "f"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        registry.get_profile_secure(&owner(), id).unwrap().preferences,
        vec!["coding".to_string()]
    );

    let five = vec!["p".to_string(), "q".repeat(30), "r".into(), "s".into(), "t".into()];
    registry.update_preferences(&owner(), id, five.clone()).unwrap();
    assert_eq!(registry.get_profile_secure(&owner(), id).unwrap().preferences, five);
}

fn update_profile_is_all_or_nothing<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);

    // Valid nickname, invalid bio: neither field changes
    let update = ProfileUpdate {
        nickname: Some("alice2".into()),
        bio: Some("b".repeat(161)),
        preferences: None,
    };
    let err = registry.update_profile(&owner(), id, update).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let before = registry.get_profile_secure(&owner(), id).unwrap();
    assert_eq!(before.nickname, "alice");
    assert_eq!(before.bio, "hi");

    let update = ProfileUpdate {
        nickname: Some("alice2".into()),
        bio: Some("new bio".into()),
        preferences: Some(vec!["reading".into()]),
    };
    registry.update_profile(&owner().at(500), id, update).unwrap();

    let after = registry.get_profile_secure(&owner(), id).unwrap();
    assert_eq!(after.nickname, "alice2");
    assert_eq!(after.bio, "new bio");
    assert_eq!(after.preferences, vec!["reading".to_string()]);
    assert_eq!(after.owner, before.owner);
    assert_eq!(after.registered_at, before.registered_at);
    assert_eq!(after.member_id, before.member_id);
}

fn update_missing_member<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let err = registry.update_nickname(&owner(), 7, "ghost").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn authorization_precedes_validation<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);
    let err = registry.update_nickname(&stranger(), id, "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

fn remove_semantics<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let err = registry.remove(&owner(), 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let id = register_alice(&mut registry);
    let err = registry.remove(&stranger(), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(registry.get_profile_secure(&owner(), id).is_ok());

    registry.remove(&owner(), id).unwrap();
    let err = registry.get_profile_secure(&owner(), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = registry.remove(&owner(), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn ids_never_reused<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let first = register_alice(&mut registry);
    registry.remove(&owner(), first).unwrap();

    let second = registry
        .register(&stranger(), NewMember::new("bob", "", ["chess"]))
        .unwrap();
    assert_ne!(first, second);
    assert!(second > first);
    assert_eq!(registry.current_counter().unwrap(), second);
}

fn side_rows_survive_removal<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);
    registry.record_login(&owner(), id).unwrap();
    registry.remove(&owner(), id).unwrap();

    assert!(registry.check_visibility(id, &owner().caller).unwrap());
    assert_eq!(registry.get_activity(id).unwrap().total_logins, 1);
    assert_eq!(
        registry.record_login(&owner(), id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

fn visibility_lookup<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);

    assert!(registry.check_visibility(id, &owner().caller).unwrap());

    let err = registry
        .check_visibility(id, &Principal::new("nobody"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = registry.check_visibility(99, &owner().caller).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn profile_read_is_owner_only<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);

    let err = registry.get_profile_secure(&stranger(), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let err = registry.get_profile_secure(&stranger(), 99).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn login_counting<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let err = registry.record_login(&owner(), 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let id = register_alice(&mut registry);
    assert_eq!(registry.get_activity(id).unwrap_err().kind(), ErrorKind::NotFound);

    // Any caller may record a login
    registry.record_login(&stranger().at(60), id).unwrap();
    let entry = registry.get_activity(id).unwrap();
    assert_eq!(entry.total_logins, 1);
    assert_eq!(entry.last_login, 60);
    assert_eq!(entry.last_action, "login");

    registry.record_login(&owner().at(61), id).unwrap();
    registry.record_login(&owner().at(75), id).unwrap();
    let entry = registry.get_activity(id).unwrap();
    assert_eq!(entry.total_logins, 3);
    assert_eq!(entry.last_login, 75);
}

fn alice_example<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = registry
        .register(&owner(), NewMember::new("alice", "hi", ["coding"]))
        .unwrap();
    assert_eq!(id, 1);

    registry.update_nickname(&owner(), 1, "alice2").unwrap();
    assert_eq!(registry.get_profile_secure(&owner(), 1).unwrap().nickname, "alice2");

    let err = registry.update_nickname(&stranger(), 1, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(registry.get_profile_secure(&owner(), 1).unwrap().nickname, "alice2");
}

fn reputation_is_read_only<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let id = register_alice(&mut registry);
    registry.record_login(&owner(), id).unwrap();
    let err = registry.get_reputation(id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

fn timestamps_span_full_u64<S: RegistryStore>(mut registry: MembershipRegistry<S>) {
    let late = owner().at(u64::MAX);
    let id = registry
        .register(&late, NewMember::new("alice", "hi", ["coding"]))
        .unwrap();
    assert_eq!(registry.get_profile_secure(&late, id).unwrap().registered_at, u64::MAX);

    registry.record_login(&late, id).unwrap();
    let entry = registry.get_activity(id).unwrap();
    assert_eq!(entry.last_login, u64::MAX);
    assert_eq!(entry.total_logins, 1);

    let id = registry
        .register(&owner().at(i64::MAX as u64 + 1), NewMember::new("bob", "", ["art"]))
        .unwrap();
    let record = registry.get_profile_secure(&owner(), id).unwrap();
    assert_eq!(record.registered_at, i64::MAX as u64 + 1);
}

/// Seed the counter just below the top of the id range, then register
/// until the counter runs out
fn counter_runs_to_u64_max<S: RegistryStore>(mut store: S) {
    let mut batch = WriteBatch::new();
    batch.push(Write::SetCounter(u64::MAX - 1));
    store.apply(batch).unwrap();

    let mut registry = MembershipRegistry::new(store);
    assert_eq!(registry.next_id().unwrap(), u64::MAX);
    let id = registry
        .register(&owner(), NewMember::new("alice", "hi", ["coding"]))
        .unwrap();
    assert_eq!(id, u64::MAX);
    assert_eq!(registry.current_counter().unwrap(), u64::MAX);
    assert_eq!(registry.get_profile_secure(&owner(), id).unwrap().nickname, "alice");

    assert_eq!(registry.next_id().unwrap_err().kind(), ErrorKind::Internal);
    let err = registry
        .register(&owner(), NewMember::new("bob", "", ["art"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(registry.current_counter().unwrap(), u64::MAX);
}

#[test]
fn test_counter_runs_to_u64_max_in_memory() {
    counter_runs_to_u64_max(MemoryStore::new());
}

#[test]
fn test_counter_runs_to_u64_max_in_sqlite() {
    counter_runs_to_u64_max(SqliteStore::open_in_memory().unwrap());
}

// =============================================================================
// Backend wiring
// =============================================================================

macro_rules! backend_tests {
    ($($name:ident),* $(,)?) => {
        mod memory_backend {
            use super::*;
            $(
                #[test]
                fn $name() {
                    super::$name(memory());
                }
            )*
        }

        mod sqlite_backend {
            use super::*;
            $(
                #[test]
                fn $name() {
                    super::$name(sqlite());
                }
            )*
        }
    };
}

backend_tests!(
    register_then_read_back,
    nickname_bounds,
    bio_and_preference_bounds_on_register,
    update_bio_by_non_owner,
    update_preferences_bounds,
    update_profile_is_all_or_nothing,
    update_missing_member,
    authorization_precedes_validation,
    remove_semantics,
    ids_never_reused,
    side_rows_survive_removal,
    visibility_lookup,
    profile_read_is_owner_only,
    login_counting,
    alice_example,
    reputation_is_read_only,
    timestamps_span_full_u64,
);
