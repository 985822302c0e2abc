//! Call context for registry transitions
//!
//! The host environment supplies the invoking principal and the current
//! sequence counter (e.g. block height) for every call. Both are threaded
//! explicitly into each operation instead of being read from global state.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a calling identity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Principal {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-call context passed to every registry operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Principal invoking the operation
    pub caller: Principal,
    /// Sequence counter at the time of the call
    pub now: u64,
}

impl CallContext {
    pub fn new(caller: impl Into<Principal>, now: u64) -> Self {
        Self {
            caller: caller.into(),
            now,
        }
    }

    /// Same caller at a later sequence number
    pub fn at(&self, now: u64) -> Self {
        Self {
            caller: self.caller.clone(),
            now,
        }
    }
}

impl std::fmt::Display for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallContext({} @ {})", self.caller, self.now)
    }
}
