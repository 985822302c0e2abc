//! Field validation for member profiles
//!
//! Every write path runs these checks before touching storage. Lengths are
//! measured in bytes of the UTF-8 encoding.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::models::{NewMember, ProfileUpdate};

pub const NICKNAME_MIN_LEN: usize = 1;
pub const NICKNAME_MAX_LEN: usize = 50;
pub const BIO_MAX_LEN: usize = 160;
pub const PREFERENCE_MIN_LEN: usize = 1;
pub const PREFERENCE_MAX_LEN: usize = 30;
pub const PREFERENCES_MIN_COUNT: usize = 1;
pub const PREFERENCES_MAX_COUNT: usize = 5;

/// Length and count bounds for profile fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    #[serde(default = "default_nickname_min")]
    pub nickname_min_len: usize,
    #[serde(default = "default_nickname_max")]
    pub nickname_max_len: usize,
    #[serde(default = "default_bio_max")]
    pub bio_max_len: usize,
    #[serde(default = "default_preference_min")]
    pub preference_min_len: usize,
    #[serde(default = "default_preference_max")]
    pub preference_max_len: usize,
    #[serde(default = "default_preferences_min")]
    pub preferences_min_count: usize,
    #[serde(default = "default_preferences_max")]
    pub preferences_max_count: usize,
}

fn default_nickname_min() -> usize {
    NICKNAME_MIN_LEN
}

fn default_nickname_max() -> usize {
    NICKNAME_MAX_LEN
}

fn default_bio_max() -> usize {
    BIO_MAX_LEN
}

fn default_preference_min() -> usize {
    PREFERENCE_MIN_LEN
}

fn default_preference_max() -> usize {
    PREFERENCE_MAX_LEN
}

fn default_preferences_min() -> usize {
    PREFERENCES_MIN_COUNT
}

fn default_preferences_max() -> usize {
    PREFERENCES_MAX_COUNT
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            nickname_min_len: NICKNAME_MIN_LEN,
            nickname_max_len: NICKNAME_MAX_LEN,
            bio_max_len: BIO_MAX_LEN,
            preference_min_len: PREFERENCE_MIN_LEN,
            preference_max_len: PREFERENCE_MAX_LEN,
            preferences_min_count: PREFERENCES_MIN_COUNT,
            preferences_max_count: PREFERENCES_MAX_COUNT,
        }
    }
}

impl FieldLimits {
    pub fn validate_nickname(&self, nickname: &str) -> Result<()> {
        check_len("nickname", nickname, self.nickname_min_len, self.nickname_max_len)
    }

    pub fn validate_bio(&self, bio: &str) -> Result<()> {
        check_len("bio", bio, 0, self.bio_max_len)
    }

    pub fn validate_preference(&self, preference: &str) -> Result<()> {
        check_len("preference", preference, self.preference_min_len, self.preference_max_len)
    }

    pub fn validate_preferences(&self, preferences: &[String]) -> Result<()> {
        let count = preferences.len();
        if count < self.preferences_min_count || count > self.preferences_max_count {
            return Err(RegistryError::InvalidInput(format!(
                "preferences must contain {}-{} items, got {}",
                self.preferences_min_count, self.preferences_max_count, count
            )));
        }
        preferences
            .iter()
            .try_for_each(|p| self.validate_preference(p))
    }

    /// Validate every field of a registration, failing on the first violation
    pub fn validate_new_member(&self, input: &NewMember) -> Result<()> {
        self.validate_nickname(&input.nickname)?;
        self.validate_bio(&input.bio)?;
        self.validate_preferences(&input.preferences)
    }

    /// Validate only the fields an update targets
    pub fn validate_update(&self, update: &ProfileUpdate) -> Result<()> {
        if let Some(nickname) = &update.nickname {
            self.validate_nickname(nickname)?;
        }
        if let Some(bio) = &update.bio {
            self.validate_bio(bio)?;
        }
        if let Some(preferences) = &update.preferences {
            self.validate_preferences(preferences)?;
        }
        Ok(())
    }

    /// Reject bounds that no input could satisfy
    pub fn check_consistent(&self) -> Result<()> {
        let pairs = [
            ("nickname length", self.nickname_min_len, self.nickname_max_len),
            ("preference length", self.preference_min_len, self.preference_max_len),
            ("preference count", self.preferences_min_count, self.preferences_max_count),
        ];
        for (name, min, max) in pairs {
            if min > max {
                return Err(RegistryError::Config(format!(
                    "{} bounds are inverted: min {} > max {}",
                    name, min, max
                )));
            }
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.len();
    if len < min || len > max {
        return Err(RegistryError::InvalidInput(format!(
            "{} must be {}-{} bytes, got {}",
            field, min, max, len
        )));
    }
    Ok(())
}

/// `1 <= len <= 50`
pub fn validate_nickname(nickname: &str) -> bool {
    FieldLimits::default().validate_nickname(nickname).is_ok()
}

/// `len <= 160`; an empty bio is allowed
pub fn validate_bio(bio: &str) -> bool {
    FieldLimits::default().validate_bio(bio).is_ok()
}

/// `1 <= len <= 30`
pub fn validate_preference(preference: &str) -> bool {
    FieldLimits::default().validate_preference(preference).is_ok()
}

/// `1 <= count <= 5` and every element is a valid preference
pub fn validate_preferences(preferences: &[String]) -> bool {
    FieldLimits::default().validate_preferences(preferences).is_ok()
}
