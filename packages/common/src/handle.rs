//! # Handles
//!
//! A handle is the public identifier of a page. User input is normalized to
//! lower case before validation; stored handles carry the `@` prefix and must
//! already be lower case.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

pub const HANDLE_PREFIX: char = '@';
pub const MIN_HANDLE_LEN: usize = 3;
pub const MAX_HANDLE_LEN: usize = 30;

/// Words that cannot be claimed because they collide with app routes
pub const RESERVED_HANDLES: &[&str] = &[
    "admin", "api", "app", "auth", "dashboard", "edit", "help", "login", "logout", "new",
    "profile", "settings", "signup", "static", "support", "www",
];

static HANDLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[a-z0-9_]{{{MIN_HANDLE_LEN},{MAX_HANDLE_LEN}}}$"))
        .expect("handle pattern is valid")
});

const SEPARATORS: &[char] = &['/', '\\', '.', ':', '?', '#'];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandleRejection {
    #[error("handles are 3-30 characters of letters, digits or underscores")]
    InvalidFormat,

    #[error("this handle is reserved")]
    Reserved,

    #[error("handles cannot contain separators")]
    ContainsSeparator,

    #[error("stored handles must be lower case")]
    WrongCase,
}

/// Normalized, validated page handle (without prefix)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Normalize and validate raw user input
    ///
    /// A leading `@` is accepted and stripped. Input is lower-cased before
    /// the format check, so `"ABC"` becomes `"abc"`.
    pub fn parse(raw: &str) -> Result<Self, HandleRejection> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix(HANDLE_PREFIX).unwrap_or(trimmed);

        if body.contains(SEPARATORS) || body.chars().any(char::is_whitespace) {
            return Err(HandleRejection::ContainsSeparator);
        }

        let normalized = body.to_lowercase();
        if !HANDLE_PATTERN.is_match(&normalized) {
            return Err(HandleRejection::InvalidFormat);
        }

        if RESERVED_HANDLES.contains(&normalized.as_str()) {
            return Err(HandleRejection::Reserved);
        }

        Ok(Self(normalized))
    }

    /// Parse a handle as stored (`@name`), which must already be normalized
    pub fn from_canonical(stored: &str) -> Result<Self, HandleRejection> {
        let body = stored
            .strip_prefix(HANDLE_PREFIX)
            .ok_or(HandleRejection::InvalidFormat)?;

        if body.chars().any(char::is_uppercase) {
            return Err(HandleRejection::WrongCase);
        }

        Self::parse(body)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stored form with the prefix
    pub fn canonical(&self) -> String {
        format!("{HANDLE_PREFIX}{}", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Handle {
    type Error = HandleRejection;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Handle::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Serde adapter that stores a handle in its prefixed form
pub mod canonical {
    use super::Handle;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(handle: &Handle, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&handle.canonical())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Handle, D::Error> {
        let stored = String::deserialize(deserializer)?;
        Handle::from_canonical(&stored).map_err(D::Error::custom)
    }
}
