use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session provider abstraction
///
/// `None` means the viewer is not signed in and only gets a read-only view.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<UserId>;
}

/// Provider with a fixed identity, used by the CLI and in tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    pub user: Option<UserId>,
}

impl StaticIdentity {
    pub fn signed_in(id: impl Into<String>) -> Self {
        Self {
            user: Some(UserId::new(id)),
        }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<UserId> {
        self.user.clone()
    }
}
