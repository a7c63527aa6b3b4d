//! Durable authentication state.
//!
//! [`SessionStore`] is the only writer of the persisted session. Pipeline and
//! guard receive a cloned handle and never touch the storage backend directly.
//!
//! ```rust,ignore
//! use tracker_client::session::{FileStorage, SessionStore};
//!
//! let store = SessionStore::open(FileStorage::new("session.json")).await?;
//! let mut changes = store.subscribe();
//! changes.changed().await?;
//! println!("role is now {:?}", changes.borrow().role);
//! ```

mod file;
mod memory;
mod storage;
mod store;

use std::fmt;

use crate::types::{Role, UserId};

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use storage::{KEYS, SessionStorage, StorageError, keys};
pub use store::SessionStore;

/// Current authentication state.
///
/// Either fully authenticated (both tokens present) or fully logged out.
/// `role` is only meaningful while an access token is present.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<UserId>,
}

impl Session {
    /// A fully authenticated session.
    #[must_use]
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        role: Role,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            role: Some(role),
            user_id: Some(user_id.into()),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Role, but only while an access token is held.
    #[must_use]
    pub fn effective_role(&self) -> Option<Role> {
        self.access_token.as_ref().and(self.role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// Tokens never reach logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_tokens() {
        let session = Session::authenticated("secret-a", "secret-r", Role::Editor, "7");
        let out = format!("{session:?}");
        assert!(!out.contains("secret-a"));
        assert!(!out.contains("secret-r"));
        assert!(out.contains("Editor"));
    }

    #[test]
    fn effective_role_requires_access_token() {
        let session = Session {
            role: Some(Role::Admin),
            ..Session::default()
        };
        assert_eq!(session.effective_role(), None);
        assert!(!session.is_authenticated());

        let session = Session::authenticated("a", "r", Role::Admin, "1");
        assert_eq!(session.effective_role(), Some(Role::Admin));
    }
}
