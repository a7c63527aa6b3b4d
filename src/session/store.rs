use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Session;
use super::memory::MemoryStorage;
use super::storage::{KEYS, SessionStorage, SessionStorageDyn, StorageError, keys};
use super::FileStorage;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::types::{Role, UserId};

/// Single source of truth for authentication state.
///
/// Cheap to clone; all clones share the same backend and change channel.
/// Reads always go to storage, so a write is visible to the next `read()`
/// from any handle.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Box<dyn SessionStorageDyn>,
    // Serialises mutations so `update_access_token` cannot resurrect a cleared session.
    write_lock: Mutex<()>,
    changes: watch::Sender<Session>,
}

impl SessionStore {
    /// Open a store over `storage`, loading whatever session it already holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend cannot be read.
    pub async fn open<S: SessionStorage>(storage: S) -> Result<Self, Error> {
        let store = Self::with_snapshot(storage, Session::default());
        let current = store.read().await?;
        store.publish(current);
        Ok(store)
    }

    /// Open the backend selected by `config`: a file when one is configured,
    /// otherwise memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the session file exists but cannot be read.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        match config.session_file() {
            Some(path) => Self::open(FileStorage::new(path)).await,
            None => Ok(Self::in_memory()),
        }
    }

    /// Empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_snapshot(MemoryStorage::new(), Session::default())
    }

    fn with_snapshot<S: SessionStorage>(storage: S, snapshot: Session) -> Self {
        let (changes, _) = watch::channel(snapshot);
        Self {
            inner: Arc::new(Inner {
                storage: Box::new(storage),
                write_lock: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Current session as persisted.
    ///
    /// A half-present token pair (left behind by an interrupted external writer)
    /// reads as logged out, and an unrecognised role reads as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend cannot be read.
    pub async fn read(&self) -> Result<Session, Error> {
        let values = self
            .inner
            .storage
            .get_many_dyn(KEYS)
            .await
            .map_err(storage_error)?;
        let [access_token, refresh_token, role, user_id]: [Option<String>; 4] =
            values.try_into().map_err(|v: Vec<Option<String>>| {
                Error::Storage(format!("expected {} values, backend returned {}", KEYS.len(), v.len()))
            })?;

        if access_token.is_some() != refresh_token.is_some() {
            tracing::warn!("Stored session has only one of its tokens; treating as logged out");
            return Ok(Session::default());
        }

        let role = role.and_then(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                tracing::warn!(role = %r, "Ignoring unrecognised stored role");
                None
            }
        });

        Ok(Session {
            access_token,
            refresh_token,
            role,
            user_id: user_id.map(UserId),
        })
    }

    /// Replace the whole session in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if exactly one token is present, or
    /// [`Error::Storage`] if the write fails.
    pub async fn save(&self, session: Session) -> Result<(), Error> {
        if session.access_token.is_some() != session.refresh_token.is_some() {
            return Err(Error::Validation(
                "access and refresh tokens must be saved together".into(),
            ));
        }

        let _guard = self.inner.write_lock.lock().await;
        self.inner
            .storage
            .write_batch_dyn(vec![
                (keys::ACCESS_TOKEN, session.access_token.clone()),
                (keys::REFRESH_TOKEN, session.refresh_token.clone()),
                (keys::ROLE, session.role.map(|r| r.as_str().to_owned())),
                (keys::USER_ID, session.user_id.as_ref().map(|u| u.0.clone())),
            ])
            .await
            .map_err(storage_error)?;
        self.publish(session);
        Ok(())
    }

    /// Replace only the access token, provided the stored refresh token is
    /// still `refresh_token`.
    ///
    /// Returns `false` without writing when the session was cleared, or
    /// replaced by another login, while the new token was being obtained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    pub async fn update_access_token(
        &self,
        refresh_token: &str,
        token: impl Into<String>,
    ) -> Result<bool, Error> {
        let _guard = self.inner.write_lock.lock().await;
        let mut session = self.read().await?;
        if session.refresh_token.as_deref() != Some(refresh_token) {
            return Ok(false);
        }

        let token = token.into();
        self.inner
            .storage
            .write_batch_dyn(vec![(keys::ACCESS_TOKEN, Some(token.clone()))])
            .await
            .map_err(storage_error)?;
        session.access_token = Some(token);
        self.publish(session);
        Ok(true)
    }

    /// Erase all four fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend fails.
    pub async fn clear(&self) -> Result<(), Error> {
        let _guard = self.inner.write_lock.lock().await;
        self.inner
            .storage
            .write_batch_dyn(KEYS.iter().map(|k| (*k, None)).collect())
            .await
            .map_err(storage_error)?;
        self.publish(Session::default());
        Ok(())
    }

    /// Receiver that observes every change to the session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.changes.subscribe()
    }

    /// Last published snapshot, without touching storage.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.changes.borrow().clone()
    }

    /// Re-read storage and notify subscribers if another writer changed it.
    ///
    /// Returns whether a change was published.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend cannot be read.
    pub async fn reload(&self) -> Result<bool, Error> {
        let current = self.read().await?;
        Ok(self.publish(current))
    }

    /// Poll storage every `interval` until `cancel` fires.
    ///
    /// Picks up logins and logouts performed by other processes sharing the
    /// same backend (e.g. the same session file).
    pub fn spawn_reload_task(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        match store.reload().await {
                            Ok(true) => tracing::debug!("Session changed externally"),
                            Ok(false) => {}
                            Err(e) => tracing::warn!(error = %e, "Session reload failed"),
                        }
                    }
                }
            }
        })
    }

    fn publish(&self, session: Session) -> bool {
        self.inner.changes.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session;
                true
            }
        })
    }
}

fn storage_error(e: StorageError) -> Error {
    tracing::error!(error = %e, "Session storage failure");
    Error::Storage(e.to_string())
}
