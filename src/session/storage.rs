use std::future::Future;
use std::pin::Pin;

/// Error type returned by storage backends.
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// Fixed storage key names.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const ROLE: &str = "userRole";
    pub const USER_ID: &str = "userId";
}

/// All session keys, in [`Session`](super::Session) field order.
pub const KEYS: &[&str] = &[
    keys::ACCESS_TOKEN,
    keys::REFRESH_TOKEN,
    keys::ROLE,
    keys::USER_ID,
];

/// Durable key-value storage behind the session store.
///
/// Implementations must make `write_batch` atomic: a concurrent `get_many`
/// observes either none or all of the batch.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStorage for KeyringStorage {
///     async fn get_many(&self, keys: &'static [&'static str]) -> Result<Vec<Option<String>>, StorageError> {
///         keys.iter().map(|k| self.keyring.get(k)).collect()
///     }
///
///     async fn write_batch(&self, batch: Vec<(&'static str, Option<String>)>) -> Result<(), StorageError> {
///         self.keyring.transaction(batch)
///     }
/// }
/// ```
pub trait SessionStorage: Send + Sync + 'static {
    /// Read several keys at once. Missing keys yield `None`.
    fn get_many(
        &self,
        keys: &'static [&'static str],
    ) -> impl Future<Output = Result<Vec<Option<String>>, StorageError>> + Send;

    /// Apply all writes atomically. `None` removes the key.
    fn write_batch(
        &self,
        batch: Vec<(&'static str, Option<String>)>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe wrapper for SessionStorage (needed for `Box<dyn>`).
pub(super) trait SessionStorageDyn: Send + Sync {
    fn get_many_dyn(
        &self,
        keys: &'static [&'static str],
    ) -> BoxFuture<'_, Result<Vec<Option<String>>, StorageError>>;

    fn write_batch_dyn(
        &self,
        batch: Vec<(&'static str, Option<String>)>,
    ) -> BoxFuture<'_, Result<(), StorageError>>;
}

impl<T: SessionStorage> SessionStorageDyn for T {
    fn get_many_dyn(
        &self,
        keys: &'static [&'static str],
    ) -> BoxFuture<'_, Result<Vec<Option<String>>, StorageError>> {
        Box::pin(self.get_many(keys))
    }

    fn write_batch_dyn(
        &self,
        batch: Vec<(&'static str, Option<String>)>,
    ) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(self.write_batch(batch))
    }
}
