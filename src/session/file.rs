use std::collections::{BTreeMap, HashMap};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use tokio::sync::Mutex;

use super::storage::{SessionStorage, StorageError};

type PathLocks = std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

// One write lock per path, shared by every handle in the process.
static PATH_LOCKS: LazyLock<PathLocks> = LazyLock::new(Default::default);

/// Session persisted as a flat JSON object in a single file.
///
/// Each write goes to a uniquely named temp file in the same directory that is
/// then renamed over the target, so readers (including other processes) see
/// either the old or the new contents and concurrent writers never share a
/// temp file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = PATH_LOCKS
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(path.clone())
            .or_default()
            .clone();
        Self { path, write_lock }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

fn replace_file(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl SessionStorage for FileStorage {
    async fn get_many(
        &self,
        keys: &'static [&'static str],
    ) -> Result<Vec<Option<String>>, StorageError> {
        let entries = self.load().await?;
        Ok(keys.iter().map(|k| entries.get(*k).cloned()).collect())
    }

    async fn write_batch(
        &self,
        batch: Vec<(&'static str, Option<String>)>,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await?;
        for (key, value) in batch {
            match value {
                Some(v) => entries.insert(key.to_owned(), v),
                None => entries.remove(key),
            };
        }

        let dir = self.dir().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        let contents = serde_json::to_vec_pretty(&entries)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&dir, &path, &contents)).await??;

        tracing::debug!(path = %self.path.display(), keys = entries.len(), "Session file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));

        let values = storage.get_many(&["token"]).await.unwrap();
        assert_eq!(values, vec![None]);
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStorage::new(&path)
            .write_batch(vec![
                ("token", Some("t1".into())),
                ("refreshToken", Some("r1".into())),
            ])
            .await
            .unwrap();

        let reopened = FileStorage::new(&path);
        let values = reopened.get_many(&["token", "refreshToken"]).await.unwrap();
        assert_eq!(values, vec![Some("t1".into()), Some("r1".into())]);
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_handles_on_one_path_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let first = FileStorage::new(&path);
        let second = FileStorage::new(&path);

        for round in 0..100 {
            let (a, b) = tokio::join!(
                first.write_batch(vec![("token", Some(format!("t{round}")))]),
                second.write_batch(vec![("refreshToken", Some(format!("r{round}")))]),
            );
            a.unwrap();
            b.unwrap();
        }

        let values = first.get_many(&["token", "refreshToken"]).await.unwrap();
        assert_eq!(values, vec![Some("t99".into()), Some("r99".into())]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(FileStorage::new(&path).get_many(&["token"]).await.is_err());
    }
}
