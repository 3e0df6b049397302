//! [`Storage`] implementation over a capability-scoped directory.

use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::Arc,
};

use akami_core::{Page, Storage, StorageError};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use tracing::{debug, instrument};

use crate::{
    errors::FsStorageError,
    keys::{TEMP_PREFIX, checked, is_valid_key, temp_name},
};

/// Stores each key as a file in one directory.
///
/// Writes land in a temporary file that is then renamed over the target, so
/// a reader sees either the old value or the new one. A batch is applied
/// key by key; a crash mid-batch can leave a prefix of it written.
///
/// # Examples
/// ```
/// use akami_core::Storage;
/// use akami_providers_fs::FsStorage;
///
/// # let tmp = tempfile::tempdir().expect("tempdir");
/// # let path = camino::Utf8Path::from_path(tmp.path()).expect("utf-8 path");
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let storage = FsStorage::open(path)?;
/// storage.put("greeting", b"hello".to_vec()).await?;
/// assert_eq!(storage.get("greeting").await?, Some(b"hello".to_vec()));
/// # Ok::<(), akami_core::StorageError>(())
/// # }).unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct FsStorage {
    dir: Arc<Dir>,
}

impl FsStorage {
    /// Opens `path`, creating it and any missing parents.
    ///
    /// # Errors
    /// Returns [`FsStorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, FsStorageError> {
        let path = path.as_ref();
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|err| FsStorageError::io(path.as_str(), err))?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|err| FsStorageError::io(path.as_str(), err))?;
        debug!(%path, "opened filesystem store");
        Ok(Self { dir: Arc::new(dir) })
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, FsStorageError> + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let outcome = tokio::task::spawn_blocking(move || work(&dir))
            .await
            .map_err(FsStorageError::from)?;
        Ok(outcome?)
    }
}

fn read_key(dir: &Dir, key: &str) -> Result<Option<Vec<u8>>, FsStorageError> {
    match dir.read(checked(key)?) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(FsStorageError::io(key, err)),
    }
}

fn write_key(dir: &Dir, key: &str, value: &[u8]) -> Result<(), FsStorageError> {
    let target = checked(key)?;
    let temp = temp_name(target);
    dir.write(&temp, value)
        .map_err(|err| FsStorageError::io(temp.as_str(), err))?;
    dir.rename(&temp, dir, target)
        .map_err(|err| FsStorageError::io(target, err))
}

/// Lists stored key names, skipping temporary files and foreign entries.
fn key_names(dir: &Dir) -> Result<Vec<String>, FsStorageError> {
    let mut names = Vec::new();
    for entry in dir.entries().map_err(|err| FsStorageError::io(".", err))? {
        let entry = entry.map_err(|err| FsStorageError::io(".", err))?;
        let name = entry
            .file_name()
            .map_err(|_| FsStorageError::NonUtf8Name)?;
        if is_valid_key(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

#[async_trait]
impl Storage for FsStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_owned();
        self.blocking(move |dir| read_key(dir, &key)).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        let keys = keys.to_vec();
        self.blocking(move |dir| {
            let mut found = HashMap::with_capacity(keys.len());
            for key in keys {
                if let Some(bytes) = read_key(dir, &key)? {
                    found.insert(key, bytes);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let key = key.to_owned();
        self.blocking(move |dir| write_key(dir, &key, &value)).await
    }

    #[instrument(name = "fs.put_many", level = "trace", err, skip(self, entries), fields(entries = entries.len()))]
    async fn put_many(&self, entries: BTreeMap<String, Vec<u8>>) -> Result<(), StorageError> {
        self.blocking(move |dir| {
            for key in entries.keys() {
                checked(key)?;
            }
            for (key, value) in &entries {
                write_key(dir, key, value)?;
            }
            Ok(())
        })
        .await
    }

    async fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<Page, StorageError> {
        let prefix = prefix.to_owned();
        let start_after = start_after.map(str::to_owned);
        self.blocking(move |dir| {
            let mut names: Vec<String> = key_names(dir)?
                .into_iter()
                .filter(|name| name.starts_with(prefix.as_str()))
                .filter(|name| start_after.as_deref().is_none_or(|cursor| name.as_str() > cursor))
                .collect();
            names.sort_unstable();
            names.truncate(limit);
            let mut page = Vec::with_capacity(names.len());
            for name in names {
                if let Some(bytes) = read_key(dir, &name)? {
                    page.push((name, bytes));
                }
            }
            Ok(page)
        })
        .await
    }

    #[instrument(name = "fs.clear", level = "debug", err, skip(self))]
    async fn clear(&self) -> Result<(), StorageError> {
        self.blocking(|dir| {
            let entries = dir.entries().map_err(|err| FsStorageError::io(".", err))?;
            for entry in entries {
                let entry = entry.map_err(|err| FsStorageError::io(".", err))?;
                let Ok(name) = entry.file_name() else {
                    continue;
                };
                if is_valid_key(&name) || name.starts_with(TEMP_PREFIX) {
                    dir.remove_file(&name)
                        .map_err(|err| FsStorageError::io(name.as_str(), err))?;
                }
            }
            Ok(())
        })
        .await
    }
}
