use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use souq_types::{Result, StoreError};

/// Keyed record collection, optionally mirrored to a JSON file.
///
/// Every mutation rewrites the whole file through a temp file and rename,
/// so a crash never leaves a half-written collection behind.
#[derive(Debug)]
pub struct Collection<T> {
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, T>>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load a collection from `path`, starting empty if the file is absent
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)
                .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), "opened collection");

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, T>>> {
        self.entries
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, T>>> {
        self.entries
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()).into())
    }

    fn persist(&self, entries: &BTreeMap<String, T>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<T>> {
        Ok(self.read()?.get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    /// All values in key order
    pub fn values(&self) -> Result<Vec<T>> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Values matching `pred`, in key order
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self.read()?.values().filter(|v| pred(v)).cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Apply `f` to the entries as a single change. `f` returns its output
    /// and whether it changed anything.
    ///
    /// File-backed collections run `f` on a copy and swap the copy in only
    /// after it is saved, so a failed save leaves memory matching disk.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, T>) -> Result<(R, bool)>,
    ) -> Result<R> {
        let mut entries = self.write()?;
        if self.path.is_none() {
            return f(&mut *entries).map(|(out, _)| out);
        }
        let mut next = entries.clone();
        let (out, changed) = f(&mut next)?;
        if changed {
            self.persist(&next)?;
            *entries = next;
        }
        Ok(out)
    }

    /// Insert or replace. Returns `true` if the key was new.
    pub fn upsert(&self, key: &str, value: T) -> Result<bool> {
        self.mutate(|entries| Ok((entries.insert(key.to_string(), value).is_none(), true)))
    }

    /// Insert only if absent. Returns `true` if inserted.
    pub fn insert_new(&self, key: &str, value: T) -> Result<bool> {
        self.mutate(|entries| {
            if entries.contains_key(key) {
                return Ok((false, false));
            }
            entries.insert(key.to_string(), value);
            Ok((true, true))
        })
    }

    /// Apply `f` to the value at `key`. Returns the updated value, or
    /// `None` if the key is absent.
    pub fn update(&self, key: &str, f: impl FnOnce(&mut T)) -> Result<Option<T>> {
        self.mutate(|entries| match entries.get_mut(key) {
            Some(value) => {
                f(value);
                Ok((Some(value.clone()), true))
            }
            None => Ok((None, false)),
        })
    }

    /// Apply `f` to the value at `key`, inserting `default()` first if the
    /// key is absent. Read-modify-write happens under one write lock.
    pub fn upsert_with(
        &self,
        key: &str,
        default: impl FnOnce() -> T,
        f: impl FnOnce(&mut T),
    ) -> Result<T> {
        self.mutate(|entries| {
            let value = entries.entry(key.to_string()).or_insert_with(default);
            f(value);
            Ok((value.clone(), true))
        })
    }

    /// Apply `f` to every value in `keys` as one change.
    ///
    /// Returns `None` without changing anything if a key is absent. If `f`
    /// fails for any value, its error is returned and nothing is changed.
    pub fn update_all(
        &self,
        keys: &[&str],
        mut f: impl FnMut(&mut T) -> Result<()>,
    ) -> Result<Option<Vec<T>>> {
        self.mutate(|entries| {
            let mut updated = Vec::with_capacity(keys.len());
            for key in keys {
                let Some(current) = entries.get(*key) else {
                    return Ok((None, false));
                };
                let mut value = current.clone();
                f(&mut value)?;
                updated.push(value);
            }
            for (key, value) in keys.iter().zip(&updated) {
                entries.insert(key.to_string(), value.clone());
            }
            Ok((Some(updated), true))
        })
    }

    pub fn remove(&self, key: &str) -> Result<Option<T>> {
        self.mutate(|entries| {
            let removed = entries.remove(key);
            let changed = removed.is_some();
            Ok((removed, changed))
        })
    }

    /// Keep only entries for which `keep` returns true. Returns the number removed.
    pub fn retain(&self, keep: impl Fn(&str, &T) -> bool) -> Result<usize> {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|k, v| keep(k, v));
            let removed = before - entries.len();
            Ok((removed, removed > 0))
        })
    }
}
