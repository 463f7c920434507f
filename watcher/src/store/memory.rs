use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use error_stack::{report, Result};

use super::{Store, StoreError};

/// A [Store] that keeps everything in memory.
///
/// Follows Redis semantics for counters and lists, so it can stand in for [super::RedisStore]
/// in tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug, Clone)]
enum Entry {
    Scalar(String),
    List(VecDeque<String>),
}

impl InMemoryStore {
    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| report!(StoreError::Connection).attach_printable("store lock poisoned"))
    }

    /// Returns a copy of the list at `key`, head first. Empty if the key is missing.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.entries().ok().and_then(|e| e.get(key).cloned()) {
            Some(Entry::List(list)) => list.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the scalar at `key`.
    pub fn scalar(&self, key: &str) -> Option<String> {
        match self.entries().ok().and_then(|e| e.get(key).cloned()) {
            Some(Entry::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self
            .entries()
            .map(|e| e.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn push(&self, key: &str, value: &str, head: bool) -> Result<i64, StoreError> {
        let mut entries = self.entries()?;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));

        let Entry::List(list) = entry else {
            return Err(wrong_type(key));
        };

        if head {
            list.push_front(value.to_string());
        } else {
            list.push_back(value.to_string());
        }

        Ok(list.len() as i64)
    }
}

fn wrong_type(key: &str) -> error_stack::Report<StoreError> {
    report!(StoreError::WrongType).attach_printable(format!("key: {key}"))
}

/// Resolves a Redis style inclusive range against a list of length `len`.
fn resolve_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { start + len } else { start }.max(0);
    let stop = if stop < 0 { stop + len } else { stop }.min(len - 1);

    if start > stop || start >= len {
        return None;
    }

    Some((start as usize, stop as usize))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entries()?.get(key) {
            None => Ok(None),
            Some(Entry::Scalar(value)) => Ok(Some(value.clone())),
            Some(Entry::List(_)) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries()?
            .insert(key.to_string(), Entry::Scalar(value.to_string()));
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut entries = self.entries()?;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Scalar("0".to_string()));

        let Entry::Scalar(value) = entry else {
            return Err(wrong_type(key));
        };

        let current = value.parse::<i64>().map_err(|_| {
            report!(StoreError::InvalidValue)
                .attach_printable("value is not an integer")
                .attach_printable(format!("key: {key}"))
        })?;

        let next = current.checked_add(1).ok_or_else(|| {
            report!(StoreError::InvalidValue)
                .attach_printable("increment would overflow")
                .attach_printable(format!("key: {key}"))
        })?;

        *value = next.to_string();
        Ok(next)
    }

    async fn list_push_head(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.push(key, value, true)
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.push(key, value, false)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        let mut entries = self.entries()?;

        let list = match entries.get_mut(key) {
            None => return Ok(()),
            Some(Entry::Scalar(_)) => return Err(wrong_type(key)),
            Some(Entry::List(list)) => list,
        };

        match resolve_range(start, stop, list.len()) {
            Some((start, stop)) => {
                list.truncate(stop + 1);
                list.drain(..start);
            }
            None => {
                // Redis deletes the key once the list is empty.
                entries.remove(key);
            }
        }

        Ok(())
    }
}
