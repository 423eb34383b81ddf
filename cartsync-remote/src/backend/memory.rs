//! In-process list service.
//!
//! Cloning a [`MemoryService`] shares the underlying state, so a test can
//! hand one clone to the sync engine and inspect or mutate the lists through
//! another. Failure injection covers the whole error taxonomy: an
//! unreachable service, per-item rejections, and slow calls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cartsync_core::ListRef;

use crate::error::RemoteError;
use crate::service::ListService;

#[derive(Debug, Default)]
struct MemoryList {
    name: String,
    active: Vec<String>,
    completed: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    lists: BTreeMap<String, MemoryList>,
    unavailable: bool,
    rejected: BTreeSet<String>,
    delay: Option<Duration>,
    log: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MemoryService {
    name: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::default(),
        }
    }

    /// Add a list whose id and name are both `name`, holding `items`.
    pub fn with_list<I, S>(self, name: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_items(name, items);
        self
    }

    /// Replace the active items of `list`, creating it if needed.
    pub fn set_items<I, S>(&self, list: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.lock();
        let entry = state.lists.entry(list.to_string()).or_default();
        entry.name = list.to_string();
        entry.active = items.into_iter().map(Into::into).collect();
    }

    /// Mark `item` completed on `list`, as a user ticking it off would.
    pub fn complete(&self, list: &str, item: &str) {
        let mut state = self.lock();
        if let Some(entry) = state.lists.get_mut(list) {
            entry.active.retain(|name| name != item);
            entry.completed.push(item.to_string());
        }
    }

    /// Active items of `list`, in insertion order.
    pub fn items(&self, list: &str) -> Vec<String> {
        self.lock()
            .lists
            .get(list)
            .map(|entry| entry.active.clone())
            .unwrap_or_default()
    }

    pub fn completed(&self, list: &str) -> Vec<String> {
        self.lock()
            .lists
            .get(list)
            .map(|entry| entry.completed.clone())
            .unwrap_or_default()
    }

    /// Make every call fail with `Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make adds and removes of `item` fail with `Rejected`.
    pub fn reject_item(&self, item: &str) {
        self.lock().rejected.insert(item.to_string());
    }

    pub fn clear_rejections(&self) {
        self.lock().rejected.clear();
    }

    /// Sleep this long inside every call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Mutations performed so far, as `"add:<item>"` / `"remove:<item>"`.
    pub fn mutations(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn clear_mutations(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply the configured delay, then check reachability.
    fn enter(&self) -> Result<MutexGuard<'_, MemoryState>, RemoteError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let state = self.lock();
        if state.unavailable {
            return Err(RemoteError::unavailable(&self.name, "service offline"));
        }
        Ok(state)
    }

    fn missing_list(&self, list: &ListRef) -> RemoteError {
        RemoteError::unavailable(&self.name, format!("no list with id '{}'", list.id))
    }
}

impl ListService for MemoryService {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn authenticate(&mut self) -> Result<(), RemoteError> {
        self.enter().map(|_| ())
    }

    fn available_lists(&mut self) -> Result<Vec<ListRef>, RemoteError> {
        let state = self.enter()?;
        Ok(state
            .lists
            .iter()
            .map(|(id, entry)| ListRef::new(id.clone(), entry.name.clone()))
            .collect())
    }

    fn active_items(&mut self, list: &ListRef) -> Result<Vec<String>, RemoteError> {
        let state = self.enter()?;
        state
            .lists
            .get(&list.id)
            .map(|entry| entry.active.clone())
            .ok_or_else(|| self.missing_list(list))
    }

    fn add_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        let mut state = self.enter()?;
        if state.rejected.contains(name) {
            return Err(RemoteError::rejected(&self.name, name, "rejected by test"));
        }
        let Some(entry) = state.lists.get_mut(&list.id) else {
            return Err(self.missing_list(list));
        };
        entry.active.push(name.to_string());
        state.log.push(format!("add:{name}"));
        Ok(())
    }

    fn remove_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        let mut state = self.enter()?;
        if state.rejected.contains(name) {
            return Err(RemoteError::rejected(&self.name, name, "rejected by test"));
        }
        let Some(entry) = state.lists.get_mut(&list.id) else {
            return Err(self.missing_list(list));
        };
        entry.active.retain(|item| item != name);
        state.log.push(format!("remove:{name}"));
        Ok(())
    }

    fn purge_completed(&mut self, list: &ListRef) -> Result<usize, RemoteError> {
        let mut state = self.enter()?;
        let Some(entry) = state.lists.get_mut(&list.id) else {
            return Err(self.missing_list(list));
        };
        let purged = entry.completed.len();
        entry.completed.clear();
        Ok(purged)
    }
}
