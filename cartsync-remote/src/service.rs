//! The capability every list backend provides.

use cartsync_core::ListRef;

use crate::error::RemoteError;

/// A remote (or local) store of shopping-list items.
///
/// All calls are blocking and may be slow; implementations apply their own
/// per-request timeout and report it as [`RemoteError::Unavailable`].
/// Item identity is the exact item name.
pub trait ListService: Send {
    /// Short label used in logs and errors (`"checklist"`, `"bring"`, …).
    fn service_name(&self) -> &str;

    /// Establish (or resume) a session. Called once before any other call.
    fn authenticate(&mut self) -> Result<(), RemoteError>;

    /// Every list the account can see, in service order.
    fn available_lists(&mut self) -> Result<Vec<ListRef>, RemoteError>;

    /// Names of the items on `list` that are not completed. May contain
    /// duplicates and blank names; callers normalize.
    fn active_items(&mut self, list: &ListRef) -> Result<Vec<String>, RemoteError>;

    fn add_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError>;

    /// Remove every active entry called `name`. Removing an absent item
    /// succeeds.
    fn remove_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError>;

    /// Delete completed entries from `list`, returning how many went.
    fn purge_completed(&mut self, _list: &ListRef) -> Result<usize, RemoteError> {
        Ok(0)
    }
}

impl<T: ListService + ?Sized> ListService for Box<T> {
    fn service_name(&self) -> &str {
        (**self).service_name()
    }

    fn authenticate(&mut self) -> Result<(), RemoteError> {
        (**self).authenticate()
    }

    fn available_lists(&mut self) -> Result<Vec<ListRef>, RemoteError> {
        (**self).available_lists()
    }

    fn active_items(&mut self, list: &ListRef) -> Result<Vec<String>, RemoteError> {
        (**self).active_items(list)
    }

    fn add_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        (**self).add_item(list, name)
    }

    fn remove_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        (**self).remove_item(list, name)
    }

    fn purge_completed(&mut self, list: &ListRef) -> Result<usize, RemoteError> {
        (**self).purge_completed(list)
    }
}
