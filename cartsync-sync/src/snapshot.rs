//! Snapshot reader: the current active items of one side.

use cartsync_core::{normalize_items, ItemSet, ListRef};
use cartsync_remote::{ListService, RemoteError};

/// Fetch the active items of `list` as a normalized set.
///
/// Completed entries are excluded by the service; duplicates and blank
/// names are collapsed here. Any service error is returned unchanged and
/// the caller aborts the pass: there is no retry within a pass.
pub fn fetch_active(
    service: &mut dyn ListService,
    list: &ListRef,
) -> Result<ItemSet, RemoteError> {
    let raw = service.active_items(list)?;
    let raw_len = raw.len();
    let set = normalize_items(raw);
    if set.len() != raw_len {
        tracing::debug!(
            "{} '{}': collapsed {} raw entries into {} items",
            service.service_name(),
            list.name,
            raw_len,
            set.len()
        );
    }
    Ok(set)
}
