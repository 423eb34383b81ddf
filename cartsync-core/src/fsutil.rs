//! Atomic file replacement shared by every on-disk store.
//!
//! Write flow: create parent dirs → write `<name>.tmp` sibling → optional
//! `chmod 0600` → `rename` over the target. The `.tmp` file is always in the
//! same directory as the target so the rename never crosses filesystems.
//! A failed rename removes the `.tmp` file and leaves the original intact.

use std::io;
use std::path::{Path, PathBuf};

/// `<path>.tmp`, next to `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically replace `path` with `contents`.
///
/// When `private` is set the file is created with mode `0600` on unix.
pub fn write_atomic(path: &Path, contents: &[u8], private: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents)?;
    if private {
        set_private(&tmp)?;
    }
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

#[cfg(unix)]
fn set_private(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_private(_path: &Path) -> io::Result<()> {
    Ok(())
}
