//! Private JSON file helpers.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value as RawValue;

use scrapehub_module::StoreError;

fn io_error(path: &Path, e: &io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    }
}

/// Parsed content of `path`; `None` when the file is absent or blank.
pub fn read_json(path: &Path) -> Result<Option<RawValue>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, &e)),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
}

/// Replace `path` with pretty-printed `value`, readable by the owner only.
pub fn write_json(path: &Path, value: &RawValue) -> Result<(), StoreError> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).map_err(|e| io_error(&tmp, &e))?;
    set_private(&tmp)?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, &e))
}

#[cfg(unix)]
fn set_private(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_error(path, &e))
}

#[cfg(not(unix))]
fn set_private(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Fail when `path` exists and is readable by group or other users.
#[cfg(unix)]
pub fn check_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match fs::metadata(path) {
        Ok(m) => m.permissions().mode() & 0o777,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error(path, &e)),
    };
    if mode & 0o044 != 0 {
        return Err(StoreError::WrongPermissions {
            path: path.display().to_string(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
