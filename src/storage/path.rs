use std::path::PathBuf;

use super::StorageError;

/// Expands a leading `~/` or `$HOME` in configured data paths.
pub(crate) fn expand_home_path(raw_path: &str) -> Result<PathBuf, StorageError> {
    let suffix = if let Some(rest) = raw_path.strip_prefix("~/") {
        rest
    } else if raw_path == "$HOME" {
        ""
    } else if let Some(rest) = raw_path.strip_prefix("$HOME/") {
        rest
    } else {
        return Ok(PathBuf::from(raw_path));
    };

    let home = std::env::var("HOME").map_err(|_| StorageError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(suffix))
}
