//! Bookmark list persistence (`bookmarks.lst` at the storage root)

use crate::error::StorageError;
use crate::store::manifest::{format_id_list, parse_id_list, read_legacy_lists, remove_file_if_present};
use crate::store::write_atomic;
use crate::types::{NodeId, BOOKMARKS_LST};
use std::path::Path;

/// What happened to the bookmark artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkWrite {
    Written,
    /// The list was empty and a previous artifact was deleted
    Cleared,
    /// The list was empty and nothing was on disk
    Absent,
}

/// Overwrite the bookmark list; an empty list leaves no artifact behind
pub fn write_bookmarks(root: &Path, bookmarks: &[NodeId]) -> Result<BookmarkWrite, StorageError> {
    let path = root.join(BOOKMARKS_LST);
    if bookmarks.is_empty() {
        let removed = remove_file_if_present(&path)?;
        return Ok(if removed {
            BookmarkWrite::Cleared
        } else {
            BookmarkWrite::Absent
        });
    }
    write_atomic(&path, format_id_list(bookmarks).as_bytes())?;
    Ok(BookmarkWrite::Written)
}

/// Read the bookmark list, falling back to the legacy XML wrapper
pub fn read_bookmarks(root: &Path) -> Result<Vec<NodeId>, StorageError> {
    let path = root.join(BOOKMARKS_LST);
    match std::fs::read_to_string(&path) {
        Ok(text) => parse_id_list(&text, &path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(read_legacy_lists(root)?
            .map(|lists| lists.bookmarks)
            .unwrap_or_default()),
        Err(source) => Err(StorageError::Read { path, source }),
    }
}
