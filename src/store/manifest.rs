//! Sibling-order manifests
//!
//! `subnodes.lst` holds the comma-joined ids of a directory's children in
//! persisted order. The older `subnodes.xml` wrapper is still readable.

use crate::error::StorageError;
use crate::store::write_atomic;
use crate::types::{NodeId, SUBNODES_LST, SUBNODES_XML};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

pub fn format_id_list(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_id_list(text: &str, path: &Path) -> Result<Vec<NodeId>, StorageError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<NodeId>().map_err(|_| {
                StorageError::malformed(path, format!("invalid node id '{}' in id list", entry))
            })
        })
        .collect()
}

/// Write the manifest of `dir`.
///
/// An empty list deletes a stale manifest unless `keep_empty` is set (the
/// storage root always carries one). Returns whether a file was written.
pub fn write_manifest(dir: &Path, ids: &[NodeId], keep_empty: bool) -> Result<bool, StorageError> {
    let path = dir.join(SUBNODES_LST);
    if ids.is_empty() && !keep_empty {
        remove_file_if_present(&path)?;
        return Ok(false);
    }
    write_atomic(&path, format_id_list(ids).as_bytes())?;
    Ok(true)
}

/// Read the manifest of `dir`; `None` when the directory has none
pub fn read_manifest(dir: &Path) -> Result<Option<Vec<NodeId>>, StorageError> {
    let path = dir.join(SUBNODES_LST);
    match std::fs::read_to_string(&path) {
        Ok(text) => return parse_id_list(&text, &path).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(StorageError::Read { path, source }),
    }
    let legacy = read_legacy_lists(dir)?;
    Ok(legacy.map(|lists| lists.subnodes))
}

/// Id lists stored in a `subnodes.xml` wrapper
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyLists {
    pub subnodes: Vec<NodeId>,
    pub bookmarks: Vec<NodeId>,
}

/// Read `subnodes.xml` from `dir`, if present.
///
/// The id list is taken from the first attribute of the `subnodes` and
/// `bookmarks` elements.
pub fn read_legacy_lists(dir: &Path) -> Result<Option<LegacyLists>, StorageError> {
    let path = dir.join(SUBNODES_XML);
    let xml = match std::fs::read_to_string(&path) {
        Ok(xml) => xml,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StorageError::Read { path, source }),
    };
    let mut reader = Reader::from_str(&xml);
    let mut lists = LegacyLists::default();
    loop {
        match reader.read_event().map_err(|e| StorageError::xml(&path, e))? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let slot = match name.as_ref() {
                    b"subnodes" => &mut lists.subnodes,
                    b"bookmarks" => &mut lists.bookmarks,
                    _ => continue,
                };
                if let Some(attr) = e.attributes().next() {
                    let attr = attr.map_err(|err| StorageError::xml(&path, err))?;
                    let value = attr
                        .unescape_value()
                        .map_err(|err| StorageError::xml(&path, err))?;
                    *slot = parse_id_list(&value, &path)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(Some(lists))
}

pub(crate) fn remove_file_if_present(path: &Path) -> Result<bool, StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StorageError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}
