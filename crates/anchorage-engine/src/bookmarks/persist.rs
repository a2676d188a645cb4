use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bookmarks::{Bookmark, BookmarkError, BookmarkId, BookmarkStore};
use crate::buffer::AnchorBuffer;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Failed to read bookmarks file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse bookmarks file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write bookmarks file at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize bookmarks: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A bookmark flattened to plain character offsets for storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedBookmark {
    pub name: String,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SavedBookmark>,
}

/// On-disk bookmark collection, keyed by document
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkFile {
    #[serde(default)]
    pub documents: BTreeMap<String, Vec<SavedBookmark>>,
}

impl BookmarkFile {
    /// Load a bookmarks file; a missing file is an empty collection
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| PersistError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| PersistError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| PersistError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, content).map_err(|source| PersistError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl BookmarkStore {
    /// Snapshot every bookmark's current offsets
    pub fn to_saved<B: AnchorBuffer>(&self, buffer: &B) -> Result<Vec<SavedBookmark>, BookmarkError> {
        fn save<B: AnchorBuffer>(
            store: &BookmarkStore,
            buffer: &B,
            bookmark: &Bookmark,
        ) -> Result<SavedBookmark, BookmarkError> {
            let (start, end) = store.range(buffer, bookmark.id)?;
            let children = bookmark
                .children
                .iter()
                .map(|child| save(store, buffer, child))
                .collect::<Result<_, _>>()?;
            Ok(SavedBookmark {
                name: bookmark.name.clone(),
                start,
                end,
                children,
            })
        }

        self.roots
            .iter()
            .map(|root| save(self, buffer, root))
            .collect()
    }

    /// Rebuild a store from saved offsets, minting fresh anchors.
    ///
    /// Offsets beyond the end of the buffer (the file changed since the
    /// bookmarks were saved) are clamped rather than rejected.
    pub fn from_saved<B: AnchorBuffer>(
        buffer: &mut B,
        saved: &[SavedBookmark],
    ) -> Result<Self, BookmarkError> {
        fn restore<B: AnchorBuffer>(
            store: &mut BookmarkStore,
            buffer: &mut B,
            saved: &SavedBookmark,
            parent: Option<BookmarkId>,
        ) -> Result<(), BookmarkError> {
            let len = buffer.len_chars();
            let end = saved.end.min(len);
            let start = saved.start.min(end);
            if (start, end) != (saved.start, saved.end) {
                log::warn!(
                    "bookmark '{}' clamped from {}..{} to {}..{}",
                    saved.name,
                    saved.start,
                    saved.end,
                    start,
                    end
                );
            }

            let id = store.add(buffer, start, end, saved.name.clone(), parent)?;
            for child in &saved.children {
                restore(store, buffer, child, Some(id))?;
            }
            Ok(())
        }

        let mut store = Self::new();
        for bookmark in saved {
            restore(&mut store, buffer, bookmark, None)?;
        }
        store.selected = None;
        store.renaming = None;
        Ok(store)
    }
}
