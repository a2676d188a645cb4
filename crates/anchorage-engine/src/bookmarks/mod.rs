//! Named, nestable ranges into a live document.
//!
//! Ranges are held as pairs of anchors rather than plain offsets, so
//! navigating to a bookmark lands on the same text however much the
//! document has been edited since the bookmark was made.

pub mod persist;

use std::fmt;

use uuid::Uuid;

use crate::buffer::{AnchorBuffer, AnchorId, BufferError};

pub use persist::{BookmarkFile, PersistError, SavedBookmark};

/// Unique identifier for a bookmark
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BookmarkId(pub Uuid);

impl BookmarkId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookmarkError {
    #[error("Invalid selection {start}..{end}: start is after end")]
    InvalidRange { start: usize, end: usize },
    #[error("Bookmark not found: {0}")]
    NotFound(BookmarkId),
    #[error("Cannot move bookmark {id} under {parent}: it would contain itself")]
    CycleDetected { id: BookmarkId, parent: BookmarkId },
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub name: String,
    pub start: AnchorId,
    pub end: AnchorId,
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    fn contains(&self, id: BookmarkId) -> bool {
        self.id == id || self.children.iter().any(|child| child.contains(id))
    }

    fn collect_anchors(&self, anchors: &mut Vec<AnchorId>) {
        anchors.push(self.start);
        anchors.push(self.end);
        for child in &self.children {
            child.collect_anchors(anchors);
        }
    }
}

/// Ordered forest of bookmarks over a single document
///
/// The store never owns the buffer; every operation that needs offsets
/// borrows it. Insertion order is display order.
#[derive(Debug, Default, Clone)]
pub struct BookmarkStore {
    roots: Vec<Bookmark>,
    selected: Option<BookmarkId>,
    renaming: Option<BookmarkId>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark a selection, appending it at top level or under `parent`.
    ///
    /// The new entry becomes the selected one and is flagged for renaming,
    /// so a front-end can immediately ask for a display name.
    pub fn add<B: AnchorBuffer>(
        &mut self,
        buffer: &mut B,
        start: usize,
        end: usize,
        name: impl Into<String>,
        parent: Option<BookmarkId>,
    ) -> Result<BookmarkId, BookmarkError> {
        if start > end {
            return Err(BookmarkError::InvalidRange { start, end });
        }
        if let Some(parent) = parent
            && self.get(parent).is_none()
        {
            return Err(BookmarkError::NotFound(parent));
        }
        let len = buffer.len_chars();
        if end > len {
            return Err(BufferError::OutOfBounds { offset: end, len }.into());
        }

        let (start_anchor, end_anchor) = buffer.create_range(start, end)?;

        let bookmark = Bookmark {
            id: BookmarkId::new(),
            name: name.into(),
            start: start_anchor,
            end: end_anchor,
            children: Vec::new(),
        };
        let id = bookmark.id;
        self.insert(bookmark, parent);

        self.selected = Some(id);
        self.renaming = Some(id);
        log::debug!("added bookmark {id} at {start}..{end}");
        Ok(id)
    }

    /// Resolve a bookmark's anchors to current character offsets
    pub fn navigate<B: AnchorBuffer>(
        &mut self,
        buffer: &B,
        id: BookmarkId,
    ) -> Result<(usize, usize), BookmarkError> {
        let range = self.range(buffer, id)?;
        self.selected = Some(id);
        Ok(range)
    }

    /// Like [`BookmarkStore::navigate`] without touching the selection
    pub fn range<B: AnchorBuffer>(
        &self,
        buffer: &B,
        id: BookmarkId,
    ) -> Result<(usize, usize), BookmarkError> {
        let bookmark = self.get(id).ok_or(BookmarkError::NotFound(id))?;
        let start = buffer.resolve(bookmark.start)?;
        let end = buffer.resolve(bookmark.end)?;
        Ok((start, end))
    }

    pub fn rename(&mut self, id: BookmarkId, name: impl Into<String>) -> Result<(), BookmarkError> {
        let bookmark = self.get_mut(id).ok_or(BookmarkError::NotFound(id))?;
        bookmark.name = name.into();
        if self.renaming == Some(id) {
            self.renaming = None;
        }
        Ok(())
    }

    /// Remove a bookmark and its subtree, handing the removed nodes back.
    ///
    /// The anchors stay in the buffer; whoever owns the buffer decides
    /// whether to release them (see [`BookmarkStore::anchors`]).
    pub fn delete(&mut self, id: BookmarkId) -> Result<Bookmark, BookmarkError> {
        let removed = Self::detach(&mut self.roots, id).ok_or(BookmarkError::NotFound(id))?;
        if self.selected.is_some_and(|selected| removed.contains(selected)) {
            self.selected = None;
        }
        if self.renaming.is_some_and(|renaming| removed.contains(renaming)) {
            self.renaming = None;
        }
        log::debug!("deleted bookmark {id}");
        Ok(removed)
    }

    /// Move a bookmark under a new parent, or to top level with `None`.
    ///
    /// The moved bookmark is appended after the new parent's existing
    /// children.
    pub fn reparent(
        &mut self,
        id: BookmarkId,
        parent: Option<BookmarkId>,
    ) -> Result<(), BookmarkError> {
        let node = self.get(id).ok_or(BookmarkError::NotFound(id))?;
        if let Some(parent) = parent {
            if node.contains(parent) {
                return Err(BookmarkError::CycleDetected { id, parent });
            }
            if self.get(parent).is_none() {
                return Err(BookmarkError::NotFound(parent));
            }
        }

        let node = Self::detach(&mut self.roots, id).ok_or(BookmarkError::NotFound(id))?;
        self.insert(node, parent);
        Ok(())
    }

    pub fn get(&self, id: BookmarkId) -> Option<&Bookmark> {
        self.iter()
            .map(|(_, bookmark)| bookmark)
            .find(|bookmark| bookmark.id == id)
    }

    /// First bookmark in display order with the given name
    pub fn find_by_name(&self, name: &str) -> Option<&Bookmark> {
        self.iter()
            .map(|(_, bookmark)| bookmark)
            .find(|bookmark| bookmark.name == name)
    }

    /// Every anchor held by a bookmark and its descendants
    pub fn anchors(&self, id: BookmarkId) -> Result<Vec<AnchorId>, BookmarkError> {
        let bookmark = self.get(id).ok_or(BookmarkError::NotFound(id))?;
        let mut anchors = Vec::new();
        bookmark.collect_anchors(&mut anchors);
        Ok(anchors)
    }

    pub fn select(&mut self, id: Option<BookmarkId>) -> Result<(), BookmarkError> {
        if let Some(id) = id
            && self.get(id).is_none()
        {
            return Err(BookmarkError::NotFound(id));
        }
        self.selected = id;
        Ok(())
    }

    pub fn selected(&self) -> Option<BookmarkId> {
        self.selected
    }

    /// Bookmark awaiting a display name, set by [`BookmarkStore::add`]
    pub fn renaming(&self) -> Option<BookmarkId> {
        self.renaming
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[Bookmark] {
        &self.roots
    }

    /// Preorder traversal yielding each bookmark with its depth
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: self.roots.iter().rev().map(|root| (0, root)).collect(),
        }
    }

    fn insert(&mut self, bookmark: Bookmark, parent: Option<BookmarkId>) {
        match parent.and_then(|parent| self.get_mut(parent)) {
            Some(parent) => parent.children.push(bookmark),
            None => self.roots.push(bookmark),
        }
    }

    fn get_mut(&mut self, id: BookmarkId) -> Option<&mut Bookmark> {
        fn find(nodes: &mut [Bookmark], id: BookmarkId) -> Option<&mut Bookmark> {
            for node in nodes {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = find(&mut node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        find(&mut self.roots, id)
    }

    fn detach(nodes: &mut Vec<Bookmark>, id: BookmarkId) -> Option<Bookmark> {
        if let Some(index) = nodes.iter().position(|node| node.id == id) {
            return Some(nodes.remove(index));
        }
        nodes
            .iter_mut()
            .find_map(|node| Self::detach(&mut node.children, id))
    }
}

impl<'a> IntoIterator for &'a BookmarkStore {
    type Item = (usize, &'a Bookmark);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy preorder iterator over a [`BookmarkStore`]
pub struct Iter<'a> {
    stack: Vec<(usize, &'a Bookmark)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (usize, &'a Bookmark);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, bookmark) = self.stack.pop()?;
        self.stack.extend(
            bookmark
                .children
                .iter()
                .rev()
                .map(|child| (depth + 1, child)),
        );
        Some((depth, bookmark))
    }
}
