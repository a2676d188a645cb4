pub mod bookmarks;
pub mod buffer;
pub mod host;

// Re-export key types for easier usage
pub use bookmarks::{
    Bookmark, BookmarkError, BookmarkFile, BookmarkId, BookmarkStore, PersistError, SavedBookmark,
};
pub use buffer::{AnchorBuffer, AnchorId, Bias, BufferError, Patch, TextBuffer};
pub use host::{
    ActiveViewChanged, Anchors, Document, DocumentRef, HostContext, HostError, HostInfo, Structure, View,
    ViewRef, Workspace,
};
