use std::cell::RefCell;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;

use crate::buffer::{AnchorBuffer, AnchorId, Bias, BufferError, TextBuffer};

pub type DocumentRef = Rc<RefCell<Document>>;
pub type ViewRef = Rc<RefCell<View>>;

/// An open document: a named text buffer, optionally backed by a file
#[derive(Debug)]
pub struct Document {
    name: String,
    path: Option<PathBuf>,
    buffer: TextBuffer,
    dirty: bool,
}

impl Document {
    /// Create an in-memory document with no backing file
    pub fn new(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            path: None,
            buffer: TextBuffer::from(text),
            dirty: false,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let buffer = TextBuffer::from_bytes(&bytes)
            .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

        let name = path
            .file_name()
            .unwrap_or(path.as_os_str())
            .to_string_lossy()
            .to_string();

        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            buffer,
            dirty: false,
        })
    }

    /// Write the buffer back to its file
    pub fn save(&mut self) -> anyhow::Result<()> {
        let path = self
            .path
            .as_ref()
            .with_context(|| format!("Document '{}' has no file to save to", self.name))?;
        std::fs::write(path, self.buffer.text())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.dirty = false;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Mutable buffer access; marks the document as modified
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        self.dirty = true;
        &mut self.buffer
    }

    /// Anchor-only access to the buffer; leaves the document unmodified
    pub fn anchors_mut(&mut self) -> Anchors<'_> {
        Anchors(&mut self.buffer)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }
}

/// Borrow of a document's buffer that can mint and release anchors but
/// cannot touch the text
pub struct Anchors<'a>(&'a mut TextBuffer);

impl Anchors<'_> {
    pub fn release(&mut self, id: AnchorId) -> Result<(), BufferError> {
        self.0.release(id)
    }
}

impl AnchorBuffer for Anchors<'_> {
    fn len_chars(&self) -> usize {
        self.0.len_chars()
    }

    fn create_anchor(&mut self, offset: usize, bias: Bias) -> Result<AnchorId, BufferError> {
        self.0.create_anchor(offset, bias)
    }

    fn create_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(AnchorId, AnchorId), BufferError> {
        self.0.create_range(start, end)
    }

    fn resolve(&self, id: AnchorId) -> Result<usize, BufferError> {
        self.0.resolve(id)
    }
}

/// A view onto a document with its own selection
#[derive(Debug)]
pub struct View {
    document: DocumentRef,
    selection: Range<usize>,
}

impl View {
    pub fn new(document: DocumentRef) -> Self {
        Self {
            document,
            selection: 0..0,
        }
    }

    pub fn document(&self) -> DocumentRef {
        Rc::clone(&self.document)
    }

    /// Current selection, clamped to the document as it is now
    pub fn selection(&self) -> Range<usize> {
        let len = self.document.borrow().len_chars();
        let end = self.selection.end.min(len);
        let start = self.selection.start.min(end);
        start..end
    }

    /// Select a range; the ends may be given in either order
    pub fn set_selection(&mut self, a: usize, b: usize) {
        let len = self.document.borrow().len_chars();
        let (start, end) = (a.min(b).min(len), a.max(b).min(len));
        self.selection = start..end;
    }

    pub fn selected_text(&self) -> String {
        let selection = self.selection();
        self.document
            .borrow()
            .buffer()
            .slice(selection)
            .map(|text| text.into_owned())
            .unwrap_or_default()
    }
}
