//! Host façade: the set of open views, which one is active, and the
//! context handed to anything that has to follow the active document.
//!
//! The core never subscribes to host events. [`Workspace::activate`] returns
//! an [`ActiveViewChanged`] value and the surrounding application decides
//! what to rebind in response.

pub mod document;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub use document::{Anchors, Document, DocumentRef, View, ViewRef};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("The bound document is no longer open")]
    Detached,
    #[error("Line {line} does not exist (document has {count} lines)")]
    NoSuchLine { line: usize, count: usize },
    #[error(transparent)]
    Buffer(#[from] crate::buffer::BufferError),
}

/// Notification that the active view switched; carries no payload, the
/// receiver re-reads [`Workspace::active_view`] or [`Workspace::context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveViewChanged;

/// Summary of the host itself at the moment a context was taken
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub documents: Vec<String>,
    pub active: Option<String>,
}

/// Line structure of a document, looked up through a weak reference
#[derive(Debug, Clone)]
pub struct Structure {
    document: Weak<RefCell<Document>>,
}

impl Structure {
    pub fn new(document: &DocumentRef) -> Self {
        Self {
            document: Rc::downgrade(document),
        }
    }

    pub fn document(&self) -> Result<DocumentRef, HostError> {
        self.document.upgrade().ok_or(HostError::Detached)
    }

    pub fn line_count(&self) -> Result<usize, HostError> {
        Ok(self.document()?.borrow().buffer().line_count())
    }

    pub fn line(&self, line: usize) -> Result<String, HostError> {
        let document = self.document()?;
        let document = document.borrow();
        let buffer = document.buffer();
        buffer.line(line).ok_or(HostError::NoSuchLine {
            line,
            count: buffer.line_count(),
        })
    }

    pub fn line_of(&self, offset: usize) -> Result<usize, HostError> {
        Ok(self.document()?.borrow().buffer().line_of(offset)?)
    }
}

impl PartialEq for Structure {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.document, &other.document)
    }
}

/// Everything a console needs to see of the active document.
///
/// References are weak: holding a context never keeps a closed document
/// alive. Any part may be absent when no view is active.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    pub host: HostInfo,
    pub document: Option<Weak<RefCell<Document>>>,
    pub view: Option<Weak<RefCell<View>>>,
    pub structure: Option<Structure>,
}

impl HostContext {
    pub fn document(&self) -> Option<DocumentRef> {
        self.document.as_ref().and_then(Weak::upgrade)
    }

    pub fn view(&self) -> Option<ViewRef> {
        self.view.as_ref().and_then(Weak::upgrade)
    }
}

fn same_target<T>(a: &Option<Weak<T>>, b: &Option<Weak<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Weak::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for HostContext {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && same_target(&self.document, &other.document)
            && same_target(&self.view, &other.view)
            && self.structure == other.structure
    }
}

/// The set of open views and which of them is active
#[derive(Debug, Default)]
pub struct Workspace {
    views: Vec<ViewRef>,
    active: Option<usize>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document in a new view and return the view's index.
    ///
    /// The new view is not activated.
    pub fn open(&mut self, document: Document) -> usize {
        let document = Rc::new(RefCell::new(document));
        self.views.push(Rc::new(RefCell::new(View::new(document))));
        self.views.len() - 1
    }

    /// Make a view active; `None` when nothing changed
    pub fn activate(&mut self, index: usize) -> Option<ActiveViewChanged> {
        if index >= self.views.len() {
            log::warn!("ignoring activation of missing view {index}");
            return None;
        }
        if self.active == Some(index) {
            return None;
        }
        self.active = Some(index);
        log::debug!("active view is now {index}");
        Some(ActiveViewChanged)
    }

    /// Close a view. Closing the active view activates its neighbour.
    pub fn close(&mut self, index: usize) -> Option<ActiveViewChanged> {
        if index >= self.views.len() {
            return None;
        }
        self.views.remove(index);

        let previous = self.active;
        self.active = match self.active {
            Some(active) if active == index => {
                if self.views.is_empty() {
                    None
                } else {
                    Some(index.min(self.views.len() - 1))
                }
            }
            Some(active) if active > index => Some(active - 1),
            other => other,
        };

        // Closing the active view always switches documents
        if previous == Some(index) {
            Some(ActiveViewChanged)
        } else {
            None
        }
    }

    pub fn views(&self) -> &[ViewRef] {
        &self.views
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_view(&self) -> Option<ViewRef> {
        self.active.and_then(|index| self.views.get(index)).cloned()
    }

    pub fn info(&self) -> HostInfo {
        let documents = self
            .views
            .iter()
            .map(|view| view.borrow().document().borrow().name().to_string())
            .collect::<Vec<_>>();
        let active = self.active.and_then(|index| documents.get(index).cloned());
        HostInfo { documents, active }
    }

    /// Context describing the active view right now
    pub fn context(&self) -> HostContext {
        let view = self.active_view();
        let document = view.as_ref().map(|view| view.borrow().document());

        HostContext {
            host: self.info(),
            document: document.as_ref().map(Rc::downgrade),
            view: view.as_ref().map(Rc::downgrade),
            structure: document.as_ref().map(Structure::new),
        }
    }
}
