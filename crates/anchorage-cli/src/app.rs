use std::path::PathBuf;

use anchorage_config::Config;
use anchorage_console::{RhaiInterpreter, ScriptingSession, SessionOptions, SubmitError};
use anchorage_engine::{
    BookmarkFile, BookmarkId, BookmarkStore, Document, DocumentRef, ViewRef, Workspace,
};
use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Console,
    Rename,
}

pub struct App {
    pub workspace: Workspace,
    /// Bookmarks of each open view, indexed like `workspace.views()`
    pub stores: Vec<BookmarkStore>,
    pub session: ScriptingSession<RhaiInterpreter>,
    pub mode: Mode,
    pub cursor: usize,
    /// Other end of the selection while one is being made
    pub mark: Option<usize>,
    pub input: String,
    pub status: String,
    bookmarks_path: PathBuf,
    quit: bool,
}

/// Key under which a document's bookmarks are saved
fn document_key(document: &Document) -> String {
    match document.path() {
        Some(path) => path.display().to_string(),
        None => document.name().to_string(),
    }
}

impl App {
    pub fn new(documents: Vec<Document>, config: &Config) -> Result<Self> {
        let saved = BookmarkFile::load_from_path(&config.bookmarks_path)?;

        let mut workspace = Workspace::new();
        let mut stores = Vec::new();
        for mut document in documents {
            let store = match saved.documents.get(&document_key(&document)) {
                Some(bookmarks) => {
                    let restored = BookmarkStore::from_saved(&mut document.anchors_mut(), bookmarks);
                    restored.with_context(|| {
                        format!("Failed to restore bookmarks for {}", document.name())
                    })?
                }
                None => BookmarkStore::new(),
            };
            stores.push(store);
            workspace.open(document);
        }

        let interpreter = RhaiInterpreter::with_max_operations(config.console.max_operations);
        let session = ScriptingSession::with_options(
            interpreter,
            SessionOptions {
                prompt: config.console.prompt.clone(),
                history_limit: config.console.history_limit,
            },
        );

        let mut app = Self {
            workspace,
            stores,
            session,
            mode: Mode::Normal,
            cursor: 0,
            mark: None,
            input: String::new(),
            status: String::new(),
            bookmarks_path: config.bookmarks_path.clone(),
            quit: false,
        };
        app.activate(0);
        Ok(app)
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn active_view(&self) -> Option<ViewRef> {
        self.workspace.active_view()
    }

    pub fn active_store(&self) -> Option<&BookmarkStore> {
        self.workspace
            .active_index()
            .and_then(|index| self.stores.get(index))
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Insert => self.handle_insert_key(key),
            Mode::Console => self.handle_console_key(key),
            Mode::Rename => self.handle_rename_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        self.status.clear();
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(1),
            KeyCode::Home => self.set_cursor(0),
            KeyCode::End => self.set_cursor(usize::MAX),
            KeyCode::Char('v') => {
                self.mark = match self.mark {
                    Some(_) => None,
                    None => Some(self.cursor),
                };
                self.sync_selection();
            }
            KeyCode::Down | KeyCode::Char('j') => self.step_bookmark(1)?,
            KeyCode::Up | KeyCode::Char('k') => self.step_bookmark(-1)?,
            KeyCode::Enter => self.navigate_selected()?,
            KeyCode::Char('b') => self.add_bookmark()?,
            KeyCode::Char('r') => self.begin_rename(),
            KeyCode::Char('d') => self.delete_selected()?,
            KeyCode::Char('>') => self.indent_selected()?,
            KeyCode::Char('<') => self.outdent_selected()?,
            KeyCode::Tab => self.next_document(),
            KeyCode::Char('i') => self.mode = Mode::Insert,
            KeyCode::Char(':') => {
                self.input.clear();
                self.mode = Mode::Console;
            }
            KeyCode::Char('w') => self.save()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_insert_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Enter => self.insert_text("\n")?,
            KeyCode::Backspace if self.cursor > 0 => {
                let document = self.active_document()?;
                document
                    .borrow_mut()
                    .buffer_mut()
                    .delete(self.cursor - 1..self.cursor)?;
                self.move_cursor(-1);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_text(c.encode_utf8(&mut [0; 4]))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_console_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => self.submit_console(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Up => {
                if let Some(line) = self.session.history_older() {
                    self.input = line;
                }
            }
            KeyCode::Down => self.input = self.session.history_newer().unwrap_or_default(),
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.session.clear_transcript();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_rename_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter => self.finish_rename(true)?,
            KeyCode::Esc => self.finish_rename(false)?,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        Ok(())
    }

    fn active_document(&self) -> Result<DocumentRef> {
        let view = self.active_view().context("No document is open")?;
        let document = view.borrow().document();
        Ok(document)
    }

    fn active_parts(&mut self) -> Result<(DocumentRef, &mut BookmarkStore)> {
        let document = self.active_document()?;
        let index = self
            .workspace
            .active_index()
            .context("No document is open")?;
        let store = self
            .stores
            .get_mut(index)
            .context("No bookmarks for the active document")?;
        Ok((document, store))
    }

    fn activate(&mut self, index: usize) {
        if self.workspace.activate(index).is_some() {
            self.session.rebind(self.workspace.context());
            self.mark = None;
            self.cursor = self
                .active_view()
                .map(|view| view.borrow().selection().end)
                .unwrap_or(0);
        }
    }

    fn next_document(&mut self) {
        let count = self.workspace.views().len();
        if count == 0 {
            return;
        }
        let next = self
            .workspace
            .active_index()
            .map_or(0, |index| (index + 1) % count);
        self.activate(next);
    }

    fn document_len(&self) -> usize {
        self.active_document()
            .map(|document| document.borrow().len_chars())
            .unwrap_or(0)
    }

    fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.document_len());
        self.sync_selection();
    }

    fn move_cursor(&mut self, delta: isize) {
        self.set_cursor(self.cursor.saturating_add_signed(delta));
    }

    fn sync_selection(&mut self) {
        if let Some(view) = self.active_view() {
            let anchor = self.mark.unwrap_or(self.cursor);
            view.borrow_mut().set_selection(anchor, self.cursor);
        }
    }

    fn insert_text(&mut self, text: &str) -> Result<()> {
        let document = self.active_document()?;
        document.borrow_mut().buffer_mut().insert(self.cursor, text)?;
        self.move_cursor(text.chars().count() as isize);
        Ok(())
    }

    fn submit_console(&mut self) {
        let line = std::mem::take(&mut self.input);
        match self.session.submit(&line) {
            Ok(_) => {}
            // Already shown in the transcript
            Err(SubmitError::Eval(_)) => {}
            Err(err) => self.status = err.to_string(),
        }
        // Scripts may have edited or shortened the document
        self.set_cursor(self.cursor);
    }

    fn add_bookmark(&mut self) -> Result<()> {
        let view = self.active_view().context("No document is open")?;
        let selection = view.borrow().selection();
        let (document, store) = self.active_parts()?;
        let name = format!("bookmark {}", store.len() + 1);
        store.add(
            &mut document.borrow_mut().anchors_mut(),
            selection.start,
            selection.end,
            name.clone(),
            None,
        )?;
        self.mark = None;
        self.input = name;
        self.mode = Mode::Rename;
        Ok(())
    }

    fn begin_rename(&mut self) {
        let name = self.active_store().and_then(|store| {
            store
                .selected()
                .and_then(|id| store.get(id))
                .map(|bookmark| bookmark.name.clone())
        });
        if let Some(name) = name {
            self.input = name;
            self.mode = Mode::Rename;
        }
    }

    fn finish_rename(&mut self, accept: bool) -> Result<()> {
        let name = std::mem::take(&mut self.input);
        self.mode = Mode::Normal;
        let (_, store) = self.active_parts()?;
        let Some(id) = store.renaming().or(store.selected()) else {
            return Ok(());
        };
        let name = match (accept, name.trim()) {
            (true, trimmed) if !trimmed.is_empty() => trimmed.to_string(),
            _ => store
                .get(id)
                .map(|bookmark| bookmark.name.clone())
                .unwrap_or_default(),
        };
        store.rename(id, name)?;
        Ok(())
    }

    fn selected_bookmark(&self) -> Option<BookmarkId> {
        self.active_store().and_then(BookmarkStore::selected)
    }

    fn step_bookmark(&mut self, delta: isize) -> Result<()> {
        let (_, store) = self.active_parts()?;
        let ids = store.iter().map(|(_, bookmark)| bookmark.id).collect::<Vec<_>>();
        if ids.is_empty() {
            return Ok(());
        }
        let current = store
            .selected()
            .and_then(|id| ids.iter().position(|candidate| *candidate == id));
        let next = match current {
            Some(index) => index
                .saturating_add_signed(delta)
                .min(ids.len() - 1),
            None => 0,
        };
        store.select(Some(ids[next]))?;
        Ok(())
    }

    fn navigate_selected(&mut self) -> Result<()> {
        let Some(id) = self.selected_bookmark() else {
            return Ok(());
        };
        let (document, store) = self.active_parts()?;
        let (start, end) = store.navigate(document.borrow().buffer(), id)?;
        self.mark = Some(start);
        self.set_cursor(end);
        Ok(())
    }

    fn delete_selected(&mut self) -> Result<()> {
        let Some(id) = self.selected_bookmark() else {
            return Ok(());
        };
        let (document, store) = self.active_parts()?;
        let anchors = store.anchors(id)?;
        let removed = store.delete(id)?;
        let mut document = document.borrow_mut();
        for anchor in anchors {
            document.anchors_mut().release(anchor)?;
        }
        self.status = format!("Deleted '{}'", removed.name);
        Ok(())
    }

    /// Nest the selected bookmark under the one listed above it
    fn indent_selected(&mut self) -> Result<()> {
        let Some(id) = self.selected_bookmark() else {
            return Ok(());
        };
        let (_, store) = self.active_parts()?;
        let above = store
            .iter()
            .map(|(_, bookmark)| bookmark.id)
            .take_while(|candidate| *candidate != id)
            .last();
        if let Some(parent) = above {
            store.reparent(id, Some(parent))?;
        }
        Ok(())
    }

    fn outdent_selected(&mut self) -> Result<()> {
        let Some(id) = self.selected_bookmark() else {
            return Ok(());
        };
        let (_, store) = self.active_parts()?;
        store.reparent(id, None)?;
        Ok(())
    }

    /// Write back modified documents and every document's bookmarks
    fn save(&mut self) -> Result<()> {
        let mut file = BookmarkFile::load_from_path(&self.bookmarks_path)?;
        for (view, store) in self.workspace.views().iter().zip(&self.stores) {
            let document = view.borrow().document();
            let mut document = document.borrow_mut();
            if document.is_dirty() && document.path().is_some() {
                document.save()?;
            }
            let saved = store.to_saved(document.buffer())?;
            file.documents.insert(document_key(&document), saved);
        }
        file.save_to_path(&self.bookmarks_path)?;
        self.status = format!("Saved bookmarks to {}", self.bookmarks_path.display());
        Ok(())
    }
}
