use std::cell::RefCell;
use std::rc::Rc;

use anchorage_engine::HostContext;

/// Failure raised by an interpreter while evaluating one submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// In-memory destination for an interpreter's standard output and error.
///
/// Clones share the same buffer, so the interpreter can keep a handle for
/// the duration of a call while the session drains it afterwards.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    buffer: Rc<RefCell<String>>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }

    pub fn write_line(&self, text: &str) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push_str(text);
        buffer.push('\n');
    }

    /// Take everything written so far, leaving the sink empty for reuse
    pub fn drain(&self) -> String {
        std::mem::take(&mut *self.buffer.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }
}

/// What a scripting session needs from an embedded interpreter.
///
/// Bindings are not ambient globals: every call receives the context it
/// must evaluate against, and the interpreter exposes it under the names
/// `Host`, `View`, `Doc` and `Struct`.
pub trait Interpreter {
    /// Send standard output and error to `sink`, or back to the process
    /// streams with `None`
    fn redirect_output(&mut self, sink: Option<OutputSink>);

    /// Evaluate one expression or statement.
    ///
    /// Returns the display form of the resulting value, or `None` when the
    /// value is the interpreter's unit/none value.
    fn eval(&mut self, source: &str, context: &HostContext) -> Result<Option<String>, EvalError>;
}
