use std::cell::{Cell, Ref, RefCell};
use std::fmt;

use anchorage_engine::HostContext;

use crate::interpreter::{EvalError, Interpreter, OutputSink};
use crate::transcript::{DEFAULT_HISTORY_LIMIT, DEFAULT_PROMPT, History, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Evaluating,
}

/// Everything one evaluation wrote to standard output and error, plus the
/// echoed value of the expression if it had one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub text: String,
}

impl fmt::Display for CapturedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("Another submission is still being evaluated")]
    Busy,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub prompt: String,
    pub history_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Interactive console bound to whichever document the host says is active.
///
/// All methods take `&self` so the session can be shared with host
/// callbacks (`Rc<ScriptingSession<_>>`). That makes two things reachable
/// while a submission is running, and both have a fixed answer:
///
/// - `rebind` takes effect for the *next* submission; the running one keeps
///   the context it captured on entry.
/// - a nested `submit` is rejected with [`SubmitError::Busy`].
pub struct ScriptingSession<I> {
    interpreter: RefCell<I>,
    bound: RefCell<HostContext>,
    state: Cell<SessionState>,
    sink: OutputSink,
    transcript: RefCell<Transcript>,
    history: RefCell<History>,
}

impl<I: Interpreter> ScriptingSession<I> {
    pub fn new(interpreter: I) -> Self {
        Self::with_options(interpreter, SessionOptions::default())
    }

    pub fn with_options(interpreter: I, options: SessionOptions) -> Self {
        Self {
            interpreter: RefCell::new(interpreter),
            bound: RefCell::new(HostContext::default()),
            state: Cell::new(SessionState::Idle),
            sink: OutputSink::new(),
            transcript: RefCell::new(Transcript::new(options.prompt)),
            history: RefCell::new(History::new(options.history_limit)),
        }
    }

    /// Point the session at a new host context.
    ///
    /// Returns whether anything changed; rebinding to the context already
    /// bound is a no-op.
    pub fn rebind(&self, context: HostContext) -> bool {
        let mut bound = self.bound.borrow_mut();
        if *bound == context {
            return false;
        }
        log::debug!(
            "console rebound to {:?} (was {:?})",
            context.host.active,
            bound.host.active
        );
        *bound = context;
        true
    }

    /// Evaluate one line against the bound context.
    ///
    /// Output is captured only for the duration of the call, the echo and
    /// output (or the error text) are appended to the transcript, and the
    /// session is idle again by the time this returns, whatever the outcome.
    pub fn submit(&self, text: &str) -> Result<CapturedOutput, SubmitError> {
        if self.state.get() == SessionState::Evaluating {
            log::warn!("rejected nested submission: {text}");
            return Err(SubmitError::Busy);
        }

        let context = self.bound.borrow().clone();
        self.state.set(SessionState::Evaluating);
        self.history.borrow_mut().push(text);

        let result = {
            let mut interpreter = self.interpreter.borrow_mut();
            interpreter.redirect_output(Some(self.sink.clone()));
            let result = interpreter.eval(text, &context);
            interpreter.redirect_output(None);
            result
        };

        if let Ok(Some(value)) = &result {
            self.sink.write_line(value);
        }
        let captured = CapturedOutput {
            text: self.sink.drain(),
        };
        self.state.set(SessionState::Idle);

        let mut transcript = self.transcript.borrow_mut();
        match result {
            Ok(_) => {
                transcript.record(text, &captured.text);
                Ok(captured)
            }
            Err(err) => {
                log::debug!("evaluation failed: {err}");
                transcript.record_error(text, &captured.text, &err);
                Err(SubmitError::Eval(err))
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Copy of the currently bound context
    pub fn context(&self) -> HostContext {
        self.bound.borrow().clone()
    }

    pub fn transcript(&self) -> Ref<'_, Transcript> {
        self.transcript.borrow()
    }

    pub fn clear_transcript(&self) {
        self.transcript.borrow_mut().clear();
    }

    /// Previous submission, for recalling into the input line
    pub fn history_older(&self) -> Option<String> {
        self.history.borrow_mut().older().map(str::to_string)
    }

    pub fn history_newer(&self) -> Option<String> {
        self.history.borrow_mut().newer().map(str::to_string)
    }
}
