/*!
 * # Scripting console
 *
 * A line-oriented console whose scripts always see the document the user
 * is looking at. The host hands the session a fresh [`HostContext`] whenever
 * the active view changes; the session never listens for host events itself.
 *
 * ```rust
 * use anchorage_console::{RhaiInterpreter, ScriptingSession};
 * use anchorage_engine::{Document, Workspace};
 *
 * let mut workspace = Workspace::new();
 * workspace.open(Document::new("notes.txt", "hello"));
 *
 * let session = ScriptingSession::new(RhaiInterpreter::new());
 * if workspace.activate(0).is_some() {
 *     session.rebind(workspace.context());
 * }
 *
 * assert_eq!(session.submit("Doc.Length").unwrap().text, "5\n");
 * ```
 *
 * [`HostContext`]: anchorage_engine::HostContext
 */

mod api;
pub mod engine;
pub mod interpreter;
pub mod session;
pub mod transcript;

pub use engine::{DEFAULT_MAX_OPERATIONS, RhaiInterpreter};
pub use interpreter::{EvalError, Interpreter, OutputSink};
pub use session::{CapturedOutput, ScriptingSession, SessionOptions, SessionState, SubmitError};
pub use transcript::{DEFAULT_HISTORY_LIMIT, DEFAULT_PROMPT, History, Transcript};
