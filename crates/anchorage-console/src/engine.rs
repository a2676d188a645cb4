use std::cell::RefCell;
use std::rc::Rc;

use anchorage_engine::HostContext;
use rhai::{Dynamic, Engine, Scope};

use crate::api;
use crate::interpreter::{EvalError, Interpreter, OutputSink};

/// Operation budget for a single evaluation; stops runaway loops from
/// freezing the host
pub const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;

/// [`Interpreter`] backed by a Rhai engine.
///
/// Variables defined by one submission stay visible to the next, the way an
/// interactive console behaves. The host bindings are refreshed before every
/// call, shadowing any constant a script may have declared with the same
/// name.
pub struct RhaiInterpreter {
    engine: Engine,
    scope: Scope<'static>,
    target: Rc<RefCell<Option<OutputSink>>>,
}

impl Default for RhaiInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiInterpreter {
    pub fn new() -> Self {
        Self::with_max_operations(DEFAULT_MAX_OPERATIONS)
    }

    /// Create an interpreter with an operation budget (0 = unlimited)
    pub fn with_max_operations(max_operations: u64) -> Self {
        let target: Rc<RefCell<Option<OutputSink>>> = Rc::default();

        let mut engine = Engine::new();
        engine.set_max_operations(max_operations);

        let print_target = Rc::clone(&target);
        engine.on_print(move |text| match print_target.borrow().as_ref() {
            Some(sink) => sink.write_line(text),
            None => println!("{text}"),
        });

        let debug_target = Rc::clone(&target);
        engine.on_debug(move |text, _source, _position| {
            match debug_target.borrow().as_ref() {
                Some(sink) => sink.write_line(text),
                None => eprintln!("{text}"),
            }
        });

        api::register(&mut engine);

        Self {
            engine,
            scope: Scope::new(),
            target,
        }
    }
}

impl Interpreter for RhaiInterpreter {
    fn redirect_output(&mut self, sink: Option<OutputSink>) {
        *self.target.borrow_mut() = sink;
    }

    fn eval(&mut self, source: &str, context: &HostContext) -> Result<Option<String>, EvalError> {
        for (name, value) in api::bindings(context) {
            match self.scope.is_constant(name) {
                Some(false) => {
                    self.scope.set_value(name, value);
                }
                _ => {
                    self.scope.push_dynamic(name, value);
                }
            }
        }

        let value = self
            .engine
            .eval_with_scope::<Dynamic>(&mut self.scope, source)
            .map_err(|err| EvalError::new(err.to_string()))?;

        Ok((!value.is_unit()).then(|| value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorage_engine::{Document, Workspace};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn eval(interpreter: &mut RhaiInterpreter, source: &str, context: &HostContext) -> String {
        let sink = OutputSink::new();
        interpreter.redirect_output(Some(sink.clone()));
        let value = interpreter.eval(source, context).unwrap();
        interpreter.redirect_output(None);
        if let Some(value) = value {
            sink.write_line(&value);
        }
        sink.drain()
    }

    fn workspace() -> Workspace {
        let mut workspace = Workspace::new();
        workspace.open(Document::new("notes.txt", "hello world\nsecond line"));
        workspace.activate(0);
        workspace
    }

    #[rstest]
    #[case::arithmetic("1+1", "2\n")]
    #[case::string(r#""a" + "b""#, "ab\n")]
    #[case::statement("let x = 3;", "")]
    #[case::print(r#"print("hi")"#, "hi\n")]
    #[case::debug("debug(42)", "42\n")]
    fn test_eval_without_document(#[case] source: &str, #[case] expected: &str) {
        let mut interpreter = RhaiInterpreter::new();

        assert_eq!(eval(&mut interpreter, source, &HostContext::default()), expected);
    }

    #[test]
    fn test_variables_persist_between_calls() {
        let mut interpreter = RhaiInterpreter::new();
        let context = HostContext::default();

        eval(&mut interpreter, "let total = 40;", &context);

        assert_eq!(eval(&mut interpreter, "total + 2", &context), "42\n");
    }

    #[test]
    fn test_bindings_resolve_against_context() {
        let workspace = workspace();
        let view = workspace.active_view().unwrap();
        view.borrow_mut().set_selection(0, 5);
        let context = workspace.context();
        let mut interpreter = RhaiInterpreter::new();

        assert_eq!(eval(&mut interpreter, "Doc.Length", &context), "23\n");
        assert_eq!(eval(&mut interpreter, "Doc.name", &context), "notes.txt\n");
        assert_eq!(eval(&mut interpreter, "Doc.slice(6, 11)", &context), "world\n");
        assert_eq!(eval(&mut interpreter, "View.selected_text", &context), "hello\n");
        assert_eq!(eval(&mut interpreter, "Struct.line_count", &context), "2\n");
        assert_eq!(eval(&mut interpreter, "Struct.line(1)", &context), "second line\n");
        assert_eq!(eval(&mut interpreter, "Host.active", &context), "notes.txt\n");
        assert_eq!(eval(&mut interpreter, "Host.documents.len()", &context), "1\n");
    }

    #[test]
    fn test_scripts_can_edit_the_bound_document() {
        let workspace = workspace();
        let context = workspace.context();
        let mut interpreter = RhaiInterpreter::new();

        eval(&mut interpreter, r#"Doc.insert(0, ">> ")"#, &context);
        eval(&mut interpreter, "View.select(3, 8)", &context);

        let document = context.document().unwrap();
        assert_eq!(document.borrow().buffer().text(), ">> hello world\nsecond line");
        assert_eq!(context.view().unwrap().borrow().selection(), 3..8);
    }

    #[test]
    fn test_missing_document_is_an_error_not_a_panic() {
        let mut interpreter = RhaiInterpreter::new();

        let err = interpreter
            .eval("Doc.Length", &HostContext::default())
            .unwrap_err();

        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_closed_document_is_reported() {
        let mut workspace = workspace();
        let context = workspace.context();
        workspace.close(0);
        let mut interpreter = RhaiInterpreter::new();

        let err = interpreter.eval("Doc.Length", &context).unwrap_err();

        assert!(err.message.contains("no longer open"), "{}", err.message);
    }

    #[test]
    fn test_constant_binding_is_shadowed_on_next_call() {
        let workspace = workspace();
        let context = workspace.context();
        let mut interpreter = RhaiInterpreter::new();

        eval(&mut interpreter, "const Doc = 5;", &HostContext::default());

        assert_eq!(eval(&mut interpreter, "Doc.Length", &context), "23\n");
    }

    #[test]
    fn test_runaway_loop_is_stopped() {
        let mut interpreter = RhaiInterpreter::with_max_operations(1_000);

        let result = interpreter.eval("loop {}", &HostContext::default());

        assert!(result.is_err());
    }

    #[test]
    fn test_output_goes_to_process_streams_when_not_redirected() {
        let mut interpreter = RhaiInterpreter::new();
        let sink = OutputSink::new();
        interpreter.redirect_output(Some(sink.clone()));
        interpreter.redirect_output(None);

        interpreter
            .eval(r#"print("to stdout")"#, &HostContext::default())
            .unwrap();

        assert!(sink.is_empty());
    }
}
