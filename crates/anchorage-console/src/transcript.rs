use std::collections::VecDeque;

use crate::interpreter::EvalError;

pub const DEFAULT_PROMPT: &str = ">>> ";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Console text as the user sees it.
///
/// Each submission is echoed after the prompt on its own line, followed by
/// exactly what was captured. Failures add one `Error: ...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    prompt: String,
    text: String,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

impl Transcript {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            text: String::new(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn record(&mut self, input: &str, output: &str) {
        self.text.push_str(&self.prompt);
        self.text.push_str(input);
        self.text.push('\n');
        self.text.push_str(output);
    }

    pub fn record_error(&mut self, input: &str, output: &str, error: &EvalError) {
        self.record(input, output);
        self.text.push_str(&format!("Error: {error}\n"));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Previously submitted lines, newest last, with a browsing cursor
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    limit: usize,
    cursor: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
            cursor: None,
        }
    }

    /// Remember a submission. Blank lines and immediate repeats are skipped.
    pub fn push(&mut self, line: &str) {
        self.cursor = None;
        if line.trim().is_empty() || self.entries.back().is_some_and(|last| last == line) {
            return;
        }
        self.entries.push_back(line.to_string());
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    /// Step back towards older entries
    pub fn older(&mut self) -> Option<&str> {
        let index = match self.cursor {
            Some(0) => 0,
            Some(index) => index - 1,
            None => self.entries.len().checked_sub(1)?,
        };
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Step forward towards newer entries; `None` once past the newest
    pub fn newer(&mut self) -> Option<&str> {
        let index = self.cursor? + 1;
        if index >= self.entries.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_transcript_echoes_then_appends_output() {
        let mut transcript = Transcript::default();

        transcript.record("1+1", "2\n");
        transcript.record("let x = 1;", "");
        transcript.record_error("nope", "", &EvalError::new("Variable not found: nope"));

        insta::assert_snapshot!(transcript.as_str(), @r"
        >>> 1+1
        2
        >>> let x = 1;
        >>> nope
        Error: Variable not found: nope
        ");
    }

    #[test]
    fn test_partial_output_precedes_error() {
        let mut transcript = Transcript::new("$ ");

        transcript.record_error("boom", "before\n", &EvalError::new("bad"));

        assert_eq!(transcript.as_str(), "$ boom\nbefore\nError: bad\n");
        assert_eq!(transcript.lines().count(), 3);
    }

    #[test]
    fn test_history_navigation() {
        let mut history = History::new(10);
        history.push("first");
        history.push("second");
        history.push("third");

        assert_eq!(history.older(), Some("third"));
        assert_eq!(history.older(), Some("second"));
        assert_eq!(history.older(), Some("first"));
        assert_eq!(history.older(), Some("first"));
        assert_eq!(history.newer(), Some("second"));
        assert_eq!(history.newer(), Some("third"));
        assert_eq!(history.newer(), None);
        assert_eq!(history.older(), Some("third"));
    }

    #[test]
    fn test_history_skips_blanks_and_repeats() {
        let mut history = History::new(10);
        history.push("a");
        history.push("a");
        history.push("   ");
        history.push("b");

        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut history = History::new(2);
        history.push("one");
        history.push("two");
        history.push("three");

        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["two", "three"]);
    }

    #[test]
    fn test_empty_history_has_nothing_to_browse() {
        let mut history = History::default();

        assert_eq!(history.older(), None);
        assert_eq!(history.newer(), None);
        assert!(history.is_empty());
    }
}
