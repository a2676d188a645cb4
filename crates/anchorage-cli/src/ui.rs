use std::ops::Range;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, Mode};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(rows[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(columns[1]);

    draw_bookmarks(f, app, columns[0]);
    draw_document(f, app, right[0]);
    draw_console(f, app, right[1]);
    draw_status(f, app, rows[1]);
}

fn draw_bookmarks(f: &mut Frame, app: &App, area: Rect) {
    let mut state = ListState::default();
    let mut items = Vec::new();

    if let (Some(store), Some(view)) = (app.active_store(), app.active_view()) {
        let document = view.borrow().document();
        let document = document.borrow();
        for (index, (depth, bookmark)) in store.iter().enumerate() {
            let range = match store.range(document.buffer(), bookmark.id) {
                Ok((start, end)) => format!("{start}..{end}"),
                Err(_) => "?".to_string(),
            };
            let text = format!("{}{} {}", "  ".repeat(depth), bookmark.name, range);
            items.push(ListItem::new(Line::from(text)));
            if store.selected() == Some(bookmark.id) {
                state.select(Some(index));
            }
        }
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Bookmarks"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_document(f: &mut Frame, app: &App, area: Rect) {
    let (title, lines) = match app.active_view() {
        Some(view) => {
            let view = view.borrow();
            let document = view.document();
            let document = document.borrow();
            let title = format!(
                "{} ({}/{})",
                document.name(),
                app.workspace.active_index().map_or(0, |index| index + 1),
                app.workspace.views().len()
            );
            let show_cursor = matches!(app.mode, Mode::Normal | Mode::Insert);
            let cursor = show_cursor.then_some(app.cursor);
            let lines = document_lines(&document.buffer().text(), view.selection(), cursor);
            (title, lines)
        }
        None => ("Document".to_string(), vec![Line::from("No document open")]),
    };

    let content = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(content, area);
}

fn draw_console(f: &mut Frame, app: &App, area: Rect) {
    let transcript = app.session.transcript();
    let mut lines: Vec<Line> = transcript
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    if app.mode == Mode::Console {
        lines.push(Line::from(vec![
            Span::raw(transcript.prompt().to_string()),
            Span::raw(app.input.clone()),
            Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)),
        ]));
    }

    // Keep the newest lines in view
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let lines = lines.into_iter().skip(skip).collect::<Vec<_>>();

    let console = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Console"));
    f.render_widget(console, area);
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match app.mode {
        Mode::Rename => Line::from(vec![
            Span::styled("Name: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.input.clone()),
        ]),
        _ if !app.status.is_empty() => Line::from(app.status.clone()),
        Mode::Normal => Line::from(
            "q: Quit | h/l: Move | v: Select | b: Bookmark | j/k: Pick | Enter: Go | r: Rename | d: Delete | >/<: Nest | Tab: Next doc | i: Insert | ':': Console | w: Save",
        ),
        Mode::Insert => Line::from("Esc: Done | typing edits the document"),
        Mode::Console => Line::from("Esc: Back | Enter: Run | ↑/↓: History | Ctrl-l: Clear"),
    };
    f.render_widget(Paragraph::new(line), area);
}

/// Split text into display lines, highlighting the selection and cursor
fn document_lines(text: &str, selection: Range<usize>, cursor: Option<usize>) -> Vec<Line<'static>> {
    let selected = Style::default().bg(Color::Yellow).fg(Color::Black);
    let at_cursor = Style::default().add_modifier(Modifier::REVERSED);
    let style_of = |offset: usize| {
        if cursor == Some(offset) {
            at_cursor
        } else if selection.contains(&offset) {
            selected
        } else {
            Style::default()
        }
    };

    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();

    fn flush(spans: &mut Vec<Span<'static>>, run: &mut String, style: Style) {
        if !run.is_empty() {
            spans.push(Span::styled(std::mem::take(run), style));
        }
    }

    let mut len = 0;
    for (offset, ch) in text.chars().enumerate() {
        len = offset + 1;
        let style = style_of(offset);
        if style != run_style {
            flush(&mut spans, &mut run, run_style);
            run_style = style;
        }
        if ch == '\n' {
            // A cursor sitting on a line break still needs a visible cell
            if style != Style::default() {
                run.push(' ');
            }
            flush(&mut spans, &mut run, run_style);
            lines.push(Line::from(std::mem::take(&mut spans)));
        } else {
            run.push(ch);
        }
    }

    if cursor == Some(len) {
        flush(&mut spans, &mut run, run_style);
        run_style = at_cursor;
        run.push(' ');
    }
    flush(&mut spans, &mut run, run_style);
    lines.push(Line::from(spans));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_document_lines_split_on_newlines() {
        let lines = document_lines("one\ntwo", 0..0, None);

        assert_eq!(plain(&lines), vec!["one", "two"]);
    }

    #[test]
    fn test_selection_is_its_own_span() {
        let lines = document_lines("hello world", 6..11, None);

        let spans = lines[0]
            .spans
            .iter()
            .map(|span| span.content.to_string())
            .collect::<Vec<_>>();
        assert_eq!(spans, vec!["hello ", "world"]);
    }

    #[test]
    fn test_cursor_at_end_gets_a_cell() {
        let lines = document_lines("ab", 2..2, Some(2));

        assert_eq!(plain(&lines), vec!["ab "]);
    }
}
