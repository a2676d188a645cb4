mod app;
mod ui;

use anchorage_config::Config;
use anchorage_engine::Document;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    env,
    io::{Stdout, stdout},
    process,
};

use crate::app::App;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let (program, paths) = split_args(&args);
    if paths.is_empty() {
        eprintln!("{}", usage(program));
        process::exit(1);
    }

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", Config::config_path().display());
            process::exit(1);
        }
    };
    log::info!("Bookmarks path: {}", config.bookmarks_path.display());

    let mut documents = Vec::new();
    for path in paths {
        match Document::open(path) {
            Ok(document) => documents.push(document),
            Err(e) => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
    }

    // Bookmarks are restored before the terminal switches to raw mode so
    // that any warnings about clamped offsets stay readable
    let mut app = App::new(documents, &config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

/// Program name and file paths; argv may be empty
fn split_args(args: &[String]) -> (&str, &[String]) {
    let program = args.first().map_or("anchorage", String::as_str);
    (program, args.get(1..).unwrap_or_default())
}

fn usage(program: &str) -> String {
    format!("Usage: {program} <file> [file...]")
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit() {
        terminal.draw(|f| ui::draw(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Err(err) = app.handle_key(key)
        {
            log::debug!("key {:?} failed: {err:#}", key.code);
            app.status = err.to_string();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_usage_names_the_program() {
        assert_eq!(usage("anchorage"), "Usage: anchorage <file> [file...]");
    }

    #[test]
    fn test_empty_argv_has_no_paths() {
        let (program, paths) = split_args(&[]);

        assert_eq!(program, "anchorage");
        assert!(paths.is_empty());
    }

    #[test]
    fn test_paths_follow_the_program_name() {
        let args = vec!["bin/anchorage".to_string(), "a.txt".to_string(), "b.txt".to_string()];

        let (program, paths) = split_args(&args);

        assert_eq!(program, "bin/anchorage");
        assert_eq!(paths, ["a.txt", "b.txt"]);
    }
}
