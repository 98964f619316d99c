//! Interactive console for STAX.
//!
//! One line is one command: a dot directive or a SQL script for the current
//! database. History is kept across runs.

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use tracing::{debug, error};

use stax_core::Session;

use crate::commands::{self, CommandResult};
use crate::config::StaxConfig;

/// The prompt shown when waiting for input.
pub const PROMPT: &str = "~> ";

const DIRECTIVES: &[&str] = &[
    ".clear", ".cls", ".conn", ".connect", ".current", ".exit", ".get", ".h", ".help", ".join",
    ".main", ".mode", ".ping", ".q", ".quit", ".reconn", ".reconnect", ".run", ".set", ".status",
    ".temp", ".timing", ".unset", ".use", ".vars",
];

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE",
    "TABLE", "DROP", "ALTER", "INDEX", "JOIN", "LEFT", "INNER", "ON", "AND", "OR", "NOT", "NULL",
    "IS", "IN", "LIKE", "BETWEEN", "ORDER", "BY", "ASC", "DESC", "LIMIT", "OFFSET", "GROUP",
    "HAVING", "DISTINCT", "AS", "CASE", "WHEN", "THEN", "ELSE", "END", "COUNT", "SUM", "AVG",
    "MIN", "MAX", "UNION", "ALL", "WITH", "BEGIN", "COMMIT", "ROLLBACK",
];

/// Completion for directives at line start and SQL keywords elsewhere.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];

        let matches: Vec<Pair> = if start == 0 && word.starts_with('.') {
            let word = word.to_lowercase();
            DIRECTIVES
                .iter()
                .filter(|d| d.starts_with(&word))
                .map(|d| candidate(d))
                .collect()
        } else if word.is_empty() {
            Vec::new()
        } else {
            let word = word.to_uppercase();
            KEYWORDS
                .iter()
                .filter(|kw| kw.starts_with(&word))
                .map(|kw| candidate(kw))
                .collect()
        };

        Ok((start, matches))
    }
}

fn candidate(text: &str) -> Pair {
    Pair {
        display: text.to_string(),
        replacement: text.to_string(),
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

/// Interactive console.
pub struct Repl {
    session: Session,
    editor: Editor<ReplHelper, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl Repl {
    /// Creates a console over a session.
    pub fn new(session: Session, config: &StaxConfig) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(config.history_size)?
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper));

        let history_file = config.history_file.clone().or_else(default_history_file);
        if let Some(ref path) = history_file {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    debug!("Failed to load history: {}", e);
                }
            }
        }

        Ok(Self {
            session,
            editor,
            history_file,
        })
    }

    /// Prints the welcome banner.
    pub fn print_banner(&self) {
        print!("{}", banner(self.session.current()));
    }

    /// Runs the console loop until `.quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    match commands::dispatch(&mut self.session, line).await {
                        CommandResult::Exit => break,
                        CommandResult::Output(text) => println!("{}", text),
                        CommandResult::Continue => {}
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    error!("Readline error: {}", e);
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        if let Some(ref path) = self.history_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = self.editor.save_history(path) {
                debug!("Failed to save history: {}", e);
            }
        }
    }
}

/// Intro text naming today's date and the current database.
pub fn banner(current: &str) -> String {
    format!(
        "\nSTAX SQL Shell v{}\n\
         =====================================\n\
         Today's date: {}\n\
         Current database: \"{}\"\n\n",
        env!("CARGO_PKG_VERSION"),
        Local::now().format("%B %-d, %Y"),
        current
    )
}

fn default_history_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("stax").join("history"))
}
