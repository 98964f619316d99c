//! Dot directives and raw SQL dispatch.
//!
//! Every input line, from the console or a remote session, goes through
//! [`Command::parse`] and [`Command::execute`]. Lines starting with `.` are
//! directives; anything else is SQL for the current database.

use std::path::PathBuf;

use tracing::debug;

use stax_core::{CoreError, CoreResult, DisplayMode, ScriptOutcome, Session};

/// ANSI sequence that clears the screen and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Result of executing a command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Nothing to print.
    Continue,
    /// End the session.
    Exit,
    /// Text for the caller to print.
    Output(String),
}

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// End the session.
    Quit,
    /// Show help.
    Help,
    /// Print the current database.
    Current,
    /// Switch the current database.
    Use(String),
    /// Set the display mode.
    Mode(String),
    /// Show script timings: `Some(on)`, or toggle with `None`.
    Timing(Option<bool>),
    /// Clear the screen.
    Clear,
    /// Run a script file.
    Run(PathBuf),
    /// Bind a query's result set to a name.
    Set {
        /// Variable name.
        name: String,
        /// Script to run.
        sql: String,
    },
    /// Drop a binding.
    Unset(String),
    /// Render a binding.
    Get(String),
    /// Join two bindings on columns.
    Join {
        /// Left variable.
        left: String,
        /// Right variable.
        right: String,
        /// Join columns.
        columns: Vec<String>,
    },
    /// Probe one connection or all of them.
    Ping(Option<String>),
    /// Probe all connections.
    Status,
    /// Rebuild every connection.
    Reconnect,
    /// Alias a connection as `main`.
    Main(String),
    /// Copy query results into `main`.
    Temp {
        /// Table name prefix.
        prefix: String,
        /// Script to run.
        sql: String,
    },
    /// List variable names.
    Vars,
    /// Raw SQL for the current database.
    Sql(String),
    /// Blank line.
    Empty,
    /// A directive missing its arguments.
    Usage(&'static str),
    /// Unknown directive.
    Unknown(String),
}

/// Splits off the first whitespace-delimited word.
fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(i) => (&input[..i], input[i..].trim_start()),
        None => (input, ""),
    }
}

impl Command {
    /// Parses one input line.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Command::Empty;
        }
        if !input.starts_with('.') {
            return Command::Sql(input.to_string());
        }

        let (directive, rest) = next_word(input);
        let cmd_name = directive.to_lowercase();

        match cmd_name.as_str() {
            ".quit" | ".exit" | ".q" => Command::Quit,
            ".help" | ".h" => Command::Help,
            ".current" => Command::Current,
            ".use" => match next_word(rest).0 {
                "" => Command::Usage(".use <name>"),
                name => Command::Use(name.to_string()),
            },
            ".mode" => Command::Mode(next_word(rest).0.to_string()),
            ".timing" => match next_word(rest).0.to_lowercase().as_str() {
                "" => Command::Timing(None),
                "on" => Command::Timing(Some(true)),
                "off" => Command::Timing(Some(false)),
                _ => Command::Usage(".timing [on|off]"),
            },
            ".clear" | ".cls" => Command::Clear,
            ".run" => match next_word(rest).0 {
                "" => Command::Usage(".run <path>"),
                path => Command::Run(PathBuf::from(path)),
            },
            ".set" => match next_word(rest) {
                ("", _) | (_, "") => Command::Usage(".set <name> <sql...>"),
                (name, sql) => Command::Set {
                    name: name.to_string(),
                    sql: sql.to_string(),
                },
            },
            ".unset" => match next_word(rest).0 {
                "" => Command::Usage(".unset <name>"),
                name => Command::Unset(name.to_string()),
            },
            ".get" => match next_word(rest).0 {
                "" => Command::Usage(".get <name>"),
                name => Command::Get(name.to_string()),
            },
            ".join" => {
                let words: Vec<&str> = rest.split_whitespace().collect();
                match words.as_slice() {
                    [left, right, columns @ ..] => Command::Join {
                        left: left.to_string(),
                        right: right.to_string(),
                        columns: columns.iter().map(|c| c.to_string()).collect(),
                    },
                    _ => Command::Usage(".join <name> <name> <column...>"),
                }
            }
            ".ping" => match next_word(rest).0 {
                "" => Command::Ping(None),
                name => Command::Ping(Some(name.to_string())),
            },
            ".status" => Command::Status,
            ".reconnect" | ".reconn" | ".connect" | ".conn" => Command::Reconnect,
            ".main" => match next_word(rest).0 {
                "" => Command::Usage(".main <name>"),
                name => Command::Main(name.to_string()),
            },
            ".temp" => match next_word(rest) {
                ("", _) | (_, "") => Command::Usage(".temp <prefix> <sql...>"),
                (prefix, sql) => Command::Temp {
                    prefix: prefix.to_string(),
                    sql: sql.to_string(),
                },
            },
            ".vars" => Command::Vars,
            _ => Command::Unknown(directive.to_string()),
        }
    }

    /// Executes the command against a session.
    ///
    /// Failures are reported as output text; only `Quit` ends the session.
    pub async fn execute(&self, session: &mut Session) -> CommandResult {
        match self {
            Command::Quit => CommandResult::Exit,

            Command::Help => CommandResult::Output(help_text()),

            Command::Current => {
                CommandResult::Output(format!("current database: {}", session.current()))
            }

            Command::Use(name) => match session.use_database(name.as_str()) {
                Ok(()) => CommandResult::Continue,
                Err(e) => CommandResult::Output(format!("warning: {}", e)),
            },

            Command::Mode(mode) => match mode.parse::<DisplayMode>() {
                Ok(mode) => {
                    session.set_mode(mode);
                    CommandResult::Continue
                }
                Err(e) => CommandResult::Output(e),
            },

            Command::Timing(on) => {
                let on = on.unwrap_or(!session.timing());
                session.set_timing(on);
                CommandResult::Output(format!("Timing is {}.", if on { "on" } else { "off" }))
            }

            Command::Clear => CommandResult::Output(CLEAR_SCREEN.to_string()),

            Command::Run(path) => match session.run_file(path).await {
                Ok(outcome) => CommandResult::Output(render_outcome(session, &outcome)),
                Err(CoreError::Io(e)) => {
                    CommandResult::Output(format!("(cannot read {}: {})", path.display(), e))
                }
                Err(e) => error_output(e),
            },

            Command::Set { name, sql } => match session.set_variable(name, sql).await {
                Ok(outcome) => quiet_output(failure_lines(&outcome)),
                Err(e) => error_output(e),
            },

            Command::Unset(name) => {
                session.unset_variable(name);
                CommandResult::Continue
            }

            Command::Get(name) => {
                if !session.shared().variables().contains(name) {
                    return CommandResult::Output(format!("(variable '{}' is not set)", name));
                }
                let result = session.get_variable(name);
                if result.is_empty() {
                    CommandResult::Output(format!("(variable '{}' holds no tables)", name))
                } else {
                    CommandResult::Output(session.render(&result))
                }
            }

            Command::Join {
                left,
                right,
                columns,
            } => {
                let joined = session.join_variables(left, right, columns);
                CommandResult::Output(session.render(&vec![joined]))
            }

            Command::Ping(Some(name)) => {
                let result = session.shared().registry().ping(name).await;
                CommandResult::Output(status_line(name, &result))
            }

            Command::Ping(None) | Command::Status => {
                let results = session.shared().registry().ping_all().await;
                CommandResult::Output(connection_report(&results))
            }

            Command::Reconnect => {
                let results = session.shared().connect_all().await;
                CommandResult::Output(connection_report(&results))
            }

            Command::Main(name) => {
                match session.shared().registry().alias(stax_core::MAIN_DATABASE, name) {
                    Ok(()) => CommandResult::Output(format!("main database: {}", name)),
                    Err(e) => error_output(e),
                }
            }

            Command::Temp { prefix, sql } => match session.materialize(prefix, sql).await {
                Ok(tables) if tables.is_empty() => CommandResult::Output("(no tables created)".to_string()),
                Ok(tables) => CommandResult::Output(format!(
                    "created {}",
                    tables
                        .iter()
                        .map(|t| format!("main.{}", t))
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
                Err(CoreError::UnknownDatabase(name)) if name == stax_core::MAIN_DATABASE => {
                    CommandResult::Output("(please identify a main database)".to_string())
                }
                Err(e) => error_output(e),
            },

            Command::Vars => {
                let names = session.shared().variables().names();
                if names.is_empty() {
                    CommandResult::Output("(no variables)".to_string())
                } else {
                    CommandResult::Output(names.join("\n"))
                }
            }

            Command::Sql(sql) => match session.execute(sql).await {
                Ok(outcome) => CommandResult::Output(render_outcome(session, &outcome)),
                Err(e) => error_output(e),
            },

            Command::Empty => CommandResult::Continue,

            Command::Usage(usage) => CommandResult::Output(format!("usage: {}", usage)),

            Command::Unknown(cmd) => CommandResult::Output(format!(
                "unknown directive '{}'. Type .help for help.",
                cmd
            )),
        }
    }
}

/// Parses and executes one line.
pub async fn dispatch(session: &mut Session, line: &str) -> CommandResult {
    let command = Command::parse(line);
    debug!("[{}] {:?}", session.current(), command);
    command.execute(session).await
}

/// One `PASS`/`FAIL` line per database.
pub fn connection_report(results: &[(String, CoreResult<()>)]) -> String {
    if results.is_empty() {
        return "(no databases configured)".to_string();
    }
    results
        .iter()
        .map(|(name, result)| status_line(name, result))
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_line(name: &str, result: &CoreResult<()>) -> String {
    match result {
        Ok(()) => format!("database '{}'...\t\tPASS", name),
        Err(e) => format!("database '{}'...\t\tFAIL ({})", name, e),
    }
}

fn render_outcome(session: &Session, outcome: &ScriptOutcome) -> String {
    let mut output = session.render(&outcome.tables);
    let failures = failure_lines(outcome);
    if !failures.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&failures);
    }
    if session.timing() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&format!(
            "Time: {:.3}ms",
            outcome.elapsed.as_secs_f64() * 1000.0
        ));
    }
    output
}

fn failure_lines(outcome: &ScriptOutcome) -> String {
    outcome
        .failures
        .iter()
        .map(|f| format!("ERROR (statement {}): {}", f.index + 1, f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

fn quiet_output(text: String) -> CommandResult {
    if text.is_empty() {
        CommandResult::Continue
    } else {
        CommandResult::Output(text)
    }
}

fn error_output(e: CoreError) -> CommandResult {
    CommandResult::Output(format!("ERROR: {}", e))
}

fn help_text() -> String {
    r#"STAX Help Menu
=====================================

Session:
  .quit, .exit, .q              End the session
  .help, .h                     Show this help
  .clear, .cls                  Clear the screen
  .current                      Show the current database
  .use NAME                     Switch the current database
  .mode MODE                    Set output: default, json, csv, xml, table
  .timing [on|off]              Show how long each script takes

Queries:
  .run PATH                     Run a script file
  .set NAME SQL...              Store the result of SQL as NAME
  .unset NAME                   Forget NAME
  .get NAME                     Show a stored result
  .vars                         List stored results
  .join LEFT RIGHT COL...       Join two stored results on columns
  .temp PREFIX SQL...           Copy results into the main database

Connections:
  .ping [NAME]                  Probe one or all databases
  .status                       Probe all databases
  .reconnect, .conn             Reconnect every database
  .main NAME                    Use NAME as the main database

Anything else is run as SQL against the current database.
"#
    .to_string()
}
