//! Script cleaning and statement splitting.
//!
//! This is a lexical pass, not a parser. Line comments are recognized
//! anywhere, including inside string literals, so `'a--b'` loses its tail.
//! Statement terminators inside quoted literals are respected.

/// Removes `--` comments, collapses whitespace runs to one space and trims.
///
/// A comment runs to the end of its line; the line break itself is kept so
/// the tokens on either side stay separated.
pub fn clean(script: &str) -> String {
    let mut stripped = String::with_capacity(script.len());
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '-' && chars.peek() == Some(&'-') {
            while let Some(&next) = chars.peek() {
                if next == '\n' {
                    break;
                }
                chars.next();
            }
            continue;
        }
        stripped.push(c);
    }

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits a cleaned script on `;` outside of quoted literals.
///
/// Empty candidates are dropped.
pub fn split(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => {
                current.push(c);
                // Doubled quote is an escaped quote
                if chars.peek() == Some(&q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                current.push(c);
            }
            None if c == ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            None => current.push(c),
        }
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Cleans a script and splits it into statements.
pub fn statements(script: &str) -> Vec<String> {
    split(&clean(script))
}
