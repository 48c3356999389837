use crate::error::{Error, Result};

/// A resolved column-selection formula.
///
/// The formula language is small: `y1 + y2 ~ * -skip1 -skip2` names the
/// target columns on the left of `~`, takes every remaining column as an
/// input via `*`, and drops the `-`-prefixed columns from the inputs.
/// A column that is both a target and an exclusion stays a target.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaSpec {
    /// The formula text as written (trimmed); persisted with the model.
    pub raw: String,
    /// Target column names, in formula order, without duplicates.
    pub targets: Vec<String>,
    /// Input column names, in table order.
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Plus,
    Tilde,
    Star,
    Minus,
}

/// Parses `formula` against the ordered column names of a table and
/// partitions them into targets and inputs.
pub fn resolve(formula: &str, columns: &[&str]) -> Result<FormulaSpec> {
    let raw = formula.trim();
    let tokens = tokenize(raw);
    if !tokens.contains(&Token::Tilde) {
        return Err(Error::Formula(format!(
            "missing '~' separator in '{}'",
            raw
        )));
    }

    let mut iter = tokens.into_iter();

    // Left of '~': one or more '+'-joined target names.
    let mut targets: Vec<String> = Vec::new();
    loop {
        match iter.next() {
            Some(Token::Name(name)) => {
                if !targets.contains(&name) {
                    targets.push(name);
                }
                match iter.next() {
                    Some(Token::Plus) => continue,
                    Some(Token::Tilde) => break,
                    other => {
                        return Err(Error::Formula(format!(
                            "expected '+' or '~' after a target name, found {}",
                            describe(other)
                        )))
                    }
                }
            }
            // A '~' at the loop head with targets already named means a
            // '+' dangled before it.
            Some(Token::Tilde) if targets.is_empty() => break,
            other => {
                return Err(Error::Formula(format!(
                    "expected a target name, found {}",
                    describe(other)
                )))
            }
        }
    }
    if targets.is_empty() {
        return Err(Error::Formula(format!(
            "no target columns named before '~' in '{}'",
            raw
        )));
    }

    // Right of '~': the wildcard, then zero or more '-name' exclusions.
    match iter.next() {
        Some(Token::Star) => {}
        other => {
            return Err(Error::Formula(format!(
                "expected '*' after '~', found {}",
                describe(other)
            )))
        }
    }

    let mut excluded: Vec<String> = Vec::new();
    loop {
        match iter.next() {
            None => break,
            Some(Token::Minus) => match iter.next() {
                Some(Token::Name(name)) => excluded.push(name),
                other => {
                    return Err(Error::Formula(format!(
                        "expected a column name after '-', found {}",
                        describe(other)
                    )))
                }
            },
            other => {
                return Err(Error::Formula(format!(
                    "unexpected {} after the input list",
                    describe(other)
                )))
            }
        }
    }

    // Every mentioned name must exist in the table.
    for name in targets.iter().chain(excluded.iter()) {
        if !columns.contains(&name.as_str()) {
            return Err(Error::Formula(format!(
                "unknown column '{}' in '{}'",
                name, raw
            )));
        }
    }

    // Targets take precedence: excluding a target leaves it a target.
    excluded.retain(|name| !targets.contains(name));

    let inputs: Vec<String> = columns
        .iter()
        .filter(|c| {
            !targets.iter().any(|t| t == *c) && !excluded.iter().any(|e| e == *c)
        })
        .map(|c| c.to_string())
        .collect();
    if inputs.is_empty() {
        return Err(Error::Formula(format!(
            "no input columns remain after exclusions in '{}'",
            raw
        )));
    }

    Ok(FormulaSpec {
        raw: raw.to_string(),
        targets,
        inputs,
    })
}

fn tokenize(formula: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut name = String::new();
    for ch in formula.chars() {
        match ch {
            '+' | '~' | '*' | '-' => {
                flush(&mut name, &mut tokens);
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '~' => Token::Tilde,
                    '*' => Token::Star,
                    _ => Token::Minus,
                });
            }
            c if c.is_whitespace() => flush(&mut name, &mut tokens),
            c => name.push(c),
        }
    }
    flush(&mut name, &mut tokens);
    tokens
}

fn flush(name: &mut String, tokens: &mut Vec<Token>) {
    if !name.is_empty() {
        tokens.push(Token::Name(std::mem::take(name)));
    }
}

fn describe(token: Option<Token>) -> String {
    match token {
        None => "the end of the formula".to_string(),
        Some(Token::Name(name)) => format!("'{}'", name),
        Some(Token::Plus) => "'+'".to_string(),
        Some(Token::Tilde) => "'~'".to_string(),
        Some(Token::Star) => "'*'".to_string(),
        Some(Token::Minus) => "'-'".to_string(),
    }
}
