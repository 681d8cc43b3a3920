//! Variable-substitution tokeniser
//!
//! Lexes `$name` / `${name}` references and backslash escapes out of a path
//! string so bookmark aliases can be expanded inside it. Rendering is pure;
//! tokens carry no state between renders.

use crate::error::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    RawString(String),
    VariableRef(String),
}

/// Break a string down into literal and variable tokens.
///
/// Escape rules: `\$` yields a literal `$`; any other `\x` yields `\x`
/// verbatim. A braced variable consumes everything up to the matching `}`,
/// and an unclosed brace is fatal. A trailing `$` with no identifier is
/// silently dropped, a long-standing quirk callers rely on.
pub fn tokenise(s: &str) -> Result<Vec<Token>> {
    let mut acc = Vec::new();
    let mut curr = String::new();
    let mut is_var = false;
    let mut is_braced = false;
    let mut is_escaped = false;

    for c in s.chars() {
        if !is_var {
            if c == '\\' && !is_escaped {
                is_escaped = true;
                continue;
            }

            if c == '$' && !is_escaped {
                is_var = true;
                if !curr.is_empty() {
                    acc.push(Token::RawString(std::mem::take(&mut curr)));
                }
                continue;
            }

            if is_escaped && c != '$' {
                curr.push('\\');
            }

            is_escaped = false;
            curr.push(c);
            continue;
        }

        if c == '{' && curr.is_empty() {
            is_braced = true;
            continue;
        }

        if is_braced {
            if c == '}' {
                acc.push(Token::VariableRef(std::mem::take(&mut curr)));
                is_var = false;
                is_braced = false;
                continue;
            }
            curr.push(c);
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            acc.push(Token::VariableRef(std::mem::take(&mut curr)));
            is_var = false;

            match c {
                '\\' => is_escaped = true,
                '$' => is_var = true,
                _ => curr.push(c),
            }
            continue;
        }

        curr.push(c);
    }

    if is_var && is_braced {
        return Err(Error::MalformedVariable);
    }

    if !curr.is_empty() {
        acc.push(if is_var {
            Token::VariableRef(curr)
        } else {
            Token::RawString(curr)
        });
    }

    Ok(acc)
}

/// Render tokens back into a string against a name -> value context.
///
/// Every variable must resolve exactly; there are no defaults.
pub fn render(tokens: &[Token], context: &HashMap<String, String>) -> Result<String> {
    let mut acc = String::new();

    for t in tokens {
        match t {
            Token::RawString(v) => acc.push_str(v),
            Token::VariableRef(name) => match context.get(name) {
                Some(v) => acc.push_str(v),
                None => return Err(Error::UnknownVariable(name.clone())),
            },
        }
    }

    Ok(acc)
}
