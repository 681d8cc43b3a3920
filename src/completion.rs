//! Tab completion
//!
//! Rebuilt from scratch on every request: the raw buffer up to the cursor
//! is re-tokenized with shell quoting rules, the command is classified,
//! and the in-progress token is completed against the recognized command
//! set, the remote namespace, or the local filesystem. No state survives
//! between keystrokes.

use crate::command;
use crate::error::{Error, Result};
use crate::session::Session;
use log::debug;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// A completion result: the text to splice into the buffer and the byte
/// offset it replaces from (through the cursor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub replacement: String,
    pub start: usize,
}

pub struct CompletionEngine {
    session: Rc<RefCell<Session>>,
}

/// Split a buffer that may end mid-quote: try as-is, then with one
/// appended double quote, then one single quote. Bounded at two extra
/// attempts; anything still unparseable is a real error.
fn split_with_repair(line: &str) -> Result<Vec<String>> {
    if let Some(words) = shlex::split(line) {
        return Ok(words);
    }

    for quote in ['"', '\''] {
        let mut attempt = String::with_capacity(line.len() + 1);
        attempt.push_str(line);
        attempt.push(quote);
        if let Some(words) = shlex::split(&attempt) {
            return Ok(words);
        }
    }

    Err(Error::UnbalancedQuoting)
}

/// Byte offset where the in-progress token begins in the raw buffer,
/// including any opening quote character. A buffer ending in unquoted
/// whitespace starts a fresh empty token at the cursor.
fn last_token_start(line: &str) -> usize {
    let mut start = line.len();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else if c == '\\' && q == '"' {
                    escaped = true;
                }
            }
            None => {
                if c.is_whitespace() {
                    in_token = false;
                    continue;
                }
                if !in_token {
                    in_token = true;
                    start = i;
                }
                match c {
                    '\\' => escaped = true,
                    '\'' | '"' => quote = Some(c),
                    _ => {}
                }
            }
        }
    }

    if in_token || quote.is_some() {
        start
    } else {
        line.len()
    }
}

/// Where the final path segment of the in-progress token begins, so a
/// relative candidate replaces only that segment. Falls back to the token
/// start (covering an opening quote) when the token has no separator.
fn segment_start(line: &str, token_start: usize) -> usize {
    match line[token_start..].rfind('/') {
        Some(i) => token_start + i + 1,
        None => token_start,
    }
}

fn quoted(s: &str) -> String {
    shlex::try_quote(s)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

impl CompletionEngine {
    pub fn new(session: Rc<RefCell<Session>>) -> Self {
        CompletionEngine { session }
    }

    /// Produce ranked candidates for the buffer-up-to-cursor. Tokeniser
    /// and quoting errors propagate; backend failures while listing
    /// degrade to an empty result so completion never interrupts typing.
    pub fn complete(&self, buffer: &str, cursor: usize) -> Result<Vec<Candidate>> {
        let line = &buffer[..cursor.min(buffer.len())];
        let parsed_as_is = shlex::split(line).is_some();
        let mut words = split_with_repair(line)?;

        // An empty buffer means the command name itself is in progress,
        // as does unquoted trailing whitespace for the next argument
        let ends_in_space = line.chars().last().is_some_and(char::is_whitespace);
        if words.is_empty() {
            words.push(String::new());
        } else if parsed_as_is && ends_in_space {
            words.push(String::new());
        }

        let token_start = last_token_start(line);
        let cmd = words[0].clone();

        if words.len() == 1 {
            let candidates = command::RECOGNISED_COMMANDS
                .iter()
                .filter(|c| c.starts_with(&cmd))
                .map(|c| Candidate {
                    replacement: c.to_string(),
                    start: token_start,
                })
                .collect();
            return Ok(candidates);
        }

        let replacements = match cmd.as_str() {
            "put" => self.complete_transfer(&words, false),
            "get" => self.complete_transfer(&words, true),
            c if command::expects_remote_path(c) => {
                let partial = words.last().map(String::as_str).unwrap_or("");
                self.complete_remote_path(partial, command::expects_key(c))
            }
            _ => Ok(Vec::new()),
        }?;

        let start = segment_start(line, token_start);
        Ok(replacements
            .into_iter()
            .map(|replacement| Candidate { replacement, start })
            .collect())
    }

    /// put expects a local path then a remote one; get the other way
    /// round. Flags don't count toward the argument position.
    fn complete_transfer(&self, words: &[String], s3_first: bool) -> Result<Vec<String>> {
        let args: Vec<&String> = words[1..].iter().filter(|w| !w.starts_with('-')).collect();
        let Some(partial) = args.last() else {
            return Ok(Vec::new());
        };

        match (s3_first, args.len()) {
            (true, 1) | (false, 2) => self.complete_remote_path(partial, true),
            (true, 2) | (false, 1) => Ok(self.complete_local_path(partial)),
            _ => Ok(Vec::new()),
        }
    }

    /// Look up possible continuations of a partial remote path one level
    /// up from the cursor. A trailing `.` or `..` is ambiguous between
    /// relative navigation and a key literally so named, so the literal
    /// `./` / `../` continuation is offered alongside any matches.
    fn complete_remote_path(&self, partial: &str, allow_keys: bool) -> Result<Vec<String>> {
        let mut res = Vec::new();
        if partial == "." || partial.ends_with("/.") {
            res.push("./".to_string());
        } else if partial == ".." || partial.ends_with("/..") {
            res.push("../".to_string());
        }

        let mut session = self.session.borrow_mut();
        let path = session.normalise_path(partial)?;
        let fragment = !partial.ends_with('/');

        let entries = match session.ls(&path, fragment) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("completion listing failed for {}: {}", path, e);
                Vec::new()
            }
        };

        res.extend(
            entries
                .iter()
                .filter(|e| allow_keys || !e.is_terminal())
                .map(|e| quoted(&e.display_name())),
        );

        Ok(res)
    }

    /// Complete against the real filesystem: expand `~`, offer an exact
    /// file's basename alone, otherwise list the directory filtered by
    /// the final segment. Candidates are shell-quoted since they get
    /// spliced back into the edit buffer.
    fn complete_local_path(&self, partial: &str) -> Vec<String> {
        let home = dirs::home_dir();
        if partial == "~" {
            return home
                .map(|h| vec![h.to_string_lossy().into_owned()])
                .unwrap_or_default();
        }

        let expanded = match (partial.strip_prefix("~/"), home) {
            (Some(rest), Some(h)) => h.join(rest).to_string_lossy().into_owned(),
            _ => partial.to_string(),
        };
        let as_path = Path::new(&expanded);

        if as_path.is_file() {
            return as_path
                .file_name()
                .map(|n| vec![quoted(&n.to_string_lossy())])
                .unwrap_or_default();
        }

        let (dir, frag) = if expanded.ends_with('/') && as_path.is_dir() {
            (expanded.as_str(), "")
        } else {
            match expanded.rsplit_once('/') {
                Some(("", frag)) => ("/", frag),
                Some((dir, frag)) => (dir, frag),
                None => (".", expanded.as_str()),
            }
        };

        let Ok(listing) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut hits: Vec<String> = listing
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(frag))
            .map(|name| quoted(&name))
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// rustyline glue: hands the raw line and cursor to the engine and swallows
/// every error into "no candidates" so completion can't break the prompt.
pub struct ShellHelper {
    pub engine: CompletionEngine,
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        match self.engine.complete(line, pos) {
            Ok(candidates) if !candidates.is_empty() => {
                let start = candidates[0].start;
                let pairs = candidates
                    .into_iter()
                    .map(|c| Pair {
                        display: c.replacement.clone(),
                        replacement: c.replacement,
                    })
                    .collect();
                Ok((start, pairs))
            }
            _ => Ok((pos, Vec::new())),
        }
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}
impl Helper for ShellHelper {}
