//! The recognized command set
//!
//! A closed enum rather than a string-keyed handler table, so dispatch is
//! exhaustive at compile time.

use anyhow::{bail, Result};

pub const RECOGNISED_COMMANDS: &[&str] = &[
    "bookmark", "cat", "cd", "clear", "exit", "file", "get", "head", "help", "ll", "ls",
    "prompt", "put", "pwd", "refresh", "rm",
];

/// Commands whose argument is an individual key (something file-like).
pub fn expects_key(cmd: &str) -> bool {
    matches!(cmd, "cat" | "file" | "head" | "rm")
}

/// Commands taking a remote path argument at all; those not in
/// [`expects_key`] only accept navigable (non-terminal) targets.
pub fn expects_remote_path(cmd: &str) -> bool {
    expects_key(cmd) || matches!(cmd, "cd" | "ls" | "ll")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Bookmark { args: Vec<String> },
    Cat { key: String },
    Cd { path: String },
    Clear,
    Exit,
    /// `file` and its alias `head`: extended metadata about a key
    File { key: String },
    Get { remote: String, local: Option<String> },
    Help,
    Ll { path: String },
    Ls { path: String },
    Prompt { value: Option<String> },
    Put { local: String, remote: String },
    Pwd,
    Refresh,
    Rm { key: String },
}

impl Command {
    /// Parse an already-tokenized input line. The first word picks the
    /// command; the rest must fit its arity.
    pub fn parse(words: &[String]) -> Result<Command> {
        let Some((cmd, args)) = words.split_first() else {
            bail!("empty command");
        };

        let one = |usage: &str| -> Result<String> {
            match args {
                [a] => Ok(a.clone()),
                _ => bail!("usage: {}", usage),
            }
        };
        let at_most_one = |usage: &str| -> Result<String> {
            match args {
                [] => Ok(String::new()),
                [a] => Ok(a.clone()),
                _ => bail!("usage: {}", usage),
            }
        };

        let parsed = match cmd.as_str() {
            "bookmark" => Command::Bookmark {
                args: args.to_vec(),
            },
            "cat" => Command::Cat {
                key: one("cat KEY")?,
            },
            "cd" => Command::Cd {
                path: at_most_one("cd [PATH]")?,
            },
            "clear" => Command::Clear,
            "exit" => Command::Exit,
            "file" | "head" => Command::File {
                key: one("file KEY")?,
            },
            "get" => match args {
                [remote] => Command::Get {
                    remote: remote.clone(),
                    local: None,
                },
                [remote, local] => Command::Get {
                    remote: remote.clone(),
                    local: Some(local.clone()),
                },
                _ => bail!("usage: get REMOTE [LOCAL]"),
            },
            "help" => Command::Help,
            "ll" => Command::Ll {
                path: at_most_one("ll [PATH]")?,
            },
            "ls" => Command::Ls {
                path: at_most_one("ls [PATH]")?,
            },
            "prompt" => Command::Prompt {
                value: if args.is_empty() {
                    None
                } else {
                    Some(args.join(" "))
                },
            },
            "put" => match args {
                [local, remote] => Command::Put {
                    local: local.clone(),
                    remote: remote.clone(),
                },
                _ => bail!("usage: put LOCAL REMOTE"),
            },
            "pwd" => Command::Pwd,
            "refresh" => Command::Refresh,
            "rm" => Command::Rm {
                key: one("rm KEY")?,
            },
            other => bail!("Unrecognised command: '{}'", other),
        };

        Ok(parsed)
    }
}
