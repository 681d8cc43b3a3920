//! s3nav - interactive shell for navigating object storage
//!
//! Wires the navigation core (paths, cache, completion, bookmarks) to a
//! rustyline prompt and dispatches the recognized commands.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use s3nav::bookmarks::BookmarkManager;
use s3nav::client::S3Client;
use s3nav::command::Command;
use s3nav::completion::{CompletionEngine, ShellHelper};
use s3nav::display;
use s3nav::logger;
use s3nav::paths::S3Path;
use s3nav::session::Session;

const DEFAULT_PS1: &str = "s3://{path_short}> ";

const SPLASH: &str = "
Welcome to the interactive s3 navigator.

Type 'help' for help.
";

const HELP: &str = "
Available commands:

help            Print this help message
exit            Bye!

bookmark        Add, remove, or list bookmarks.
                Use 'bookmark help' for more details.
cat [key]       Print the contents of a (textual) key
cd [path]       Change directory
clear           Clear the screen
file [key]      Show extended metadata about a given key
get KEY [FILE]  Download a key to a local file
head [key]      Alias for file
ll [path]       Like ls, but show modified times and object types
ls [path]       List the contents of an s3 \"directory\"
prompt [str]    Override the current prompt string
put FILE KEY    Upload a local file to a key
pwd             Print the current working directory
refresh         Clear the ls cache
rm [key]        Delete a key

Tab completion is available on paths and keys.
";

const BOOKMARK_HELP: &str = "
Add, remove, or list bookmarks.

add NAME PATH   Add a bookmark called NAME pointing at PATH
rm NAME         Remove the named bookmark
list, ls        List all bookmarks
";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Interactive shell for navigating S3-style object storage like a filesystem"
)]
struct Args {
    /// Prompt string; the patterns {path}, {path_short} and {path_end}
    /// expand to the current location
    #[arg(short = 'p', long)]
    prompt: Option<String>,

    /// Bookmark file (default: ~/.s3nav_bookmarks)
    #[arg(long = "bookmarks")]
    bookmark_file: Option<PathBuf>,

    /// History file (default: ~/.s3nav_history)
    #[arg(long = "history")]
    history_file: Option<PathBuf>,

    /// Custom S3-compatible endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Log debug information to a file in the temp directory
    #[arg(long)]
    debug: bool,

    /// Initial working directory
    #[arg(default_value = "/")]
    working_dir: String,
}

/// Print a message in red
fn err(msg: impl std::fmt::Display) {
    eprintln!("\x1b[31m{}\x1b[0m", msg);
}

fn render_prompt(ps1: &str, path: &S3Path) -> String {
    ps1.replace("{path}", &path.path_string())
        .replace("{path_short}", &path.short_format())
        .replace(
            "{path_end}",
            path.name().or(path.bucket.as_deref()).unwrap_or("/"),
        )
}

struct Shell {
    session: Rc<RefCell<Session>>,
    ps1: String,
    history_file: Option<PathBuf>,
}

enum Flow {
    Continue,
    Exit,
}

impl Shell {
    fn read_loop(&mut self) -> Result<()> {
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(ShellHelper {
            engine: CompletionEngine::new(self.session.clone()),
        }));

        if let Some(h) = &self.history_file {
            let _ = rl.load_history(h);
        }

        println!("{}", SPLASH);

        loop {
            let prompt = render_prompt(&self.ps1, &self.session.borrow().current_path);

            match rl.readline(&prompt) {
                Ok(line) => {
                    let words = shlex::split(&line).unwrap_or_else(|| {
                        // unbalanced quotes: degrade to whitespace splitting
                        line.split_whitespace().map(str::to_string).collect()
                    });
                    if words.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line.as_str());

                    match Command::parse(&words).and_then(|cmd| self.dispatch(cmd)) {
                        Ok(Flow::Exit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => err(e),
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(h) = &self.history_file {
            let _ = rl.save_history(h);
        }
        Ok(())
    }

    fn dispatch(&mut self, cmd: Command) -> Result<Flow> {
        debug!("dispatching {:?}", cmd);

        match cmd {
            Command::Bookmark { args } => self.bookmark(&args)?,
            Command::Cat { key } => {
                let session = self.session.borrow_mut();
                let path = session.normalise_path(&key)?;
                let body = session.read(&path)?;
                display::print_object(&body)?;
            }
            Command::Cd { path } => {
                let mut session = self.session.borrow_mut();
                if !session.cd(&path)? {
                    bail!("cannot access '{}': no such s3 directory", path);
                }
            }
            Command::Clear => {
                crossterm::execute!(
                    std::io::stdout(),
                    Clear(ClearType::All),
                    MoveTo(0, 0)
                )?;
            }
            Command::Exit => return Ok(Flow::Exit),
            Command::File { key } => {
                let session = self.session.borrow_mut();
                let path = session.normalise_path(&key)?;
                let meta = session.head(&path)?;
                println!("\x1b[33m{}\x1b[0m", path.canonical());
                println!();
                display::print_head_meta(&meta);
            }
            Command::Get { remote, local } => {
                let session = self.session.borrow_mut();
                let path = session.normalise_path(&remote)?;
                let local = match local {
                    Some(l) => PathBuf::from(l),
                    None => PathBuf::from(path.name().context("no key name to download")?),
                };
                session.get(&path, &local)?;
                println!("Downloaded {} to {}", path.canonical(), local.display());
            }
            Command::Help => println!("{}", HELP),
            Command::Ll { path } => {
                let mut session = self.session.borrow_mut();
                let target = session.normalise_path(&path)?;
                let entries = session.ls(&target, false)?;
                let annotations = session.annotate_bookmarks(&entries);
                let lines: Vec<String> = entries
                    .iter()
                    .zip(&annotations)
                    .map(|(e, b)| e.detail_line(b.as_deref()))
                    .collect();
                display::print_grid(&lines);
            }
            Command::Ls { path } => {
                let mut session = self.session.borrow_mut();
                let target = session.normalise_path(&path)?;
                let entries = session.ls(&target, false)?;
                let names: Vec<String> = entries.iter().map(|e| e.display_name()).collect();
                display::print_grid(&names);
            }
            Command::Prompt { value } => {
                self.ps1 = match value {
                    Some(v) => format!("{} ", v),
                    None => DEFAULT_PS1.to_string(),
                };
            }
            Command::Put { local, remote } => {
                let mut session = self.session.borrow_mut();
                let mut path = session.normalise_path(&remote)?;
                // uploading "into" a directory keeps the local basename
                if path.key.is_none() || remote.ends_with('/') {
                    let name = Path::new(&local)
                        .file_name()
                        .context("no local file name to upload")?
                        .to_string_lossy()
                        .into_owned();
                    path = session.normalise_path(&format!("{}/{}", path.path_string(), name))?;
                }
                session.put(Path::new(&local), &path)?;
                println!("Uploaded {} to {}", local, path.canonical());
            }
            Command::Pwd => {
                println!("{}", self.session.borrow().current_path.canonical());
            }
            Command::Refresh => {
                let count = self.session.borrow_mut().cache.clear();
                println!("Cleared {} cached paths.", count);
            }
            Command::Rm { key } => {
                let mut session = self.session.borrow_mut();
                let path = session.normalise_path(&key)?;
                session.rm(&path)?;
            }
        }

        Ok(Flow::Continue)
    }

    fn bookmark(&mut self, args: &[String]) -> Result<()> {
        let mut session = self.session.borrow_mut();
        if session.bookmarks.is_none() {
            bail!("Bookmarks are unavailable");
        }

        match args.first().map(String::as_str) {
            Some("add") => {
                let [_, name, path] = args else {
                    bail!("usage: bookmark add NAME PATH");
                };
                if !BookmarkManager::validate_key(name) {
                    bail!("{} is an invalid name for a bookmark", name);
                }
                let target = session.normalise_path(path)?;
                if !session.exists(&target)? {
                    bail!("cannot bookmark '{}': not an s3 directory", target);
                }
                let name = name.clone();
                session
                    .bookmarks
                    .as_mut()
                    .unwrap()
                    .add(&name, &target.path_string())?;
            }
            Some("rm") => {
                let [_, name] = args else {
                    bail!("usage: bookmark rm NAME");
                };
                if !session.bookmarks.as_mut().unwrap().remove(name)? {
                    bail!("{} is not the name of a bookmark", name);
                }
            }
            Some("ls") | Some("list") => {
                for (name, bookmark) in session.bookmarks.as_ref().unwrap().iter() {
                    println!("\x1b[33m${: <18}\x1b[0m {}", name, bookmark.path);
                }
            }
            Some("help") => println!("{}", BOOKMARK_HELP),
            _ => bail!("Bad operation. Try 'bookmark help' for correct usage"),
        }

        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        let log_file = logger::default_log_file();
        logger::init(&log_file)
            .with_context(|| format!("initializing log file {}", log_file.display()))?;
        info!("starting s3nav in debug mode");
    }

    let home = dirs::home_dir();
    let bookmark_file = args
        .bookmark_file
        .or_else(|| home.as_ref().map(|h| h.join(".s3nav_bookmarks")));
    let history_file = args
        .history_file
        .or_else(|| home.as_ref().map(|h| h.join(".s3nav_history")));

    let client = S3Client::new(args.endpoint.as_deref())?;
    let bookmarks = bookmark_file.map(|f| BookmarkManager::open(&f));
    if let Some(b) = &bookmarks {
        if !b.available() {
            err("Bookmark file is unreadable; bookmarks are disabled for this session");
        }
    }

    let session = Session::new(Box::new(client), &args.working_dir, bookmarks);

    let mut shell = Shell {
        session: Rc::new(RefCell::new(session)),
        ps1: args.prompt.unwrap_or_else(|| DEFAULT_PS1.to_string()),
        history_file,
    };
    shell.read_loop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_placeholders() {
        let path = S3Path::from_path("bucket/a/b/leaf");
        assert_eq!(render_prompt("{path}> ", &path), "/bucket/a/b/leaf> ");
        assert_eq!(render_prompt("s3://{path_short}> ", &path), "s3://bucket/…/leaf> ");
        assert_eq!(render_prompt("[{path_end}] ", &path), "[leaf] ");

        let root = S3Path::from_path("/");
        assert_eq!(render_prompt("[{path_end}] ", &root), "[/] ");
    }
}
