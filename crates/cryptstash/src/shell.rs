// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cryptstash shell` command implementation.
//!
//! Opens (or creates) one vault and runs a line-editing REPL over it with
//! tab completion of commands and entry labels. Changes stay in memory
//! until `save`; the prompt carries a `*` while there are unsaved changes.

use std::path::PathBuf;

use colored::Colorize;
use cryptstash_config::CryptstashConfig;
use cryptstash_vault::{Store, TerminalPrompt};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::commands::CommandError;

/// Command names offered by completion, with their help lines.
const COMMANDS: &[(&str, &str)] = &[
    ("ls", "list entry labels"),
    ("cat", "cat <label>: print an entry"),
    ("set", "set <label>: enter a value, finished by a blank line"),
    ("rm", "rm <label>: delete an entry"),
    ("save", "write the vault to disk"),
    ("passwd", "change the vault passphrase"),
    ("help", "show this help"),
    ("quit", "leave the shell"),
];

/// Commands whose argument is an entry label.
const LABEL_COMMANDS: &[&str] = &["cat", "set", "rm"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    List,
    Show(String),
    Set(String),
    Remove(String),
    Save,
    Passwd,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. The label is the rest of the line, so labels
    /// may contain spaces.
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let label = |build: fn(String) -> ShellCommand| {
            if arg.is_empty() {
                Err(format!("usage: {name} <label>"))
            } else {
                Ok(build(arg.to_string()))
            }
        };
        let bare = |command: ShellCommand| {
            if arg.is_empty() {
                Ok(command)
            } else {
                Err(format!("`{name}` takes no arguments"))
            }
        };

        match name {
            "" => Ok(ShellCommand::Empty),
            "ls" => bare(ShellCommand::List),
            "cat" => label(ShellCommand::Show),
            "set" => label(ShellCommand::Set),
            "rm" => label(ShellCommand::Remove),
            "save" => bare(ShellCommand::Save),
            "passwd" => bare(ShellCommand::Passwd),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" => bare(ShellCommand::Quit),
            other => Err(format!("unknown command `{other}`; try `help`")),
        }
    }
}

/// Completion for command names and, after a label command, entry labels.
#[derive(Debug, Default)]
struct ShellHelper {
    labels: Vec<String>,
}

impl ShellHelper {
    /// Replacement start and candidates for the text before the cursor.
    fn candidates(&self, before: &str) -> (usize, Vec<String>) {
        let trimmed = before.trim_start();
        let indent = before.len() - trimmed.len();
        match trimmed.split_once(char::is_whitespace) {
            None => {
                let names = COMMANDS
                    .iter()
                    .map(|(name, _)| *name)
                    .filter(|name| name.starts_with(trimmed))
                    .map(str::to_string)
                    .collect();
                (indent, names)
            }
            Some((command, rest)) if LABEL_COMMANDS.contains(&command) => {
                let partial = rest.trim_start();
                let start = before.len() - partial.len();
                let labels = self
                    .labels
                    .iter()
                    .filter(|label| label.starts_with(partial))
                    .cloned()
                    .collect();
                (start, labels)
            }
            Some(_) => (before.len(), Vec::new()),
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, candidates) = self.candidates(&line[..pos]);
        let pairs = candidates
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

type ShellEditor = Editor<ShellHelper, DefaultHistory>;

struct Session<'a> {
    config: &'a CryptstashConfig,
    store: Store,
    path: PathBuf,
    /// Set after an unsaved-changes warning so a second quit goes through.
    quit_warned: bool,
}

/// Runs the `cryptstash shell` interactive REPL.
pub fn run_shell(config: &CryptstashConfig, path: PathBuf) -> Result<(), CommandError> {
    let prompt = TerminalPrompt::new(config.vault.per_stage_passphrases);
    let store = Store::open_or_create(&path, &config.stage_specs(), prompt)?;

    let mut rl = ShellEditor::new()?;
    rl.set_helper(Some(ShellHelper::default()));

    println!("{} {}", "cryptstash shell".bold().green(), path.display());
    if store.is_modified() {
        println!("{}", "new vault; `save` to write it".yellow());
    } else {
        println!("{} entries", store.len());
    }
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    let mut session = Session {
        config,
        store,
        path,
        quit_warned: false,
    };

    loop {
        if let Some(helper) = rl.helper_mut() {
            helper.labels = session.store.labels().map(str::to_string).collect();
        }

        let marker = if session.store.is_modified() { "*" } else { "" };
        let prompt = format!("{}{}> ", "cryptstash".green(), marker.yellow());

        let command = match rl.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match ShellCommand::parse(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        eprintln!("{message}");
                        continue;
                    }
                }
            }
            // Ctrl+C / Ctrl+D
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => ShellCommand::Quit,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };

        if command == ShellCommand::Quit {
            if session.store.is_modified() && !session.quit_warned {
                session.quit_warned = true;
                eprintln!(
                    "{}",
                    "unsaved changes; `save` first or quit again to discard them".yellow()
                );
                continue;
            }
            break;
        }
        session.quit_warned = false;

        if let Err(e) = session.execute(&mut rl, command) {
            eprintln!("{}: {e}", "error".red());
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

impl Session<'_> {
    fn execute(&mut self, rl: &mut ShellEditor, command: ShellCommand) -> Result<(), CommandError> {
        match command {
            ShellCommand::Empty | ShellCommand::Quit => {}
            ShellCommand::List => {
                if self.store.is_empty() {
                    println!("{}", "(no entries)".dimmed());
                }
                for label in self.store.labels() {
                    println!("{label}");
                }
            }
            ShellCommand::Show(label) => {
                let value = self
                    .store
                    .get(&label)
                    .ok_or(CommandError::NoSuchLabel(label.clone()))?;
                println!("{value}");
            }
            ShellCommand::Set(label) => match read_value(rl)? {
                None => println!("{}", "cancelled, nothing stored".dimmed()),
                Some(value) => {
                    if store_value(&mut self.store, &label, value) {
                        println!("replaced `{label}`");
                    } else {
                        println!("stored `{label}`");
                    }
                }
            },
            ShellCommand::Remove(label) => {
                if self.store.remove(&label).is_none() {
                    return Err(CommandError::NoSuchLabel(label));
                }
                println!("removed `{label}`");
            }
            ShellCommand::Save => {
                self.store.save(&self.path)?;
                println!("saved {}", self.path.display());
            }
            ShellCommand::Passwd => self.change_passphrase()?,
            ShellCommand::Help => {
                for (name, help) in COMMANDS {
                    println!("  {:<8} {}", name.yellow(), help);
                }
            }
        }
        Ok(())
    }

    /// Ask for the current passphrase before accepting a new one.
    fn change_passphrase(&mut self) -> Result<(), CommandError> {
        let current = rpassword::prompt_password("Current vault passphrase: ")
            .map(SecretString::from)
            .map_err(|source| CommandError::Input {
                what: "passphrase",
                source,
            })?;
        if !self.store.check_passphrase(&current)? {
            warn!("passphrase change refused: current passphrase rejected");
            println!("{}", "passphrase incorrect".red());
            return Ok(());
        }
        self.store
            .change_passphrases(TerminalPrompt::new(self.config.vault.per_stage_passphrases))?;
        println!("passphrase changed; `save` to keep it");
        Ok(())
    }
}

/// Store `value` under `label`, empty or not; true when it replaced one.
fn store_value(store: &mut Store, label: &str, value: String) -> bool {
    let replaced = store.set(label, value).is_some();
    debug!(replaced, "entry stored");
    replaced
}

/// Value lines until a blank line, joined and trimmed. `None` when Ctrl-C
/// cancels the entry.
fn read_value(rl: &mut ShellEditor) -> Result<Option<String>, CommandError> {
    println!("{}", "enter the value; finish with a blank line".dimmed());
    let mut lines = Vec::new();
    loop {
        match rl.readline("... ") {
            Ok(line) if line.trim().is_empty() => break,
            Ok(line) => lines.push(line),
            Err(ReadlineError::Interrupted) => {
                debug!("value entry cancelled");
                return Ok(None);
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(lines.join("\n").trim().to_string()))
}
