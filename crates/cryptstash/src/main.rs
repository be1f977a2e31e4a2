// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! cryptstash - a layered passphrase vault for small secrets.
//!
//! This is the binary entry point: argument parsing, logging setup and
//! dispatch to the one-shot commands or the interactive shell.

mod commands;
mod shell;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use cryptstash_config::CryptstashConfig;
use cryptstash_core::StageSpec;

use crate::commands::CommandError;

/// cryptstash - a layered passphrase vault for small secrets.
#[derive(Parser, Debug)]
#[command(name = "cryptstash", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log more (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new vault.
    Init {
        file: Option<PathBuf>,
        /// Stage as cipher:key_handler[:name=value,...], innermost first.
        #[arg(long = "stage", value_name = "SPEC")]
        stages: Vec<StageSpec>,
    },
    /// Open an interactive session, creating the vault if it is missing.
    Shell { file: Option<PathBuf> },
    /// List entry labels.
    Ls { file: Option<PathBuf> },
    /// Print one entry.
    Get(Target),
    /// Store one entry, reading the value from stdin.
    Set(Target),
    /// Delete one entry.
    Rm(Target),
    /// Change the vault passphrase.
    Passwd { file: Option<PathBuf> },
    /// Print the effective configuration as TOML.
    Config,
}

/// `[FILE] LABEL` arguments.
#[derive(Args, Debug)]
struct Target {
    #[arg(num_args = 1..=2, required = true, value_name = "[FILE] LABEL")]
    args: Vec<String>,
}

impl Target {
    fn split(&self) -> (Option<PathBuf>, &str) {
        match self.args.as_slice() {
            [file, label] => (Some(PathBuf::from(file)), label.as_str()),
            [label] => (None, label.as_str()),
            _ => (None, ""),
        }
    }
}

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// The configured level raised by one step per `-v`.
fn log_level(configured: &str, verbose: u8) -> String {
    if verbose == 0 {
        return configured.to_ascii_lowercase();
    }
    let base = LEVELS
        .iter()
        .position(|level| level.eq_ignore_ascii_case(configured))
        .unwrap_or(1);
    LEVELS[(base + usize::from(verbose)).min(LEVELS.len() - 1)].to_string()
}

/// Logs go to stderr; stdout carries secret values and must stay clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cryptstash={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, config: &CryptstashConfig) -> Result<(), CommandError> {
    let vault_path = |file: Option<PathBuf>| file.unwrap_or_else(|| config.vault.default_path.clone());

    match cli.command {
        Commands::Init { file, stages } => commands::init(config, &vault_path(file), &stages),
        Commands::Shell { file } => shell::run_shell(config, vault_path(file)),
        Commands::Ls { file } => commands::list(config, &vault_path(file)),
        Commands::Get(target) => {
            let (file, label) = target.split();
            commands::get(config, &vault_path(file), label)
        }
        Commands::Set(target) => {
            let (file, label) = target.split();
            commands::set(config, &vault_path(file), label)
        }
        Commands::Rm(target) => {
            let (file, label) = target.split();
            commands::remove(config, &vault_path(file), label)
        }
        Commands::Passwd { file } => commands::passwd(config, &vault_path(file)),
        Commands::Config => commands::print_config(config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cryptstash_config::load_and_validate(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            cryptstash_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&log_level(&config.general.log_level, cli.verbose));

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn file_is_optional_before_label() {
        let cli = Cli::try_parse_from(["cryptstash", "get", "github"]).unwrap();
        let Commands::Get(target) = cli.command else {
            panic!("expected get");
        };
        assert_eq!(target.split(), (None, "github"));

        let cli = Cli::try_parse_from(["cryptstash", "rm", "work.json", "github"]).unwrap();
        let Commands::Rm(target) = cli.command else {
            panic!("expected rm");
        };
        assert_eq!(target.split(), (Some(PathBuf::from("work.json")), "github"));

        assert!(Cli::try_parse_from(["cryptstash", "get"]).is_err());
        assert!(Cli::try_parse_from(["cryptstash", "get", "a", "b", "c"]).is_err());
    }

    #[test]
    fn init_accepts_stage_specs() {
        let cli = Cli::try_parse_from([
            "cryptstash",
            "init",
            "new.json",
            "--stage",
            "aes:scrypt:time=0.5",
            "--stage",
            "blowfish:pbkdf2",
        ])
        .unwrap();
        let Commands::Init { file, stages } = cli.command else {
            panic!("expected init");
        };
        assert_eq!(file, Some(PathBuf::from("new.json")));
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].options.raw("time"), Some("0.5"));
    }

    #[test]
    fn malformed_stage_spec_is_a_usage_error() {
        assert!(Cli::try_parse_from(["cryptstash", "init", "--stage", "aes"]).is_err());
    }

    #[test]
    fn verbosity_raises_the_configured_level() {
        assert_eq!(log_level("warn", 0), "warn");
        assert_eq!(log_level("warn", 1), "info");
        assert_eq!(log_level("WARN", 2), "debug");
        assert_eq!(log_level("info", 9), "trace");
        assert_eq!(log_level("off", 0), "off");
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["cryptstash", "ls", "-vv", "--config", "c.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }
}
