/*!
 * Keystone CLI - Command Line Interface
 *
 * Version: 0.1.0
 * Author: Shane Wall <shaneawall@gmail.com>
 */

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use keystone::{
    cli_style,
    commands::{
        bump::run_bump,
        init::{run_init, InitOptions},
        keygen::run_keygen,
        verify::{print_report, run_verify},
    },
    config::{KeystoneConfig, LogLevel},
    error::{Result, EXIT_SUCCESS},
    logging,
    manifest::ManifestKind,
};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "keystone")]
#[command(version, about = "Tamper-evident signed manifest repository", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Path to config file (default: ~/.keystone/keystone.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate signing keys for every manifest role
    Keygen {
        /// Key directory (default: keys_dir from config)
        #[arg(long, value_name = "DIR")]
        keys: Option<PathBuf>,

        /// Write a new set even if keys already exist
        #[arg(long)]
        force: bool,
    },

    /// Bootstrap a new repository
    Init {
        /// Repository directory (default: repo_dir from config)
        #[arg(long, value_name = "DIR")]
        repo: Option<PathBuf>,

        /// Key directory (default: keys_dir from config)
        #[arg(long, value_name = "DIR")]
        keys: Option<PathBuf>,

        /// Replace an existing repository
        #[arg(long)]
        force: bool,

        /// Do not ask before replacing
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Verify signatures, expiry and cross-references
    Verify {
        /// Repository directory (default: repo_dir from config)
        #[arg(long, value_name = "DIR")]
        repo: Option<PathBuf>,

        /// Output one JSON object per manifest
        #[arg(long)]
        json: bool,
    },

    /// Republish Root or Index with a new version
    Bump {
        /// Manifest to republish
        #[arg(value_enum)]
        kind: BumpKind,

        /// Repository directory (default: repo_dir from config)
        #[arg(long, value_name = "DIR")]
        repo: Option<PathBuf>,

        /// Key directory (default: keys_dir from config)
        #[arg(long, value_name = "DIR")]
        keys: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BumpKind {
    Root,
    Index,
}

impl From<BumpKind> for ManifestKind {
    fn from(kind: BumpKind) -> Self {
        match kind {
            BumpKind::Root => ManifestKind::Root,
            BumpKind::Index => ManifestKind::Index,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!(category = %e.category(), "{}", e);
            cli_style::print_error(&e.to_string(), e.hint());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = KeystoneConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let registry = config.registry()?;
    let now = Utc::now();

    match cli.command {
        Commands::Keygen { keys, force } => {
            let keys_dir = keys.unwrap_or(config.keys_dir);
            run_keygen(&registry, &keys_dir, force)?;
        }
        Commands::Init {
            repo,
            keys,
            force,
            yes,
        } => {
            let options = InitOptions {
                repo_dir: repo.unwrap_or(config.repo_dir),
                keys_dir: keys.unwrap_or(config.keys_dir),
                force,
                assume_yes: yes,
            };
            run_init(&registry, &options, now)?;
        }
        Commands::Verify { repo, json } => {
            let repo_dir = repo.unwrap_or(config.repo_dir);
            let rows = run_verify(&registry, &repo_dir, now)?;
            print_report(&repo_dir, &rows, json)?;
        }
        Commands::Bump { kind, repo, keys } => {
            let repo_dir = repo.unwrap_or(config.repo_dir);
            let keys_dir = keys.unwrap_or(config.keys_dir);
            run_bump(&registry, &repo_dir, &keys_dir, kind.into(), now)?;
        }
    }

    Ok(())
}
