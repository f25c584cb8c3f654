//! Revcheck CLI - Command-line tool for Battle.net revision checks and Warden crypto

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

mod commands;
mod config;
mod output;

use revcheck::{ExecutionMode, LoadStrategy};

// Global context for commands to access
pub static GLOBAL_OPTS: OnceLock<GlobalOptions> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub output: OutputFormat,
    pub verbose: u8,
    pub quiet: bool,
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum StrategyArg {
    OnDemand,
    Preload,
    PreloadRetain,
}

impl From<StrategyArg> for LoadStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::OnDemand => LoadStrategy::OnDemand,
            StrategyArg::Preload => LoadStrategy::Preload,
            StrategyArg::PreloadRetain => LoadStrategy::PreloadRetain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum ExecutionArg {
    Interpreted,
    Compiled,
}

impl From<ExecutionArg> for ExecutionMode {
    fn from(arg: ExecutionArg) -> Self {
        match arg {
            ExecutionArg::Interpreted => ExecutionMode::Interpreted,
            ExecutionArg::Compiled => ExecutionMode::Compiled,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "revcheck-cli",
    about = "Command-line tool for Battle.net revision checks and Warden crypto",
    long_about = None,
    after_help = "EXAMPLES:
    # Compute a revision check checksum
    revcheck-cli checksum -V \"A=1 B=2 C=3 4 A=A-S B=B-C C=C-A A=A+B\" -m IX86ver1.mpq \\
        StarCraft.exe Storm.dll Battle.snp

    # Show the canonical form of a value string
    revcheck-cli formula \"C=3 A=1 B=2 4 A=A-S B=B-C C=C-A A=A+B\"

    # Derive the MPQ index from an archive name
    revcheck-cli mpq-index ver-IX86-3.mpq

    # Encrypt hex data for the Warden channel
    revcheck-cli warden encrypt --seed 0x12345678 00010203

    # Generate shell completions
    revcheck-cli completion bash > ~/.bash_completion.d/revcheck-cli.bash"
)]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(global = true, short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(global = true, short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(global = true, short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable colored output
    #[arg(global = true, long)]
    no_color: bool,

    /// Configuration file (defaults to ~/.config/revcheck/config.toml)
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a revision check checksum over three files
    Checksum {
        /// Value string sent by the server
        #[arg(short = 'V', long)]
        value: String,

        /// MPQ archive name sent by the server
        #[arg(short = 'm', long, conflicts_with = "index", required_unless_present = "index")]
        mpq: Option<String>,

        /// MPQ index (0-7), instead of an archive name
        #[arg(short = 'i', long, value_parser = clap::value_parser!(u8).range(0..=7))]
        index: Option<u8>,

        /// File loading strategy
        #[arg(short = 's', long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Program execution mode
        #[arg(short = 'e', long, value_enum)]
        execution: Option<ExecutionArg>,

        /// The three files to hash, in order
        #[arg(num_args = 3, required = true)]
        files: Vec<PathBuf>,
    },
    /// Parse a value string and show its canonical form
    Formula {
        /// Value string to parse
        value: String,
    },
    /// Derive the MPQ index from an archive name
    MpqIndex {
        /// Archive name, e.g. IX86ver1.mpq or ver-IX86-1.mpq
        name: String,
    },
    /// Warden channel crypto
    #[command(subcommand)]
    Warden(WardenCommands),
    /// Generate shell completion scripts
    #[command(about = "Generate completion scripts for your shell")]
    Completion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum WardenCommands {
    /// Encrypt hex data with the send key of a session
    Encrypt {
        /// Session seed (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = commands::warden::parse_seed)]
        seed: u32,
        /// Use the peer's key order
        #[arg(long)]
        mirrored: bool,
        /// Data as hex
        data: String,
    },
    /// Decrypt hex data with the receive key of a session
    Decrypt {
        /// Session seed (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = commands::warden::parse_seed)]
        seed: u32,
        /// Use the peer's key order
        #[arg(long)]
        mirrored: bool,
        /// Data as hex
        data: String,
    },
    /// Show the keys and generator output derived from a seed
    Keys {
        /// Session seed (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = commands::warden::parse_seed)]
        seed: u32,
        /// Number of extra generator bytes to show after the keys
        #[arg(short = 'n', long, default_value = "0")]
        extra: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up colored output based on flags
    if cli.no_color || cli.output != OutputFormat::Text {
        colored::control::set_override(false);
    }

    // Configure logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Store global options for commands to access
    let global_opts = GlobalOptions {
        output: cli.output,
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: cli.no_color,
    };

    GLOBAL_OPTS
        .set(global_opts)
        .expect("Failed to set global options");

    let config = config::load_config(cli.config.as_ref())?;

    // Execute command
    match cli.command {
        Commands::Checksum {
            value,
            mpq,
            index,
            strategy,
            execution,
            files,
        } => {
            let mut revision = config.revision.clone();
            if let Some(strategy) = strategy {
                revision.strategy = strategy.into();
            }
            if let Some(execution) = execution {
                revision.execution = execution.into();
            }

            let target = match (mpq, index) {
                (Some(name), _) => commands::revision::MpqTarget::Name(name),
                (None, Some(index)) => commands::revision::MpqTarget::Index(index as usize),
                (None, None) => unreachable!(),
            };

            commands::revision::checksum(&value, target, &files, revision)?;
        }
        Commands::Formula { value } => {
            commands::revision::formula(&value)?;
        }
        Commands::MpqIndex { name } => {
            commands::revision::mpq_index(&name)?;
        }
        Commands::Warden(warden_cmd) => match warden_cmd {
            WardenCommands::Encrypt {
                seed,
                mirrored,
                data,
            } => {
                commands::warden::crypt(seed, mirrored, &data, commands::warden::Direction::Send)?;
            }
            WardenCommands::Decrypt {
                seed,
                mirrored,
                data,
            } => {
                commands::warden::crypt(
                    seed,
                    mirrored,
                    &data,
                    commands::warden::Direction::Receive,
                )?;
            }
            WardenCommands::Keys { seed, extra } => {
                commands::warden::keys(seed, extra)?;
            }
        },
        Commands::Completion { shell } => {
            // Generate completion script for the specified shell
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
