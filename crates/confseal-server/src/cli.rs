//! Command-line interface

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// confseal - layered configuration with secret indirection and redacted export
#[derive(Parser, Debug)]
#[command(name = "confseal", version)]
pub struct Cli {
    /// Settings file (defaults to <config_dir>/confseal/confseal.yaml)
    #[arg(long, short, env = "CONFSEAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "CONFSEAL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides `listen` in the settings file)
        #[arg(long, env = "CONFSEAL_LISTEN")]
        listen: Option<SocketAddr>,
    },

    /// Resolve the configured sources once and write the redacted result
    Export {
        /// properties, json or yaml
        #[arg(long, short, default_value = "properties")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Encrypt a value into its {cipher} form
    Encrypt {
        /// Value to encrypt (read from stdin if omitted)
        value: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
