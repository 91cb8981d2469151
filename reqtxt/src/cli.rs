use crate::env::OnMissing;
use crate::resolver::Precedence;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and edit pip requirements files without disturbing their layout
#[derive(Parser, Debug, Clone)]
#[command(name = "reqtxt")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to reqtxt.toml in the current directory)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Report diagnostics for one or more files
    Check {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// List the requirements of a file
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replace the version specifiers of a package
    SetVersion {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "PACKAGE")]
        package: String,

        /// New specifiers, e.g. "==2.31.0" or ">=1.0,<2"
        #[arg(value_name = "SPEC")]
        specifiers: String,

        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// Follow -r and -c includes and print the merged set
    Resolve {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Expand ${VAR} placeholders from the environment
        #[arg(long)]
        expand: bool,

        /// What to do with unset variables when expanding
        #[arg(long, value_enum, requires = "expand")]
        on_missing: Option<OnMissingArg>,

        /// Which duplicate wins
        #[arg(long, value_enum)]
        precedence: Option<Precedence>,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissingArg {
    KeepLiteral,
    Error,
}

impl From<OnMissingArg> for OnMissing {
    fn from(arg: OnMissingArg) -> Self {
        match arg {
            OnMissingArg::KeepLiteral => OnMissing::KeepLiteral,
            OnMissingArg::Error => OnMissing::Error,
        }
    }
}

impl Args {
    /// Install a stderr `tracing` subscriber; `RUST_LOG` is honored too
    pub fn setup_logging(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(!self.no_color);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
