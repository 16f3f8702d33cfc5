//! # Cli
//!
//! This module contains everything needed for parsing the CLI arguments for
//! bish.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Struct containing the CLI configuration for bish.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of bish.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings, like imports that could not be resolved.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the compiler.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally in the compiler.
    #[value(alias("3"))]
    Debug,

    /// Log extra information. This output can be quite clunky.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Translate a Bishop source file to C++.
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// The path to the Bishop source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// The path to the generated C++ file (defaults to the input with a
    /// .cpp extension).
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Compile in test mode: every test_* function becomes a test case and
    /// the generated main reports the failure count.
    #[arg(long)]
    pub test: bool,

    /// Whether to dump the parsed AST (for debugging).
    #[arg(long)]
    pub dump_parsed: bool,
}
