//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Question trees: break a yes/no question into atomic subquestions and answer them from NBA statistics
#[derive(Parser, Debug)]
#[command(name = "qtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Directory holding the local .qtree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, resolve and save the question tree for a question
    Ask {
        /// Yes/no question to decompose
        question: String,

        /// Tree depth below the root (default from config)
        #[arg(long)]
        depth: Option<usize>,

        /// Output file for the tree document (default from config)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        /// Keep building when a node cannot be decomposed
        #[arg(long)]
        partial: bool,

        /// Only build the tree, do not resolve it
        #[arg(long)]
        skip_resolve: bool,

        /// Concurrent resolve calls (default from config)
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: Option<u16>,
    },

    /// Render a saved tree document
    Show {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// List the statistics operations available to the oracle
    Tools,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config (API keys masked)
    Show,

    /// Show config paths
    Path,

    /// Print a commented config template
    Template,
}
