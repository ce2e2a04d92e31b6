//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Hierarchical station notes: reshape an always-acyclic forest from the terminal
#[derive(Parser, Debug)]
#[command(name = "stationmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more: -d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Explicit config file, layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Forest document (overrides `data_file`)
    #[arg(short = 'f', long, global = true, value_hint = ValueHint::FilePath)]
    pub data_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Show the forest as a tree
    Tree,

    /// List stations in depth-first order
    List {
        /// Include children of collapsed stations
        #[arg(short, long)]
        all: bool,
    },

    /// Add a new top-level station
    Add {
        /// Name (default: "Station N")
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove a station and its whole subtree
    Remove { id: String },

    /// Rename a station
    Rename { id: String, name: String },

    /// Recolor a station and descendants sharing its color
    Recolor { id: String, color: String },

    /// Replace a station's notes
    Notes { id: String, text: String },

    /// Collapse or expand a station's children
    Toggle { id: String },

    /// Move a station to the top level
    Detach { id: String },

    /// Make SOURCE a child of TARGET
    Connect { source: String, target: String },

    /// Run the force layout and print positions as JSON
    Layout {
        /// Maximum simulation steps
        #[arg(short, long, default_value_t = 300)]
        ticks: usize,
    },

    /// Print the search corpus as JSON lines
    Corpus,

    /// Read commands from stdin, one per line, within one session
    Shell,

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

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented template
    Template,
    /// Show config file locations
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_connect_args_when_parsed_then_positional_source_and_target() {
        let cli = Cli::try_parse_from(["stationmap", "-dd", "connect", "a", "b"]).unwrap();
        assert_eq!(cli.debug, 2);
        assert_eq!(
            cli.command,
            Some(Commands::Connect {
                source: "a".into(),
                target: "b".into()
            })
        );
    }
}
