//! Command execution
//!
//! One-shot commands open a session, dispatch a single [`Command`], flush the
//! pending save, and exit. `shell` keeps one session alive across lines.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{Command, Outcome, Session};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => return config_command(cli, command),
        _ => {}
    }

    let settings = load_settings(cli)?;
    let container = ServiceContainer::new(settings);
    let mut session = container.open_session()?;

    let result = match command {
        Commands::Tree => {
            tree(&session);
            Ok(())
        }
        Commands::List { all } => {
            list(&session, *all);
            Ok(())
        }
        Commands::Layout { ticks } => layout(&mut session, *ticks),
        Commands::Corpus => corpus(&session),
        Commands::Shell => shell(&mut session, io::stdin().lock()),
        other => match to_command(other) {
            Some(cmd) => run_one(&mut session, cmd),
            None => Ok(()),
        },
    };

    // A rejected command must not drop an earlier successful change
    let flushed = session.flush().map_err(CliError::from);
    result.and(flushed)
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = &cli.data_file {
        settings.data_file = path.clone();
    }
    debug!(data_file = %settings.data_file.display(), "settings loaded");
    Ok(settings)
}

/// Map one-shot subcommands onto session commands.
fn to_command(command: &Commands) -> Option<Command> {
    Some(match command {
        Commands::Add { name } => Command::Add { name: name.clone() },
        Commands::Remove { id } => Command::Remove { id: id.clone() },
        Commands::Rename { id, name } => Command::Rename {
            id: id.clone(),
            name: name.clone(),
        },
        Commands::Recolor { id, color } => Command::Recolor {
            id: id.clone(),
            color: color.clone(),
        },
        Commands::Notes { id, text } => Command::SetNotes {
            id: id.clone(),
            notes: text.clone(),
        },
        Commands::Toggle { id } => Command::ToggleChildren { id: id.clone() },
        Commands::Detach { id } => Command::Detach { id: id.clone() },
        Commands::Connect { source, target } => Command::Connect {
            source: source.clone(),
            target: target.clone(),
        },
        _ => return None,
    })
}

#[instrument(level = "debug", skip(session))]
fn run_one(session: &mut Session, command: Command) -> CliResult<()> {
    let outcome = session.dispatch(command, Instant::now())?;
    report(&outcome);
    Ok(())
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Changed => output::success("done"),
        Outcome::Unchanged => {}
        Outcome::Created { id } => output::action("Created", id),
        Outcome::ConfirmRemoval { id } => {
            output::warning(&format!("dropped on removal zone: run `remove {id}` to confirm"))
        }
    }
}

fn tree(session: &Session) {
    for tree in output::forest_trees(session.forest()) {
        print!("{tree}");
    }
}

fn list(session: &Session, all: bool) {
    for flat in session.store().flatten(!all) {
        output::info(&output::list_line(&flat));
    }
}

fn layout(session: &mut Session, ticks: usize) -> CliResult<()> {
    let ran = session.settle(ticks);
    debug!(ran, "layout settled");
    session.checkpoint(Instant::now());
    let json = serde_json::to_string_pretty(&session.scene()).map_err(InfraError::from)?;
    output::info(&json);
    Ok(())
}

fn corpus(session: &Session) -> CliResult<()> {
    for entry in session.search_corpus() {
        output::info(&serde_json::to_string(&entry).map_err(InfraError::from)?);
    }
    Ok(())
}

/// Process one command per line; errors are reported and the loop continues.
///
/// Saves are polled after each line and flushed at end of input.
pub fn shell(session: &mut Session, input: impl BufRead) -> CliResult<()> {
    for line in input.lines() {
        let line = line.map_err(|e| InfraError::io("read stdin", e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_shell_line(line) {
            Ok(ShellLine::Command(cmd)) => match session.dispatch(cmd, Instant::now()) {
                Ok(outcome) => report(&outcome),
                Err(e) => output::error(&e),
            },
            Ok(ShellLine::Tree) => tree(session),
            Ok(ShellLine::List) => list(session, false),
            Ok(ShellLine::Tick(n)) => {
                for _ in 0..n {
                    session.tick(Instant::now());
                }
            }
            Err(e) => output::error(&e),
        }
        session.poll(Instant::now());
        io::stdout().flush().ok();
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum ShellLine {
    Command(Command),
    Tree,
    List,
    Tick(usize),
}

/// Parse `verb arg ...`; the last argument of `rename`, `notes`, and `add`
/// takes the rest of the line.
fn parse_shell_line(line: &str) -> CliResult<ShellLine> {
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args = rest.split_whitespace().collect_vec();

    let arg = |i: usize| -> CliResult<String> {
        args.get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| CliError::Usage(format!("{verb}: missing argument {}", i + 1)))
    };
    // Raw remainder after `skip` words; inner whitespace is kept as typed
    let tail = |skip: usize| -> CliResult<String> {
        let mut text = rest;
        for _ in 0..skip {
            text = text
                .split_once(char::is_whitespace)
                .map_or("", |(_, after)| after.trim_start());
        }
        if text.is_empty() {
            Err(CliError::Usage(format!("{verb}: missing text")))
        } else {
            Ok(text.to_string())
        }
    };
    let coord = |i: usize| -> CliResult<f64> {
        arg(i)?
            .parse::<f64>()
            .map_err(|e| CliError::InvalidArgs(format!("{verb}: {e}")))
    };

    let cmd = match verb {
        "tree" => return Ok(ShellLine::Tree),
        "list" => return Ok(ShellLine::List),
        "tick" => {
            let n = match args.first() {
                Some(n) => n
                    .parse()
                    .map_err(|e| CliError::InvalidArgs(format!("tick: {e}")))?,
                None => 1,
            };
            return Ok(ShellLine::Tick(n));
        }
        "add" => Command::Add {
            name: (!rest.is_empty()).then(|| tail(0)).transpose()?,
        },
        "remove" => Command::Remove { id: arg(0)? },
        "rename" => Command::Rename {
            id: arg(0)?,
            name: tail(1)?,
        },
        "recolor" => Command::Recolor {
            id: arg(0)?,
            color: arg(1)?,
        },
        "notes" => Command::SetNotes {
            id: arg(0)?,
            notes: tail(1)?,
        },
        "toggle" => Command::ToggleChildren { id: arg(0)? },
        "detach" => Command::Detach { id: arg(0)? },
        "connect" => Command::Connect {
            source: arg(0)?,
            target: arg(1)?,
        },
        "undo" => Command::Undo,
        "select" => Command::Select {
            id: args.first().map(|s| s.to_string()),
        },
        "drag-start" => Command::DragStart { id: arg(0)? },
        "drag-move" => Command::DragMove {
            id: arg(0)?,
            x: coord(1)?,
            y: coord(2)?,
        },
        "drag-end" => Command::DragEnd {
            id: arg(0)?,
            x: coord(1)?,
            y: coord(2)?,
        },
        other => return Err(CliError::Usage(format!("unknown command: {other}"))),
    };
    Ok(ShellLine::Command(cmd))
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            output::header("Config locations");
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable)".into());
            output::action("global", &global);
            if let Some(path) = &cli.config {
                output::action("explicit", &path.display());
            }
            let data_file: PathBuf = load_settings(cli)?.data_file;
            output::action("data", &data_file.display());
        }
    }
    Ok(())
}
