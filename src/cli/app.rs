//! Main CLI application

use crate::config::{
    find_config_file, find_config_file_in, parse_config_file, read_env_file, Config,
    ConfigBuilder, ConfigFile, DEFAULT_TASK,
};
use crate::error::{ConfigError, Result};
use crate::runner::{Context, Dispatcher, Registry, Verbosity};
use crate::tasks;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Tasks that can be requested
    registry: Registry,
}

impl App {
    /// Create the app with the built-in os64 tasks
    pub fn new() -> Result<Self> {
        Ok(App::with_registry(tasks::registry()?))
    }

    /// Create the app around any validated registry
    pub fn with_registry(registry: Registry) -> Self {
        let command = build_command(&registry);
        App { command, registry }
    }

    /// Run the application with the process arguments
    pub fn run(self) -> Result<()> {
        self.run_from(env::args_os())
    }

    /// Run the application with explicit arguments (first one is the binary name)
    pub fn run_from<I, T>(mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);

        if let Some(shell) = matches.get_one::<Shell>("completions").copied() {
            let name = self.command.get_name().to_string();
            clap_complete::generate(shell, &mut self.command, name, &mut io::stdout());
            return Ok(());
        }

        if matches.get_flag("list") {
            print!("{}", self.registry.help_text());
            return Ok(());
        }

        let config = load_config(
            matches.get_one::<PathBuf>("base-dir").map(PathBuf::as_path),
            matches.get_one::<PathBuf>("file").map(PathBuf::as_path),
        )?;

        let ctx = Context::new(&config)
            .with_verbosity(get_verbosity(&matches))
            .with_dry_run(matches.get_flag("dry-run"));

        let requested: Vec<String> = matches
            .get_many::<String>("tasks")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        ctx.print_debug(&format!("Base directory: {}", config.base_dir().display()));

        Dispatcher::new(&self.registry).dispatch(&requested, &ctx)
    }
}

/// Build the clap command, listing every task in the help epilog
fn build_command(registry: &Registry) -> Command {
    Command::new("os64-make")
        .version(crate::VERSION)
        .about("os64 task automation system")
        .after_help(registry.help_text())
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .num_args(0..)
                .action(ArgAction::Append)
                .help(format!(
                    "Tasks to execute (default: {}, or default-task from os64.yml)",
                    DEFAULT_TASK
                )),
        )
        .arg(
            Arg::new("base-dir")
                .short('C')
                .long("base-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Project root (default: directory of os64.yml, else the current directory)"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to os64.yml config file"),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Print commands without executing them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print commands and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script and exit"),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Locate the project root and config file, then build the settings store
pub fn load_config(base_dir: Option<&Path>, file: Option<&Path>) -> Result<Config> {
    let cwd = env::current_dir()?;

    let file_path = match (file, base_dir) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, Some(dir)) => find_config_file_in(dir),
        (None, None) => find_config_file().ok(),
    };

    let base_dir = match (base_dir, &file_path) {
        (Some(dir), _) => dir.to_path_buf(),
        // a bare file name has an empty parent
        (None, Some(path)) => path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone()),
        (None, None) => cwd,
    };
    let base_dir = fs::canonicalize(&base_dir).map_err(|e| ConfigError::File {
        path: base_dir.clone(),
        error: e.to_string(),
    })?;

    let file = match &file_path {
        Some(path) => parse_config_file(path)?,
        None => ConfigFile::default(),
    };

    let env_file = read_env_file(&base_dir)?;

    ConfigBuilder::new(base_dir)
        .with_file(&file)?
        .with_env(env_file)
        .with_env(process_env())
        .build()
}

/// Process environment, skipping entries that are not valid UTF-8
fn process_env() -> impl Iterator<Item = (String, String)> {
    env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<()> {
    App::new()?.run()
}
