//! Terminal output
//!
//! Command lines go to stdout uncoloured so they can be captured as a build
//! log; status messages go to stderr.

use colored::Colorize;

/// Print an expanded command line before it runs
pub fn echo_command(command: &str) {
    println!("{}", command);
}

pub fn info(message: &str) {
    eprintln!("{} {}", "[INFO]".green(), message);
}

pub fn debug(message: &str) {
    eprintln!("{} {}", "[DEBUG]".dimmed(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

/// Final diagnostic printed by `main` before exiting with a failure status
pub fn fatal(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}
