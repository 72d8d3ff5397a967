//! Tilestamp - command-line front end for managing and drawing templates

use std::process::ExitCode;

use tilestamp::cli;

fn main() -> ExitCode {
    cli::run()
}
