mod aggregate;
mod audit;
mod clean;
mod cli;
mod config;
mod csv;
mod error;
mod loader;
mod logging;
mod persist;
mod pipeline;
mod records;
mod reports;

use log::error;

use crate::cli::Cli;

fn main() {
    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
