use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::SchemePrepError;
use crate::logging;
use crate::pipeline;
use crate::reports::Reports;
use crate::{audit, loader};

#[derive(Parser)]
#[command(
    name = "schemeprep",
    version,
    about = "SchemePrep: batch data preparation for scheme workflow reporting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline (default if no command specified)
    Run {
        /// Path to a config file (defaults to the per-user config)
        #[arg(long = "config", short = 'c')]
        config: Option<PathBuf>,

        /// Directory holding the raw tables (overrides config)
        #[arg(long = "input", short = 'i')]
        input: Option<PathBuf>,

        /// Directory to publish artifacts to (overrides config)
        #[arg(long = "output", short = 'o')]
        output: Option<PathBuf>,
    },

    /// Audit the raw input and print health metrics without writing anything
    Audit {
        #[arg(long = "config", short = 'c')]
        config: Option<PathBuf>,

        /// Directory holding the raw tables (overrides config)
        #[arg(long = "input", short = 'i')]
        input: Option<PathBuf>,
    },

    /// Print health metrics and summaries from previously published artifacts
    Report {
        #[arg(long = "config", short = 'c')]
        config: Option<PathBuf>,

        /// Directory the artifacts were published to (overrides config)
        #[arg(long = "output", short = 'o')]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn handle_command_line() -> Result<(), SchemePrepError> {
        let args = Cli::parse();

        // Default to a full run if no command specified
        let command = args.command.unwrap_or(Command::Run {
            config: None,
            input: None,
            output: None,
        });

        match command {
            Command::Run {
                config,
                input,
                output,
            } => {
                let config = Config::load(config.as_deref())?.with_overrides(input, output);
                let _logger = logging::init(&config.logging)?;
                let summary = pipeline::run(&config)?;
                Reports::print_run_summary(&summary);
                Ok(())
            }
            Command::Audit { config, input } => {
                let config = Config::load(config.as_deref())?.with_overrides(input, None);
                let _logger = logging::init(&config.logging)?;
                let raw = loader::load_raw_tables(&config.data.input_dir)?;
                let health = audit::audit(&raw);
                Reports::print_health(&health);
                Ok(())
            }
            Command::Report { config, output } => {
                let config = Config::load(config.as_deref())?.with_overrides(None, output);
                let _logger = logging::init(&config.logging)?;
                Reports::report_output(&config.data.output_dir)
            }
        }
    }
}
