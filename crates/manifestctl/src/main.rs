use std::io;

use clap::Parser;
use manifest_engine::clock::SystemClock;
use manifest_telemetry::Tracing;
use snafu::{ResultExt, Snafu};

use crate::cli::{Cli, Command, LOG_LEVEL_ENV};

mod cli;
mod commands;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize tracing"))]
    InitTracing {
        source: manifest_telemetry::tracing::Error,
    },

    #[snafu(display("failed to load configuration"))]
    LoadConfig { source: commands::Error },

    #[snafu(display("failed to render resource"))]
    Render { source: commands::Error },

    #[snafu(display("configuration is invalid"))]
    Validate { source: commands::Error },

    #[snafu(display("failed to print schema"))]
    PrintSchema { source: commands::Error },
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let Cli { command, telemetry } = Cli::parse();

    let _tracing_guard = Tracing::pre_configured("manifestctl", LOG_LEVEL_ENV, telemetry)
        .init()
        .context(InitTracingSnafu)?;

    let stdout = io::stdout().lock();

    match command {
        Command::Render(arguments) => {
            let definition = arguments.config.resource.resource.definition();
            let config =
                commands::load_config(&arguments.config.config).context(LoadConfigSnafu)?;

            commands::render(&definition, config, SystemClock, arguments.output, stdout)
                .map(|_| ())
                .context(RenderSnafu)
        }
        Command::Validate(arguments) => {
            let definition = arguments.resource.resource.definition();
            let config = commands::load_config(&arguments.config).context(LoadConfigSnafu)?;

            commands::validate_config(&definition, config, stdout).context(ValidateSnafu)
        }
        Command::Schema(arguments) => {
            commands::print_schema(&arguments.resource.definition(), stdout)
                .context(PrintSchemaSnafu)
        }
    }
}
