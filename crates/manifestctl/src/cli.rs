//! Command line arguments.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use manifest_engine::{ResourceDefinition, resources::spark_application};
use manifest_telemetry::tracing::TelemetryOptions;

/// The environment variable used to set the console log level.
pub const LOG_LEVEL_ENV: &str = "MANIFESTCTL_LOG";

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(name = "manifestctl", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // IMPORTANT: All (flattened) sub structs should be placed at the end to ensure the help
    // headings are correct.
    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Validate a configuration file and print the rendered resource.
    Render(RenderArguments),

    /// Validate a configuration file and print every problem found.
    Validate(ConfigArguments),

    /// Print the attribute tree of a resource type.
    Schema(ResourceArguments),
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct ResourceArguments {
    /// The resource type to work with.
    #[arg(
        long,
        short,
        env = "MANIFESTCTL_RESOURCE",
        value_enum,
        default_value_t = ResourceType::SparkApplication
    )]
    pub resource: ResourceType,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct ConfigArguments {
    /// Path to a YAML or JSON configuration FILE.
    #[arg(long, short, env = "MANIFESTCTL_CONFIG", value_name = "FILE")]
    pub config: PathBuf,

    #[command(flatten)]
    pub resource: ResourceArguments,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct RenderArguments {
    /// What to print on success.
    #[arg(
        long,
        short,
        env = "MANIFESTCTL_OUTPUT",
        value_enum,
        default_value_t = OutputFormat::Document
    )]
    pub output: OutputFormat,

    #[command(flatten)]
    pub config: ConfigArguments,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceType {
    SparkApplication,
}

impl ResourceType {
    pub fn definition(self) -> ResourceDefinition {
        match self {
            Self::SparkApplication => spark_application::definition(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    /// Only the manifest document.
    Document,

    /// The full resource record as JSON.
    Json,

    /// The full resource record as YAML.
    Yaml,
}
