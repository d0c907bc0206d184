//! The subcommands of `manifestctl`.
//!
//! Every command writes its output to a caller supplied writer, so that it can be tested
//! without touching stdout.
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use manifest_engine::{
    Resource, ResourceDefinition, ResourceRecord, clock::Clock, lifecycle,
    validation::validate,
};
use serde_json::Value as JsonValue;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::cli::OutputFormat;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read configuration file {path}", path = path.display()))]
    ReadConfig {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse configuration file {path}", path = path.display()))]
    ParseConfig {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to render {kind}"))]
    Render {
        source: lifecycle::Error,
        kind: String,
    },

    #[snafu(display("configuration has {count} problem(s)"))]
    InvalidConfiguration { count: usize },

    #[snafu(display("failed to serialize resource record as JSON"))]
    SerializeRecordJson { source: serde_json::Error },

    #[snafu(display("failed to serialize resource record as YAML"))]
    SerializeRecordYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: std::io::Error },
}

/// Reads a YAML or JSON configuration file.
///
/// JSON is a subset of YAML, so both are read by the YAML parser.
pub fn load_config(path: &Path) -> Result<JsonValue> {
    let content = fs::read_to_string(path).with_context(|_| ReadConfigSnafu { path })?;
    let config = serde_yaml::from_str(&content).with_context(|_| ParseConfigSnafu { path })?;

    debug!(path = %path.display(), "loaded configuration file");
    Ok(config)
}

/// Renders `config` as a new resource and writes it in the requested format.
pub fn render<C, W>(
    definition: &ResourceDefinition,
    config: JsonValue,
    clock: C,
    output: OutputFormat,
    mut writer: W,
) -> Result<ResourceRecord>
where
    C: Clock,
    W: Write,
{
    let mut resource = Resource::with_clock(definition, clock);
    let record = resource.create(config).with_context(|_| RenderSnafu {
        kind: definition.kind(),
    })?;
    info!(id = %record.id, kind = %record.kind, "rendered resource");

    match output {
        OutputFormat::Document => writer
            .write_all(record.document.as_str().as_bytes())
            .context(WriteOutputSnafu)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, record).context(SerializeRecordJsonSnafu)?;
            writeln!(writer).context(WriteOutputSnafu)?;
        }
        OutputFormat::Yaml => {
            serde_yaml::to_writer(&mut writer, record).context(SerializeRecordYamlSnafu)?;
        }
    }

    Ok(record.clone())
}

/// Validates `config` and writes one `path: kind: message` line per problem.
///
/// Fails with [`Error::InvalidConfiguration`] if there was at least one problem.
pub fn validate_config<W>(
    definition: &ResourceDefinition,
    config: JsonValue,
    mut writer: W,
) -> Result<()>
where
    W: Write,
{
    let errors = match validate(definition.schema(), config) {
        Ok(_) => {
            writeln!(writer, "configuration is valid").context(WriteOutputSnafu)?;
            return Ok(());
        }
        Err(errors) => errors,
    };

    for (path, kind, message) in errors.triples() {
        writeln!(writer, "{path}: {kind}: {message}").context(WriteOutputSnafu)?;
    }

    InvalidConfigurationSnafu {
        count: errors.len(),
    }
    .fail()
}

/// Writes the attribute tree of `definition`.
pub fn print_schema<W>(definition: &ResourceDefinition, mut writer: W) -> Result<()>
where
    W: Write,
{
    writeln!(
        writer,
        "{kind} ({api_version})",
        kind = definition.kind(),
        api_version = definition.api_version()
    )
    .context(WriteOutputSnafu)?;
    write!(writer, "{}", definition.schema()).context(WriteOutputSnafu)
}
