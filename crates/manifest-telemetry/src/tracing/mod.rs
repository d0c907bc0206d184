//! This module contains functionality to initialise tracing Subscribers for
//! console output and rolling file output.
//!
//! To get started, see [`Tracing`].

use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::rolling::{InitError, RollingFileAppender};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, layer::SubscriberExt};

use crate::tracing::settings::*;

pub mod settings;

type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors which can be encountered when initialising [`Tracing`].
#[derive(Debug, Snafu)]
pub enum Error {
    /// Indicates that [`Tracing`] failed to install the rolling file appender.
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender {
        #[allow(missing_docs)]
        source: InitError,
    },

    /// Indicates that [`Tracing`] failed to set the global default subscriber.
    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber {
        #[allow(missing_docs)]
        source: SetGlobalDefaultError,
    },
}

/// Easily initialize a set of pre-configured [`Subscriber`][1] layers.
///
/// # Usage
///
/// ## Tracing Guard
///
/// The configured subscribers are active as long as the tracing guard returned by
/// [`Tracing::init`] is in scope and not dropped. Dropping it flushes and stops the file writer,
/// which can lead to lost log lines when done before exiting the application.
///
/// <div class="warning">
/// Name the guard variable appropriately, do not just use <code>let _ =</code>, as that will drop
/// immediately.
/// </div>
///
/// ```
/// # use manifest_telemetry::tracing::{Tracing, Error};
/// use tracing_subscriber::filter::LevelFilter;
///
/// fn main() -> Result<(), Error> {
///     let _tracing_guard = Tracing::builder()                 // < Scope starts here
///         .service_name("test")                               // |
///         .with_console_output(("TEST_LOG", LevelFilter::INFO)) // |
///         .build()                                            // |
///         .init()?;                                           // |
///                                                             // |
///     tracing::info!("log a message");                        // |
///     Ok(())                                                  // < Scope ends here, guard is dropped
/// }
/// ```
///
/// ## Pre-configured Tracing Instance
///
/// [`Tracing::pre_configured`] builds an instance from [`TelemetryOptions`], which can be
/// flattened into a [`clap`](https://docs.rs/clap) parser when the `clap` feature is enabled.
///
/// ## Environment Variables and CLI Arguments
///
/// ### Console logs
///
/// - `CONSOLE_LOG_DISABLED` (`--console-log-disabled`): Disables console logs when set to `true`.
/// - `CONSOLE_LOG_FORMAT` (`--console-log-format`): Either `plain` or `json`.
/// - The level filter is read from the environment variable passed to [`Tracing::pre_configured`].
///
/// ### File logs
///
/// - `FILE_LOG_DIRECTORY` (`--file-log-directory`): Enable the file logs and set the file log directory.
/// - `FILE_LOG_ROTATION_PERIOD` (`--file-log-rotation-period`): Set the rotation period of log files.
/// - `FILE_LOG_MAX_FILES` (`--file-log-max-files`): Keep at most this many rotated files.
/// - `FILE_LOG_LEVEL`: Set the log level for file logs.
///
/// [1]: tracing::Subscriber
pub struct Tracing {
    service_name: &'static str,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,

    file_log_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl Tracing {
    /// The environment variable used to set the rolling file log level filter.
    pub const FILE_LOG_LEVEL: &str = "FILE_LOG_LEVEL";
    /// The filename used for the rolling file logs.
    pub const FILE_LOG_SUFFIX: &str = "tracing-rs.json";

    /// Creates and returns a [`TracingBuilder`].
    pub fn builder() -> TracingBuilder<builder_state::PreServiceName> {
        TracingBuilder::default()
    }

    /// Creates and returns a pre-configured [`Tracing`] instance which can be initialized by
    /// calling [`Tracing::init()`].
    ///
    /// Console logs are written to stderr, so that stdout stays free for command output. Their
    /// level is read from `console_log_level_env`.
    ///
    /// ### Default Levels
    ///
    /// - Console logs: WARN
    /// - File logs: INFO
    ///
    /// ### Default Values
    ///
    /// - If `file_log_rotation_period` is [`None`], this function will use a default value of
    ///   [`RotationPeriod::Never`].
    pub fn pre_configured(
        service_name: &'static str,
        console_log_level_env: &'static str,
        options: TelemetryOptions,
    ) -> Self {
        let TelemetryOptions {
            console_log_disabled,
            console_log_format,
            file_log_directory,
            file_log_rotation_period,
            file_log_max_files,
        } = options;

        let file_log_rotation_period = file_log_rotation_period.unwrap_or_default();

        Self::builder()
            .service_name(service_name)
            .with_console_output((!console_log_disabled).then(|| {
                Settings::builder()
                    .with_environment_variable(console_log_level_env)
                    .with_default_level(LevelFilter::WARN)
                    .console_log_settings_builder()
                    .with_log_format(console_log_format.unwrap_or_default().into())
                    .build()
            }))
            .with_file_output(file_log_directory.map(|log_directory| {
                Settings::builder()
                    .with_environment_variable(Self::FILE_LOG_LEVEL)
                    .with_default_level(LevelFilter::INFO)
                    .file_log_settings_builder(log_directory, Self::FILE_LOG_SUFFIX)
                    .with_rotation_period(file_log_rotation_period)
                    .with_max_files(file_log_max_files)
                    .build()
            }))
            .build()
    }

    /// Initialize the configured tracing subscribers, returning a guard that
    /// will flush and stop the subscribers when dropped.
    ///
    /// <div class="warning">
    /// Name the guard variable appropriately, do not just use <code>let _ =</code>, as that will drop
    /// immediately.
    /// </div>
    pub fn init(mut self) -> Result<Tracing> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Sync + Send>> = Vec::new();

        if let ConsoleLogSettings::Enabled {
            common_settings,
            log_format,
        } = &self.console_log_settings
        {
            let env_filter_layer = env_filter_builder(
                common_settings.environment_variable,
                common_settings.default_level,
            );
            let console_output_layer =
                tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            let console_output_layer = match log_format {
                Format::Plain => console_output_layer.with_filter(env_filter_layer).boxed(),
                Format::Json => console_output_layer
                    .json()
                    .with_filter(env_filter_layer)
                    .boxed(),
            };
            layers.push(console_output_layer);
        }

        if let FileLogSettings::Enabled {
            common_settings,
            file_log_dir,
            rotation_period,
            filename_suffix,
            max_log_files,
        } = &self.file_log_settings
        {
            let env_filter_layer = env_filter_builder(
                common_settings.environment_variable,
                common_settings.default_level,
            );

            let file_appender = RollingFileAppender::builder()
                .rotation(rotation_period.clone())
                .filename_prefix(self.service_name.to_string())
                .filename_suffix(filename_suffix);

            let file_appender = if let Some(max_log_files) = max_log_files {
                file_appender.max_log_files(*max_log_files)
            } else {
                file_appender
            };

            let file_appender = file_appender
                .build(file_log_dir)
                .context(InitRollingFileAppenderSnafu)?;
            let (file_writer, file_log_guard) = tracing_appender::non_blocking(file_appender);

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_filter(env_filter_layer)
                    .boxed(),
            );
            self.file_log_guard = Some(file_log_guard);
        }

        if !layers.is_empty() {
            // Add the layers to the tracing_subscriber Registry (console, file)
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        // IMPORTANT: we must return self, otherwise Drop will be called and the file writer stops
        Ok(self)
    }
}

impl Drop for Tracing {
    fn drop(&mut self) {
        tracing::debug!(
            console_log.enabled = self.console_log_settings.is_enabled(),
            file_log.enabled = self.file_log_settings.is_enabled(),
            "shutting down tracing subscribers"
        );
    }
}

/// This trait is only used for the typestate builder and cannot be implemented
/// outside of this crate.
///
/// The only reason it has pub visibility is because it needs to be at least as
/// visible as the types that use it.
#[doc(hidden)]
pub trait BuilderState: private::Sealed {}

/// This private module holds the [`Sealed`][1] trait that is used by the
/// [`BuilderState`], so that it cannot be implemented outside of this crate.
///
/// [1]: private::Sealed
#[doc(hidden)]
mod private {
    use super::builder_state;

    pub trait Sealed {}

    impl Sealed for builder_state::PreServiceName {}
    impl Sealed for builder_state::Config {}
}

/// This module holds the possible states that the builder is in.
///
/// Each state will implement [`BuilderState`] (with no methods), and the
/// Builder struct ([`TracingBuilder`]) itself will be implemented with
/// each state as a generic parameter.
#[doc(hidden)]
pub mod builder_state {
    /// The initial state, before the service name is set.
    #[derive(Default)]
    pub struct PreServiceName;

    /// The state that allows you to configure the supported [`Subscriber`][1]
    /// [`Layer`][2].
    ///
    /// [1]: tracing::Subscriber
    /// [2]: tracing_subscriber::layer::Layer
    pub struct Config {
        pub(super) service_name: &'static str,
    }
}

// Make the states usable
#[doc(hidden)]
impl BuilderState for builder_state::PreServiceName {}

#[doc(hidden)]
impl BuilderState for builder_state::Config {}

/// Makes it easy to build a valid [`Tracing`] instance.
pub struct TracingBuilder<S: BuilderState> {
    /// The builder state, which carries the service name once it is set.
    state: S,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,
}

impl Default for TracingBuilder<builder_state::PreServiceName> {
    fn default() -> Self {
        Self {
            state: builder_state::PreServiceName,
            console_log_settings: ConsoleLogSettings::default(),
            file_log_settings: FileLogSettings::default(),
        }
    }
}

impl TracingBuilder<builder_state::PreServiceName> {
    /// Set the service name used as the prefix of log files.
    pub fn service_name(self, service_name: &'static str) -> TracingBuilder<builder_state::Config> {
        TracingBuilder {
            state: builder_state::Config { service_name },
            console_log_settings: self.console_log_settings,
            file_log_settings: self.file_log_settings,
        }
    }
}

impl TracingBuilder<builder_state::Config> {
    /// Enable the console output tracing subscriber and set the default
    /// [`LevelFilter`] which is overridable through the given environment
    /// variable.
    pub fn with_console_output(self, console_log_settings: impl Into<ConsoleLogSettings>) -> Self {
        Self {
            console_log_settings: console_log_settings.into(),
            ..self
        }
    }

    /// Enable the file output tracing subscriber and set the default
    /// [`LevelFilter`] which is overridable through the given environment
    /// variable.
    pub fn with_file_output(self, file_log_settings: impl Into<FileLogSettings>) -> Self {
        Self {
            file_log_settings: file_log_settings.into(),
            ..self
        }
    }

    /// Consumes self and returns a valid [`Tracing`] instance.
    ///
    /// Once built, you can call [`Tracing::init`] to enable the configured
    /// tracing subscribers.
    pub fn build(self) -> Tracing {
        Tracing {
            service_name: self.state.service_name,
            console_log_settings: self.console_log_settings,
            file_log_settings: self.file_log_settings,
            file_log_guard: None,
        }
    }
}

/// Create an [`EnvFilter`] configured with the given environment variable and default [`Directive`].
fn env_filter_builder(env_var: &str, default_directive: impl Into<Directive>) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env_var)
        .with_default_directive(default_directive.into())
        .from_env_lossy()
}

/// Contains options which can be passed to [`Tracing::pre_configured()`].
///
/// Additionally, this struct can be used as CLI arguments. This functionality is only
/// available if the feature `clap` is enabled.
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Disable console logs.
    #[cfg_attr(feature = "clap", arg(long, env))]
    pub console_log_disabled: bool,

    /// Output FORMAT of console logs.
    #[cfg_attr(feature = "clap", arg(long, env, value_name = "FORMAT"))]
    pub console_log_format: Option<ConsoleLogFormat>,

    /// Enable logging to files located in the specified DIRECTORY.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "DIRECTORY", group = "file_log")
    )]
    pub file_log_directory: Option<PathBuf>,

    /// Time PERIOD after which log files are rolled over.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "PERIOD", requires = "file_log")
    )]
    pub file_log_rotation_period: Option<RotationPeriod>,

    /// Maximum NUMBER of rotated log files to keep.
    #[cfg_attr(
        feature = "clap",
        arg(long, env, value_name = "NUMBER", requires = "file_log")
    )]
    pub file_log_max_files: Option<usize>,
}

/// Supported console log formats.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConsoleLogFormat {
    #[default]
    Plain,
    Json,
}

impl From<ConsoleLogFormat> for Format {
    fn from(value: ConsoleLogFormat) -> Self {
        match value {
            ConsoleLogFormat::Plain => Self::Plain,
            ConsoleLogFormat::Json => Self::Json,
        }
    }
}

/// Supported periods when the log file is rolled over.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}
