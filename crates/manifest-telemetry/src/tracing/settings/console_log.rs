//! Console Log Subscriber Settings.

use tracing::level_filters::LevelFilter;

use super::{Build, Settings, SettingsBuilder, SettingsToggle};

/// Configure specific settings for the Console Log subscriber.
#[derive(Debug, Default, PartialEq)]
pub enum ConsoleLogSettings {
    /// Console Log subscriber disabled.
    #[default]
    Disabled,

    /// Console Log subscriber enabled.
    Enabled {
        /// Common subscriber settings that apply to the Console Log Subscriber.
        common_settings: Settings,

        /// Console Subscriber log event output format.
        log_format: Format,
    },
}

/// Console Subscriber log event output formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Use the plain unstructured log output.
    ///
    /// ANSI color output is enabled by default, but can be disabled at runtime by
    /// setting `NO_COLOR` to a non-empty value.
    ///
    /// See: [`Layer::with_ansi`][tracing_subscriber::fmt::Layer::with_ansi].
    #[default]
    Plain,

    /// One JSON object per log event.
    Json,
}

impl SettingsToggle for ConsoleLogSettings {
    fn is_enabled(&self) -> bool {
        match self {
            ConsoleLogSettings::Disabled => false,
            ConsoleLogSettings::Enabled { .. } => true,
        }
    }
}

/// For building [`ConsoleLogSettings`].
///
/// <div class="warning">
/// Do not use directly, instead use the [`Settings::builder`] associated function.
/// </div>
pub struct ConsoleLogSettingsBuilder {
    pub(crate) common_settings: Settings,
    pub(crate) log_format: Format,
}

impl ConsoleLogSettingsBuilder {
    pub fn with_log_format(mut self, format: Format) -> Self {
        self.log_format = format;
        self
    }

    pub fn build(self) -> ConsoleLogSettings {
        self.into()
    }
}

impl From<ConsoleLogSettingsBuilder> for ConsoleLogSettings {
    fn from(value: ConsoleLogSettingsBuilder) -> Self {
        Self::Enabled {
            common_settings: value.common_settings,
            log_format: value.log_format,
        }
    }
}

impl From<SettingsBuilder> for ConsoleLogSettingsBuilder {
    fn from(value: SettingsBuilder) -> Self {
        Self {
            common_settings: value.build(),
            log_format: Format::default(),
        }
    }
}

impl From<Settings> for ConsoleLogSettings {
    fn from(common_settings: Settings) -> Self {
        ConsoleLogSettings::Enabled {
            common_settings,
            log_format: Format::default(),
        }
    }
}

impl<T> From<Option<T>> for ConsoleLogSettings
where
    T: Into<ConsoleLogSettings>,
{
    fn from(settings: Option<T>) -> Self {
        match settings {
            Some(settings) => settings.into(),
            None => ConsoleLogSettings::default(),
        }
    }
}

impl From<(&'static str, LevelFilter)> for ConsoleLogSettings {
    fn from(value: (&'static str, LevelFilter)) -> Self {
        Self::Enabled {
            common_settings: Settings {
                environment_variable: value.0,
                default_level: value.1,
            },
            log_format: Default::default(),
        }
    }
}

impl From<(&'static str, LevelFilter, bool)> for ConsoleLogSettings {
    fn from(value: (&'static str, LevelFilter, bool)) -> Self {
        if value.2 {
            (value.0, value.1).into()
        } else {
            Self::Disabled
        }
    }
}
