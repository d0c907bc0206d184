//! Create/read/update/delete over a [`ResourceDefinition`].
//!
//! Every write runs the full pipeline: validate, build the value model, inject computed values,
//! serialize. Nothing is kept between runs except the last [`ResourceRecord`], and reads and
//! deletes do no work besides handing that record out.
use std::fmt::Display;

use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value as JsonValue;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info, instrument};

use crate::{
    clock::{Clock, SystemClock},
    document::{self, Document},
    inject::{self, ComputedValues, inject_computed},
    path::FieldPath,
    schema::Schema,
    transcode::into_value_model,
    validation::{ValidationErrors, validate},
    value::Value,
};

/// The surface name of the API version discriminator.
pub const API_VERSION_FIELD: &str = "api_version";

/// The surface name of the type discriminator.
pub const KIND_FIELD: &str = "kind";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid {kind} configuration"))]
    InvalidConfiguration {
        source: ValidationErrors,
        kind: String,
    },

    #[snafu(display("failed to inject computed values"))]
    InjectComputed { source: inject::Error },

    #[snafu(display("failed to serialize document"))]
    SerializeDocument { source: document::SerializeError },

    #[snafu(display("timestamp {timestamp} is out of range for a resource id"))]
    IdOutOfRange { timestamp: Timestamp },

    #[snafu(display("resource was already created, use update instead"))]
    AlreadyMaterialized,

    #[snafu(display("resource was not created yet, use create instead"))]
    NotMaterialized,
}

impl Error {
    /// Whether the error was caused by the supplied configuration rather than by the resource
    /// definition or the engine.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }

    /// The complete list of validation errors, if the configuration was rejected.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::InvalidConfiguration { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// How the value of a computed node is produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComputedSource {
    /// The same value on every run, e.g. a type discriminator.
    Constant(Value),

    /// The RFC 3339 representation of the clock reading the resource id was derived from.
    GenerationTimestamp,
}

/// An opaque resource identity, derived from the generation time in nanoseconds since the Unix
/// epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(i64);

impl ResourceId {
    /// Derives the id for a run at `timestamp`.
    ///
    /// Ids are strictly increasing per resource: if `previous` is not smaller than the clock
    /// reading, the result is `previous + 1`.
    pub fn generate(timestamp: Timestamp, previous: Option<Self>) -> Result<Self> {
        let nanos = i64::try_from(timestamp.as_nanosecond())
            .ok()
            .context(IdOutOfRangeSnafu { timestamp })?;

        match previous {
            Some(Self(previous)) if previous >= nanos => previous
                .checked_add(1)
                .map(Self)
                .context(IdOutOfRangeSnafu { timestamp }),
            _ => Ok(Self(nanos)),
        }
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The externally visible result of a create or update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub api_version: String,
    pub kind: String,
    pub document: Document,
}

/// A resource type: its schema, discriminators and the sources of all computed nodes.
#[derive(Clone, Debug)]
pub struct ResourceDefinition {
    api_version: String,
    kind: String,
    schema: Schema,
    computed: Vec<(FieldPath, ComputedSource)>,
}

impl ResourceDefinition {
    /// Creates a definition whose `api_version` and `kind` nodes are set to the given constants.
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, schema: Schema) -> Self {
        let api_version = api_version.into();
        let kind = kind.into();

        Self {
            computed: vec![
                (
                    FieldPath::from(API_VERSION_FIELD),
                    ComputedSource::Constant(Value::from(api_version.as_str())),
                ),
                (
                    FieldPath::from(KIND_FIELD),
                    ComputedSource::Constant(Value::from(kind.as_str())),
                ),
            ],
            api_version,
            kind,
            schema,
        }
    }

    /// Registers the source of the computed node at `path`, replacing any previous one.
    pub fn with_computed(mut self, path: impl Into<FieldPath>, source: ComputedSource) -> Self {
        let path = path.into();
        self.computed.retain(|(existing, _)| *existing != path);
        self.computed.push((path, source));
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs the full pipeline once and returns the resulting record.
    ///
    /// `previous` is the id of the record this run replaces, if any.
    pub fn render<C>(
        &self,
        config: JsonValue,
        clock: &C,
        previous: Option<ResourceId>,
    ) -> Result<ResourceRecord>
    where
        C: Clock + ?Sized,
    {
        let validated = validate(&self.schema, config).context(InvalidConfigurationSnafu {
            kind: self.kind.clone(),
        })?;
        let model = into_value_model(&validated);

        let generated_at = clock.now();
        let id = ResourceId::generate(generated_at, previous)?;
        debug!(%id, %generated_at, "generated resource id");

        let model = inject_computed(&self.schema, model, &self.computed_values(generated_at))
            .context(InjectComputedSnafu)?;
        let document = document::serialize(&self.schema, &model).context(SerializeDocumentSnafu)?;

        Ok(ResourceRecord {
            id,
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            document,
        })
    }

    fn computed_values(&self, generated_at: Timestamp) -> ComputedValues {
        self.computed
            .iter()
            .map(|(path, source)| {
                let value = match source {
                    ComputedSource::Constant(value) => value.clone(),
                    ComputedSource::GenerationTimestamp => Value::from(generated_at.to_string()),
                };
                (path.clone(), value)
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum LifecycleState {
    Uninitialized,
    Materialized,
}

/// The lifecycle adapter for a single resource.
///
/// Operations take `&mut self`, so a host can never run two of them on the same resource
/// concurrently. Adapters share no state with each other.
#[derive(Debug)]
pub struct Resource<'a, C = SystemClock> {
    definition: &'a ResourceDefinition,
    clock: C,
    record: Option<ResourceRecord>,
}

impl<'a> Resource<'a> {
    pub fn new(definition: &'a ResourceDefinition) -> Self {
        Self::with_clock(definition, SystemClock)
    }
}

impl<'a, C> Resource<'a, C>
where
    C: Clock,
{
    pub fn with_clock(definition: &'a ResourceDefinition, clock: C) -> Self {
        Self {
            definition,
            clock,
            record: None,
        }
    }

    pub fn definition(&self) -> &'a ResourceDefinition {
        self.definition
    }

    pub fn state(&self) -> LifecycleState {
        match self.record {
            Some(_) => LifecycleState::Materialized,
            None => LifecycleState::Uninitialized,
        }
    }

    /// Materializes the resource from `config`.
    ///
    /// On failure the resource stays uninitialized.
    #[instrument(skip_all, fields(kind = self.definition.kind()))]
    pub fn create(&mut self, config: JsonValue) -> Result<&ResourceRecord> {
        if self.record.is_some() {
            return AlreadyMaterializedSnafu.fail();
        }

        let record = self.definition.render(config, &self.clock, None)?;
        info!(id = %record.id, "created resource");
        Ok(self.record.insert(record))
    }

    /// Regenerates the whole record from `config`, including a new id.
    ///
    /// On failure the previous record is kept.
    #[instrument(skip_all, fields(kind = self.definition.kind()))]
    pub fn update(&mut self, config: JsonValue) -> Result<&ResourceRecord> {
        let previous = self.record.as_ref().context(NotMaterializedSnafu)?.id;

        let record = self
            .definition
            .render(config, &self.clock, Some(previous))?;
        info!(%previous, id = %record.id, "updated resource");
        Ok(self.record.insert(record))
    }

    /// Returns the current record. The record is self-contained, so there is nothing to refresh.
    pub fn read(&self) -> Option<&ResourceRecord> {
        self.record.as_ref()
    }

    /// Releases the record back to the host. There is no external state to clean up.
    pub fn delete(&mut self) -> Option<ResourceRecord> {
        self.record.take()
    }
}
