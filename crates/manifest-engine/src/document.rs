//! The canonical YAML document produced from a [`ValueModel`].
//!
//! Documents are emitted by walking the schema in declaration order. Only present slots are
//! written, each under its node's document key, so the output for a given model is always
//! byte-identical. [`parse`] reads a document back into a model, which is what makes the
//! round trip `serialize(parse(serialize(model))) == serialize(model)` checkable.
use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;
use serde_yaml::{Mapping, Value as YamlValue};
use snafu::{ResultExt, Snafu};

use crate::{
    path::{FieldPath, PathContext},
    schema::{Fields, Kind, Requirement, ScalarKind, Schema},
    value::{Scalar, Slot, Slots, Value, ValueModel},
};

/// Errors raised while emitting a document. These indicate a model that does not belong to
/// the schema it is serialized with, never a user mistake.
#[derive(Debug, Snafu)]
pub enum SerializeError {
    #[snafu(display("value at {path} is a {actual}, but the schema declares a {expected}"))]
    KindMismatch {
        path: FieldPath,
        expected: &'static str,
        actual: &'static str,
    },

    #[snafu(display("{requirement} field {path} has no value"))]
    UnpopulatedSlot {
        path: FieldPath,
        requirement: Requirement,
    },

    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("failed to parse bytes as valid UTF-8 string"))]
    ParseUtf8Bytes { source: std::string::FromUtf8Error },
}

/// Errors raised while reading a document back into a model.
#[derive(Debug, Snafu)]
pub enum ParseError {
    #[snafu(display("failed to parse YAML document"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("key {key:?} at {path} is not described by the schema"))]
    UnknownKey { path: FieldPath, key: String },

    #[snafu(display("expected {expected} at {path}, found {actual}"))]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        actual: &'static str,
    },

    #[snafu(display("{requirement} field {path} is missing"))]
    MissingField {
        path: FieldPath,
        requirement: Requirement,
    },
}

/// Provides configurable options during document serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Adds leading triple dashes (`---`) to the output string.
    pub explicit_document: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            explicit_document: true,
        }
    }
}

/// A serialized manifest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Serializes `model` with the default [`SerializeOptions`].
pub fn serialize(schema: &Schema, model: &ValueModel) -> Result<Document, SerializeError> {
    serialize_with_options(schema, model, SerializeOptions::default())
}

/// Serializes `model` into a document, emitting only present slots.
pub fn serialize_with_options(
    schema: &Schema,
    model: &ValueModel,
    options: SerializeOptions,
) -> Result<Document, SerializeError> {
    let mapping = emit_fields(schema.fields(), model.root(), &PathContext::root())?;

    let mut buffer = Vec::new();
    write_yaml(&YamlValue::Mapping(mapping), &mut buffer, options)?;
    let document = String::from_utf8(buffer).context(ParseUtf8BytesSnafu)?;

    Ok(Document(document))
}

fn write_yaml<W>(
    value: &YamlValue,
    mut writer: W,
    options: SerializeOptions,
) -> Result<(), SerializeError>
where
    W: std::io::Write,
{
    if options.explicit_document {
        writer
            .write_all(b"---\n")
            .context(WriteDocumentSeparatorSnafu)?;
    }

    let mut serializer = serde_yaml::Serializer::new(writer);
    value
        .serialize(&mut serializer)
        .context(SerializeYamlSnafu)?;

    Ok(())
}

fn emit_fields(
    fields: &Fields,
    slots: &Slots,
    ctx: &PathContext,
) -> Result<Mapping, SerializeError> {
    let mut mapping = Mapping::new();

    for node in fields {
        let ctx = ctx.field(node.name());

        match slots.get(node.name()).unwrap_or(&Slot::Absent) {
            Slot::Present(value) => {
                mapping.insert(
                    YamlValue::String(node.document_key().to_owned()),
                    emit_value(node.kind(), value, &ctx)?,
                );
            }
            Slot::Absent => match node.requirement() {
                Requirement::Optional => {}
                requirement @ (Requirement::Required | Requirement::Computed) => {
                    return UnpopulatedSlotSnafu {
                        path: ctx.path(),
                        requirement,
                    }
                    .fail();
                }
            },
        }
    }

    Ok(mapping)
}

fn emit_value(kind: &Kind, value: &Value, ctx: &PathContext) -> Result<YamlValue, SerializeError> {
    match (kind, value) {
        (Kind::Scalar(expected), Value::Scalar(scalar)) if scalar.kind() == *expected => {
            Ok(emit_scalar(scalar))
        }
        (Kind::List(element), Value::List(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| emit_value(element, item, &ctx.index(index)))
            .collect::<Result<Vec<_>, _>>()
            .map(YamlValue::Sequence),
        (Kind::Map(expected), Value::Map(entries)) => {
            let mut mapping = Mapping::new();
            for (key, scalar) in entries {
                if scalar.kind() != *expected {
                    return KindMismatchSnafu {
                        path: ctx.key(key).path(),
                        expected: <&'static str>::from(*expected),
                        actual: <&'static str>::from(scalar.kind()),
                    }
                    .fail();
                }
                mapping.insert(YamlValue::String(key.clone()), emit_scalar(scalar));
            }
            Ok(YamlValue::Mapping(mapping))
        }
        (Kind::Object(fields), Value::Object(slots)) => {
            emit_fields(fields, slots, ctx).map(YamlValue::Mapping)
        }
        (kind, value) => KindMismatchSnafu {
            path: ctx.path(),
            expected: kind.type_name(),
            actual: value.type_name(),
        }
        .fail(),
    }
}

fn emit_scalar(scalar: &Scalar) -> YamlValue {
    match scalar {
        Scalar::String(value) => YamlValue::String(value.clone()),
        Scalar::Int(value) => YamlValue::Number((*value).into()),
        Scalar::Bool(value) => YamlValue::Bool(*value),
    }
}

/// Reads a document produced by [`serialize`] back into a value model.
///
/// Keys are matched against document keys, so the resulting model uses surface names again.
/// Required and computed nodes have to be present, optional ones may be left out.
pub fn parse(schema: &Schema, document: &Document) -> Result<ValueModel, ParseError> {
    let root: YamlValue = serde_yaml::from_str(document.as_str()).context(ParseYamlSnafu)?;
    let ctx = PathContext::root();

    let slots = match root {
        // An empty document is an empty mapping
        YamlValue::Null => parse_fields(schema.fields(), &Mapping::new(), &ctx)?,
        YamlValue::Mapping(mapping) => parse_fields(schema.fields(), &mapping, &ctx)?,
        other => {
            return TypeMismatchSnafu {
                path: ctx.path(),
                expected: "object",
                actual: yaml_type_name(&other),
            }
            .fail();
        }
    };

    Ok(ValueModel::new(slots))
}

fn parse_fields(
    fields: &Fields,
    mapping: &Mapping,
    ctx: &PathContext,
) -> Result<Slots, ParseError> {
    for key in mapping.keys() {
        let known = key
            .as_str()
            .is_some_and(|key| fields.by_document_key(key).is_some());
        if !known {
            return UnknownKeySnafu {
                path: ctx.path(),
                key: key.as_str().map_or_else(|| format!("{key:?}"), str::to_owned),
            }
            .fail();
        }
    }

    let mut slots = Slots::new();
    for node in fields {
        let ctx = ctx.field(node.name());
        let slot = match mapping.get(node.document_key()) {
            Some(value) => Slot::Present(parse_value(node.kind(), value, &ctx)?),
            None => match node.requirement() {
                Requirement::Optional => Slot::Absent,
                requirement @ (Requirement::Required | Requirement::Computed) => {
                    return MissingFieldSnafu {
                        path: ctx.path(),
                        requirement,
                    }
                    .fail();
                }
            },
        };
        slots.insert(node.name(), slot);
    }

    Ok(slots)
}

fn parse_value(kind: &Kind, value: &YamlValue, ctx: &PathContext) -> Result<Value, ParseError> {
    match (kind, value) {
        (Kind::Scalar(scalar), value) => parse_scalar(*scalar, value, ctx).map(Value::Scalar),
        (Kind::List(element), YamlValue::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_value(element, item, &ctx.index(index)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (Kind::Map(scalar), YamlValue::Mapping(mapping)) => {
            let mut entries = BTreeMap::new();
            for (key, entry) in mapping {
                let Some(key) = key.as_str() else {
                    return TypeMismatchSnafu {
                        path: ctx.path(),
                        expected: "string key",
                        actual: yaml_type_name(key),
                    }
                    .fail();
                };
                let entry = parse_scalar(*scalar, entry, &ctx.key(key))?;
                entries.insert(key.to_owned(), entry);
            }
            Ok(Value::Map(entries))
        }
        (Kind::Object(fields), YamlValue::Mapping(mapping)) => {
            parse_fields(fields, mapping, ctx).map(Value::Object)
        }
        (kind, value) => TypeMismatchSnafu {
            path: ctx.path(),
            expected: kind.type_name(),
            actual: yaml_type_name(value),
        }
        .fail(),
    }
}

fn parse_scalar(
    kind: ScalarKind,
    value: &YamlValue,
    ctx: &PathContext,
) -> Result<Scalar, ParseError> {
    let scalar = match (kind, value) {
        (ScalarKind::String, YamlValue::String(value)) => Some(Scalar::String(value.clone())),
        (ScalarKind::Int, YamlValue::Number(number)) => number.as_i64().map(Scalar::Int),
        (ScalarKind::Bool, YamlValue::Bool(value)) => Some(Scalar::Bool(*value)),
        _ => None,
    };

    scalar.ok_or_else(|| ParseError::TypeMismatch {
        path: ctx.path(),
        expected: kind.into(),
        actual: yaml_type_name(value),
    })
}

fn yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "bool",
        YamlValue::Number(number) if number.is_i64() => "int",
        YamlValue::Number(_) => "float",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "list",
        YamlValue::Mapping(_) => "object",
        YamlValue::Tagged(_) => "tagged value",
    }
}
