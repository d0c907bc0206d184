//! Conversion of validated configurations into the [`ValueModel`].
//!
//! The conversion is a plain structural recursion over the schema. Every node gets a slot,
//! nodes the user left out (or set to `null`) get [`Slot::Absent`], computed nodes are always
//! absent at this point and are filled in by [`inject_computed`](crate::inject::inject_computed).
use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use crate::{
    schema::{Fields, Kind, Requirement, ScalarKind},
    validation::ValidatedConfig,
    value::{Scalar, Slot, Slots, Value, ValueModel},
};

/// Builds the value model of a validated configuration.
///
/// List elements keep their configuration order, map entries are sorted by key.
pub fn into_value_model(validated: &ValidatedConfig<'_>) -> ValueModel {
    ValueModel::new(slots_from_json(
        validated.schema().fields(),
        validated.config(),
    ))
}

fn slots_from_json(fields: &Fields, object: &Map<String, JsonValue>) -> Slots {
    fields
        .iter()
        .map(|node| {
            let slot = match node.requirement() {
                Requirement::Computed => Slot::Absent,
                Requirement::Required | Requirement::Optional => object
                    .get(node.name())
                    .and_then(|value| value_from_json(node.kind(), value))
                    .into(),
            };
            (node.name().to_owned(), slot)
        })
        .collect()
}

/// Converts a single JSON value, returning [`None`] for `null` and for values that do not have
/// the declared kind. Validation guarantees the latter never happens for a [`ValidatedConfig`].
fn value_from_json(kind: &Kind, value: &JsonValue) -> Option<Value> {
    match (kind, value) {
        (_, JsonValue::Null) => None,
        (Kind::Scalar(scalar), value) => scalar_from_json(*scalar, value).map(Value::Scalar),
        (Kind::List(element), JsonValue::Array(items)) => Some(Value::List(
            items
                .iter()
                .filter_map(|item| value_from_json(element, item))
                .collect(),
        )),
        (Kind::Map(scalar), JsonValue::Object(entries)) => Some(Value::Map(
            entries
                .iter()
                .filter_map(|(key, entry)| {
                    scalar_from_json(*scalar, entry).map(|scalar| (key.clone(), scalar))
                })
                .collect::<BTreeMap<_, _>>(),
        )),
        (Kind::Object(fields), JsonValue::Object(object)) => {
            Some(Value::Object(slots_from_json(fields, object)))
        }
        _ => None,
    }
}

fn scalar_from_json(kind: ScalarKind, value: &JsonValue) -> Option<Scalar> {
    match kind {
        ScalarKind::String => value.as_str().map(Scalar::from),
        ScalarKind::Int => value.as_i64().map(Scalar::Int),
        ScalarKind::Bool => value.as_bool().map(Scalar::Bool),
    }
}
