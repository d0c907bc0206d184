//! Post-processing of a [`ValueModel`] that fills in engine-owned fields.
use std::collections::BTreeMap;

use snafu::Snafu;
use tracing::debug;

use crate::{
    path::{FieldPath, PathContext},
    schema::{Fields, Kind, Requirement, Schema},
    value::{Slot, Slots, Value, ValueModel},
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while injecting computed values.
///
/// Both variants mean the resource definition did not supply what its schema asks for. They
/// are never caused by user configuration.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("no value was supplied for computed field {path}"))]
    MissingComputedValue { path: FieldPath },

    #[snafu(display(
        "computed value for {path} is a {actual}, but the schema declares a {expected}"
    ))]
    ComputedKindMismatch {
        path: FieldPath,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Values for computed nodes, keyed by schema path (e.g. `spec.volumes[].origin`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComputedValues(BTreeMap<FieldPath, Value>);

impl ComputedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<FieldPath>, value: impl Into<Value>) {
        self.0.insert(path.into(), value.into());
    }

    /// Builder variant of [`ComputedValues::insert`].
    pub fn with(mut self, path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        self.0.get(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FieldPath, Value)> for ComputedValues {
    fn from_iter<T: IntoIterator<Item = (FieldPath, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Sets every computed slot of `model` to the value supplied for its schema path.
///
/// Slots are overwritten regardless of their prior state. Computed nodes nested in objects are
/// set wherever the enclosing object is present, including each element of a list of objects.
/// Every computed node of the schema needs a value, even if no instance of it ends up in the
/// model.
pub fn inject_computed(
    schema: &Schema,
    mut model: ValueModel,
    computed_values: &ComputedValues,
) -> Result<ValueModel> {
    let mut injected = 0;

    // Check the whole schema first, so that missing values are reported even for nodes whose
    // ancestors are absent in this particular model.
    for path in schema.computed_paths() {
        let Some(value) = computed_values.get(&path) else {
            return MissingComputedValueSnafu { path }.fail();
        };
        if let Some(node) = schema.node(&path)
            && !value.conforms_to(node.kind())
        {
            return ComputedKindMismatchSnafu {
                expected: node.kind().type_name(),
                actual: value.type_name(),
                path,
            }
            .fail();
        }
    }

    inject_fields(
        schema.fields(),
        model.root_mut(),
        &PathContext::root(),
        computed_values,
        &mut injected,
    )?;

    debug!(injected, "injected computed values");
    Ok(model)
}

fn inject_fields(
    fields: &Fields,
    slots: &mut Slots,
    ctx: &PathContext,
    computed_values: &ComputedValues,
    injected: &mut usize,
) -> Result<()> {
    for node in fields {
        let ctx = ctx.field(node.name());

        if node.requirement() == Requirement::Computed {
            let path = ctx.path();
            let value = computed_values
                .get(&path)
                .ok_or(Error::MissingComputedValue { path })?;
            slots.insert(node.name(), Slot::Present(value.clone()));
            *injected += 1;
            continue;
        }

        if let Some(value) = slots.get_mut(node.name()).and_then(Slot::as_present_mut) {
            inject_value(node.kind(), value, &ctx, computed_values, injected)?;
        }
    }

    Ok(())
}

fn inject_value(
    kind: &Kind,
    value: &mut Value,
    ctx: &PathContext,
    computed_values: &ComputedValues,
    injected: &mut usize,
) -> Result<()> {
    match (kind, value) {
        (Kind::Object(fields), Value::Object(slots)) => {
            inject_fields(fields, slots, ctx, computed_values, injected)
        }
        (Kind::List(element), Value::List(items)) => {
            // Computed values are keyed by schema path, so every element shares the same one
            let ctx = ctx.element();
            items
                .iter_mut()
                .try_for_each(|item| inject_value(element, item, &ctx, computed_values, injected))
        }
        _ => Ok(()),
    }
}
