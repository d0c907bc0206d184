//! The presence-aware value model.
//!
//! Every schema node has exactly one [`Slot`] in a [`ValueModel`], which is either
//! [`Slot::Absent`] or [`Slot::Present`]. Leaving a field out is therefore never confused with
//! setting it to `0`, `""` or `false`.
use std::{collections::BTreeMap, fmt::Display};

use indexmap::IndexMap;

use crate::{
    path::{FieldPath, Segment},
    schema::{Kind, Requirement, ScalarKind},
};

/// The presence state of a single node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Slot<T> {
    #[default]
    Absent,
    Present(T),
}

impl<T> Slot<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn as_present_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn into_present(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }
}

/// A leaf value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scalar {
    String(String),
    Int(i64),
    Bool(bool),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::String(_) => ScalarKind::String,
            Self::Int(_) => ScalarKind::Int,
            Self::Bool(_) => ScalarKind::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Int(_) | Self::Bool(_) => None,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// The content of a present slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Scalar(Scalar),

    /// Elements in configuration order.
    List(Vec<Value>),

    /// Sorted by key, so that two maps with the same entries are equal and serialize
    /// identically regardless of insertion order.
    Map(BTreeMap<String, Scalar>),

    Object(Slots),
}

impl Value {
    /// A short name of the kind of this value, matching [`Kind::type_name`].
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(scalar) => scalar.kind().into(),
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Whether this value has the shape described by `kind`, recursively.
    ///
    /// Objects conform if every slot they hold is declared by the kind and every present slot
    /// conforms to its node.
    pub fn conforms_to(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Self::Scalar(scalar), Kind::Scalar(expected)) => scalar.kind() == *expected,
            (Self::List(elements), Kind::List(element)) => {
                elements.iter().all(|value| value.conforms_to(element))
            }
            (Self::Map(entries), Kind::Map(expected)) => {
                entries.values().all(|scalar| scalar.kind() == *expected)
            }
            (Self::Object(slots), Kind::Object(fields)) => {
                let known = slots.iter().all(|(name, slot)| match fields.child(name) {
                    Some(node) => match slot {
                        Slot::Present(value) => value.conforms_to(node.kind()),
                        Slot::Absent => true,
                    },
                    None => false,
                });

                // Only optional children may be left out
                known
                    && fields.iter().all(|node| {
                        node.requirement() == Requirement::Optional
                            || slots.present(node.name()).is_some()
                    })
            }
            _ => false,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Scalar>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Slots> {
        match self {
            Self::Object(slots) => Some(slots),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

/// The slots of one object, keyed by surface name, in schema declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slots(IndexMap<String, Slot<Value>>);

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slot for `name`, keeping its position if it already existed.
    pub fn insert(&mut self, name: impl Into<String>, slot: Slot<Value>) {
        self.0.insert(name.into(), slot);
    }

    pub fn get(&self, name: &str) -> Option<&Slot<Value>> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Slot<Value>> {
        self.0.get_mut(name)
    }

    /// Returns the value of `name` if its slot is present.
    pub fn present(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Slot::as_present)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot<Value>)> {
        self.0.iter().map(|(name, slot)| (name.as_str(), slot))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Slot<Value>)> for Slots {
    fn from_iter<T: IntoIterator<Item = (String, Slot<Value>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A presence-aware instance of a schema, one slot per node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueModel {
    root: Slots,
}

impl ValueModel {
    pub fn new(root: Slots) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Slots {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Slots {
        &mut self.root
    }

    pub fn into_root(self) -> Slots {
        self.root
    }

    /// Returns the present value at `path`, following fields, list indices and map keys.
    ///
    /// Returns [`None`] if any slot along the way is absent or the path does not exist.
    pub fn get(&self, path: &FieldPath) -> Option<Lookup<'_>> {
        let mut current = Lookup::Object(&self.root);

        for segment in path.segments() {
            current = match (current, segment) {
                (Lookup::Object(slots), Segment::Field(name)) => {
                    Lookup::Value(slots.present(name)?)
                }
                (Lookup::Value(Value::Object(slots)), Segment::Field(name)) => {
                    Lookup::Value(slots.present(name)?)
                }
                (Lookup::Value(Value::List(elements)), Segment::Index(index)) => {
                    Lookup::Value(elements.get(*index)?)
                }
                (Lookup::Value(Value::Map(entries)), Segment::Key(key)) => {
                    Lookup::Scalar(entries.get(key)?)
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Whether a value is present at `path`.
    pub fn is_present(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }
}

/// The result of [`ValueModel::get`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The path addressed the model root.
    Object(&'a Slots),
    Value(&'a Value),
    /// The path addressed a map entry.
    Scalar(&'a Scalar),
}

impl<'a> Lookup<'a> {
    /// The addressed scalar, whether it is a leaf value or a map entry.
    pub fn scalar(self) -> Option<&'a Scalar> {
        match self {
            Self::Value(Value::Scalar(scalar)) | Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Object(_) | Self::Scalar(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::schema::Node;

    fn model() -> ValueModel {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_owned(), Scalar::from("spark"));

        let mut host = Slots::new();
        host.insert("ip", Slot::Present("10.0.0.1".into()));

        let mut spec = Slots::new();
        spec.insert("replicas", Slot::Absent);
        spec.insert("labels", Slot::Present(Value::Map(labels)));
        spec.insert(
            "hosts",
            Slot::Present(Value::List(vec![Value::Object(host)])),
        );

        let mut root = Slots::new();
        root.insert("name", Slot::Present("x".into()));
        root.insert("spec", Slot::Present(Value::Object(spec)));
        ValueModel::new(root)
    }

    #[test]
    fn absent_is_not_a_zero_value() {
        assert_ne!(Slot::<Value>::Absent, Slot::Present(Value::from(0_i64)));
        assert_ne!(Slot::<Value>::Absent, Slot::Present(Value::from("")));
        assert_ne!(Slot::<Value>::Absent, Slot::Present(Value::from(false)));
    }

    #[test]
    fn looks_up_nested_values() {
        let model = model();

        assert_eq!(
            model
                .get(&FieldPath::from_dotted("name"))
                .and_then(Lookup::scalar),
            Some(&Scalar::from("x"))
        );

        let ip: FieldPath = [
            Segment::Field("spec".into()),
            Segment::Field("hosts".into()),
            Segment::Index(0),
            Segment::Field("ip".into()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            model.get(&ip).and_then(Lookup::scalar),
            Some(&Scalar::from("10.0.0.1"))
        );

        let label: FieldPath = [
            Segment::Field("spec".into()),
            Segment::Field("labels".into()),
            Segment::Key("app".into()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            model.get(&label).and_then(Lookup::scalar),
            Some(&Scalar::from("spark"))
        );
    }

    #[test]
    fn absent_slots_are_not_found() {
        let model = model();

        assert!(!model.is_present(&FieldPath::from_dotted("spec.replicas")));
        assert!(!model.is_present(&FieldPath::from_dotted("spec.unknown")));
        assert!(model.is_present(&FieldPath::from_dotted("spec.hosts")));
    }

    #[test]
    fn conformance_follows_kinds() {
        let kind = Kind::object([
            Node::required("ip", Kind::String),
            Node::optional("port", Kind::Int),
        ]);

        let mut slots = Slots::new();
        slots.insert("ip", Slot::Present("a".into()));
        slots.insert("port", Slot::Absent);
        assert!(Value::Object(slots.clone()).conforms_to(&kind));

        slots.insert("port", Slot::Present("80".into()));
        assert!(!Value::Object(slots.clone()).conforms_to(&kind));

        slots.insert("port", Slot::Absent);
        slots.insert("zone", Slot::Present("eu".into()));
        assert!(!Value::Object(slots).conforms_to(&kind));
    }

    #[rstest]
    #[case::required_absent(&[("ip", Slot::Absent)])]
    #[case::required_missing(&[("port", Slot::Present(Value::from(80_i64)))])]
    #[case::computed_missing(&[("ip", Slot::Present(Value::from("a")))])]
    fn objects_without_mandatory_children_do_not_conform(
        #[case] entries: &[(&str, Slot<Value>)],
    ) {
        let kind = Kind::object([
            Node::required("ip", Kind::String),
            Node::optional("port", Kind::Int),
            Node::computed("zone", Kind::String),
        ]);

        let slots = entries
            .iter()
            .map(|(name, slot)| ((*name).to_owned(), slot.clone()))
            .collect();
        assert!(!Value::Object(slots).conforms_to(&kind));
    }
}
