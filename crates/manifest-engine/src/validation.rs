//! Validation of candidate configurations against a [`Schema`].
//!
//! [`validate`] walks the whole candidate and collects *every* violation before returning, so
//! a deeply nested configuration with several independent mistakes is reported in one go.
//!
//! ```
//! use manifest_engine::{
//!     schema::{Kind, Node, Schema},
//!     validation::{ValidationErrorKind, validate},
//! };
//! use serde_json::json;
//!
//! let schema = Schema::new([
//!     Node::required("name", Kind::String),
//!     Node::computed("kind", Kind::String),
//! ]);
//!
//! let errors = validate(&schema, json!({"kind": "custom"})).unwrap_err();
//! let kinds: Vec<_> = errors.iter().map(|error| error.kind()).collect();
//!
//! assert_eq!(kinds, [
//!     ValidationErrorKind::MissingRequiredField,
//!     ValidationErrorKind::ComputedFieldOverride,
//! ]);
//! ```
use std::fmt::Display;

use serde_json::{Map, Value as JsonValue};
use snafu::Snafu;
use strum::EnumDiscriminants;

use crate::{
    path::{FieldPath, PathContext},
    schema::{Fields, Kind, Node, Requirement, ScalarKind, Schema},
};

/// A configuration that passed [`validate`] against the schema it refers to.
#[derive(Debug)]
pub struct ValidatedConfig<'a> {
    schema: &'a Schema,
    config: Map<String, JsonValue>,
}

impl<'a> ValidatedConfig<'a> {
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The top-level configuration object, as supplied by the caller.
    pub fn config(&self) -> &Map<String, JsonValue> {
        &self.config
    }
}

/// A problem with a single configuration field, with no additional context.
#[derive(Debug, PartialEq, Eq, Snafu, EnumDiscriminants)]
#[strum_discriminants(name(ValidationErrorKind), derive(Hash, strum::Display))]
pub enum ValidationProblem {
    #[snafu(display("field is required"))]
    MissingRequiredField,

    #[snafu(display("field is not described by the schema"))]
    UnknownField,

    #[snafu(display("field is computed and must not be set"))]
    ComputedFieldOverride,

    #[snafu(display("expected {expected}, found {actual}"))]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[snafu(display("{predicate}: {message}"))]
    InvalidValue {
        predicate: &'static str,
        message: String,
    },
}

/// A single violation, located by its path in the configuration.
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display("invalid configuration at {path}"))]
pub struct ValidationError {
    path: FieldPath,
    #[snafu(source)]
    problem: ValidationProblem,
}

impl ValidationError {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn problem(&self) -> &ValidationProblem {
        &self.problem
    }

    pub fn kind(&self) -> ValidationErrorKind {
        ValidationErrorKind::from(&self.problem)
    }

    /// A human readable description of the problem, without the path.
    pub fn message(&self) -> String {
        self.problem.to_string()
    }
}

/// Every violation discovered while validating one configuration.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The violations as `(path, kind, message)` triples, e.g. for reporting them to a host.
    pub fn triples(&self) -> impl Iterator<Item = (String, ValidationErrorKind, String)> + '_ {
        self.0
            .iter()
            .map(|error| (error.path.to_string(), error.kind(), error.message()))
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{path}: {problem}", path = error.path, problem = error.problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type IntoIter = std::vec::IntoIter<ValidationError>;
    type Item = ValidationError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Validates `candidate` against `schema`.
///
/// Explicit `null` values are treated exactly like left out fields.
pub fn validate(
    schema: &Schema,
    candidate: JsonValue,
) -> Result<ValidatedConfig<'_>, ValidationErrors> {
    let root = PathContext::root();
    let mut errors = Vec::new();

    let config = match candidate {
        JsonValue::Object(config) => {
            validate_fields(schema.fields(), &config, &root, &mut errors);
            config
        }
        other => {
            errors.push(root.error(ValidationProblem::TypeMismatch {
                expected: "object",
                actual: json_type_name(&other),
            }));
            Map::new()
        }
    };

    if errors.is_empty() {
        tracing::debug!("configuration is valid");
        Ok(ValidatedConfig { schema, config })
    } else {
        tracing::debug!(errors = errors.len(), "configuration is invalid");
        Err(ValidationErrors(errors))
    }
}

impl PathContext<'_> {
    fn error(&self, problem: ValidationProblem) -> ValidationError {
        ValidationError {
            path: self.path(),
            problem,
        }
    }
}

fn validate_fields(
    fields: &Fields,
    object: &Map<String, JsonValue>,
    ctx: &PathContext,
    errors: &mut Vec<ValidationError>,
) {
    for node in fields {
        let ctx = ctx.field(node.name());
        let value = object.get(node.name()).filter(|value| !value.is_null());

        match (node.requirement(), value) {
            (Requirement::Computed, Some(_)) => {
                errors.push(ctx.error(ValidationProblem::ComputedFieldOverride));
            }
            (Requirement::Required, None) => {
                errors.push(ctx.error(ValidationProblem::MissingRequiredField));
            }
            (Requirement::Computed | Requirement::Optional, None) => {}
            (Requirement::Required | Requirement::Optional, Some(value)) => {
                validate_value(node, node.kind(), value, &ctx, errors);
            }
        }
    }

    for name in object.keys() {
        if fields.child(name).is_none() {
            errors.push(ctx.field(name).error(ValidationProblem::UnknownField));
        }
    }
}

fn validate_value(
    node: &Node,
    kind: &Kind,
    value: &JsonValue,
    ctx: &PathContext,
    errors: &mut Vec<ValidationError>,
) {
    let mismatch = || {
        ctx.error(ValidationProblem::TypeMismatch {
            expected: kind.type_name(),
            actual: json_type_name(value),
        })
    };

    match kind {
        Kind::Scalar(scalar) => {
            if scalar_matches(*scalar, value) {
                validate_predicates(node, value, ctx, errors);
            } else {
                errors.push(mismatch());
            }
        }
        Kind::List(element) => match value {
            JsonValue::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    validate_value(node, element, item, &ctx.index(index), errors);
                }
            }
            _ => errors.push(mismatch()),
        },
        Kind::Map(scalar) => match value {
            JsonValue::Object(entries) => {
                for (key, entry) in entries {
                    let ctx = ctx.key(key);
                    if scalar_matches(*scalar, entry) {
                        validate_predicates(node, entry, &ctx, errors);
                    } else {
                        errors.push(ctx.error(ValidationProblem::TypeMismatch {
                            expected: (*scalar).into(),
                            actual: json_type_name(entry),
                        }));
                    }
                }
            }
            _ => errors.push(mismatch()),
        },
        Kind::Object(fields) => match value {
            JsonValue::Object(object) => validate_fields(fields, object, ctx, errors),
            _ => errors.push(mismatch()),
        },
    }
}

fn validate_predicates(
    node: &Node,
    value: &JsonValue,
    ctx: &PathContext,
    errors: &mut Vec<ValidationError>,
) {
    let Some(value) = value.as_str() else {
        return;
    };

    for predicate in node.predicates() {
        if let Err(problems) = predicate.check(value) {
            errors.push(ctx.error(ValidationProblem::InvalidValue {
                predicate: predicate.name(),
                message: problems.to_string(),
            }));
        }
    }
}

fn scalar_matches(kind: ScalarKind, value: &JsonValue) -> bool {
    match kind {
        ScalarKind::String => value.is_string(),
        ScalarKind::Int => value.is_i64(),
        ScalarKind::Bool => value.is_boolean(),
    }
}

/// The name of a JSON value's type, in the vocabulary of [`Kind::type_name`].
pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(number) if number.is_i64() => "int",
        JsonValue::Number(number) if number.is_u64() => "out-of-range int",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::predicate;

    fn kinds(errors: &ValidationErrors) -> Vec<(String, ValidationErrorKind)> {
        errors
            .iter()
            .map(|error| (error.path().to_string(), error.kind()))
            .collect()
    }

    fn driver_schema() -> Schema {
        Schema::new([
            Node::computed("kind", Kind::String),
            Node::required(
                "metadata",
                Kind::object([
                    Node::required("name", Kind::String)
                        .with_predicate(predicate::lowercase_rfc_1123_subdomain()),
                    Node::optional("labels", Kind::map_of(ScalarKind::String))
                        .with_predicate(predicate::Predicate::max_length(8)),
                ]),
            ),
            Node::required(
                "spec",
                Kind::object([Node::required(
                    "template",
                    Kind::object([
                        Node::required(
                            "driver",
                            Kind::object([
                                Node::required("cores", Kind::Int),
                                Node::optional("memory", Kind::String),
                            ]),
                        ),
                        Node::optional(
                            "hosts",
                            Kind::list_of(Kind::object([Node::required("ip", Kind::String)])),
                        ),
                        Node::optional("arguments", Kind::list_of(Kind::String)),
                        Node::optional("dynamic", Kind::Bool),
                    ]),
                )]),
            ),
        ])
    }

    #[test]
    fn accepts_valid_configuration() {
        let schema = driver_schema();
        let validated = validate(
            &schema,
            json!({
                "metadata": {"name": "spark-pi", "labels": {"app": "spark"}},
                "spec": {"template": {
                    "driver": {"cores": 1},
                    "hosts": [{"ip": "a"}, {"ip": "b"}],
                    "arguments": ["--verbose"],
                    "dynamic": false,
                }},
            }),
        )
        .expect("configuration is valid");

        assert!(validated.config().contains_key("spec"));
    }

    #[test]
    fn reports_missing_required_field() {
        let schema = Schema::new([Node::required("name", Kind::String)]);
        let errors = validate(&schema, json!({})).expect_err("name is missing");

        assert_eq!(kinds(&errors), [(
            "name".to_owned(),
            ValidationErrorKind::MissingRequiredField
        )]);
    }

    #[rstest]
    #[case(json!(9_223_372_036_854_775_808_u64), "expected int, found out-of-range int")]
    #[case(json!(u64::MAX), "expected int, found out-of-range int")]
    #[case(json!(1.5), "expected int, found float")]
    #[case(json!("3"), "expected int, found string")]
    fn names_the_mismatched_type(#[case] replicas: JsonValue, #[case] message: &str) {
        let schema = Schema::new([Node::optional("replicas", Kind::Int)]);
        let errors = validate(&schema, json!({"replicas": replicas})).expect_err("not an i64");

        let triples: Vec<_> = errors.triples().collect();
        assert_eq!(triples, [(
            "replicas".to_owned(),
            ValidationErrorKind::TypeMismatch,
            message.to_owned()
        )]);
    }

    #[test]
    fn null_counts_as_missing() {
        let schema = Schema::new([
            Node::required("name", Kind::String),
            Node::optional("replicas", Kind::Int),
        ]);
        let errors =
            validate(&schema, json!({"name": null, "replicas": null})).expect_err("name is null");

        assert_eq!(kinds(&errors), [(
            "name".to_owned(),
            ValidationErrorKind::MissingRequiredField
        )]);
    }

    #[rstest]
    #[case(json!("custom"))]
    #[case(json!(""))]
    #[case(json!(1))]
    #[case(json!({"nested": true}))]
    fn rejects_computed_override_regardless_of_value(#[case] value: JsonValue) {
        let schema = Schema::new([Node::computed("kind", Kind::String)]);
        let errors = validate(&schema, json!({ "kind": value })).expect_err("kind is computed");

        assert_eq!(kinds(&errors), [(
            "kind".to_owned(),
            ValidationErrorKind::ComputedFieldOverride
        )]);
    }

    #[rstest]
    #[case(Kind::String, json!(1), "string", "int")]
    #[case(Kind::Int, json!("1"), "int", "string")]
    #[case(Kind::Int, json!(1.5), "int", "float")]
    #[case(Kind::Bool, json!("true"), "bool", "string")]
    #[case(Kind::list_of(Kind::String), json!("a"), "list", "string")]
    #[case(Kind::map_of(ScalarKind::String), json!(["a"]), "map", "list")]
    #[case(Kind::object([]), json!(true), "object", "bool")]
    fn reports_type_mismatch(
        #[case] kind: Kind,
        #[case] value: JsonValue,
        #[case] expected: &'static str,
        #[case] actual: &'static str,
    ) {
        let schema = Schema::new([Node::required("field", kind)]);
        let errors = validate(&schema, json!({ "field": value })).expect_err("type mismatch");
        let error = errors.iter().next().expect("one error");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            error.problem(),
            &ValidationProblem::TypeMismatch { expected, actual }
        );
    }

    #[test]
    fn rejects_non_object_root() {
        let schema = Schema::new([]);
        let errors = validate(&schema, json!([1, 2])).expect_err("root is a list");

        assert_eq!(kinds(&errors), [(
            "<root>".to_owned(),
            ValidationErrorKind::TypeMismatch
        )]);
    }

    #[test]
    fn accumulates_independent_violations() {
        let schema = driver_schema();
        let errors = validate(
            &schema,
            json!({
                "kind": "SparkApplication",
                "metadata": {"name": "Spark_Pi", "labels": {"app": 1, "team": "data-engineering"}},
                "spec": {"template": {
                    "driver": {"cores": "2", "gpus": 1},
                    "hosts": [{"ip": "a"}, {}],
                    "arguments": ["ok", 3],
                }},
                "status": {},
            }),
        )
        .expect_err("configuration has many problems");

        assert_eq!(kinds(&errors), [
            ("kind".to_owned(), ValidationErrorKind::ComputedFieldOverride),
            ("metadata.name".to_owned(), ValidationErrorKind::InvalidValue),
            (
                r#"metadata.labels["app"]"#.to_owned(),
                ValidationErrorKind::TypeMismatch
            ),
            (
                r#"metadata.labels["team"]"#.to_owned(),
                ValidationErrorKind::InvalidValue
            ),
            (
                "spec.template.driver.cores".to_owned(),
                ValidationErrorKind::TypeMismatch
            ),
            (
                "spec.template.driver.gpus".to_owned(),
                ValidationErrorKind::UnknownField
            ),
            (
                "spec.template.hosts[1].ip".to_owned(),
                ValidationErrorKind::MissingRequiredField
            ),
            (
                "spec.template.arguments[1]".to_owned(),
                ValidationErrorKind::TypeMismatch
            ),
            ("status".to_owned(), ValidationErrorKind::UnknownField),
        ]);
    }

    #[test]
    fn triples_carry_path_kind_and_message() {
        let schema = Schema::new([Node::required("name", Kind::String)]);
        let errors = validate(&schema, json!({"name": 1})).expect_err("name is not a string");
        let triples: Vec<_> = errors.triples().collect();

        assert_eq!(triples, [(
            "name".to_owned(),
            ValidationErrorKind::TypeMismatch,
            "expected string, found int".to_owned()
        )]);
        assert_eq!(errors.to_string(), "name: expected string, found int");
    }

    #[test]
    fn kinds_display_by_name() {
        assert_eq!(
            ValidationErrorKind::ComputedFieldOverride.to_string(),
            "ComputedFieldOverride"
        );
    }
}
