use indoc::indoc;
use jiff::{SignedDuration, Timestamp};
use manifest_engine::{
    Resource, ResourceDefinition,
    clock::SteppingClock,
    document::{self, Document},
    inject::{ComputedValues, inject_computed},
    lifecycle::{API_VERSION_FIELD, KIND_FIELD},
    path::FieldPath,
    schema::{Kind, Node, ScalarKind, Schema},
    transcode::into_value_model,
    validation::{ValidationErrorKind, validate},
    value::ValueModel,
};
use rstest::{fixture, rstest};
use serde_json::{Map, Value as JsonValue, json};

#[fixture]
fn schema() -> Schema {
    Schema::new([
        Node::computed(API_VERSION_FIELD, Kind::String),
        Node::computed(KIND_FIELD, Kind::String),
        Node::required(
            "metadata",
            Kind::object([
                Node::required("name", Kind::String),
                Node::optional("labels", Kind::map_of(ScalarKind::String)),
            ]),
        ),
        Node::required(
            "spec",
            Kind::object([
                Node::required("image", Kind::String),
                Node::optional("replicas", Kind::Int),
                Node::optional("suspend", Kind::Bool),
                Node::optional("arguments", Kind::list_of(Kind::String)),
                Node::optional(
                    "driver",
                    Kind::object([
                        Node::optional("cores", Kind::Int),
                        Node::optional("memory", Kind::String),
                    ]),
                ),
                Node::optional(
                    "hosts",
                    Kind::list_of(Kind::object([
                        Node::required("ip", Kind::String),
                        Node::optional("port", Kind::Int),
                    ])),
                ),
            ]),
        ),
    ])
}

fn computed() -> ComputedValues {
    ComputedValues::new()
        .with(API_VERSION_FIELD, "example.com/v1")
        .with(KIND_FIELD, "Workload")
}

/// Runs validate, transcode and inject.
fn model(schema: &Schema, config: JsonValue) -> ValueModel {
    let validated = validate(schema, config).expect("configuration is valid");
    inject_computed(schema, into_value_model(&validated), &computed())
        .expect("all computed values are supplied")
}

fn render(schema: &Schema, config: JsonValue) -> Document {
    document::serialize(schema, &model(schema, config)).expect("model matches schema")
}

#[rstest]
#[case::minimal(json!({
    "metadata": {"name": "x"},
    "spec": {"image": "spark"},
}))]
#[case::full(json!({
    "metadata": {"name": "x", "labels": {"b": "2", "a": "1"}},
    "spec": {
        "image": "spark",
        "replicas": 0,
        "suspend": false,
        "arguments": ["--verbose", "123", ""],
        "driver": {},
        "hosts": [{"ip": "b"}, {"ip": "a", "port": 8080}],
    },
}))]
fn round_trip_is_idempotent(schema: Schema, #[case] config: JsonValue) {
    let model = model(&schema, config);
    let document = document::serialize(&schema, &model).expect("model matches schema");

    let parsed = document::parse(&schema, &document).expect("document is well formed");
    assert_eq!(parsed, model);

    let reserialized = document::serialize(&schema, &parsed).expect("model matches schema");
    assert_eq!(reserialized.as_str(), document.as_str());
}

#[rstest]
fn absent_optional_nodes_emit_nothing(schema: Schema) {
    let document = render(
        &schema,
        json!({"metadata": {"name": "x"}, "spec": {"image": "spark"}}),
    );

    assert_eq!(document.as_str(), indoc! {"
        ---
        apiVersion: example.com/v1
        kind: Workload
        metadata:
          name: x
        spec:
          image: spark
    "});
}

#[rstest]
fn present_zero_values_are_emitted(schema: Schema) {
    let document = render(
        &schema,
        json!({
            "metadata": {"name": "", "labels": {}},
            "spec": {
                "image": "spark",
                "replicas": 0,
                "suspend": false,
                "arguments": [],
                "driver": {},
            },
        }),
    );

    assert_eq!(document.as_str(), indoc! {"
        ---
        apiVersion: example.com/v1
        kind: Workload
        metadata:
          name: ''
          labels: {}
        spec:
          image: spark
          replicas: 0
          suspend: false
          arguments: []
          driver: {}
    "});
}

#[rstest]
fn explicit_null_is_absent(schema: Schema) {
    let with_null = render(
        &schema,
        json!({
            "metadata": {"name": "x", "labels": null},
            "spec": {"image": "spark", "driver": null},
        }),
    );
    let without = render(
        &schema,
        json!({"metadata": {"name": "x"}, "spec": {"image": "spark"}}),
    );

    assert_eq!(with_null, without);
}

#[rstest]
fn independent_violations_are_all_reported(schema: Schema) {
    let errors = validate(
        &schema,
        json!({
            "kind": "Other",
            "metadata": {"labels": {"team": 1}},
            "spec": {
                "image": "spark",
                "replicas": "three",
                "driver": {"gpus": 1},
                "hosts": [{"ip": "a"}, {"port": 80}],
            },
            "status": {},
        }),
    )
    .expect_err("configuration has violations");

    let mut triples: Vec<_> = errors
        .iter()
        .map(|error| (error.path().to_string(), error.kind()))
        .collect();
    triples.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(triples, [
        ("kind".to_owned(), ValidationErrorKind::ComputedFieldOverride),
        (r#"metadata.labels["team"]"#.to_owned(), ValidationErrorKind::TypeMismatch),
        ("metadata.name".to_owned(), ValidationErrorKind::MissingRequiredField),
        ("spec.driver.gpus".to_owned(), ValidationErrorKind::UnknownField),
        ("spec.hosts[1].ip".to_owned(), ValidationErrorKind::MissingRequiredField),
        ("spec.replicas".to_owned(), ValidationErrorKind::TypeMismatch),
        ("status".to_owned(), ValidationErrorKind::UnknownField),
    ]);
}

#[rstest]
fn map_insertion_order_does_not_change_output(schema: Schema) {
    let labels = |keys: &[&str]| {
        let mut labels = Map::new();
        for key in keys {
            labels.insert((*key).to_owned(), JsonValue::String(format!("value-{key}")));
        }
        json!({"metadata": {"name": "x", "labels": labels}, "spec": {"image": "spark"}})
    };

    let forward = render(&schema, labels(&["alpha", "beta", "gamma", "delta"]));
    let backward = render(&schema, labels(&["delta", "gamma", "beta", "alpha"]));

    assert_eq!(forward.as_str(), backward.as_str());
    assert!(forward.as_str().contains(
        "  labels:\n    alpha: value-alpha\n    beta: value-beta\n    delta: value-delta\n    gamma: value-gamma\n"
    ));
}

#[rstest]
#[case(json!("custom"))]
#[case(json!("example.com/v1"))]
#[case(json!(""))]
#[case(json!(42))]
#[case(json!(true))]
#[case(json!({"nested": "object"}))]
#[case(json!(["list"]))]
fn computed_fields_are_never_user_settable(schema: Schema, #[case] value: JsonValue) {
    let errors = validate(
        &schema,
        json!({
            "api_version": value,
            "metadata": {"name": "x"},
            "spec": {"image": "spark"},
        }),
    )
    .expect_err("api_version is computed");

    let triples: Vec<_> = errors.triples().collect();
    assert_eq!(triples, [(
        "api_version".to_owned(),
        ValidationErrorKind::ComputedFieldOverride,
        "field is computed and must not be set".to_owned()
    )]);
}

#[test]
fn scenario_optional_field_left_out() {
    let schema = Schema::new([
        Node::required("name", Kind::String),
        Node::optional("replicas", Kind::Int),
    ]);

    let validated = validate(&schema, json!({"name": "x"})).expect("configuration is valid");
    let model = inject_computed(&schema, into_value_model(&validated), &ComputedValues::new())
        .expect("schema has no computed nodes");
    let document = document::serialize(&schema, &model).expect("model matches schema");

    assert_eq!(document.as_str(), "---\nname: x\n");
}

#[test]
fn scenario_missing_required_field() {
    let schema = Schema::new([Node::required("name", Kind::String)]);

    let errors = validate(&schema, json!({})).expect_err("name is required");
    let triples: Vec<_> = errors.triples().collect();

    assert_eq!(triples, [(
        "name".to_owned(),
        ValidationErrorKind::MissingRequiredField,
        "field is required".to_owned()
    )]);
}

#[test]
fn scenario_computed_field_override() {
    let schema = Schema::new([Node::computed("kind", Kind::String)]);

    let errors = validate(&schema, json!({"kind": "custom"})).expect_err("kind is computed");
    let kinds: Vec<_> = errors
        .iter()
        .map(|error| (error.path().clone(), error.kind()))
        .collect();

    assert_eq!(kinds, [(
        FieldPath::from("kind"),
        ValidationErrorKind::ComputedFieldOverride
    )]);
}

#[rstest]
fn scenario_create_twice(schema: Schema) {
    let definition = ResourceDefinition::new("example.com/v1", "Workload", schema);
    let clock = SteppingClock::new(Timestamp::UNIX_EPOCH, SignedDuration::from_millis(1));
    let config = json!({"metadata": {"name": "x"}, "spec": {"image": "spark"}});

    let mut first = Resource::with_clock(&definition, &clock);
    let mut second = Resource::with_clock(&definition, &clock);
    let first = first.create(config.clone()).expect("configuration is valid");
    let second = second.create(config).expect("configuration is valid");

    assert_ne!(first.id, second.id);
    assert_eq!(first.document, second.document);
}

#[test]
fn scenario_list_order_is_preserved() {
    let schema = Schema::new([Node::required(
        "hosts",
        Kind::list_of(Kind::object([Node::required("ip", Kind::String)])),
    )]);

    let validated = validate(&schema, json!({"hosts": [{"ip": "a"}, {"ip": "b"}]}))
        .expect("configuration is valid");
    let model = inject_computed(&schema, into_value_model(&validated), &ComputedValues::new())
        .expect("schema has no computed nodes");
    let document = document::serialize(&schema, &model).expect("model matches schema");

    assert_eq!(document.as_str(), indoc! {"
        ---
        hosts:
        - ip: a
        - ip: b
    "});
}
