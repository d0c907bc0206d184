//! The `SparkApplication` custom resource of the Spark operator.
use crate::{
    lifecycle::{API_VERSION_FIELD, ComputedSource, KIND_FIELD, ResourceDefinition},
    predicate::{self, Predicate},
    schema::{Kind, Node, ScalarKind, Schema},
};

pub const API_VERSION: &str = "sparkoperator.k8s.io/v1beta2";
pub const KIND: &str = "SparkApplication";

/// Kubernetes limits label values to 63 characters.
const LABEL_VALUE_MAX_LENGTH: usize = 63;

pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(API_VERSION, KIND, schema())
        .with_computed("metadata.generated_at", ComputedSource::GenerationTimestamp)
}

pub fn schema() -> Schema {
    Schema::new([
        Node::computed(API_VERSION_FIELD, Kind::String),
        Node::computed(KIND_FIELD, Kind::String),
        Node::required("metadata", metadata()),
        Node::required("spec", spec()),
    ])
}

fn metadata() -> Kind {
    Kind::object([
        Node::required("name", Kind::String)
            .with_predicate(predicate::lowercase_rfc_1123_subdomain()),
        Node::optional("namespace", Kind::String).with_predicate(predicate::rfc_1123_label()),
        Node::optional("labels", Kind::map_of(ScalarKind::String))
            .with_predicate(Predicate::max_length(LABEL_VALUE_MAX_LENGTH)),
        Node::optional("annotations", Kind::map_of(ScalarKind::String)),
        Node::computed("generated_at", Kind::String),
    ])
}

fn spec() -> Kind {
    Kind::object([
        Node::required("type", Kind::String),
        Node::required("mode", Kind::String),
        Node::required("image", Kind::String),
        Node::optional("image_pull_policy", Kind::String),
        Node::optional("main_class", Kind::String),
        Node::required("main_application_file", Kind::String),
        Node::optional("arguments", Kind::list_of(Kind::String)),
        Node::required("spark_version", Kind::String),
        Node::optional("spark_conf", Kind::map_of(ScalarKind::String)),
        Node::optional("restart_policy", restart_policy()),
        Node::required("driver", driver()),
        Node::required("executor", executor()),
        Node::optional("volumes", Kind::list_of(volume())),
        Node::optional("dynamic_allocation", dynamic_allocation()),
        Node::optional("time_to_live_seconds", Kind::Int),
    ])
}

fn restart_policy() -> Kind {
    Kind::object([
        Node::required("type", Kind::String),
        Node::optional("on_failure_retries", Kind::Int),
        Node::optional("on_failure_retry_interval", Kind::Int),
        Node::optional("on_submission_failure_retries", Kind::Int),
    ])
}

fn driver() -> Kind {
    Kind::object([
        Node::optional("cores", Kind::Int),
        Node::optional("core_limit", Kind::String),
        Node::optional("memory", Kind::String),
        Node::optional("service_account", Kind::String)
            .with_predicate(predicate::lowercase_rfc_1123_subdomain()),
        Node::optional("labels", Kind::map_of(ScalarKind::String))
            .with_predicate(Predicate::max_length(LABEL_VALUE_MAX_LENGTH)),
        Node::optional("env", Kind::list_of(env_var())),
        Node::optional("volume_mounts", Kind::list_of(volume_mount())),
    ])
}

fn executor() -> Kind {
    Kind::object([
        Node::optional("cores", Kind::Int),
        Node::optional("instances", Kind::Int),
        Node::optional("memory", Kind::String),
        Node::optional("labels", Kind::map_of(ScalarKind::String))
            .with_predicate(Predicate::max_length(LABEL_VALUE_MAX_LENGTH)),
        Node::optional("env", Kind::list_of(env_var())),
        Node::optional("volume_mounts", Kind::list_of(volume_mount())),
    ])
}

fn env_var() -> Kind {
    Kind::object([
        Node::required("name", Kind::String),
        Node::optional("value", Kind::String),
    ])
}

fn volume_mount() -> Kind {
    Kind::object([
        Node::required("name", Kind::String).with_predicate(predicate::rfc_1123_label()),
        Node::required("mount_path", Kind::String),
        Node::optional("read_only", Kind::Bool),
    ])
}

fn volume() -> Kind {
    Kind::object([
        Node::required("name", Kind::String).with_predicate(predicate::rfc_1123_label()),
        Node::optional(
            "host_path",
            Kind::object([
                Node::required("path", Kind::String),
                Node::optional("type", Kind::String),
            ]),
        ),
        Node::optional(
            "config_map",
            Kind::object([Node::required("name", Kind::String)
                .with_predicate(predicate::lowercase_rfc_1123_subdomain())]),
        ),
    ])
}

fn dynamic_allocation() -> Kind {
    Kind::object([
        Node::required("enabled", Kind::Bool),
        Node::optional("initial_executors", Kind::Int),
        Node::optional("min_executors", Kind::Int),
        Node::optional("max_executors", Kind::Int),
    ])
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use jiff::Timestamp;
    use serde_json::json;

    use super::*;
    use crate::{
        clock::FixedClock, lifecycle::Resource, path::FieldPath, validation::ValidationErrorKind,
    };

    fn minimal_config() -> serde_json::Value {
        json!({
            "metadata": {"name": "spark-pi"},
            "spec": {
                "type": "Scala",
                "mode": "cluster",
                "image": "spark:3.5.1",
                "main_class": "org.apache.spark.examples.SparkPi",
                "main_application_file": "local:///opt/spark/examples/jars/spark-examples.jar",
                "spark_version": "3.5.1",
                "driver": {"cores": 1, "memory": "512m"},
                "executor": {"instances": 2},
                "volumes": [{"name": "data", "host_path": {"path": "/tmp"}}],
            },
        })
    }

    #[test]
    fn renders_minimal_application() {
        let definition = definition();
        let mut resource = Resource::with_clock(&definition, FixedClock(Timestamp::UNIX_EPOCH));

        let record = resource
            .create(minimal_config())
            .expect("configuration is valid");
        assert_eq!(record.document.as_str(), indoc! {"
            ---
            apiVersion: sparkoperator.k8s.io/v1beta2
            kind: SparkApplication
            metadata:
              name: spark-pi
              generatedAt: 1970-01-01T00:00:00Z
            spec:
              type: Scala
              mode: cluster
              image: spark:3.5.1
              mainClass: org.apache.spark.examples.SparkPi
              mainApplicationFile: local:///opt/spark/examples/jars/spark-examples.jar
              sparkVersion: 3.5.1
              driver:
                cores: 1
                memory: 512m
              executor:
                instances: 2
              volumes:
              - name: data
                hostPath:
                  path: /tmp
        "});
    }

    #[test]
    fn rejects_invalid_names() {
        let mut config = minimal_config();
        config["metadata"]["name"] = json!("Spark_Pi");
        config["spec"]["volumes"][0]["name"] = json!("-data");

        let errors = crate::validation::validate(&schema(), config)
            .expect_err("names are not valid");
        let paths: Vec<_> = errors
            .iter()
            .map(|error| (error.path().to_string(), error.kind()))
            .collect();
        assert_eq!(paths, [
            ("metadata.name".to_owned(), ValidationErrorKind::InvalidValue),
            (
                "spec.volumes[0].name".to_owned(),
                ValidationErrorKind::InvalidValue
            ),
        ]);
    }

    #[test]
    fn computed_nodes_are_engine_owned() {
        let schema = schema();
        let computed: Vec<_> = schema
            .computed_paths()
            .iter()
            .map(FieldPath::to_string)
            .collect();

        assert_eq!(computed, [
            "api_version",
            "kind",
            "metadata.generated_at"
        ]);
    }
}
