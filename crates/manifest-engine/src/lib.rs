//! Schema-driven transcoding of nested resource configuration into canonical YAML manifests.
//!
//! A [`Schema`](schema::Schema) declares a resource's attribute tree. Candidate configurations
//! are checked against it by [`validate`](validation::validate), turned into a presence-aware
//! [`ValueModel`](value::ValueModel), completed with engine-owned values by
//! [`inject_computed`](inject::inject_computed) and emitted by
//! [`serialize`](document::serialize). The [`lifecycle`] module ties these steps together
//! behind create/read/update/delete operations.

pub mod clock;
pub mod document;
pub mod inject;
pub mod lifecycle;
pub mod path;
pub mod predicate;
pub mod resources;
pub mod schema;
pub mod transcode;
pub mod validation;
pub mod value;

pub use lifecycle::{Resource, ResourceDefinition, ResourceRecord};
