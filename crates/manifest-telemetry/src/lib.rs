//! This crate contains the tracing primitives shared by the manifest engine binaries.
pub mod tracing;

pub use tracing::Tracing;
