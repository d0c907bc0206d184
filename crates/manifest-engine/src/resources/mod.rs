//! Resource types shipped with the engine.
pub mod spark_application;
