//! Data models: the invoice schema and pipeline configuration.

pub mod config;
pub mod invoice;
