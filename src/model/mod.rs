//! Core data model types for parsed messages and extracted records.

pub mod message;
pub mod record;
