//! `mboxtract` extracts Gmail Takeout MBOX archives into structured records.
//!
//! This crate provides the core library for streaming MBOX files, parsing
//! MIME message trees, and normalizing each message into a flat JSON record
//! with cleaned addresses and hashed body content.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod scan;
