//! Export functionality: decoded attachment extraction.

pub mod attachment;
