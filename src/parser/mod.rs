//! Email parsing: MBOX streaming parser, header decoding, and MIME handling.

pub mod header;
pub mod mbox;
pub mod mime;
