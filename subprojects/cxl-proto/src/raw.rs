//! Raw mailbox payload layouts.
//!
//! Zero-copy struct definitions for the payloads exchanged over the mailbox
//! payload area: little-endian, byte-packed, no implicit padding. Every
//! struct size is checked at compile time against the protocol tables.
//!
//! Use these when you need direct field access; for validated parsing with
//! error handling (event record dispatch in particular) see the `read`
//! module.

pub mod event;
pub mod identify;
pub mod log;
pub mod lsa;
pub mod partition;
pub mod security;
pub mod timestamp;
