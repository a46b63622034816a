//! Validated views over raw payload bytes.
//!
//! Length-checked parsing with error handling on top of the `raw`
//! structures: event record dispatch by type UUID, and the supported-logs /
//! Command Effects Log responses.

mod cel;
mod event;

pub use self::{
    cel::{CelParseError, SupportedLogs, SupportedLogsParseError, cel_entries},
    event::{EventKind, EventPayload, EventPayloadParseError, EventRecord, RecordParseError},
};
