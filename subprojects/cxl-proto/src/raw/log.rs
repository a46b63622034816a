//! Get Supported Logs / Get Log payloads and the Command Effects Log entry.

use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, little_endian::*};

/// Get Supported Logs output header, followed by `entries` packed
/// [`SupportedLogEntry`] records.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetSupportedLogsHeader {
    /// Number of log entries that follow
    pub entries: U16,
    /// Reserved
    _reserved: [u8; 6],
}

const_assert_eq!(size_of::<GetSupportedLogsHeader>(), 0x8);

/// One advertised log: its identifying UUID and total size in bytes.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SupportedLogEntry {
    /// Log identifier
    pub uuid: [u8; 16],
    /// Log size in bytes
    pub size: U32,
}

const_assert_eq!(size_of::<SupportedLogEntry>(), 0x14);

/// Get Log input payload: the standard UUID + offset + length paging
/// triplet. Logs larger than one payload are retrieved in slices.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetLogIn {
    /// Log identifier
    pub uuid: [u8; 16],
    /// Byte offset into the log
    pub offset: U32,
    /// Number of bytes to return
    pub length: U32,
}

const_assert_eq!(size_of::<GetLogIn>(), 0x18);

impl GetLogIn {
    pub fn new(uuid: uuid::Uuid, offset: u32, length: u32) -> Self {
        Self {
            uuid: *uuid.as_bytes(),
            offset: U32::new(offset),
            length: U32::new(length),
        }
    }
}

/// Command Effects Log entry: an opcode the device accepts paired with its
/// effect flags.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct CelEntry {
    /// Supported command opcode
    pub opcode: U16,
    /// Command effect flags
    pub effect: U16,
}

const_assert_eq!(size_of::<CelEntry>(), 0x4);
