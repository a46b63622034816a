//! Protocol definitions for the CXL Type-3 memory device mailbox.
//!
//! This crate is pure data: command opcodes and descriptors, the device
//! return-code table, well-known log UUIDs, and the byte-exact wire layouts
//! exchanged over the mailbox payload area.
//!
//! # Layout
//!
//! - [`opcode`] — 16-bit command opcodes and the static command
//!   descriptor table (driver-known commands and their policy flags).
//! - [`retcode`] — the device return-code table, one variant per code,
//!   with the protocol's description strings.
//! - [`raw`] — packed little-endian payload structures with compile-time
//!   size checks. These mirror the hardware tables bit for bit.
//! - [`read`] — validating views over raw payload bytes, including event
//!   record dispatch by type UUID.
//!
//! No I/O happens here; the transport lives in `cxl-mbox` and the stateful
//! device model in `cxl-mem`.

pub mod opcode;
pub mod raw;
pub mod read;
pub mod retcode;

pub use opcode::{CommandDescriptor, CommandFlags, CommandId, Opcode};
pub use retcode::ReturnCode;

use uuid::Uuid;

/// Capacity fields in Identify and Partition Info payloads are counts of
/// this unit (256 MiB).
pub const CAPACITY_MULTIPLIER: u64 = 256 * 1024 * 1024;

/// Command Effects Log UUID.
///
/// The well-known log identifier a device must advertise through Get
/// Supported Logs; its entries enumerate the opcodes the device accepts.
pub const CEL_UUID: Uuid = Uuid::from_fields(
    0x0da9c0b5,
    0xbf41,
    0x4b78,
    &[0x8f, 0x79, 0x96, 0xb1, 0x62, 0x3b, 0x3f, 0x17],
);

/// Vendor debug log UUID.
pub const VENDOR_DEBUG_UUID: Uuid = Uuid::from_fields(
    0x0e1819d9,
    0x11a9,
    0x400c,
    &[0x81, 0x1f, 0xd6, 0x07, 0x19, 0x40, 0x3d, 0x86],
);

/// General Media event record UUID.
pub const GEN_MEDIA_EVENT_UUID: Uuid = Uuid::from_fields(
    0xfbcd0a77,
    0xc260,
    0x417f,
    &[0x85, 0xa9, 0x08, 0x8b, 0x16, 0x21, 0xeb, 0xa6],
);

/// DRAM event record UUID.
pub const DRAM_EVENT_UUID: Uuid = Uuid::from_fields(
    0x601dcbb3,
    0x9c06,
    0x4eab,
    &[0xb8, 0xaf, 0x4e, 0x9b, 0xfb, 0x5c, 0x96, 0x24],
);

/// Memory Module event record UUID.
pub const MEM_MODULE_EVENT_UUID: Uuid = Uuid::from_fields(
    0xfe927475,
    0xdd59,
    0x4339,
    &[0xa5, 0x86, 0x79, 0xba, 0xb1, 0x13, 0xb7, 0x74],
);
