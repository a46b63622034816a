//! Get/Set Partition Info payloads.

use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, little_endian::*};

/// Get Partition Info output. All fields are 256 MiB unit counts.
///
/// `next_*` report capacity configured by a previous Set Partition Info
/// that has not taken effect yet; it becomes active after a device reset.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetPartitionInfoOut {
    /// Currently active volatile capacity
    pub active_volatile_cap: U64,
    /// Currently active persistent capacity
    pub active_persistent_cap: U64,
    /// Volatile capacity pending a reset
    pub next_volatile_cap: U64,
    /// Persistent capacity pending a reset
    pub next_persistent_cap: U64,
}

const_assert_eq!(size_of::<GetPartitionInfoOut>(), 0x20);

/// When set in [`SetPartitionInfoIn::flags`], the new partitioning takes
/// effect immediately instead of after the next reset.
pub const SET_PARTITION_IMMEDIATE_FLAG: u8 = 1 << 0;

/// Set Partition Info input. The persistent capacity is implied: whatever
/// partitionable capacity is not volatile becomes persistent.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetPartitionInfoIn {
    /// Requested volatile capacity (256 MiB units)
    pub volatile_capacity: U64,
    /// Bit 0: immediate
    pub flags: u8,
}

const_assert_eq!(size_of::<SetPartitionInfoIn>(), 0x9);
