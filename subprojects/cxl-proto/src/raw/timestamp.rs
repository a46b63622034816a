//! Set Timestamp payload.

use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, little_endian::*};

/// Set Timestamp input: nanoseconds since the epoch the host chooses.
/// Subsequent event record timestamps are relative to this value.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetTimestampIn {
    pub timestamp: U64,
}

const_assert_eq!(size_of::<SetTimestampIn>(), 0x8);

impl SetTimestampIn {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp: U64::new(timestamp),
        }
    }
}
