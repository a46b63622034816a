//! Label Storage Area access payloads.

use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, little_endian::*};

/// Get LSA input: a slice of the label storage area to read.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetLsaIn {
    /// Byte offset into the LSA
    pub offset: U32,
    /// Number of bytes to return
    pub length: U32,
}

const_assert_eq!(size_of::<GetLsaIn>(), 0x8);

/// Set LSA input header, followed by the data bytes to write.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetLsaHeader {
    /// Byte offset into the LSA
    pub offset: U32,
    /// Reserved
    _reserved: U32,
}

const_assert_eq!(size_of::<SetLsaHeader>(), 0x8);

impl SetLsaHeader {
    pub fn new(offset: u32) -> Self {
        Self {
            offset: U32::new(offset),
            _reserved: U32::new(0),
        }
    }
}
