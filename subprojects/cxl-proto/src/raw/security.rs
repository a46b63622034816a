//! Persistent-memory security payload shapes.
//!
//! Only the wire shapes live here; the security state machine itself is a
//! collaborator that reserves these opcodes as exclusive (see
//! `cxl_proto::opcode::SECURITY_COMMANDS`).

use bitflags::bitflags;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Passphrase length, shared with the NVDIMM security definitions.
pub const PASSPHRASE_LEN: usize = 32;

/// Passphrase scope selector in the security payloads.
pub const PASS_MASTER: u8 = 0;
/// See [`PASS_MASTER`].
pub const PASS_USER: u8 = 1;

bitflags! {
    /// Get Security State output bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SecurityState: u32 {
        const USER_PASS_SET = 1 << 0;
        const MASTER_PASS_SET = 1 << 1;
        const LOCKED = 1 << 2;
        const FROZEN = 1 << 3;
        const USER_PLIMIT = 1 << 4;
        const MASTER_PLIMIT = 1 << 5;
    }
}

/// Set Passphrase input.
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct SetPassphraseIn {
    /// [`PASS_MASTER`] or [`PASS_USER`]
    pub kind: u8,
    /// Reserved
    _reserved: [u8; 31],
    pub old_pass: [u8; PASSPHRASE_LEN],
    pub new_pass: [u8; PASSPHRASE_LEN],
}

const_assert_eq!(size_of::<SetPassphraseIn>(), 0x60);

/// Disable Passphrase input.
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DisablePassphraseIn {
    /// [`PASS_MASTER`] or [`PASS_USER`]
    pub kind: u8,
    /// Reserved
    _reserved: [u8; 31],
    pub pass: [u8; PASSPHRASE_LEN],
}

const_assert_eq!(size_of::<DisablePassphraseIn>(), 0x40);

/// Passphrase Secure Erase input.
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct PassphraseSecureEraseIn {
    /// [`PASS_MASTER`] or [`PASS_USER`]
    pub kind: u8,
    /// Reserved
    _reserved: [u8; 31],
    pub pass: [u8; PASSPHRASE_LEN],
}

const_assert_eq!(size_of::<PassphraseSecureEraseIn>(), 0x40);
