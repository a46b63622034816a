//! Memory device status register.
//!
//! A 64-bit register combining single-bit fault flags with two small
//! fields: media status (bits 2-3) and reset-needed (bits 5-7).

use bitflags::bitflags;

bitflags! {
    /// Single-bit flags in the status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u64 {
        /// Device has hit an unrecoverable fault
        const DEV_FATAL = 1 << 0;
        /// Device firmware has halted
        const FW_HALT = 1 << 1;
        /// Mailbox interface is ready to accept commands
        const MBOX_IF_READY = 1 << 4;
    }
}

/// Media readiness as reported in bits 2-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    NotReady,
    Ready,
    /// Terminal for media: the device reported a media error.
    Error,
    /// Terminal for media: media access is disabled.
    Disabled,
}

/// Reset-needed field in bits 5-7. Any value other than `None` means the
/// device wants a reset before further configuration is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetNeeded {
    None,
    Cold,
    Warm,
    Hot,
    /// CXL protocol-level reset.
    Cxl,
    /// Reserved encoding; treated as a reset request of unknown kind.
    Unknown(u8),
}

/// A decoded snapshot of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemdevStatus(u64);

impl MemdevStatus {
    const MEDIA_SHIFT: u32 = 2;
    const MEDIA_MASK: u64 = 0b11;
    const RESET_SHIFT: u32 = 5;
    const RESET_MASK: u64 = 0b111;

    /// Wraps a raw register read.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    pub fn flags(self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.0)
    }

    /// The device hit an unrecoverable fault.
    pub fn device_fatal(self) -> bool {
        self.flags().contains(StatusFlags::DEV_FATAL)
    }

    /// Device firmware has halted.
    pub fn fw_halted(self) -> bool {
        self.flags().contains(StatusFlags::FW_HALT)
    }

    /// The mailbox interface accepts commands.
    pub fn mbox_ready(self) -> bool {
        self.flags().contains(StatusFlags::MBOX_IF_READY)
    }

    pub fn media_status(self) -> MediaStatus {
        match (self.0 >> Self::MEDIA_SHIFT) & Self::MEDIA_MASK {
            0 => MediaStatus::NotReady,
            1 => MediaStatus::Ready,
            2 => MediaStatus::Error,
            _ => MediaStatus::Disabled,
        }
    }

    pub fn media_ready(self) -> bool {
        self.media_status() == MediaStatus::Ready
    }

    pub fn reset_needed(self) -> ResetNeeded {
        match (self.0 >> Self::RESET_SHIFT) & Self::RESET_MASK {
            0 => ResetNeeded::None,
            1 => ResetNeeded::Cold,
            2 => ResetNeeded::Warm,
            3 => ResetNeeded::Hot,
            4 => ResetNeeded::Cxl,
            other => ResetNeeded::Unknown(other as u8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_media_status_field() {
        assert_eq!(MemdevStatus::from_raw(0).media_status(), MediaStatus::NotReady);
        assert_eq!(MemdevStatus::from_raw(0b0100).media_status(), MediaStatus::Ready);
        assert_eq!(MemdevStatus::from_raw(0b1000).media_status(), MediaStatus::Error);
        assert_eq!(MemdevStatus::from_raw(0b1100).media_status(), MediaStatus::Disabled);
    }

    #[test]
    fn decodes_reset_needed_field() {
        assert_eq!(MemdevStatus::from_raw(0).reset_needed(), ResetNeeded::None);
        assert_eq!(MemdevStatus::from_raw(1 << 5).reset_needed(), ResetNeeded::Cold);
        assert_eq!(MemdevStatus::from_raw(2 << 5).reset_needed(), ResetNeeded::Warm);
        assert_eq!(MemdevStatus::from_raw(3 << 5).reset_needed(), ResetNeeded::Hot);
        assert_eq!(MemdevStatus::from_raw(4 << 5).reset_needed(), ResetNeeded::Cxl);
        assert_eq!(
            MemdevStatus::from_raw(7 << 5).reset_needed(),
            ResetNeeded::Unknown(7)
        );
    }

    #[test]
    fn fault_bits_are_independent_of_media_field() {
        let status = MemdevStatus::from_raw(0b0101);
        assert!(status.device_fatal());
        assert!(!status.fw_halted());
        assert!(status.media_ready());
    }
}
