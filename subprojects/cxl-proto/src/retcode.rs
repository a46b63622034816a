//! Device return codes.
//!
//! Every mailbox exchange ends with a 16-bit status code from the device.
//! Code 0 is the only success value; each non-success code keeps its own
//! variant here so callers can distinguish "invalid input" from "wrong
//! passphrase" from "busy, retry later". The protocol's description string
//! is carried alongside for diagnostics.

/// A device return code, one variant per code the protocol defines.
///
/// Raw values the driver does not know are preserved in
/// [`ReturnCode::Unknown`] rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    /// Command completed successfully.
    Success,
    /// Background command started successfully; completion is reported
    /// through the background operation status.
    Background,
    /// Command input was invalid.
    InvalidInput,
    /// Command is not supported.
    Unsupported,
    /// Internal device error.
    Internal,
    /// Temporary device error; the transport re-issues the command once.
    Retry,
    /// Ongoing background operation; retry policy is the caller's.
    Busy,
    /// Media access is disabled.
    MediaDisabled,
    /// One FW package can be transferred at a time.
    FwInProgress,
    /// FW package content was transferred out of order.
    FwOutOfOrder,
    /// FW package authentication failed.
    FwAuth,
    /// FW slot is not supported for the requested operation.
    FwSlot,
    /// Rolled back to the previous active FW.
    FwRollback,
    /// FW failed to activate and needs a cold reset.
    FwReset,
    /// One or more event record handles were invalid.
    InvalidHandle,
    /// Physical address specified is invalid.
    InvalidPhysAddr,
    /// Poison injection limit has been reached.
    PoisonLimit,
    /// Permanent issue with the media.
    MediaFailure,
    /// Background command was aborted by the device.
    Aborted,
    /// Not valid in the current security state.
    Security,
    /// Phrase doesn't match the currently set passphrase.
    Passphrase,
    /// Unsupported on the mailbox it was issued on.
    MboxUnsupported,
    /// Invalid payload length.
    InvalidPayloadLength,
    /// A code this driver does not know, raw value preserved.
    Unknown(u16),
}

const TABLE: &[ReturnCode] = &[
    ReturnCode::Success,
    ReturnCode::Background,
    ReturnCode::InvalidInput,
    ReturnCode::Unsupported,
    ReturnCode::Internal,
    ReturnCode::Retry,
    ReturnCode::Busy,
    ReturnCode::MediaDisabled,
    ReturnCode::FwInProgress,
    ReturnCode::FwOutOfOrder,
    ReturnCode::FwAuth,
    ReturnCode::FwSlot,
    ReturnCode::FwRollback,
    ReturnCode::FwReset,
    ReturnCode::InvalidHandle,
    ReturnCode::InvalidPhysAddr,
    ReturnCode::PoisonLimit,
    ReturnCode::MediaFailure,
    ReturnCode::Aborted,
    ReturnCode::Security,
    ReturnCode::Passphrase,
    ReturnCode::MboxUnsupported,
    ReturnCode::InvalidPayloadLength,
];

impl ReturnCode {
    /// Converts the 16-bit wire status into a return code.
    pub fn from_raw(raw: u16) -> Self {
        TABLE
            .get(usize::from(raw))
            .copied()
            .unwrap_or(ReturnCode::Unknown(raw))
    }

    /// True only for code 0.
    #[inline]
    pub fn is_success(self) -> bool {
        self == ReturnCode::Success
    }

    /// The protocol's description string for this code.
    pub fn description(self) -> &'static str {
        match self {
            ReturnCode::Success => "success",
            ReturnCode::Background => "background cmd started successfully",
            ReturnCode::InvalidInput => "cmd input was invalid",
            ReturnCode::Unsupported => "cmd is not supported",
            ReturnCode::Internal => "internal device error",
            ReturnCode::Retry => "temporary error, retry once",
            ReturnCode::Busy => "ongoing background operation",
            ReturnCode::MediaDisabled => "media access is disabled",
            ReturnCode::FwInProgress => "one FW package can be transferred at a time",
            ReturnCode::FwOutOfOrder => "FW package content was transferred out of order",
            ReturnCode::FwAuth => "FW package authentication failed",
            ReturnCode::FwSlot => "FW slot is not supported for requested operation",
            ReturnCode::FwRollback => "rolled back to the previous active FW",
            ReturnCode::FwReset => "FW failed to activate, needs cold reset",
            ReturnCode::InvalidHandle => "one or more Event Record Handles were invalid",
            ReturnCode::InvalidPhysAddr => "physical address specified is invalid",
            ReturnCode::PoisonLimit => "poison injection limit has been reached",
            ReturnCode::MediaFailure => "permanent issue with the media",
            ReturnCode::Aborted => "background cmd was aborted by device",
            ReturnCode::Security => "not valid in the current security state",
            ReturnCode::Passphrase => "phrase doesn't match current set passphrase",
            ReturnCode::MboxUnsupported => "unsupported on the mailbox it was issued on",
            ReturnCode::InvalidPayloadLength => "invalid payload length",
            ReturnCode::Unknown(_) => "unknown return code",
        }
    }
}

impl core::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReturnCode::Unknown(raw) => write!(f, "unknown return code {raw:#06x}"),
            other => f.write_str(other.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_only_success() {
        assert!(ReturnCode::from_raw(0).is_success());
        for raw in 1..64u16 {
            assert!(!ReturnCode::from_raw(raw).is_success(), "raw {raw}");
        }
    }

    #[test]
    fn known_codes_map_to_distinct_variants() {
        assert_eq!(ReturnCode::from_raw(5), ReturnCode::Retry);
        assert_eq!(ReturnCode::from_raw(6), ReturnCode::Busy);
        assert_eq!(ReturnCode::from_raw(20), ReturnCode::Passphrase);
        assert_eq!(ReturnCode::from_raw(22), ReturnCode::InvalidPayloadLength);
    }

    #[test]
    fn out_of_table_codes_are_preserved() {
        assert_eq!(ReturnCode::from_raw(0x1234), ReturnCode::Unknown(0x1234));
        assert_eq!(
            ReturnCode::from_raw(0x1234).to_string(),
            "unknown return code 0x1234"
        );
    }
}
