//! The raw device I/O boundary.
//!
//! The transport depends on, but does not implement, the physical
//! doorbell/interrupt mechanism. PCI register plumbing implements this
//! trait in production; tests implement it with scripted responses.

use crate::cmd::MboxCmd;

/// Progress of a long-running (background) command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundStatus {
    /// No background operation is running.
    Idle,
    /// Operation in progress, percent complete.
    Running(u8),
    /// Operation finished with the given raw return code.
    Completed(u16),
}

/// One register-level mailbox exchange plus the status reads the transport
/// needs.
///
/// `submit` performs exactly one exchange: write opcode and input payload,
/// ring the doorbell, wait for completion (interrupt or the backend's own
/// bounded poll), then read back the return code and at most
/// `cmd.size_out` output bytes into `cmd.payload_out`. It must not retry
/// and must not interpret return codes; policy is the transport's.
pub trait MailboxBackend: Send + Sync {
    /// Negotiated capacity of the payload area in bytes.
    fn payload_size(&self) -> usize;

    /// Execute one exchange, filling `cmd.payload_out` and
    /// `cmd.return_code`.
    fn submit(&self, cmd: &mut MboxCmd) -> Result<(), SubmitError>;

    /// Read the 64-bit memory device status register.
    fn device_status(&self) -> u64;

    /// Probe background-command completion.
    fn background_status(&self) -> BackgroundStatus;
}

/// Hardware-level failure of a single exchange, below return-code level.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The doorbell never cleared within the backend's own bound.
    #[error("mailbox doorbell timed out")]
    DoorbellTimeout,
    /// The device dropped off the bus mid-exchange.
    #[error("device is gone")]
    DeviceGone,
}
