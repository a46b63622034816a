//! Mailbox transport for CXL Type-3 memory devices.
//!
//! A mailbox is a shared register-based request/response channel: one
//! opcode plus payload goes down, one return code plus payload comes back,
//! and only one exchange may be in flight per device. This crate owns that
//! discipline. It does not touch hardware itself; the register-level
//! doorbell/interrupt mechanism is abstracted behind [`MailboxBackend`],
//! and all waiting goes through an injectable [`Clock`] so timeouts are
//! deterministic under test.
//!
//! # Layers
//!
//! - [`cmd`] — the command envelope ([`MboxCmd`]): opcode, payloads,
//!   requested/minimum output lengths, returned status code.
//! - [`backend`] — the raw device I/O trait and background-operation
//!   status probe.
//! - [`clock`] — monotonic time and blocking sleep, fakeable.
//! - [`status`] — the memory device status register: media status,
//!   fatal/FW-halt bits, reset-needed field.
//! - [`transport`] — [`Mailbox`]: channel locking, return-code policy
//!   (single retry, background polling, busy pass-through), output-length
//!   validation, media-readiness wait, detach cancellation.

pub mod backend;
pub mod clock;
pub mod cmd;
pub mod status;
pub mod transport;

pub use backend::{BackgroundStatus, MailboxBackend};
pub use clock::{Clock, SystemClock};
pub use cmd::MboxCmd;
pub use status::{MediaStatus, MemdevStatus, ResetNeeded};
pub use transport::{Mailbox, MailboxConfig, MboxError};
