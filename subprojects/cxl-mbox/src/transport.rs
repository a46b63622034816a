//! The mailbox channel: locking, return-code policy, readiness waits.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use cxl_proto::ReturnCode;
use log::{debug, error, warn};

use crate::{
    backend::{BackgroundStatus, MailboxBackend, SubmitError},
    clock::Clock,
    cmd::MboxCmd,
    status::{MediaStatus, MemdevStatus},
};

/// Bounds for the transport's polling loops. Every wait ends in either
/// completion or a timeout error; nothing is left pending forever.
#[derive(Debug, Clone, Copy)]
pub struct MailboxConfig {
    /// How long a background command may run before it is reported as a
    /// timeout failure.
    pub background_timeout: Duration,
    /// Interval between background completion probes.
    pub background_poll: Duration,
    /// How long to wait for the media to become ready at attach.
    pub media_ready_timeout: Duration,
    /// Interval between media status polls.
    pub media_ready_poll: Duration,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            background_timeout: Duration::from_secs(30),
            background_poll: Duration::from_millis(100),
            media_ready_timeout: Duration::from_secs(60),
            media_ready_poll: Duration::from_millis(100),
        }
    }
}

/// Failure of a mailbox exchange.
#[derive(Debug, thiserror::Error)]
pub enum MboxError {
    /// A bounded wait (background command or readiness poll) elapsed.
    #[error("mailbox operation timed out")]
    Timeout,
    /// The device was detached; the operation was cancelled and must not
    /// be retried.
    #[error("device is gone")]
    DeviceGone,
    /// The device reported an unrecoverable state; no further commands
    /// should be issued until explicit recovery.
    #[error("device is unusable: {0}")]
    Unusable(&'static str),
    /// Input payload exceeds the negotiated payload capacity.
    #[error("input payload of {len} bytes exceeds mailbox capacity of {cap}")]
    PayloadTooLarge {
        /// Input payload length
        len: usize,
        /// Negotiated payload capacity
        cap: usize,
    },
    /// The device reported success but produced less output than the
    /// command's minimum; the response is treated as corrupted.
    #[error("corrupted response: {got} output bytes, need at least {min}")]
    Corrupted {
        /// Minimum acceptable output length
        min: usize,
        /// Output length the device produced
        got: usize,
    },
    /// The device returned a non-success code. The full classification is
    /// preserved; `Display` carries the protocol's description.
    #[error("device error: {0}")]
    Device(ReturnCode),
}

/// The single mailbox channel of one device.
///
/// Enforces one in-flight exchange at a time via a blocking mutex; callers
/// block (they do not spin) while another exchange runs. All return-code
/// policy lives here: one automatic re-issue on `Retry`, bounded completion
/// polling on `Background`, immediate surfacing of `Busy`.
pub struct Mailbox<B, C> {
    backend: B,
    clock: C,
    config: MailboxConfig,
    channel: Mutex<()>,
    detached: AtomicBool,
}

impl<B: MailboxBackend, C: Clock> Mailbox<B, C> {
    pub fn new(backend: B, clock: C) -> Self {
        Self::with_config(backend, clock, MailboxConfig::default())
    }

    pub fn with_config(backend: B, clock: C, config: MailboxConfig) -> Self {
        Self {
            backend,
            clock,
            config,
            channel: Mutex::new(()),
            detached: AtomicBool::new(false),
        }
    }

    /// Negotiated payload capacity in bytes.
    pub fn payload_size(&self) -> usize {
        self.backend.payload_size()
    }

    /// The underlying register-level backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decoded snapshot of the device status register.
    pub fn status(&self) -> MemdevStatus {
        MemdevStatus::from_raw(self.backend.device_status())
    }

    /// Marks the device as detached. Outstanding background waits return
    /// [`MboxError::DeviceGone`] at their next poll instead of hanging;
    /// subsequent sends fail immediately.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Executes one request/response exchange.
    ///
    /// On success, `cmd.payload_out` holds the device's output (at least
    /// `cmd.min_out`, at most `cmd.size_out` bytes) and `cmd.return_code`
    /// the raw status.
    pub fn send(&self, cmd: &mut MboxCmd) -> Result<(), MboxError> {
        if self.is_detached() {
            return Err(MboxError::DeviceGone);
        }

        let cap = self.backend.payload_size();
        if cmd.payload_in.len() > cap {
            return Err(MboxError::PayloadTooLarge {
                len: cmd.payload_in.len(),
                cap,
            });
        }

        let _channel = self.channel.lock().unwrap_or_else(|e| e.into_inner());

        self.submit(cmd)?;

        let mut rc = cmd.return_code();
        if rc == ReturnCode::Retry {
            warn!(
                "mailbox {:?}: temporary error, re-issuing once",
                cmd.opcode
            );
            cmd.payload_out.clear();
            self.submit(cmd)?;
            rc = cmd.return_code();
        }

        match rc {
            ReturnCode::Success => self.validate_output(cmd),
            ReturnCode::Background => {
                debug!("mailbox {:?}: background command started", cmd.opcode);
                self.wait_background(cmd)
            }
            other => {
                debug!(
                    "mailbox {:?} failed: {} ({:#06x})",
                    cmd.opcode, other, cmd.return_code
                );
                Err(MboxError::Device(other))
            }
        }
    }

    fn submit(&self, cmd: &mut MboxCmd) -> Result<(), MboxError> {
        self.backend.submit(cmd).map_err(|err| match err {
            SubmitError::DoorbellTimeout => MboxError::Timeout,
            SubmitError::DeviceGone => MboxError::DeviceGone,
        })
    }

    fn validate_output(&self, cmd: &MboxCmd) -> Result<(), MboxError> {
        // A response longer than requested or shorter than the command's
        // minimum is a protocol violation even though the device reported
        // success.
        if cmd.payload_out.len() > cmd.size_out || cmd.payload_out.len() < cmd.min_out {
            return Err(MboxError::Corrupted {
                min: cmd.min_out,
                got: cmd.payload_out.len(),
            });
        }
        Ok(())
    }

    /// Polls background-command completion on a bounded schedule. Runs with
    /// the channel still held; the device processes one command at a time.
    fn wait_background(&self, cmd: &MboxCmd) -> Result<(), MboxError> {
        let deadline = self.clock.now() + self.config.background_timeout;
        loop {
            if self.is_detached() {
                return Err(MboxError::DeviceGone);
            }
            match self.backend.background_status() {
                BackgroundStatus::Completed(raw) => {
                    let rc = ReturnCode::from_raw(raw);
                    debug!("mailbox {:?}: background command finished: {rc}", cmd.opcode);
                    return if rc.is_success() {
                        Ok(())
                    } else {
                        Err(MboxError::Device(rc))
                    };
                }
                BackgroundStatus::Idle | BackgroundStatus::Running(_) => {
                    if self.clock.now() >= deadline {
                        error!(
                            "mailbox {:?}: background command did not finish within {:?}",
                            cmd.opcode, self.config.background_timeout
                        );
                        return Err(MboxError::Timeout);
                    }
                    self.clock.sleep(self.config.background_poll);
                }
            }
        }
    }

    /// Waits for the device to report media ready.
    ///
    /// Data-path commands are not permitted before this succeeds. Fails
    /// fast with [`MboxError::Unusable`] on an unrecoverable fault (fatal
    /// or firmware-halt bit, media error/disabled); otherwise polls until
    /// ready or the configured timeout.
    pub fn await_media_ready(&self) -> Result<(), MboxError> {
        let deadline = self.clock.now() + self.config.media_ready_timeout;
        loop {
            if self.is_detached() {
                return Err(MboxError::DeviceGone);
            }
            let status = self.status();
            if status.device_fatal() {
                error!("device reports fatal error");
                return Err(MboxError::Unusable("fatal error"));
            }
            if status.fw_halted() {
                error!("device firmware has halted");
                return Err(MboxError::Unusable("firmware halt"));
            }
            match status.media_status() {
                MediaStatus::Ready => return Ok(()),
                MediaStatus::Error => {
                    error!("media reports error state");
                    return Err(MboxError::Unusable("media error"));
                }
                MediaStatus::Disabled => {
                    error!("media access is disabled");
                    return Err(MboxError::Unusable("media disabled"));
                }
                MediaStatus::NotReady => {
                    if self.clock.now() >= deadline {
                        return Err(MboxError::Timeout);
                    }
                    self.clock.sleep(self.config.media_ready_poll);
                }
            }
        }
    }
}
