//! Control plane for a CXL Type-3 memory device.
//!
//! [`MemDev`] owns one device's mailbox and the state discovered through
//! it: which commands the hardware supports, the four event logs, and the
//! capacity/partition model. Attach runs the discovery sequence; after
//! that the device is ready for event draining, partition changes, and
//! DPA range reservation.
//!
//! The three concerns live in their own modules with their own locks:
//!
//! - [`commands`] — Command Effects Log enumeration and the
//!   enabled/exclusive permission model.
//! - [`event`] — severity-log drain and clear with overflow accounting.
//! - [`capacity`] — capacity identity, partitioning, and DPA sub-range
//!   bookkeeping.

pub mod capacity;
pub mod commands;
pub mod event;

#[cfg(test)]
pub(crate) mod testutil;

pub use capacity::{
    CapacityError, CapacityState, DpaRange, IdentifyData, PartitionInfo, Reservation,
};
pub use commands::{CommandPermissions, CommandSet, EnumerateError};
pub use event::{EventError, EventState, EventStatus, LogState, MAX_FETCH_ITERATIONS};

use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use cxl_mbox::{Clock, Mailbox, MailboxBackend, MboxCmd, MboxError, MemdevStatus, ResetNeeded};
use cxl_proto::{
    CommandId, Opcode, ReturnCode,
    opcode::SECURITY_COMMANDS,
    raw::{
        event::EventLogType,
        lsa::{GetLsaIn, SetLsaHeader},
        security::SecurityState,
        timestamp::SetTimestampIn,
    },
};
use log::{debug, info};
use zerocopy::{IntoBytes, little_endian::U32};

/// Failure of the attach discovery sequence.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("mailbox transport failed")]
    Mbox(#[from] MboxError),
    #[error("command enumeration failed")]
    Enumerate(#[from] EnumerateError),
    #[error("capacity discovery failed")]
    Capacity(#[from] CapacityError),
}

/// One attached CXL memory device.
///
/// Command permissions, event-log state, and capacity state are guarded by
/// separate locks; only the capacity lock is held across a mailbox
/// exchange (partition changes must not interleave with a concurrent
/// refresh).
pub struct MemDev<B, C> {
    mbox: Mailbox<B, C>,
    identity: IdentifyData,
    permissions: Mutex<CommandPermissions>,
    events: Mutex<EventState>,
    capacity: Mutex<CapacityState>,
}

impl<B: MailboxBackend, C: Clock> MemDev<B, C> {
    /// Brings a device up: waits for media readiness, enumerates the
    /// supported commands, sets the device timestamp, and reads the
    /// capacity identity and partition configuration.
    pub fn attach(mbox: Mailbox<B, C>) -> Result<Self, AttachError> {
        mbox.await_media_ready()?;

        let enabled = commands::enumerate(&mbox)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64);
        set_device_timestamp(&mbox, now)?;

        let identity = capacity::identify(&mbox)?;
        let partition = capacity::partition_info(&mbox)?;
        let capacity = CapacityState::from_parts(&identity, partition)?;

        info!(
            "attached memory device: fw {}, {} commands, {:#x} bytes total",
            identity.fw_revision,
            enabled.len(),
            capacity.total_bytes
        );

        Ok(Self {
            mbox,
            identity,
            permissions: Mutex::new(CommandPermissions {
                enabled,
                exclusive: CommandSet::EMPTY,
            }),
            events: Mutex::new(EventState::default()),
            capacity: Mutex::new(capacity),
        })
    }

    pub fn fw_revision(&self) -> &str {
        &self.identity.fw_revision
    }

    /// Label Storage Area size in bytes.
    pub fn lsa_size(&self) -> u32 {
        self.identity.lsa_size
    }

    /// Per-severity event log size hints from Identify.
    pub fn event_log_sizes(&self) -> [u16; 4] {
        self.identity.event_log_sizes
    }

    pub fn mailbox(&self) -> &Mailbox<B, C> {
        &self.mbox
    }

    /// Decoded snapshot of the device status register.
    pub fn status(&self) -> MemdevStatus {
        self.mbox.status()
    }

    /// Marks the device as gone; see [`Mailbox::detach`].
    pub fn detach(&self) {
        self.mbox.detach();
    }

    /// Snapshot of the current permission state.
    pub fn permissions(&self) -> CommandPermissions {
        *self.lock_permissions()
    }

    /// Whether `id` may be issued through the generic command path.
    pub fn is_permitted(&self, id: CommandId) -> bool {
        self.lock_permissions().is_permitted(id)
    }

    /// Reserves commands for a collaborating subsystem; they stop being
    /// permitted through the generic path until released.
    pub fn set_exclusive(&self, ids: &[CommandId]) {
        let mut perms = self.lock_permissions();
        for id in ids {
            perms.exclusive.insert(*id);
        }
    }

    pub fn clear_exclusive(&self, ids: &[CommandId]) {
        let mut perms = self.lock_permissions();
        for id in ids {
            perms.exclusive.remove(*id);
        }
    }

    /// Reserves the security opcodes for the security subsystem.
    pub fn reserve_security_commands(&self) {
        self.set_exclusive(SECURITY_COMMANDS);
    }

    /// Drains and clears every severity log flagged in `status`.
    ///
    /// Called on a device event notification. Severities are processed in
    /// wire order under the single log lock; the first failure aborts the
    /// remaining severities (their records stay on the device and will be
    /// reported again).
    pub fn notify_event_status(&self, status: EventStatus) -> Result<(), EventError> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        for log in EventLogType::ALL {
            if status.contains(EventStatus::for_log(log)) {
                event::drain_log(&self.mbox, &mut events, log)?;
            }
        }
        Ok(())
    }

    /// Bookkeeping snapshot for one severity log.
    pub fn event_log(&self, log: EventLogType) -> LogState {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .log(log)
            .clone()
    }

    /// Snapshot of the capacity and partition state.
    pub fn capacity(&self) -> CapacityState {
        self.lock_capacity().clone()
    }

    /// Repartitions the device's partitionable capacity.
    ///
    /// Refused with [`CapacityError::ResetPending`] while the device
    /// reports an outstanding reset requirement. With `immediate` the new
    /// active values take effect now; otherwise they land in `next_*` and
    /// are promoted by the next reset. Either way the partition info is
    /// re-read so the local state reflects what the device accepted.
    pub fn set_partition(&self, volatile_bytes: u64, immediate: bool) -> Result<(), CapacityError> {
        let reset = self.mbox.status().reset_needed();
        if reset != ResetNeeded::None {
            return Err(CapacityError::ResetPending(reset));
        }

        let mut capacity = self.lock_capacity();
        capacity::set_partition(&self.mbox, &capacity, volatile_bytes, immediate)?;
        let fresh = capacity::partition_info(&self.mbox)?;
        capacity.apply_partition_info(fresh)
    }

    /// Re-reads partition info, folding a reset's `next_*` promotion into
    /// the local state.
    pub fn refresh_partition_info(&self) -> Result<(), CapacityError> {
        let mut capacity = self.lock_capacity();
        let fresh = capacity::partition_info(&self.mbox)?;
        capacity.apply_partition_info(fresh)
    }

    /// Records a DPA sub-range allocation; see [`CapacityState::reserve`].
    pub fn reserve_dpa(&self, base: u64, len: u64, skipped: u64) -> Result<(), CapacityError> {
        self.lock_capacity().reserve(base, len, skipped)
    }

    pub fn release_dpa(&self, base: u64) {
        self.lock_capacity().release(base);
    }

    /// Sets the device timestamp; event records are stamped relative to
    /// it. Devices without the command are tolerated.
    pub fn set_timestamp(&self, timestamp_ns: u64) -> Result<(), MboxError> {
        set_device_timestamp(&self.mbox, timestamp_ns)
    }

    /// Reads a slice of the Label Storage Area.
    ///
    /// One exchange per call; callers reading more than the payload area
    /// holds issue multiple calls.
    pub fn get_lsa(&self, offset: u32, length: u32) -> Result<Vec<u8>, MboxError> {
        let input = GetLsaIn {
            offset: U32::new(offset),
            length: U32::new(length),
        };
        let mut cmd = MboxCmd::new(Opcode::GetLsa)
            .with_input(input.as_bytes())
            .with_fixed_output(length as usize);
        self.mbox.send(&mut cmd)?;
        Ok(std::mem::take(&mut cmd.payload_out))
    }

    /// Writes a slice of the Label Storage Area.
    pub fn set_lsa(&self, offset: u32, data: &[u8]) -> Result<(), MboxError> {
        let mut payload = SetLsaHeader::new(offset).as_bytes().to_vec();
        payload.extend_from_slice(data);
        let mut cmd = MboxCmd::new(Opcode::SetLsa).with_input(payload);
        self.mbox.send(&mut cmd)
    }

    /// Reads the persistent-memory security state bits.
    pub fn security_state(&self) -> Result<SecurityState, MboxError> {
        let mut cmd = MboxCmd::new(Opcode::GetSecurityState).with_fixed_output(4);
        self.mbox.send(&mut cmd)?;
        let bits: [u8; 4] = cmd
            .payload_out
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(MboxError::Corrupted {
                min: 4,
                got: cmd.payload_out.len(),
            })?;
        Ok(SecurityState::from_bits_truncate(u32::from_le_bytes(bits)))
    }

    fn lock_permissions(&self) -> std::sync::MutexGuard<'_, CommandPermissions> {
        self.permissions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_capacity(&self) -> std::sync::MutexGuard<'_, CapacityState> {
        self.capacity.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn set_device_timestamp<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
    timestamp_ns: u64,
) -> Result<(), MboxError> {
    let input = SetTimestampIn::new(timestamp_ns);
    let mut cmd = MboxCmd::new(Opcode::SetTimestamp).with_input(input.as_bytes());
    match mbox.send(&mut cmd) {
        // Not every device implements Set Timestamp; its absence only
        // costs absolute event timestamps.
        Err(MboxError::Device(ReturnCode::Unsupported)) => {
            debug!("device does not support Set Timestamp");
            Ok(())
        }
        other => other,
    }
}
