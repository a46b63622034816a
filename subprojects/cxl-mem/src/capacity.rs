//! Device capacity and partition state.
//!
//! Capacity is described in device physical addresses (DPA): a single span
//! `[0, total)` carved into a volatile sub-range at the low addresses, a
//! persistent sub-range above it, and possibly a skipped gap that belongs
//! to neither. All partition boundaries are multiples of the 256 MiB
//! capacity unit. Partition changes made without the immediate flag land
//! in `next_*` and only become active after a device reset.

use cxl_mbox::{Clock, Mailbox, MailboxBackend, MboxCmd, MboxError, ResetNeeded};
use cxl_proto::{
    CAPACITY_MULTIPLIER, Opcode,
    raw::{
        identify::IdentifyOut,
        partition::{GetPartitionInfoOut, SET_PARTITION_IMMEDIATE_FLAG, SetPartitionInfoIn},
    },
};
use log::debug;
use zerocopy::{FromBytes, IntoBytes, little_endian::U64};

/// A half-open `[base, base + len)` range of device physical addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DpaRange {
    pub base: u64,
    pub len: u64,
}

impl DpaRange {
    pub const fn new(base: u64, len: u64) -> Self {
        Self { base, len }
    }

    /// Exclusive end of the range. Saturates at the top of the address
    /// space; ranges validated against the device span never get there.
    pub const fn end(self) -> u64 {
        self.base.saturating_add(self.len)
    }

    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    pub fn overlaps(self, other: DpaRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.base < other.end() && other.base < self.end()
    }

    pub fn contains_range(self, other: DpaRange) -> bool {
        other.base >= self.base && other.end() <= self.end()
    }
}

/// A sub-range allocation recorded against the device's DPA span.
///
/// `skipped` is unused space below `base` claimed along with the
/// allocation (a gap the consumer deliberately jumps over); it counts for
/// overlap purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub base: u64,
    pub len: u64,
    pub skipped: u64,
}

impl Reservation {
    /// The full footprint including the skipped gap, or `None` when the
    /// values do not describe an addressable range (skip below zero, or a
    /// length wrapping the address space).
    fn footprint(self) -> Option<DpaRange> {
        let base = self.base.checked_sub(self.skipped)?;
        let len = self.len.checked_add(self.skipped)?;
        Some(DpaRange::new(base, len))
    }
}

/// Capacity identity from Identify, in bytes.
#[derive(Debug, Clone, Default)]
pub struct IdentifyData {
    pub fw_revision: String,
    pub total_bytes: u64,
    pub volatile_only_bytes: u64,
    pub persistent_only_bytes: u64,
    pub partition_align_bytes: u64,
    pub lsa_size: u32,
    /// Per-severity event log size hints (info, warning, failure, fatal).
    pub event_log_sizes: [u16; 4],
}

/// Active and pending partition configuration, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionInfo {
    pub active_volatile_bytes: u64,
    pub active_persistent_bytes: u64,
    pub next_volatile_bytes: u64,
    pub next_persistent_bytes: u64,
}

/// The device's capacity and partition state.
#[derive(Debug, Clone, Default)]
pub struct CapacityState {
    pub total_bytes: u64,
    pub volatile_only_bytes: u64,
    pub persistent_only_bytes: u64,
    pub partition_align_bytes: u64,
    pub active_volatile_bytes: u64,
    pub active_persistent_bytes: u64,
    pub next_volatile_bytes: u64,
    pub next_persistent_bytes: u64,
    /// Overall DPA reservation, `[0, total)`.
    pub dpa: DpaRange,
    /// Volatile sub-range at the low addresses.
    pub ram: DpaRange,
    /// Persistent sub-range above the volatile one.
    pub pmem: DpaRange,
    reservations: Vec<Reservation>,
}

/// Capacity and partition failures.
#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    #[error("mailbox exchange failed")]
    Mbox(#[from] MboxError),
    /// A capacity value is not a multiple of the partition alignment.
    #[error("{what} of {value:#x} bytes is not aligned to {align:#x}")]
    Misaligned {
        what: &'static str,
        value: u64,
        align: u64,
    },
    /// Active capacities exceed the advertised total.
    #[error("active capacity {active:#x} exceeds device total {total:#x}")]
    ExceedsTotal { active: u64, total: u64 },
    /// A reservation collides with an existing sub-range.
    #[error("reservation at {base:#x} of {len:#x} bytes overlaps an existing range")]
    Overlap { base: u64, len: u64 },
    /// A reservation escapes the overall DPA span.
    #[error("reservation at {base:#x} of {len:#x} bytes is outside the device span")]
    OutOfRange { base: u64, len: u64 },
    /// The device wants a reset; partition state must not be changed until
    /// the reset is observed to complete.
    #[error("device requires a {0:?} reset before reconfiguration")]
    ResetPending(ResetNeeded),
    /// The device is not partitionable.
    #[error("device has no partitionable capacity")]
    NotPartitionable,
}

impl CapacityState {
    /// Builds the state from the two attach-time exchanges and derives the
    /// DPA sub-ranges.
    pub fn from_parts(
        identify: &IdentifyData,
        partition: PartitionInfo,
    ) -> Result<Self, CapacityError> {
        let mut state = CapacityState {
            total_bytes: identify.total_bytes,
            volatile_only_bytes: identify.volatile_only_bytes,
            persistent_only_bytes: identify.persistent_only_bytes,
            partition_align_bytes: identify.partition_align_bytes,
            active_volatile_bytes: partition.active_volatile_bytes,
            active_persistent_bytes: partition.active_persistent_bytes,
            next_volatile_bytes: partition.next_volatile_bytes,
            next_persistent_bytes: partition.next_persistent_bytes,
            ..CapacityState::default()
        };
        state.recompute_ranges()?;
        Ok(state)
    }

    /// Recomputes the DPA sub-ranges from the active partition values.
    ///
    /// Volatile capacity occupies `[0, active_volatile)`, persistent
    /// capacity follows it, and any remainder up to `total` is a skipped
    /// gap belonging to neither partition.
    pub fn recompute_ranges(&mut self) -> Result<(), CapacityError> {
        for (what, value) in [
            ("total capacity", self.total_bytes),
            ("active volatile capacity", self.active_volatile_bytes),
            ("active persistent capacity", self.active_persistent_bytes),
        ] {
            if value % CAPACITY_MULTIPLIER != 0 {
                return Err(CapacityError::Misaligned {
                    what,
                    value,
                    align: CAPACITY_MULTIPLIER,
                });
            }
        }

        let active = self.active_volatile_bytes + self.active_persistent_bytes;
        if active > self.total_bytes {
            return Err(CapacityError::ExceedsTotal {
                active,
                total: self.total_bytes,
            });
        }

        self.dpa = DpaRange::new(0, self.total_bytes);
        self.ram = DpaRange::new(0, self.active_volatile_bytes);
        self.pmem = DpaRange::new(self.ram.end(), self.active_persistent_bytes);
        debug!(
            "DPA ranges: ram [{:#x}, {:#x}), pmem [{:#x}, {:#x}), total {:#x}",
            self.ram.base,
            self.ram.end(),
            self.pmem.base,
            self.pmem.end(),
            self.total_bytes
        );
        Ok(())
    }

    /// Bytes covered by neither partition (the skipped gap above pmem).
    pub fn gap_bytes(&self) -> u64 {
        self.total_bytes - self.active_volatile_bytes - self.active_persistent_bytes
    }

    /// Records a sub-range allocation against the overall reservation.
    ///
    /// `skipped` claims unused space directly below `base` along with the
    /// allocation. Fails without side effects if the footprint overlaps an
    /// existing reservation or escapes the span.
    pub fn reserve(&mut self, base: u64, len: u64, skipped: u64) -> Result<(), CapacityError> {
        let reservation = Reservation { base, len, skipped };
        let Some(footprint) = reservation.footprint() else {
            return Err(CapacityError::OutOfRange { base, len });
        };

        if !self.dpa.contains_range(footprint) {
            return Err(CapacityError::OutOfRange {
                base: footprint.base,
                len: footprint.len,
            });
        }
        // Stored reservations were validated on insert, so their
        // footprints always exist.
        if self
            .reservations
            .iter()
            .filter_map(|existing| existing.footprint())
            .any(|existing| existing.overlaps(footprint))
        {
            return Err(CapacityError::Overlap {
                base: footprint.base,
                len: footprint.len,
            });
        }

        self.reservations.push(reservation);
        Ok(())
    }

    /// Releases a previously recorded reservation.
    pub fn release(&mut self, base: u64) {
        self.reservations.retain(|r| r.base != base);
    }

    /// Folds fresh partition info into the state and rederives the ranges.
    /// A reset promotes `next_*` to `active_*` on the device; re-reading
    /// partition info afterwards lands the promotion here.
    pub fn apply_partition_info(&mut self, info: PartitionInfo) -> Result<(), CapacityError> {
        self.active_volatile_bytes = info.active_volatile_bytes;
        self.active_persistent_bytes = info.active_persistent_bytes;
        self.next_volatile_bytes = info.next_volatile_bytes;
        self.next_persistent_bytes = info.next_persistent_bytes;
        self.recompute_ranges()
    }
}

/// Issues Identify and converts the unit counts to bytes.
pub fn identify<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
) -> Result<IdentifyData, CapacityError> {
    let mut cmd = MboxCmd::new(Opcode::Identify).with_fixed_output(size_of::<IdentifyOut>());
    mbox.send(&mut cmd)?;

    // min_out guarantees a full payload.
    let (id, _) = IdentifyOut::ref_from_prefix(&cmd.payload_out)
        .map_err(|_| MboxError::Corrupted {
            min: size_of::<IdentifyOut>(),
            got: cmd.payload_out.len(),
        })?;

    Ok(IdentifyData {
        fw_revision: id.fw_revision_str().to_owned(),
        total_bytes: id.total_capacity.get() * CAPACITY_MULTIPLIER,
        volatile_only_bytes: id.volatile_capacity.get() * CAPACITY_MULTIPLIER,
        persistent_only_bytes: id.persistent_capacity.get() * CAPACITY_MULTIPLIER,
        partition_align_bytes: id.partition_align.get() * CAPACITY_MULTIPLIER,
        lsa_size: id.lsa_size.get(),
        event_log_sizes: [
            id.info_event_log_size.get(),
            id.warning_event_log_size.get(),
            id.failure_event_log_size.get(),
            id.fatal_event_log_size.get(),
        ],
    })
}

/// Issues Get Partition Info and converts the unit counts to bytes.
pub fn partition_info<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
) -> Result<PartitionInfo, CapacityError> {
    let mut cmd =
        MboxCmd::new(Opcode::GetPartitionInfo).with_fixed_output(size_of::<GetPartitionInfoOut>());
    mbox.send(&mut cmd)?;

    let (info, _) = GetPartitionInfoOut::ref_from_prefix(&cmd.payload_out).map_err(|_| {
        MboxError::Corrupted {
            min: size_of::<GetPartitionInfoOut>(),
            got: cmd.payload_out.len(),
        }
    })?;

    Ok(PartitionInfo {
        active_volatile_bytes: info.active_volatile_cap.get() * CAPACITY_MULTIPLIER,
        active_persistent_bytes: info.active_persistent_cap.get() * CAPACITY_MULTIPLIER,
        next_volatile_bytes: info.next_volatile_cap.get() * CAPACITY_MULTIPLIER,
        next_persistent_bytes: info.next_persistent_cap.get() * CAPACITY_MULTIPLIER,
    })
}

/// Issues Set Partition Info.
///
/// The caller is responsible for the reset-needed gate; this only checks
/// argument validity and performs the exchange.
pub(crate) fn set_partition<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
    state: &CapacityState,
    volatile_bytes: u64,
    immediate: bool,
) -> Result<(), CapacityError> {
    if state.partition_align_bytes == 0 {
        return Err(CapacityError::NotPartitionable);
    }
    if volatile_bytes % state.partition_align_bytes != 0 {
        return Err(CapacityError::Misaligned {
            what: "requested volatile capacity",
            value: volatile_bytes,
            align: state.partition_align_bytes,
        });
    }

    let input = SetPartitionInfoIn {
        volatile_capacity: U64::new(volatile_bytes / CAPACITY_MULTIPLIER),
        flags: if immediate {
            SET_PARTITION_IMMEDIATE_FLAG
        } else {
            0
        },
    };
    let mut cmd = MboxCmd::new(Opcode::SetPartitionInfo).with_input(input.as_bytes());
    mbox.send(&mut cmd)?;
    Ok(())
}
