//! Event log retrieval and clearing.
//!
//! The device keeps four severity-ordered event logs. When a status-change
//! notification reports pending severities, each flagged log is drained:
//! Get Event Records is issued repeatedly while the response carries the
//! "more records" flag, then the accumulated record handles are
//! acknowledged with Clear Event Records in batches of at most 255 (the
//! handle-count field is one byte). A misbehaving device that never clears
//! "more records" is cut off at an iteration cap and reported as a
//! protocol error.
//!
//! One log buffer is shared across severities, so a single lock serializes
//! the whole fetch-and-clear sequence per device (see `MemDev`).

use bitflags::bitflags;
use cxl_mbox::{Clock, Mailbox, MailboxBackend, MboxCmd, MboxError};
use cxl_proto::{
    Opcode,
    raw::event::{
        CLEAR_EVENT_MAX_HANDLES, ClearEventRecordsHeader, EventLogType, GetEventFlags,
        GetEventRecordsHeader,
    },
    read::{EventPayload, EventPayloadParseError},
};
use log::{debug, warn};
use zerocopy::IntoBytes;

/// Fetch iterations allowed per severity in one drain. Each fetch returns
/// at least one record when "more records" is set, so the cap only trips
/// on a device that never stops advertising pending records.
pub const MAX_FETCH_ITERATIONS: usize = 1024;

bitflags! {
    /// Pending-severity bits from a device status-change notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventStatus: u32 {
        const INFO = 1 << 0;
        const WARN = 1 << 1;
        const FAIL = 1 << 2;
        const FATAL = 1 << 3;
    }
}

impl EventStatus {
    /// The status bit for one severity.
    pub fn for_log(log: EventLogType) -> EventStatus {
        match log {
            EventLogType::Info => EventStatus::INFO,
            EventLogType::Warn => EventStatus::WARN,
            EventLogType::Fail => EventStatus::FAIL,
            EventLogType::Fatal => EventStatus::FATAL,
        }
    }
}

/// Bookkeeping for one severity's log.
#[derive(Debug, Clone, Default)]
pub struct LogState {
    /// Records the device dropped to overflow, accumulated across drains.
    pub overflow_count: u64,
    /// Device timestamp of the first overflow observed.
    pub first_overflow_timestamp: Option<u64>,
    /// Device timestamp of the most recent overflow observed.
    pub last_overflow_timestamp: Option<u64>,
    /// Handles fetched but not yet acknowledged with a clear. Only shrinks
    /// when a clear exchange succeeds.
    pub pending_handles: Vec<u16>,
}

/// State for all four logs, guarded by the device's single log lock.
#[derive(Debug, Clone, Default)]
pub struct EventState {
    logs: [LogState; 4],
}

impl EventState {
    pub fn log(&self, log: EventLogType) -> &LogState {
        &self.logs[log.to_raw() as usize]
    }

    fn log_mut(&mut self, log: EventLogType) -> &mut LogState {
        &mut self.logs[log.to_raw() as usize]
    }
}

/// Errors from a drain cycle.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("mailbox exchange failed")]
    Mbox(#[from] MboxError),
    #[error("failed to parse event records response")]
    Parse(#[from] EventPayloadParseError),
    /// The device kept reporting "more records" past the iteration cap.
    #[error("{log:?} event log still reports more records after {cap} fetches")]
    FetchCapExceeded {
        /// The severity being drained
        log: EventLogType,
        /// The iteration cap that was hit
        cap: usize,
    },
}

/// Drains and clears one severity's log.
///
/// Fetched handles land in [`LogState::pending_handles`] before the clear
/// is issued and are removed batch by batch as clears succeed. Hitting the
/// iteration cap still clears what was fetched, then reports the error.
pub(crate) fn drain_log<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
    state: &mut EventState,
    log: EventLogType,
) -> Result<(), EventError> {
    let payload_cap = mbox.payload_size();
    let mut fetched: Vec<u16> = Vec::new();
    let mut capped = false;
    let mut iterations = 0;

    loop {
        if iterations == MAX_FETCH_ITERATIONS {
            capped = true;
            break;
        }
        iterations += 1;

        let mut cmd = MboxCmd::new(Opcode::GetEventRecords)
            .with_input([log.to_raw()])
            .with_output(payload_cap)
            .with_min_output(size_of::<GetEventRecordsHeader>());
        mbox.send(&mut cmd)?;

        let payload = EventPayload::try_from_bytes(&cmd.payload_out)?;

        if payload.flags().contains(GetEventFlags::OVERFLOW) {
            let entry = state.log_mut(log);
            entry.overflow_count = entry
                .overflow_count
                .saturating_add(u64::from(payload.overflow_err_count()));
            entry
                .first_overflow_timestamp
                .get_or_insert(payload.first_overflow_timestamp());
            entry.last_overflow_timestamp = Some(payload.last_overflow_timestamp());
            warn!(
                "{log:?} event log overflowed, {} records lost",
                payload.overflow_err_count()
            );
        }

        for record in payload.records() {
            debug!(
                "{log:?} event: {} record, handle {:#06x}, timestamp {}",
                record.kind().name(),
                record.handle(),
                record.timestamp()
            );
            fetched.push(record.handle());
        }

        if !payload.flags().contains(GetEventFlags::MORE_RECORDS) {
            break;
        }
    }

    state.log_mut(log).pending_handles.extend_from_slice(&fetched);
    clear_records(mbox, state, log, payload_cap)?;

    if capped {
        return Err(EventError::FetchCapExceeded {
            log,
            cap: MAX_FETCH_ITERATIONS,
        });
    }
    Ok(())
}

/// Acknowledges pending handles for one severity, at most 255 per exchange
/// and never more than the payload area can carry.
fn clear_records<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
    state: &mut EventState,
    log: EventLogType,
    payload_cap: usize,
) -> Result<(), EventError> {
    // A payload area too small to carry even one handle still gets a
    // one-handle batch; the transport rejects the oversized input instead
    // of this loop spinning on empty exchanges.
    let per_batch = CLEAR_EVENT_MAX_HANDLES
        .min(payload_cap.saturating_sub(size_of::<ClearEventRecordsHeader>()) / size_of::<u16>())
        .max(1);

    while !state.log(log).pending_handles.is_empty() {
        let entry = state.log_mut(log);
        let batch_len = entry.pending_handles.len().min(per_batch);

        let header = ClearEventRecordsHeader::new(log, batch_len as u8);
        let mut payload = header.as_bytes().to_vec();
        for handle in &entry.pending_handles[..batch_len] {
            payload.extend_from_slice(&handle.to_le_bytes());
        }

        let mut cmd = MboxCmd::new(Opcode::ClearEventRecords).with_input(payload);
        mbox.send(&mut cmd)?;

        // Acknowledged; drop the batch from the unacked set.
        state.log_mut(log).pending_handles.drain(..batch_len);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use cxl_proto::DRAM_EVENT_UUID;

    use super::*;
    use crate::testutil::{FakeBackend, event_payload, mailbox, record};

    #[test]
    fn drains_until_more_records_clears() {
        // First fetch: 2 records, more set. Second: 1 record, more clear.
        // Expect exactly 2 fetches and 1 clear carrying all 3 handles.
        let backend = FakeBackend::new()
            .respond(
                0,
                &event_payload(
                    GetEventFlags::MORE_RECORDS,
                    &[record(DRAM_EVENT_UUID, 1), record(DRAM_EVENT_UUID, 2)],
                ),
            )
            .respond(
                0,
                &event_payload(GetEventFlags::empty(), &[record(DRAM_EVENT_UUID, 3)]),
            )
            .respond(0, &[]);
        let mbox = mailbox(backend);
        let mut state = EventState::default();

        drain_log(&mbox, &mut state, EventLogType::Fail).unwrap();

        let submitted = mbox.backend().submitted();
        assert_eq!(submitted.len(), 3);
        assert_eq!(submitted[0].opcode, Opcode::GetEventRecords.to_raw());
        assert_eq!(submitted[1].opcode, Opcode::GetEventRecords.to_raw());
        assert_eq!(submitted[2].opcode, Opcode::ClearEventRecords.to_raw());

        let clear = &submitted[2].payload_in;
        assert_eq!(clear[0], EventLogType::Fail.to_raw());
        assert_eq!(clear[2], 3); // handle count
        let handles: Vec<u16> = clear[6..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(handles, [1, 2, 3]);
        assert!(state.log(EventLogType::Fail).pending_handles.is_empty());
    }

    #[test]
    fn clears_in_batches_of_at_most_255_handles() {
        let records: Vec<Vec<u8>> = (0..300u16).map(|h| record(DRAM_EVENT_UUID, h)).collect();
        let backend = FakeBackend::new()
            .with_payload_size(64 * 1024)
            .respond(0, &event_payload(GetEventFlags::empty(), &records))
            .respond(0, &[])
            .respond(0, &[]);
        let mbox = mailbox(backend);
        let mut state = EventState::default();

        drain_log(&mbox, &mut state, EventLogType::Info).unwrap();

        let submitted = mbox.backend().submitted();
        let clears: Vec<_> = submitted
            .iter()
            .filter(|s| s.opcode == Opcode::ClearEventRecords.to_raw())
            .collect();
        assert_eq!(clears.len(), 2);
        assert_eq!(clears[0].payload_in[2], 255);
        assert_eq!(clears[1].payload_in[2], 45);

        let mut cleared: Vec<u16> = clears
            .iter()
            .flat_map(|s| {
                s.payload_in[6..]
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
            })
            .collect();
        cleared.sort_unstable();
        let expected: Vec<u16> = (0..300).collect();
        assert_eq!(cleared, expected);
    }

    #[test]
    fn fetch_cap_is_an_error_not_a_hang() {
        // Every response reports one record and "more records" forever.
        let one_more = event_payload(
            GetEventFlags::MORE_RECORDS,
            &[record(DRAM_EVENT_UUID, 7)],
        );
        let backend = FakeBackend::new().respond_repeating(0, &one_more);
        let mbox = mailbox(backend);
        let mut state = EventState::default();

        let err = drain_log(&mbox, &mut state, EventLogType::Fatal).unwrap_err();
        assert!(matches!(
            err,
            EventError::FetchCapExceeded {
                log: EventLogType::Fatal,
                cap: MAX_FETCH_ITERATIONS,
            }
        ));
        let fetches = mbox
            .backend()
            .submitted()
            .iter()
            .filter(|s| s.opcode == Opcode::GetEventRecords.to_raw())
            .count();
        assert_eq!(fetches, MAX_FETCH_ITERATIONS);
    }

    #[test]
    fn tiny_payload_capacity_fails_the_clear_instead_of_looping() {
        // Capacities below one header plus one handle cannot make
        // progress; the clear must end in an error, not spin.
        for cap in [4usize, 6, 7] {
            let backend = FakeBackend::new()
                .with_payload_size(cap)
                .respond_repeating(0, &[]);
            let mbox = mailbox(backend);
            let mut state = EventState::default();
            state.log_mut(EventLogType::Info).pending_handles.push(7);

            let err = clear_records(&mbox, &mut state, EventLogType::Info, cap).unwrap_err();
            assert!(matches!(
                err,
                EventError::Mbox(MboxError::PayloadTooLarge { .. })
            ));
            // The handle stays pending; nothing was acknowledged.
            assert_eq!(state.log(EventLogType::Info).pending_handles, [7]);
        }
    }

    #[test]
    fn overflow_updates_counters_and_timestamps() {
        let mut payload = event_payload(
            GetEventFlags::OVERFLOW,
            &[record(DRAM_EVENT_UUID, 1)],
        );
        // overflow count = 5, first ts = 100, last ts = 200
        payload[2..4].copy_from_slice(&5u16.to_le_bytes());
        payload[4..12].copy_from_slice(&100u64.to_le_bytes());
        payload[12..20].copy_from_slice(&200u64.to_le_bytes());

        let backend = FakeBackend::new().respond(0, &payload).respond(0, &[]);
        let mbox = mailbox(backend);
        let mut state = EventState::default();

        drain_log(&mbox, &mut state, EventLogType::Warn).unwrap();

        let entry = state.log(EventLogType::Warn);
        assert_eq!(entry.overflow_count, 5);
        assert_eq!(entry.first_overflow_timestamp, Some(100));
        assert_eq!(entry.last_overflow_timestamp, Some(200));
    }

    #[test]
    fn empty_log_issues_no_clear() {
        let backend =
            FakeBackend::new().respond(0, &event_payload(GetEventFlags::empty(), &[]));
        let mbox = mailbox(backend);
        let mut state = EventState::default();

        drain_log(&mbox, &mut state, EventLogType::Info).unwrap();
        assert_eq!(mbox.backend().submitted().len(), 1);
    }
}
