//! Scripted backend, fake clock, and payload builders shared by the
//! crate's tests.

use std::{
    collections::VecDeque,
    sync::Mutex,
    time::{Duration, Instant},
};

use cxl_mbox::{
    BackgroundStatus, Clock, Mailbox, MailboxBackend, MboxCmd,
    backend::SubmitError,
};
use cxl_proto::raw::event::{
    EVENT_RECORD_BODY_SIZE, EventRecordHeader, GetEventFlags, GetEventRecordsHeader,
};
use uuid::Uuid;
use zerocopy::IntoBytes;

/// Status register value with media ready and mailbox interface ready.
pub const STATUS_READY: u64 = 0b1_0100;

/// One recorded submission: what the code under test sent down.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub opcode: u16,
    pub payload_in: Vec<u8>,
    pub size_out: usize,
}

/// Backend that replays scripted (return code, payload) responses in
/// submission order and records everything submitted to it.
pub struct FakeBackend {
    payload_size: usize,
    responses: Mutex<VecDeque<(u16, Vec<u8>)>>,
    repeating: Mutex<Option<(u16, Vec<u8>)>>,
    submitted: Mutex<Vec<Submitted>>,
    status: Mutex<VecDeque<u64>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            payload_size: 1024,
            responses: Mutex::new(VecDeque::new()),
            repeating: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
            status: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_payload_size(mut self, size: usize) -> Self {
        self.payload_size = size;
        self
    }

    /// Queue one response.
    pub fn respond(self, rc: u16, payload: &[u8]) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back((rc, payload.to_vec()));
        self
    }

    /// Response used once the queue is exhausted, indefinitely.
    pub fn respond_repeating(self, rc: u16, payload: &[u8]) -> Self {
        *self.repeating.lock().unwrap() = Some((rc, payload.to_vec()));
        self
    }

    /// Queue device status register reads; the last value repeats.
    pub fn statuses(self, values: &[u64]) -> Self {
        self.status.lock().unwrap().extend(values.iter().copied());
        self
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().unwrap().clone()
    }
}

impl MailboxBackend for FakeBackend {
    fn payload_size(&self) -> usize {
        self.payload_size
    }

    fn submit(&self, cmd: &mut MboxCmd) -> Result<(), SubmitError> {
        self.submitted.lock().unwrap().push(Submitted {
            opcode: cmd.opcode.to_raw(),
            payload_in: cmd.payload_in.clone(),
            size_out: cmd.size_out,
        });
        let (rc, payload) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeating.lock().unwrap().clone())
            .unwrap_or_else(|| panic!("unscripted submit of {:?}", cmd.opcode));
        cmd.return_code = rc;
        let take = payload.len().min(cmd.size_out);
        cmd.payload_out = payload[..take].to_vec();
        Ok(())
    }

    fn device_status(&self) -> u64 {
        let mut status = self.status.lock().unwrap();
        if status.len() > 1 {
            status.pop_front().unwrap()
        } else {
            status.front().copied().unwrap_or(STATUS_READY)
        }
    }

    fn background_status(&self) -> BackgroundStatus {
        BackgroundStatus::Idle
    }
}

/// Clock that only advances when slept on.
pub struct FakeClock {
    now: Mutex<Instant>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

pub fn mailbox(backend: FakeBackend) -> Mailbox<FakeBackend, FakeClock> {
    Mailbox::new(backend, FakeClock::new())
}

/// One packed event record with a zeroed body.
pub fn record(uuid: Uuid, handle: u16) -> Vec<u8> {
    let hdr = EventRecordHeader::new(uuid, handle, 0, u64::from(handle) * 10);
    let mut bytes = hdr.as_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; EVENT_RECORD_BODY_SIZE]);
    bytes
}

/// A Get Event Records response carrying the given packed records.
pub fn event_payload(flags: GetEventFlags, records: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![0u8; size_of::<GetEventRecordsHeader>()];
    bytes[0] = flags.bits();
    bytes[0x14..0x16].copy_from_slice(&(records.len() as u16).to_le_bytes());
    for rec in records {
        bytes.extend_from_slice(rec);
    }
    bytes
}

/// An Identify response; capacities in 256 MiB units.
pub fn identify_payload(
    fw: &str,
    total: u64,
    volatile: u64,
    persistent: u64,
    align: u64,
) -> Vec<u8> {
    let mut bytes = vec![0u8; 0x43];
    bytes[..fw.len()].copy_from_slice(fw.as_bytes());
    bytes[0x10..0x18].copy_from_slice(&total.to_le_bytes());
    bytes[0x18..0x20].copy_from_slice(&volatile.to_le_bytes());
    bytes[0x20..0x28].copy_from_slice(&persistent.to_le_bytes());
    bytes[0x28..0x30].copy_from_slice(&align.to_le_bytes());
    // LSA size at 0x38
    bytes[0x38..0x3c].copy_from_slice(&1024u32.to_le_bytes());
    bytes
}

/// A Get Partition Info response; capacities in 256 MiB units.
pub fn partition_payload(
    active_volatile: u64,
    active_persistent: u64,
    next_volatile: u64,
    next_persistent: u64,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(0x20);
    for value in [active_volatile, active_persistent, next_volatile, next_persistent] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// A Get Supported Logs response advertising the CEL with `cel_size`
/// bytes.
pub fn supported_logs_payload(cel_size: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 8];
    bytes[..2].copy_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(cxl_proto::CEL_UUID.as_bytes());
    bytes.extend_from_slice(&cel_size.to_le_bytes());
    bytes
}

/// Command Effects Log bytes advertising the given opcodes.
pub fn cel_payload(opcodes: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(opcodes.len() * 4);
    for opcode in opcodes {
        bytes.extend_from_slice(&opcode.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }
    bytes
}
