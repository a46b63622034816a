//! Event record payloads: Get/Clear Event Records and the typed 80-byte
//! record bodies (general-media, DRAM, memory-module).

use bitflags::bitflags;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, little_endian::*};

/// Size of the type-specific body that follows every record header.
pub const EVENT_RECORD_BODY_SIZE: usize = 0x50;

/// Size of one packed event record (header + body).
pub const EVENT_RECORD_SIZE: usize = size_of::<EventRecordRaw>();

/// The four event log severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventLogType {
    Info = 0x00,
    Warn = 0x01,
    Fail = 0x02,
    Fatal = 0x03,
}

impl EventLogType {
    /// All severities, in wire order.
    pub const ALL: [EventLogType; 4] = [
        EventLogType::Info,
        EventLogType::Warn,
        EventLogType::Fail,
        EventLogType::Fatal,
    ];

    #[inline]
    pub const fn to_raw(self) -> u8 {
        self as u8
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(EventLogType::Info),
            0x01 => Some(EventLogType::Warn),
            0x02 => Some(EventLogType::Fail),
            0x03 => Some(EventLogType::Fatal),
            _ => None,
        }
    }
}

/// Common event record header preceding every 80-byte body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct EventRecordHeader {
    /// Record type UUID; selects the body interpretation
    pub id: [u8; 16],
    /// Record length in bytes
    pub length: u8,
    /// Record flags
    pub flags: [u8; 3],
    /// Handle used to clear (acknowledge) this record
    pub handle: U16,
    /// Handle of a related record, or 0
    pub related_handle: U16,
    /// Device timestamp
    pub timestamp: U64,
    /// Maintenance operation class
    pub maint_op_class: u8,
    /// Reserved
    _reserved: [u8; 15],
}

const_assert_eq!(size_of::<EventRecordHeader>(), 0x30);

impl EventRecordHeader {
    /// Builds a header with the given identity fields; reserved bytes zero.
    pub fn new(id: uuid::Uuid, handle: u16, related_handle: u16, timestamp: u64) -> Self {
        Self {
            id: *id.as_bytes(),
            length: EVENT_RECORD_SIZE as u8,
            flags: [0; 3],
            handle: U16::new(handle),
            related_handle: U16::new(related_handle),
            timestamp: U64::new(timestamp),
            maint_op_class: 0,
            _reserved: [0; 15],
        }
    }

    /// The record type UUID.
    pub fn uuid(&self) -> uuid::Uuid {
        uuid::Uuid::from_bytes(self.id)
    }
}

/// One packed event record as it appears in a Get Event Records response:
/// the common header followed by the opaque body.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct EventRecordRaw {
    pub hdr: EventRecordHeader,
    pub body: [u8; EVENT_RECORD_BODY_SIZE],
}

const_assert_eq!(size_of::<EventRecordRaw>(), 0x80);

bitflags! {
    /// Flags in the Get Event Records output header. These describe the
    /// log, not an individual record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GetEventFlags: u8 {
        /// The log overflowed and records were lost
        const OVERFLOW = 1 << 0;
        /// More records remain; fetch again
        const MORE_RECORDS = 1 << 1;
    }
}

/// Get Event Records output header, followed by `record_count` packed
/// [`EventRecordRaw`] records.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GetEventRecordsHeader {
    /// [`GetEventFlags`] bits
    pub flags: u8,
    /// Reserved
    _reserved1: u8,
    /// Number of records dropped to overflow since last clear
    pub overflow_err_count: U16,
    /// Timestamp of the first overflowed record
    pub first_overflow_timestamp: U64,
    /// Timestamp of the most recent overflowed record
    pub last_overflow_timestamp: U64,
    /// Number of records in this response
    pub record_count: U16,
    /// Reserved
    _reserved2: [u8; 10],
}

const_assert_eq!(size_of::<GetEventRecordsHeader>(), 0x20);

impl GetEventRecordsHeader {
    pub fn flags(&self) -> GetEventFlags {
        GetEventFlags::from_bits_truncate(self.flags)
    }
}

/// Most handles one Clear Event Records exchange can carry; the count
/// field is a single byte.
pub const CLEAR_EVENT_MAX_HANDLES: usize = u8::MAX as usize;

/// Clear Event Records input header, followed by `nr_recs` little-endian
/// 16-bit handles.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct ClearEventRecordsHeader {
    /// Which log to clear from ([`EventLogType`])
    pub event_log: u8,
    /// Clear flags
    pub clear_flags: u8,
    /// Number of handles that follow
    pub nr_recs: u8,
    /// Reserved
    _reserved: [u8; 3],
}

const_assert_eq!(size_of::<ClearEventRecordsHeader>(), 0x6);

impl ClearEventRecordsHeader {
    pub fn new(log: EventLogType, nr_recs: u8) -> Self {
        Self {
            event_log: log.to_raw(),
            clear_flags: 0,
            nr_recs,
            _reserved: [0; 3],
        }
    }
}

/// General Media event record body.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct GeneralMediaBody {
    /// Device physical address of the error
    pub phys_addr: U64,
    /// Memory event descriptor flags
    pub descriptor: u8,
    /// Memory event type
    pub event_type: u8,
    /// Transaction type that triggered the event
    pub transaction_type: u8,
    /// Which of the following fields are valid
    pub validity_flags: [u8; 2],
    pub channel: u8,
    pub rank: u8,
    /// Device location (24-bit)
    pub device: [u8; 3],
    /// Component identifier
    pub component_id: [u8; 16],
    /// Reserved
    _reserved: [u8; 46],
}

const_assert_eq!(size_of::<GeneralMediaBody>(), EVENT_RECORD_BODY_SIZE);

/// DRAM event record body.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DramBody {
    /// Device physical address of the error
    pub phys_addr: U64,
    /// Memory event descriptor flags
    pub descriptor: u8,
    /// Memory event type
    pub event_type: u8,
    /// Transaction type that triggered the event
    pub transaction_type: u8,
    /// Which of the following fields are valid
    pub validity_flags: [u8; 2],
    pub channel: u8,
    pub rank: u8,
    /// Failing nibbles (24-bit mask)
    pub nibble_mask: [u8; 3],
    pub bank_group: u8,
    pub bank: u8,
    /// Row (24-bit)
    pub row: [u8; 3],
    /// Column (16-bit)
    pub column: [u8; 2],
    /// Correction mask
    pub correction_mask: [u8; 32],
    /// Reserved
    _reserved: [u8; 0x17],
}

const_assert_eq!(size_of::<DramBody>(), EVENT_RECORD_BODY_SIZE);

/// Device health snapshot embedded in memory-module events.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct HealthInfo {
    pub health_status: u8,
    pub media_status: u8,
    pub add_status: u8,
    pub life_used: u8,
    pub device_temp: [u8; 2],
    pub dirty_shutdown_cnt: [u8; 4],
    pub cor_vol_err_cnt: [u8; 4],
    pub cor_per_err_cnt: [u8; 4],
}

const_assert_eq!(size_of::<HealthInfo>(), 0x12);

/// Memory Module event record body.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct MemModuleBody {
    /// Device event type
    pub event_type: u8,
    /// Health info at the time of the event
    pub info: HealthInfo,
    /// Reserved
    _reserved: [u8; 0x3d],
}

const_assert_eq!(size_of::<MemModuleBody>(), EVENT_RECORD_BODY_SIZE);

/// Event interrupt delivery mode, one byte per severity.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct EventInterruptPolicy {
    pub info_settings: u8,
    pub warn_settings: u8,
    pub failure_settings: u8,
    pub fatal_settings: u8,
}

const_assert_eq!(size_of::<EventInterruptPolicy>(), 0x4);

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::{FromBytes as _, IntoBytes as _};

    #[test]
    fn header_round_trips_arbitrary_fields() {
        let hdr = EventRecordHeader {
            id: *crate::DRAM_EVENT_UUID.as_bytes(),
            length: 0x80,
            flags: [0xaa, 0x55, 0x01],
            handle: U16::new(0xbeef),
            related_handle: U16::new(0x1234),
            timestamp: U64::new(0xdead_beef_cafe_f00d),
            maint_op_class: 7,
            _reserved: [0; 15],
        };
        let bytes = hdr.as_bytes();
        assert_eq!(bytes.len(), 0x30);
        let back = EventRecordHeader::read_from_bytes(bytes).unwrap();
        assert_eq!(back, hdr);
        assert_eq!(back.uuid(), crate::DRAM_EVENT_UUID);
    }

    #[test]
    fn get_event_flags_are_log_level_bits() {
        let flags = GetEventFlags::from_bits_truncate(0b11);
        assert!(flags.contains(GetEventFlags::OVERFLOW));
        assert!(flags.contains(GetEventFlags::MORE_RECORDS));
        // Unknown bits are dropped, not an error.
        assert_eq!(GetEventFlags::from_bits_truncate(0xff), flags);
    }

    #[test]
    fn log_type_round_trip() {
        for log in EventLogType::ALL {
            assert_eq!(EventLogType::from_raw(log.to_raw()), Some(log));
        }
        assert_eq!(EventLogType::from_raw(4), None);
    }
}
