//! Event record parsing and type dispatch.

use uuid::Uuid;
use zerocopy::FromBytes;

use crate::{
    DRAM_EVENT_UUID, GEN_MEDIA_EVENT_UUID, MEM_MODULE_EVENT_UUID,
    raw::event::{
        DramBody, EVENT_RECORD_BODY_SIZE, EVENT_RECORD_SIZE, EventRecordHeader, EventRecordRaw,
        GeneralMediaBody, GetEventFlags, GetEventRecordsHeader, MemModuleBody,
    },
};

/// Typed interpretation of a record's 80-byte body, selected by the header
/// UUID. Unrecognized UUIDs are retained as [`EventKind::Vendor`] rather
/// than dropped.
#[derive(Debug)]
pub enum EventKind<'a> {
    GeneralMedia(&'a GeneralMediaBody),
    Dram(&'a DramBody),
    MemModule(&'a MemModuleBody),
    /// Vendor-specific or unknown record type; raw body retained.
    Vendor(&'a [u8; EVENT_RECORD_BODY_SIZE]),
}

impl EventKind<'_> {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::GeneralMedia(_) => "general media",
            EventKind::Dram(_) => "DRAM",
            EventKind::MemModule(_) => "memory module",
            EventKind::Vendor(_) => "vendor",
        }
    }
}

/// One parsed event record: the common header plus the typed body view.
#[derive(Debug)]
pub struct EventRecord<'a> {
    header: &'a EventRecordHeader,
    kind: EventKind<'a>,
}

impl<'a> EventRecord<'a> {
    /// Parse one record from the front of `bytes`, returning the record and
    /// the remaining bytes.
    pub fn parse(bytes: &'a [u8]) -> Result<(Self, &'a [u8]), RecordParseError> {
        let (raw, rest) =
            EventRecordRaw::ref_from_prefix(bytes).map_err(|_| RecordParseError::Truncated {
                required: EVENT_RECORD_SIZE,
                available: bytes.len(),
            })?;

        let uuid = raw.hdr.uuid();
        let kind = if uuid == GEN_MEDIA_EVENT_UUID {
            EventKind::GeneralMedia(GeneralMediaBody::ref_from_bytes(&raw.body).unwrap())
        } else if uuid == DRAM_EVENT_UUID {
            EventKind::Dram(DramBody::ref_from_bytes(&raw.body).unwrap())
        } else if uuid == MEM_MODULE_EVENT_UUID {
            EventKind::MemModule(MemModuleBody::ref_from_bytes(&raw.body).unwrap())
        } else {
            EventKind::Vendor(&raw.body)
        };

        Ok((
            Self {
                header: &raw.hdr,
                kind,
            },
            rest,
        ))
    }

    pub fn header(&self) -> &EventRecordHeader {
        self.header
    }

    pub fn kind(&self) -> &EventKind<'a> {
        &self.kind
    }

    /// The record type UUID.
    pub fn uuid(&self) -> Uuid {
        self.header.uuid()
    }

    /// Handle used to clear this record.
    pub fn handle(&self) -> u16 {
        self.header.handle.get()
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp.get()
    }
}

/// Errors from [`EventRecord::parse`].
#[derive(Debug, thiserror::Error)]
pub enum RecordParseError {
    /// Fewer bytes than one packed record.
    #[error("event record truncated: need {required} bytes, have {available}")]
    Truncated {
        /// Number of bytes required
        required: usize,
        /// Number of bytes available
        available: usize,
    },
}

/// Validated view over a Get Event Records response.
pub struct EventPayload<'a> {
    header: &'a GetEventRecordsHeader,
    records: &'a [u8],
}

impl<'a> EventPayload<'a> {
    /// Parse a Get Event Records response with record-count validation.
    pub fn try_from_bytes(bytes: &'a [u8]) -> Result<Self, EventPayloadParseError> {
        let (header, rest) = GetEventRecordsHeader::ref_from_prefix(bytes).map_err(|_| {
            EventPayloadParseError::Truncated {
                required: size_of::<GetEventRecordsHeader>(),
                available: bytes.len(),
            }
        })?;

        let count = usize::from(header.record_count.get());
        let needed = count * EVENT_RECORD_SIZE;
        if rest.len() < needed {
            return Err(EventPayloadParseError::Truncated {
                required: size_of::<GetEventRecordsHeader>() + needed,
                available: bytes.len(),
            });
        }

        Ok(Self {
            header,
            records: &rest[..needed],
        })
    }

    /// Log-level flags (overflow, more-records).
    pub fn flags(&self) -> GetEventFlags {
        self.header.flags()
    }

    pub fn overflow_err_count(&self) -> u16 {
        self.header.overflow_err_count.get()
    }

    pub fn first_overflow_timestamp(&self) -> u64 {
        self.header.first_overflow_timestamp.get()
    }

    pub fn last_overflow_timestamp(&self) -> u64 {
        self.header.last_overflow_timestamp.get()
    }

    /// Number of records in this response.
    pub fn record_count(&self) -> usize {
        usize::from(self.header.record_count.get())
    }

    /// Iterate over the parsed records.
    pub fn records(&self) -> impl Iterator<Item = EventRecord<'a>> + '_ {
        self.records
            .chunks_exact(EVENT_RECORD_SIZE)
            .map(|chunk| {
                // chunks_exact guarantees whole records
                EventRecord::parse(chunk).unwrap().0
            })
    }
}

/// Errors from [`EventPayload::try_from_bytes`].
#[derive(Debug, thiserror::Error)]
pub enum EventPayloadParseError {
    /// Response shorter than the header plus its declared records.
    #[error("event payload truncated: need {required} bytes, have {available}")]
    Truncated {
        /// Number of bytes required
        required: usize,
        /// Number of bytes available
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    fn record_bytes(uuid: Uuid, handle: u16) -> Vec<u8> {
        let hdr = EventRecordHeader::new(uuid, handle, 0, 0x1000 + u64::from(handle));
        let mut bytes = hdr.as_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; EVENT_RECORD_BODY_SIZE]);
        bytes
    }

    fn payload_bytes(flags: u8, records: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = vec![0u8; size_of::<GetEventRecordsHeader>()];
        bytes[0] = flags;
        bytes[0x14..0x16].copy_from_slice(&(records.len() as u16).to_le_bytes());
        for rec in records {
            bytes.extend_from_slice(rec);
        }
        bytes
    }

    #[test]
    fn dispatches_on_header_uuid() {
        let payload = payload_bytes(
            0,
            &[
                record_bytes(crate::GEN_MEDIA_EVENT_UUID, 1),
                record_bytes(crate::DRAM_EVENT_UUID, 2),
                record_bytes(crate::MEM_MODULE_EVENT_UUID, 3),
            ],
        );
        let view = EventPayload::try_from_bytes(&payload).unwrap();
        let kinds: Vec<&str> = view.records().map(|r| r.kind().name()).collect();
        assert_eq!(kinds, ["general media", "DRAM", "memory module"]);
        let handles: Vec<u16> = view.records().map(|r| r.handle()).collect();
        assert_eq!(handles, [1, 2, 3]);
    }

    #[test]
    fn unknown_uuid_is_retained_as_vendor() {
        let odd = Uuid::from_bytes([0x42; 16]);
        let payload = payload_bytes(0, &[record_bytes(odd, 9)]);
        let view = EventPayload::try_from_bytes(&payload).unwrap();
        let rec = view.records().next().unwrap();
        assert!(matches!(rec.kind(), EventKind::Vendor(_)));
        assert_eq!(rec.uuid(), odd);
        assert_eq!(rec.handle(), 9);
    }

    #[test]
    fn rejects_count_beyond_payload() {
        let mut payload = payload_bytes(0, &[record_bytes(crate::DRAM_EVENT_UUID, 1)]);
        // Claim two records while carrying one.
        payload[0x14] = 2;
        assert!(matches!(
            EventPayload::try_from_bytes(&payload),
            Err(EventPayloadParseError::Truncated { .. })
        ));
    }
}
