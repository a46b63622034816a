//! Supported-logs and Command Effects Log response parsing.

use uuid::Uuid;
use zerocopy::FromBytes;

use crate::raw::log::{CelEntry, GetSupportedLogsHeader, SupportedLogEntry};

/// Validated view over a Get Supported Logs response.
pub struct SupportedLogs<'a> {
    header: &'a GetSupportedLogsHeader,
    entries: &'a [u8],
}

impl<'a> SupportedLogs<'a> {
    /// Parse a Get Supported Logs response with entry-count validation.
    pub fn try_from_bytes(bytes: &'a [u8]) -> Result<Self, SupportedLogsParseError> {
        let (header, rest) = GetSupportedLogsHeader::ref_from_prefix(bytes).map_err(|_| {
            SupportedLogsParseError::Truncated {
                required: size_of::<GetSupportedLogsHeader>(),
                available: bytes.len(),
            }
        })?;

        let needed = usize::from(header.entries.get()) * size_of::<SupportedLogEntry>();
        if rest.len() < needed {
            return Err(SupportedLogsParseError::Truncated {
                required: size_of::<GetSupportedLogsHeader>() + needed,
                available: bytes.len(),
            });
        }

        Ok(Self {
            header,
            entries: &rest[..needed],
        })
    }

    /// Number of advertised logs.
    pub fn len(&self) -> usize {
        usize::from(self.header.entries.get())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over (log UUID, log size in bytes) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Uuid, u32)> + '_ {
        self.entries
            .chunks_exact(size_of::<SupportedLogEntry>())
            .map(|chunk| {
                // chunks_exact guarantees the length
                let entry = SupportedLogEntry::ref_from_bytes(chunk).unwrap();
                (Uuid::from_bytes(entry.uuid), entry.size.get())
            })
    }

    /// Size of the log with the given UUID, if advertised.
    pub fn find(&self, uuid: Uuid) -> Option<u32> {
        self.iter().find(|(id, _)| *id == uuid).map(|(_, size)| size)
    }
}

/// Errors from [`SupportedLogs::try_from_bytes`].
#[derive(Debug, thiserror::Error)]
pub enum SupportedLogsParseError {
    /// Response shorter than the header plus its declared entries.
    #[error("supported logs response truncated: need {required} bytes, have {available}")]
    Truncated {
        /// Number of bytes required
        required: usize,
        /// Number of bytes available
        available: usize,
    },
}

/// Parse a slice of Command Effects Log bytes into its entries.
///
/// The CEL is retrieved in byte slices via Get Log paging; each slice must
/// hold whole 4-byte entries.
pub fn cel_entries(bytes: &[u8]) -> Result<impl Iterator<Item = CelEntry> + '_, CelParseError> {
    if bytes.len() % size_of::<CelEntry>() != 0 {
        return Err(CelParseError::Ragged { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(size_of::<CelEntry>())
        .map(|chunk| CelEntry::read_from_bytes(chunk).unwrap()))
}

/// Errors from [`cel_entries`].
#[derive(Debug, thiserror::Error)]
pub enum CelParseError {
    /// Log slice length is not a multiple of the entry size.
    #[error("CEL slice of {len} bytes is not a whole number of entries")]
    Ragged {
        /// Slice length in bytes
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CEL_UUID;

    fn supported_logs_payload(entries: &[(Uuid, u32)]) -> Vec<u8> {
        let mut bytes = vec![0u8; 8];
        bytes[..2].copy_from_slice(&(entries.len() as u16).to_le_bytes());
        for (uuid, size) in entries {
            bytes.extend_from_slice(uuid.as_bytes());
            bytes.extend_from_slice(&size.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn finds_the_cel_among_logs() {
        let payload =
            supported_logs_payload(&[(crate::VENDOR_DEBUG_UUID, 128), (CEL_UUID, 0x40)]);
        let logs = SupportedLogs::try_from_bytes(&payload).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs.find(CEL_UUID), Some(0x40));
        assert_eq!(logs.find(Uuid::nil()), None);
    }

    #[test]
    fn rejects_truncated_entry_list() {
        let mut payload = supported_logs_payload(&[(CEL_UUID, 0x40)]);
        payload.truncate(payload.len() - 1);
        assert!(matches!(
            SupportedLogs::try_from_bytes(&payload),
            Err(SupportedLogsParseError::Truncated { .. })
        ));
    }

    #[test]
    fn parses_cel_entries() {
        let mut bytes = Vec::new();
        for opcode in [0x0100u16, 0x4000, 0x4100] {
            bytes.extend_from_slice(&opcode.to_le_bytes());
            bytes.extend_from_slice(&0u16.to_le_bytes());
        }
        let opcodes: Vec<u16> = cel_entries(&bytes)
            .unwrap()
            .map(|e| e.opcode.get())
            .collect();
        assert_eq!(opcodes, [0x0100, 0x4000, 0x4100]);

        assert!(matches!(
            cel_entries(&bytes[..5]).map(|_| ()),
            Err(CelParseError::Ragged { len: 5 })
        ));
    }
}
