//! Identify Memory Device output payload.

use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, little_endian::*};

/// Identify Memory Device output.
///
/// Capacity and alignment fields are counts of the 256 MiB capacity unit
/// ([`crate::CAPACITY_MULTIPLIER`]), not bytes.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct IdentifyOut {
    /// Firmware revision, space-padded ASCII
    pub fw_revision: [u8; 16],
    /// Total device capacity (256 MiB units)
    pub total_capacity: U64,
    /// Hard volatile-only capacity (256 MiB units)
    pub volatile_capacity: U64,
    /// Hard persistent-only capacity (256 MiB units)
    pub persistent_capacity: U64,
    /// Partitionable-capacity alignment (256 MiB units)
    pub partition_align: U64,
    /// Informational event log size hint (record count)
    pub info_event_log_size: U16,
    /// Warning event log size hint
    pub warning_event_log_size: U16,
    /// Failure event log size hint
    pub failure_event_log_size: U16,
    /// Fatal event log size hint
    pub fatal_event_log_size: U16,
    /// Label Storage Area size in bytes
    pub lsa_size: U32,
    /// Poison list maximum media error records (24-bit)
    pub poison_list_max_mer: [u8; 3],
    /// Inject poison limit
    pub inject_poison_limit: U16,
    /// Poison handling capabilities
    pub poison_caps: u8,
    /// QoS telemetry capabilities
    pub qos_telemetry_caps: u8,
}

const_assert_eq!(size_of::<IdentifyOut>(), 0x43);

impl IdentifyOut {
    /// Firmware revision with trailing padding trimmed.
    pub fn fw_revision_str(&self) -> &str {
        let end = self
            .fw_revision
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.fw_revision.len());
        core::str::from_utf8(&self.fw_revision[..end])
            .unwrap_or("")
            .trim_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromBytes as _;

    #[test]
    fn decodes_capacities_little_endian() {
        let mut bytes = [0u8; 0x43];
        bytes[..4].copy_from_slice(b"fw01");
        // total = 4 units, volatile = 4 units at offsets 0x10 / 0x18
        bytes[0x10] = 4;
        bytes[0x18] = 4;
        let id = IdentifyOut::read_from_bytes(&bytes).unwrap();
        assert_eq!(id.total_capacity.get(), 4);
        assert_eq!(id.volatile_capacity.get(), 4);
        assert_eq!(id.persistent_capacity.get(), 0);
        assert_eq!(id.fw_revision_str(), "fw01");
    }
}
