//! Mailbox command opcodes and the driver's command descriptor table.

use bitflags::bitflags;

/// A 16-bit mailbox command opcode.
///
/// The upper byte selects the command set, the lower byte the command
/// within it (e.g. `0x01xx` for events, `0x40xx` for memory device
/// commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    GetEventRecords = 0x0100,
    ClearEventRecords = 0x0101,
    GetEventInterruptPolicy = 0x0102,
    SetEventInterruptPolicy = 0x0103,
    GetFwInfo = 0x0200,
    ActivateFw = 0x0202,
    SetTimestamp = 0x0301,
    GetSupportedLogs = 0x0400,
    GetLog = 0x0401,
    Identify = 0x4000,
    GetPartitionInfo = 0x4100,
    SetPartitionInfo = 0x4101,
    GetLsa = 0x4102,
    SetLsa = 0x4103,
    GetHealthInfo = 0x4200,
    GetAlertConfig = 0x4201,
    SetAlertConfig = 0x4202,
    GetShutdownState = 0x4203,
    SetShutdownState = 0x4204,
    GetPoison = 0x4300,
    InjectPoison = 0x4301,
    ClearPoison = 0x4302,
    GetScanMediaCaps = 0x4303,
    ScanMedia = 0x4304,
    GetScanMedia = 0x4305,
    GetSecurityState = 0x4500,
    SetPassphrase = 0x4501,
    DisablePassphrase = 0x4502,
    Unlock = 0x4503,
    FreezeSecurity = 0x4504,
    PassphraseSecureErase = 0x4505,
}

impl Opcode {
    /// Returns the raw 16-bit wire value.
    #[inline]
    pub const fn to_raw(self) -> u16 {
        self as u16
    }

    /// Converts a raw wire value to a known opcode, if the driver knows it.
    pub fn from_raw(raw: u16) -> Option<Self> {
        COMMANDS
            .iter()
            .find(|desc| desc.opcode.to_raw() == raw)
            .map(|desc| desc.opcode)
    }
}

bitflags! {
    /// Policy flags attached to a [`CommandDescriptor`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u32 {
        /// Enable the command even when the device's Command Effects Log
        /// fails to advertise it. Used for the commands enumeration itself
        /// depends on, and compensates for devices with defective
        /// advertisement.
        const FORCE_ENABLE = 1 << 0;
    }
}

/// Dense ordinal identity for a driver-known command.
///
/// Unlike [`Opcode`] (the sparse wire value), command ids are contiguous and
/// serve as bit indices into permission sets. The order here is arbitrary
/// but fixed for the life of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    GetEventRecords = 0,
    ClearEventRecords,
    GetEventInterruptPolicy,
    SetEventInterruptPolicy,
    GetFwInfo,
    ActivateFw,
    SetTimestamp,
    GetSupportedLogs,
    GetLog,
    Identify,
    GetPartitionInfo,
    SetPartitionInfo,
    GetLsa,
    SetLsa,
    GetHealthInfo,
    GetAlertConfig,
    SetAlertConfig,
    GetShutdownState,
    SetShutdownState,
    GetPoison,
    InjectPoison,
    ClearPoison,
    GetScanMediaCaps,
    ScanMedia,
    GetScanMedia,
    GetSecurityState,
    SetPassphrase,
    DisablePassphrase,
    Unlock,
    FreezeSecurity,
    PassphraseSecureErase,
}

/// Number of driver-known commands; the width of a permission bitset.
pub const COMMAND_COUNT: usize = 31;

impl CommandId {
    /// Bit index of this command in a permission set.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Static metadata for one driver-known command.
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    /// User-facing command identity (and permission-set bit index).
    pub id: CommandId,
    /// Short name for diagnostics.
    pub name: &'static str,
    /// Wire opcode submitted to hardware.
    pub opcode: Opcode,
    /// Driver policy flags.
    pub flags: CommandFlags,
}

macro_rules! cmd {
    ($id:ident, $name:literal) => {
        cmd!($id, $name, CommandFlags::empty())
    };
    ($id:ident, $name:literal, $flags:expr) => {
        CommandDescriptor {
            id: CommandId::$id,
            name: $name,
            opcode: Opcode::$id,
            flags: $flags,
        }
    };
}

/// The driver's command table, one entry per known command, ordered by
/// [`CommandId`].
///
/// Identify, Get Supported Logs and Get Log are force-enabled: command
/// enumeration cannot run without them, and some devices fail to advertise
/// them.
pub const COMMANDS: &[CommandDescriptor; COMMAND_COUNT] = &[
    cmd!(GetEventRecords, "Get Event Records"),
    cmd!(ClearEventRecords, "Clear Event Records"),
    cmd!(GetEventInterruptPolicy, "Get Event Interrupt Policy"),
    cmd!(SetEventInterruptPolicy, "Set Event Interrupt Policy"),
    cmd!(GetFwInfo, "Get FW Info"),
    cmd!(ActivateFw, "Activate FW"),
    cmd!(SetTimestamp, "Set Timestamp"),
    cmd!(GetSupportedLogs, "Get Supported Logs", CommandFlags::FORCE_ENABLE),
    cmd!(GetLog, "Get Log", CommandFlags::FORCE_ENABLE),
    cmd!(Identify, "Identify Memory Device", CommandFlags::FORCE_ENABLE),
    cmd!(GetPartitionInfo, "Get Partition Info"),
    cmd!(SetPartitionInfo, "Set Partition Info"),
    cmd!(GetLsa, "Get Label Storage Area"),
    cmd!(SetLsa, "Set Label Storage Area"),
    cmd!(GetHealthInfo, "Get Health Info"),
    cmd!(GetAlertConfig, "Get Alert Configuration"),
    cmd!(SetAlertConfig, "Set Alert Configuration"),
    cmd!(GetShutdownState, "Get Shutdown State"),
    cmd!(SetShutdownState, "Set Shutdown State"),
    cmd!(GetPoison, "Get Poison List"),
    cmd!(InjectPoison, "Inject Poison"),
    cmd!(ClearPoison, "Clear Poison"),
    cmd!(GetScanMediaCaps, "Get Scan Media Capabilities"),
    cmd!(ScanMedia, "Scan Media"),
    cmd!(GetScanMedia, "Get Scan Media Results"),
    cmd!(GetSecurityState, "Get Security State"),
    cmd!(SetPassphrase, "Set Passphrase"),
    cmd!(DisablePassphrase, "Disable Passphrase"),
    cmd!(Unlock, "Unlock"),
    cmd!(FreezeSecurity, "Freeze Security State"),
    cmd!(PassphraseSecureErase, "Passphrase Secure Erase"),
];

/// Looks up the descriptor for a raw wire opcode.
pub fn descriptor_for_opcode(raw: u16) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|desc| desc.opcode.to_raw() == raw)
}

/// Looks up the descriptor for a command id.
#[inline]
pub fn descriptor(id: CommandId) -> &'static CommandDescriptor {
    &COMMANDS[id.index()]
}

/// The security command set, reserved by the pmem security layer so the
/// passphrase opcodes cannot be issued through the generic command path.
pub const SECURITY_COMMANDS: &[CommandId] = &[
    CommandId::GetSecurityState,
    CommandId::SetPassphrase,
    CommandId::DisablePassphrase,
    CommandId::Unlock,
    CommandId::FreezeSecurity,
    CommandId::PassphraseSecureErase,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_ordered_by_id() {
        for (idx, desc) in COMMANDS.iter().enumerate() {
            assert_eq!(desc.id.index(), idx, "{} out of place", desc.name);
        }
    }

    #[test]
    fn opcode_round_trip() {
        for desc in COMMANDS {
            assert_eq!(Opcode::from_raw(desc.opcode.to_raw()), Some(desc.opcode));
        }
        assert_eq!(Opcode::from_raw(0xffff), None);
    }

    #[test]
    fn enumeration_bootstrap_commands_are_force_enabled() {
        for id in [CommandId::Identify, CommandId::GetSupportedLogs, CommandId::GetLog] {
            assert!(descriptor(id).flags.contains(CommandFlags::FORCE_ENABLE));
        }
        assert!(
            !descriptor(CommandId::SetPartitionInfo)
                .flags
                .contains(CommandFlags::FORCE_ENABLE)
        );
    }
}
