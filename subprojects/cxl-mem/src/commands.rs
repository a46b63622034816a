//! Command enumeration and permission state.
//!
//! Which opcodes may be issued to a device is the intersection of what the
//! hardware advertises (its Command Effects Log) and driver policy. The
//! advertisement is retrieved once at attach: Get Supported Logs locates
//! the CEL by its well-known UUID, then Get Log retrieves it with
//! offset/length paging since the log may exceed one payload.

use cxl_mbox::{Clock, Mailbox, MailboxBackend, MboxCmd, MboxError};
use cxl_proto::{
    CEL_UUID, CommandFlags, CommandId, Opcode,
    opcode::{COMMAND_COUNT, COMMANDS, descriptor_for_opcode},
    raw::log::{GetLogIn, GetSupportedLogsHeader},
    read::{CelParseError, SupportedLogs, SupportedLogsParseError, cel_entries},
};
use log::debug;
use zerocopy::IntoBytes;

// CommandId indices must fit the bitset word.
static_assertions::const_assert!(COMMAND_COUNT <= 64);

/// A set of driver-known commands with O(1) membership, keyed by
/// [`CommandId`] ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandSet(u64);

impl CommandSet {
    pub const EMPTY: CommandSet = CommandSet(0);

    pub fn insert(&mut self, id: CommandId) {
        self.0 |= 1 << id.index();
    }

    pub fn remove(&mut self, id: CommandId) {
        self.0 &= !(1 << id.index());
    }

    pub fn contains(self, id: CommandId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of commands in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl FromIterator<CommandId> for CommandSet {
    fn from_iter<I: IntoIterator<Item = CommandId>>(iter: I) -> Self {
        let mut set = CommandSet::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Per-device command permission state.
///
/// `enabled` holds what the hardware advertised (plus force-enabled
/// commands); `exclusive` holds commands a driver subsystem has reserved
/// for internal use so they cannot reach the device through the generic
/// command path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandPermissions {
    pub enabled: CommandSet,
    pub exclusive: CommandSet,
}

impl CommandPermissions {
    /// A command may be issued through the generic path iff it is enabled
    /// and not reserved.
    pub fn is_permitted(&self, id: CommandId) -> bool {
        self.enabled.contains(id) && !self.exclusive.contains(id)
    }
}

/// Errors from [`enumerate`].
#[derive(Debug, thiserror::Error)]
pub enum EnumerateError {
    #[error("mailbox exchange failed")]
    Mbox(#[from] MboxError),
    #[error("failed to parse supported logs response")]
    SupportedLogs(#[from] SupportedLogsParseError),
    #[error("failed to parse command effects log")]
    Cel(#[from] CelParseError),
    /// The device advertises no Command Effects Log.
    #[error("device does not advertise a command effects log")]
    CelMissing,
}

/// Discovers which commands the device supports.
///
/// Commands flagged [`CommandFlags::FORCE_ENABLE`] are enabled regardless
/// of the log's contents; enumeration itself depends on them, and some
/// devices fail to advertise them.
pub fn enumerate<B: MailboxBackend, C: Clock>(
    mbox: &Mailbox<B, C>,
) -> Result<CommandSet, EnumerateError> {
    let payload_cap = mbox.payload_size();

    let mut cmd = MboxCmd::new(Opcode::GetSupportedLogs)
        .with_output(payload_cap)
        .with_min_output(size_of::<GetSupportedLogsHeader>());
    mbox.send(&mut cmd)?;

    let logs = SupportedLogs::try_from_bytes(&cmd.payload_out)?;
    let cel_size = logs.find(CEL_UUID).ok_or(EnumerateError::CelMissing)? as usize;

    // The CEL can exceed one payload; page through it until the declared
    // size is consumed. min_out makes every page full-length, so the loop
    // always progresses.
    let mut cel = Vec::with_capacity(cel_size);
    while cel.len() < cel_size {
        let chunk = (cel_size - cel.len()).min(payload_cap);
        let input = GetLogIn::new(CEL_UUID, cel.len() as u32, chunk as u32);
        let mut cmd = MboxCmd::new(Opcode::GetLog)
            .with_input(input.as_bytes())
            .with_fixed_output(chunk);
        mbox.send(&mut cmd)?;
        cel.extend_from_slice(&cmd.payload_out);
    }

    let mut enabled = CommandSet::EMPTY;
    for entry in cel_entries(&cel)? {
        let opcode = entry.opcode.get();
        match descriptor_for_opcode(opcode) {
            Some(desc) => {
                debug!("CEL advertises {} ({opcode:#06x})", desc.name);
                enabled.insert(desc.id);
            }
            None => debug!("CEL advertises unknown opcode {opcode:#06x}"),
        }
    }

    for desc in COMMANDS {
        if desc.flags.contains(CommandFlags::FORCE_ENABLE) {
            enabled.insert(desc.id);
        }
    }

    Ok(enabled)
}

#[cfg(test)]
mod tests {
    use cxl_proto::opcode::SECURITY_COMMANDS;

    use super::*;

    #[test]
    fn exclusive_overrides_enabled() {
        let mut perms = CommandPermissions::default();
        perms.enabled.insert(CommandId::SetPassphrase);
        perms.enabled.insert(CommandId::Identify);
        assert!(perms.is_permitted(CommandId::SetPassphrase));

        for id in SECURITY_COMMANDS {
            perms.exclusive.insert(*id);
        }
        assert!(!perms.is_permitted(CommandId::SetPassphrase));
        assert!(perms.is_permitted(CommandId::Identify));
    }

    #[test]
    fn unenabled_commands_are_not_permitted() {
        let perms = CommandPermissions::default();
        assert!(!perms.is_permitted(CommandId::Identify));
    }

    #[test]
    fn set_membership() {
        let mut set = CommandSet::EMPTY;
        assert!(set.is_empty());
        set.insert(CommandId::GetLog);
        set.insert(CommandId::PassphraseSecureErase);
        assert!(set.contains(CommandId::GetLog));
        assert!(!set.contains(CommandId::Identify));
        assert_eq!(set.len(), 2);
        set.remove(CommandId::GetLog);
        assert!(!set.contains(CommandId::GetLog));
    }
}
