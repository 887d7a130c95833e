//! The closed set of single character commands understood by the device.

use crate::secrets::{BLOB_LEN, KEY_LEN, MAC_LEN, NAME_MAX_LEN};

// =============================================================================
// Public Interface
// =============================================================================

/// A device command and its opcode on the wire. Slot selection is not part of
/// this set, it is sent as the decimal slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    EnterMode,
    List,
    SetName,
    SetMac,
    SetKey,
    SetBlob,
    StagingCrc,
    Commit,
    StorageCrc,
    Quit,
}
impl Command {
    pub const ALL: [Command; 10] = [
        Command::EnterMode,
        Command::List,
        Command::SetName,
        Command::SetMac,
        Command::SetKey,
        Command::SetBlob,
        Command::StagingCrc,
        Command::Commit,
        Command::StorageCrc,
        Command::Quit,
    ];

    pub fn opcode(self) -> char {
        match self {
            Command::EnterMode => 'X',
            Command::List => 'l',
            Command::SetName => 'N',
            Command::SetMac => 'M',
            Command::SetKey => 'K',
            Command::SetBlob => 'B',
            Command::StagingCrc => 's',
            Command::Commit => 'W',
            Command::StorageCrc => 'S',
            Command::Quit => 'q',
        }
    }

    pub fn from_opcode(opcode: char) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.opcode() == opcode)
    }

    /// Whether this command uploads one field of the staged record.
    pub fn is_field(self) -> bool {
        matches!(
            self,
            Command::SetName | Command::SetMac | Command::SetKey | Command::SetBlob
        )
    }

    /// The exact number of raw bytes a binary field command carries.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            Command::SetMac => Some(MAC_LEN),
            Command::SetKey => Some(KEY_LEN),
            Command::SetBlob => Some(BLOB_LEN),
            _ => None,
        }
    }

    /// The maximum number of bytes a text field command carries.
    pub fn max_text_len(self) -> Option<usize> {
        match self {
            Command::SetName => Some(NAME_MAX_LEN),
            _ => None,
        }
    }

    /// The opcode as it is written on the wire.
    pub(crate) fn as_bytes(self) -> [u8; 1] {
        [self.opcode() as u8]
    }
}

/// The value of a field upload, as given by the caller.
#[derive(Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Sent as is, for the name.
    Text(String),
    /// Sent base64 encoded, for the MAC, key and blob.
    Bytes(Vec<u8>),
}
impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            FieldValue::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn opcodes_are_unique() {
    for command in Command::ALL.iter() {
        assert_eq!(Command::from_opcode(command.opcode()), Some(*command));
    }
}

#[test]
fn unknown_opcodes() {
    assert_eq!(Command::from_opcode('x'), None);
    assert_eq!(Command::from_opcode('0'), None);
    assert_eq!(Command::from_opcode('n'), None);
}

#[test]
fn field_commands() {
    let fields: String = Command::ALL
        .iter()
        .filter(|c| c.is_field())
        .map(|c| c.opcode())
        .collect();
    assert_eq!(fields, "NMKB");
}

#[test]
fn payload_lengths() {
    assert_eq!(Command::SetMac.payload_len(), Some(6));
    assert_eq!(Command::SetKey.payload_len(), Some(16));
    assert_eq!(Command::SetBlob.payload_len(), Some(256));
    assert_eq!(Command::SetName.payload_len(), None);
    assert_eq!(Command::SetName.max_text_len(), Some(15));
}
