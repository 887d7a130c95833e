//! The device's secrets mode, as a typed session.
//!
//! Slot, field, commit and read-back commands are only meaningful while the
//! device is in secrets mode. They are methods of [`SecretsMode`], which can
//! only be obtained by entering the mode and is consumed when leaving it, so
//! they cannot be issued outside of it.
//!
//! Every command writes its opcode, reads the device's answer and checks it
//! for the expected content. A mismatch is returned as an error; the session
//! itself stays usable and it is up to the caller to go on.

use log::{debug, info};

use crate::{channel::LineChannel, error::ProtocolError};

use super::{
    command::{Command, FieldValue},
    state_machine,
};

/// Last line of the banner printed by the device when entering secrets mode.
pub const MODE_ENTERED_SENTINEL: &str = "!";
/// Line printed by the device when leaving secrets mode.
pub const MODE_EXITED_SENTINEL: &str = "X";

// =============================================================================
// Public Interface
// =============================================================================

/// A device in secrets mode, reachable through the owned channel `C`.
pub struct SecretsMode<C: LineChannel> {
    channel: C,
}
impl<C: LineChannel> SecretsMode<C> {
    /// Put the device into secrets mode and wait for the end of its banner.
    ///
    /// The session is returned even when the banner end was not seen, together
    /// with the banner lines or the failure.
    pub fn enter(channel: C) -> (Self, Result<Vec<String>, ProtocolError>) {
        info!("=> Enter secrets mode");
        let mut mode = SecretsMode { channel };
        let banner = mode.read_until(Command::EnterMode, MODE_ENTERED_SENTINEL);
        (mode, banner)
    }

    /// List the slots currently provisioned on the device. The device ends the
    /// list with an empty line, which is not part of the result.
    pub fn list(&mut self) -> Result<Vec<String>, ProtocolError> {
        self.read_until(Command::List, "")
    }

    /// Select `slot` as the target of the following commands. This also starts
    /// a new staged record on the device.
    pub fn select_slot(&mut self, slot: usize) -> Result<(), ProtocolError> {
        debug!("selecting slot {}", slot);
        self.channel.write_raw(slot.to_string().as_bytes())?;
        let line = self.channel.read_line()?;
        if line.contains(&format!("slot={}", slot)) {
            Ok(())
        } else {
            Err(ProtocolError::SlotSelectMismatch { slot, line })
        }
    }

    /// Upload one field of the staged record. `opcode` must be one of the
    /// field commands `N`, `M`, `K` or `B`.
    pub fn set_field(&mut self, opcode: char, value: FieldValue) -> Result<(), ProtocolError> {
        debug!("uploading field {} ({:?})", opcode, value);
        state_machine::upload(&mut self.channel, opcode, value)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ProtocolError> {
        self.set_field(
            Command::SetName.opcode(),
            FieldValue::Text(name.to_owned()),
        )
    }

    pub fn set_mac(&mut self, mac: &[u8]) -> Result<(), ProtocolError> {
        self.set_field(Command::SetMac.opcode(), FieldValue::Bytes(mac.to_vec()))
    }

    pub fn set_key(&mut self, key: &[u8]) -> Result<(), ProtocolError> {
        self.set_field(Command::SetKey.opcode(), FieldValue::Bytes(key.to_vec()))
    }

    pub fn set_blob(&mut self, blob: &[u8]) -> Result<(), ProtocolError> {
        self.set_field(Command::SetBlob.opcode(), FieldValue::Bytes(blob.to_vec()))
    }

    /// Check that the CRC the device computes over the staged record is
    /// `expected`.
    pub fn check_staging_crc(&mut self, expected: u32) -> Result<(), ProtocolError> {
        let line = self.command(Command::StagingCrc)?;
        if line.contains(&format!("slot=tmp crc={:08x}", expected)) {
            Ok(())
        } else {
            Err(ProtocolError::CrcMismatch { expected, line })
        }
    }

    /// Write the staged record to the non-volatile storage of the selected
    /// slot. The device confirms with an `[OK]` line followed by a `write=1`
    /// line.
    pub fn commit(&mut self, slot: usize) -> Result<(), ProtocolError> {
        let line = self.command(Command::Commit)?;
        if !line.contains("[OK]") {
            return Err(ProtocolError::CommitFailed {
                slot,
                expected: "[OK]",
                line,
            });
        }
        let line = self.channel.read_line()?;
        if !line.contains("write=1") {
            return Err(ProtocolError::CommitFailed {
                slot,
                expected: "write=1",
                line,
            });
        }
        Ok(())
    }

    /// Check that the CRC of what the device has stored for `slot` is
    /// `expected`.
    pub fn check_storage_crc(&mut self, slot: usize, expected: u32) -> Result<(), ProtocolError> {
        let line = self.command(Command::StorageCrc)?;
        if line.contains(&format!("slot={} crc={:08x}", slot, expected)) {
            Ok(())
        } else {
            Err(ProtocolError::ReadbackMismatch {
                slot,
                expected,
                line,
            })
        }
    }

    /// Leave secrets mode and give the channel back.
    pub fn exit(mut self) -> (C, Result<(), ProtocolError>) {
        info!("=> Exit secrets mode");
        let result = self
            .read_until(Command::Quit, MODE_EXITED_SENTINEL)
            .map(|_| ());
        (self.channel, result)
    }

    // -------------------------------------------------------------------------
    // Private stuff
    // -------------------------------------------------------------------------

    /// Send `command` and read the single line answering it.
    fn command(&mut self, command: Command) -> Result<String, ProtocolError> {
        self.channel.write_raw(&command.as_bytes())?;
        Ok(self.channel.read_line()?)
    }

    /// Send `command` and collect the lines answering it, up to the line equal
    /// to `sentinel`.
    fn read_until(
        &mut self,
        command: Command,
        sentinel: &'static str,
    ) -> Result<Vec<String>, ProtocolError> {
        self.channel.write_raw(&command.as_bytes())?;
        let mut lines = Vec::new();
        loop {
            match self.channel.read_line() {
                Ok(line) if line == sentinel => return Ok(lines),
                Ok(line) => lines.push(line),
                Err(source) => {
                    return Err(ProtocolError::SentinelNotSeen {
                        opcode: command.opcode(),
                        sentinel,
                        source,
                    })
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
