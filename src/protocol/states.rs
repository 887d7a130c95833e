//! States for the field upload state machine.
//!
//! This modules is private and restricted to the
//! [`protocol`](crate::protocol) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::{fmt, mem};

use base64::{engine::general_purpose::STANDARD, Engine};
use hexplay::HexViewBuilder;
use log::{log_enabled, trace, warn, Level::Debug};

use crate::{channel::LineChannel, error::ProtocolError};

use super::{
    command::{Command, FieldValue},
    events::*,
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// Do the state's share of the exchange with the device for the field
    /// identified by `opcode`, then request the next transition by returning
    /// the appropriate `event`.
    fn run(&mut self, opcode: char, channel: &mut dyn LineChannel) -> Event;
}

/// The encoded value of a field upload: what is written on the wire (without
/// the terminating newline) and a printable form of the attempted value for
/// diagnostics.
#[derive(Default, Clone)]
pub(crate) struct Payload {
    pub shown: String,
    pub wire: Vec<u8>,
}
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.wire.len())
    }
}

// Idle State ==================================================================

/// The initial state, before anything is sent.
///
/// The opcode and the value are validated here so that a bad request never
/// reaches the device:
///
///  * **[`CommandSentEvent`] => [`CommandSentState`]** once the opcode was
///    written,
///  * **[`DoneEvent`] => [`DoneState`]** on an invalid opcode, a value of the
///    wrong type or length, or a write failure.
#[derive(Debug)]
pub(crate) struct IdleState {
    pub value: Option<FieldValue>,
}
impl Runnable for IdleState {
    fn run(&mut self, opcode: char, channel: &mut dyn LineChannel) -> Event {
        trace!("=> Idle ({})", opcode);
        let command = match Command::from_opcode(opcode) {
            Some(command) if command.is_field() => command,
            _ => {
                warn!("invalid command: {:?}", opcode);
                return Event::failed(ProtocolError::InvalidCommand(opcode));
            }
        };

        let payload = match self.value.take() {
            Some(value) => match encode(command, value) {
                Ok(payload) => payload,
                Err(e) => return Event::failed(e),
            },
            None => return Event::failed(ProtocolError::InvalidArgument { opcode }),
        };

        match channel.write_raw(&command.as_bytes()) {
            Ok(()) => Event::CommandSent(CommandSentEvent { payload }),
            Err(e) => Event::failed(e.into()),
        }
    }
}

// CommandSent State ===========================================================

/// The opcode was written, the device is expected to acknowledge it with a
/// `set=<opcode>` line.
#[derive(Debug)]
pub(crate) struct CommandSentState {
    pub payload: Payload,
}
impl Runnable for CommandSentState {
    fn run(&mut self, opcode: char, channel: &mut dyn LineChannel) -> Event {
        trace!("=> Command Sent ({})", opcode);
        match channel.read_line() {
            Ok(line) => Event::AckReceived(AckReceivedEvent {
                payload: mem::take(&mut self.payload),
                line,
            }),
            Err(e) => Event::failed(e.into()),
        }
    }
}

// AckReceived State ===========================================================

/// The device answered the opcode. When the answer is the expected
/// acknowledgement, the value is written.
#[derive(Debug)]
pub(crate) struct AckReceivedState {
    pub payload: Payload,
    pub line: String,
}
impl Runnable for AckReceivedState {
    fn run(&mut self, opcode: char, channel: &mut dyn LineChannel) -> Event {
        trace!("=> Ack Received ({})", opcode);
        if !self.line.contains(&format!("set={}", opcode)) {
            return Event::failed(ProtocolError::UnexpectedAck {
                opcode,
                line: mem::take(&mut self.line),
            });
        }

        match channel.write_line(&self.payload.wire) {
            Ok(()) => Event::DataSent(DataSentEvent {
                payload: mem::take(&mut self.payload),
            }),
            Err(e) => Event::failed(e.into()),
        }
    }
}

// DataSent State ==============================================================

/// The value was written, the device is expected to report the result with a
/// `<opcode>=[OK]` line.
#[derive(Debug)]
pub(crate) struct DataSentState {
    pub payload: Payload,
}
impl Runnable for DataSentState {
    fn run(&mut self, opcode: char, channel: &mut dyn LineChannel) -> Event {
        trace!("=> Data Sent ({})", opcode);
        match channel.read_line() {
            Ok(line) => Event::ResultReceived(ResultReceivedEvent {
                payload: mem::take(&mut self.payload),
                line,
            }),
            Err(e) => Event::failed(e.into()),
        }
    }
}

// ResultReceived State ========================================================

/// The device answered the value, which decides the outcome of the upload.
#[derive(Debug)]
pub(crate) struct ResultReceivedState {
    pub payload: Payload,
    pub line: String,
}
impl Runnable for ResultReceivedState {
    fn run(&mut self, opcode: char, _channel: &mut dyn LineChannel) -> Event {
        trace!("=> Result Received ({})", opcode);
        if self.line.contains(&format!("{}=[OK]", opcode)) {
            return Event::Done(DoneEvent { result: Ok(()) });
        }

        // Dump what was actually sent in a hex table for debugging
        if log_enabled!(Debug) {
            let view = HexViewBuilder::new(&self.payload.wire)
                .address_offset(0)
                .row_width(16)
                .finish();
            println!("{}", view);
        }

        let payload = mem::take(&mut self.payload);
        Event::failed(ProtocolError::CommandFailed {
            opcode,
            value: payload.shown,
            sent: String::from_utf8_lossy(&payload.wire).into_owned(),
            line: mem::take(&mut self.line),
        })
    }
}

// Done State ==================================================================

/// Terminal state of the upload, holding its outcome. It has nothing left to
/// run: the outcome is moved out of it by [`upload`](super::state_machine).
#[derive(Debug)]
pub(crate) struct DoneState {
    pub result: Result<(), ProtocolError>,
}

// =============================================================================
// Private stuff
// =============================================================================

/// Validate `value` against what `command` accepts and encode it for the wire.
fn encode(command: Command, value: FieldValue) -> Result<Payload, ProtocolError> {
    let opcode = command.opcode();
    match (value, command.max_text_len(), command.payload_len()) {
        (FieldValue::Text(text), Some(max), _) => {
            if text.len() > max {
                return Err(ProtocolError::ValueTooLong {
                    opcode,
                    actual: text.len(),
                    max,
                });
            }
            Ok(Payload {
                wire: text.as_bytes().to_vec(),
                shown: text,
            })
        }
        (FieldValue::Bytes(bytes), _, Some(expected)) => {
            if bytes.len() != expected {
                return Err(ProtocolError::WrongLength {
                    opcode,
                    actual: bytes.len(),
                    expected,
                });
            }
            Ok(Payload {
                shown: hex::encode(&bytes),
                wire: STANDARD.encode(&bytes).into_bytes(),
            })
        }
        _ => Err(ProtocolError::InvalidArgument { opcode }),
    }
}
