//! Events for the field upload state machine.
//!
//! This modules is private and restricted to the
//! [`protocol`](crate::protocol) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use crate::error::ProtocolError;

use super::states::Payload;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// CommandSentEvent ============================================================

/// Fired from the `Idle` state once the value was validated and encoded, and
/// the opcode was written to the device.
#[derive(Debug)]
pub(crate) struct CommandSentEvent {
    pub payload: Payload,
}

// AckReceivedEvent ============================================================

/// Fired from the `CommandSent` state when the device answered the opcode
/// with a line. The line is not checked yet.
#[derive(Debug)]
pub(crate) struct AckReceivedEvent {
    pub payload: Payload,
    pub line: String,
}

// DataSentEvent ===============================================================

/// Fired from the `AckReceived` state after the acknowledgement was checked
/// and the encoded value written, newline terminated.
#[derive(Debug)]
pub(crate) struct DataSentEvent {
    pub payload: Payload,
}

// ResultReceivedEvent =========================================================

/// Fired from the `DataSent` state when the device answered the value with a
/// line. The line is not checked yet.
#[derive(Debug)]
pub(crate) struct ResultReceivedEvent {
    pub payload: Payload,
    pub line: String,
}

// DoneEvent ===================================================================

/// Fired from any state when the upload completes, successfully or not. No
/// further I/O happens after it.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub result: Result<(), ProtocolError>,
}

// Events enum ==================================================================

#[derive(Debug)]
pub(crate) enum Event {
    CommandSent(CommandSentEvent),
    AckReceived(AckReceivedEvent),
    DataSent(DataSentEvent),
    ResultReceived(ResultReceivedEvent),
    Done(DoneEvent),
}
impl Event {
    pub(crate) fn failed(error: ProtocolError) -> Self {
        Event::Done(DoneEvent { result: Err(error) })
    }
}
