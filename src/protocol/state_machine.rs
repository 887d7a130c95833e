//! Field upload state machine.
//!
//! Uploading one field of the staged record (name, MAC, key or blob) is a
//! two round-trip exchange with the device: the opcode is acknowledged with
//! `set=<opcode>`, then the value is acknowledged with `<opcode>=[OK]`. Both
//! answers must be observed, in order, for the upload to succeed.
//!
//! ```text
//!       START
//!         |
//!         v
//!     .-------.  write   .-------------.  read   .-------------.
//!     | Idle  |--------->| CommandSent |-------->| AckReceived |
//!     '-------'  opcode  '-------------'  line   '-------------'
//!         |                    |                        |
//!         |                    |                  write |
//!         |                    |                  value |
//!         |                    |                        v
//!         |                    |     .----------------.   read   .----------.
//!         |                    |     | ResultReceived |<---------| DataSent |
//!         |                    |     '----------------'   line   '----------'
//!         |  invalid           |  read         |                      |
//!         |  request           |  failure      |                      |
//!         v                    v               v                      v
//!     ***********************************************************************
//!     *                               Done                                  *
//!     ***********************************************************************
//! ```
//!
//! Any state can fail directly into `Done`, which holds the outcome. There is
//! no retry: the caller decides what to do with a failed upload.

use log::trace;

use crate::{channel::LineChannel, error::ProtocolError};

use super::command::FieldValue;
use super::events::*;
use super::states::*;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Run one field upload to completion on `channel`.
pub(crate) fn upload(
    channel: &mut dyn LineChannel,
    opcode: char,
    value: FieldValue,
) -> Result<(), ProtocolError> {
    let mut sm = UploadStates::Idle(UploadSM::new(opcode, value));
    loop {
        sm = match sm.step(channel) {
            UploadStates::Done(done) => {
                trace!("=> Done ({})", done.opcode);
                return done.state.result;
            }
            next => next,
        };
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine, holding the opcode being uploaded as data shared by
/// all states.
#[derive(Debug)]
struct UploadSM<S> {
    opcode: char,
    state: S,
}
impl<S: Runnable> UploadSM<S> {
    fn run(&mut self, channel: &mut dyn LineChannel) -> Event {
        self.state.run(self.opcode, channel)
    }
}

/// The state machine starts in the `IdleState`.
impl UploadSM<IdleState> {
    fn new(opcode: char, value: FieldValue) -> Self {
        UploadSM {
            opcode,
            state: IdleState { value: Some(value) },
        }
    }
}

enum UploadStates {
    Idle(UploadSM<IdleState>),
    CommandSent(UploadSM<CommandSentState>),
    AckReceived(UploadSM<AckReceivedState>),
    DataSent(UploadSM<DataSentState>),
    ResultReceived(UploadSM<ResultReceivedState>),
    Done(UploadSM<DoneState>),
}
impl UploadStates {
    /// The unit of work of the upload: run the current state and transition
    /// according to the event it returns. Transitions are implemented with
    /// `From`, so only the ones listed here can happen.
    fn step(&mut self, channel: &mut dyn LineChannel) -> Self {
        match self {
            UploadStates::Idle(sm) => {
                let event = sm.run(channel);
                let opcode = sm.opcode;
                match event {
                    Event::CommandSent(ev) => UploadStates::CommandSent((opcode, ev).into()),
                    Event::Done(ev) => UploadStates::Done((opcode, ev).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            UploadStates::CommandSent(sm) => {
                let event = sm.run(channel);
                let opcode = sm.opcode;
                match event {
                    Event::AckReceived(ev) => UploadStates::AckReceived((opcode, ev).into()),
                    Event::Done(ev) => UploadStates::Done((opcode, ev).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            UploadStates::AckReceived(sm) => {
                let event = sm.run(channel);
                let opcode = sm.opcode;
                match event {
                    Event::DataSent(ev) => UploadStates::DataSent((opcode, ev).into()),
                    Event::Done(ev) => UploadStates::Done((opcode, ev).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            UploadStates::DataSent(sm) => {
                let event = sm.run(channel);
                let opcode = sm.opcode;
                match event {
                    Event::ResultReceived(ev) => UploadStates::ResultReceived((opcode, ev).into()),
                    Event::Done(ev) => UploadStates::Done((opcode, ev).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            UploadStates::ResultReceived(sm) => {
                let event = sm.run(channel);
                let opcode = sm.opcode;
                match event {
                    Event::Done(ev) => UploadStates::Done((opcode, ev).into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            UploadStates::Done(sm) => unreachable!("upload already done {:#?}", sm),
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<(char, CommandSentEvent)> for UploadSM<CommandSentState> {
    fn from((opcode, event): (char, CommandSentEvent)) -> UploadSM<CommandSentState> {
        UploadSM {
            opcode,
            state: CommandSentState {
                payload: event.payload,
            },
        }
    }
}

impl From<(char, AckReceivedEvent)> for UploadSM<AckReceivedState> {
    fn from((opcode, event): (char, AckReceivedEvent)) -> UploadSM<AckReceivedState> {
        UploadSM {
            opcode,
            state: AckReceivedState {
                payload: event.payload,
                line: event.line,
            },
        }
    }
}

impl From<(char, DataSentEvent)> for UploadSM<DataSentState> {
    fn from((opcode, event): (char, DataSentEvent)) -> UploadSM<DataSentState> {
        UploadSM {
            opcode,
            state: DataSentState {
                payload: event.payload,
            },
        }
    }
}

impl From<(char, ResultReceivedEvent)> for UploadSM<ResultReceivedState> {
    fn from((opcode, event): (char, ResultReceivedEvent)) -> UploadSM<ResultReceivedState> {
        UploadSM {
            opcode,
            state: ResultReceivedState {
                payload: event.payload,
                line: event.line,
            },
        }
    }
}

impl From<(char, DoneEvent)> for UploadSM<DoneState> {
    fn from((opcode, event): (char, DoneEvent)) -> UploadSM<DoneState> {
        UploadSM {
            opcode,
            state: DoneState {
                result: event.result,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{scripted::ScriptedDevice, SerialLine};
    use crate::error::ChannelError;

    fn mac() -> FieldValue {
        FieldValue::Bytes(vec![0x8c, 0x2b, 0x8a, 0x29, 0xd3, 0x14])
    }

    #[test]
    fn name_upload() {
        let device = ScriptedDevice::new();
        device
            .expect("N", "set=N\n")
            .expect("dev1\n", "N=[OK]\n");
        let mut channel = SerialLine::new(device.port());

        upload(&mut channel, 'N', FieldValue::Text("dev1".into())).unwrap();
        assert!(device.script_done());
        assert_eq!(device.written(), b"Ndev1\n");
    }

    #[test]
    fn mac_upload_is_base64() {
        let device = ScriptedDevice::new();
        device
            .expect("M", "secrets: set=M\n")
            .expect("jCuKKdMU\n", "M=[OK]\n");
        let mut channel = SerialLine::new(device.port());

        upload(&mut channel, 'M', mac()).unwrap();
        assert!(device.script_done());
    }

    #[test]
    fn missing_ack_fails_without_sending_value() {
        let device = ScriptedDevice::new();
        device.expect("M", "E (1234) unknown command\n");
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'M', mac()).unwrap_err();
        match err {
            ProtocolError::UnexpectedAck { opcode, line } => {
                assert_eq!(opcode, 'M');
                assert_eq!(line, "E (1234) unknown command");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(device.written(), b"M");
    }

    #[test]
    fn ack_for_another_command_is_rejected() {
        let device = ScriptedDevice::new();
        device.expect("K", "set=M\n");
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'K', FieldValue::Bytes(vec![0; 16])).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedAck { opcode: 'K', .. }));
    }

    #[test]
    fn rejected_value() {
        let device = ScriptedDevice::new();
        device
            .expect("N", "set=N\n")
            .expect("dev1\n", "N=[FAIL]\n");
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'N', FieldValue::Text("dev1".into())).unwrap_err();
        match err {
            ProtocolError::CommandFailed {
                opcode,
                value,
                sent,
                line,
            } => {
                assert_eq!(opcode, 'N');
                assert_eq!(value, "dev1");
                assert_eq!(sent, "dev1");
                assert_eq!(line, "N=[FAIL]");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn no_result_line() {
        let device = ScriptedDevice::new();
        device.expect("B", "set=B\n");
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'B', FieldValue::Bytes(vec![0; 256])).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Channel(ChannelError::Timeout)
        ));
    }

    #[test]
    fn invalid_opcode_does_no_io() {
        let device = ScriptedDevice::new();
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'W', FieldValue::Text("x".into())).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand('W')));
        let err = upload(&mut channel, 'Z', FieldValue::Text("x".into())).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand('Z')));
        assert!(device.written().is_empty());
    }

    #[test]
    fn name_too_long_does_no_io() {
        let device = ScriptedDevice::new();
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'N', FieldValue::Text("a-very-long-name".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ValueTooLong {
                opcode: 'N',
                actual: 16,
                max: 15
            }
        ));
        assert!(device.written().is_empty());
    }

    #[test]
    fn wrong_length_does_no_io() {
        let device = ScriptedDevice::new();
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'K', FieldValue::Bytes(vec![0; 15])).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::WrongLength {
                opcode: 'K',
                actual: 15,
                expected: 16
            }
        ));
        assert!(device.written().is_empty());
    }

    #[test]
    fn value_type_must_match_command() {
        let device = ScriptedDevice::new();
        let mut channel = SerialLine::new(device.port());

        let err = upload(&mut channel, 'M', FieldValue::Text("8c2b8a29d314".into())).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidArgument { opcode: 'M' }));
        let err = upload(&mut channel, 'N', FieldValue::Bytes(b"dev1".to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidArgument { opcode: 'N' }));
        assert!(device.written().is_empty());
    }

    #[test]
    fn done_upload_keeps_its_failure() {
        let device = ScriptedDevice::new();
        let mut channel = SerialLine::new(device.port());

        let sm = UploadStates::Idle(UploadSM::new('Q', FieldValue::Text("dev1".into())))
            .step(&mut channel);
        match sm {
            UploadStates::Done(done) => assert!(matches!(
                done.state.result,
                Err(ProtocolError::InvalidCommand('Q'))
            )),
            _ => panic!("an invalid opcode must end the upload"),
        }
    }

    #[test]
    #[should_panic(expected = "upload already done")]
    fn done_upload_cannot_step() {
        let device = ScriptedDevice::new();
        let mut channel = SerialLine::new(device.port());

        let mut sm = UploadStates::Done(UploadSM {
            opcode: 'N',
            state: DoneState { result: Ok(()) },
        });
        sm.step(&mut channel);
    }
}
