//! Error types for the provisioning engine.
//!
//! Errors are split by the layer they originate from. Only [`Error`] is fatal
//! and meant to terminate the program; all the others are caught at the
//! record boundary by the [`provisioner`](crate::provisioner), logged, and
//! cause the record to be skipped.

use std::io;

use thiserror::Error;

/// Result alias for the fatal error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Public Interface
// =============================================================================

/// A textual secret field could not be turned into its binary form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("couldn't decode {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("decoded {field} is wrong length: got {actual}, want {expected}")]
    WrongLength {
        field: &'static str,
        actual: usize,
        expected: usize,
    },
}

/// Failures of the line oriented duplex channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("serial write error: {0}")]
    Write(#[source] io::Error),

    #[error("serial read error: {0}")]
    Read(#[source] io::Error),

    #[error("timed out waiting for a line from the device")]
    Timeout,

    #[error("the device closed the connection")]
    Closed,
}

/// Protocol level failures, detected while talking to the device.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid command: {0:?}")]
    InvalidCommand(char),

    #[error("invalid value type for command {opcode}")]
    InvalidArgument { opcode: char },

    #[error("expected set={opcode}, got: {line:?}")]
    UnexpectedAck { opcode: char, line: String },

    #[error("value too long for command {opcode}: {actual} bytes, at most {max}")]
    ValueTooLong {
        opcode: char,
        actual: usize,
        max: usize,
    },

    #[error("invalid len for {opcode}: {actual}, want {expected}")]
    WrongLength {
        opcode: char,
        actual: usize,
        expected: usize,
    },

    #[error("command failed: {opcode}, value: {value}, sent({}): {sent}", .sent.len())]
    CommandFailed {
        opcode: char,
        value: String,
        sent: String,
        line: String,
    },

    #[error("failed selecting slot {slot}: {line:?}")]
    SlotSelectMismatch { slot: usize, line: String },

    #[error("wrong CRC in tmp buf! wanted: {expected:08x}, got: {line:?}")]
    CrcMismatch { expected: u32, line: String },

    #[error("writing failed for slot {slot}, expected {expected:?} in {line:?}")]
    CommitFailed {
        slot: usize,
        expected: &'static str,
        line: String,
    },

    #[error("wrong CRC in NVS for slot {slot}! wanted: {expected:08x}, got: {line:?}")]
    ReadbackMismatch {
        slot: usize,
        expected: u32,
        line: String,
    },

    #[error("no {sentinel:?} line seen after command {opcode}: {source}")]
    SentinelNotSeen {
        opcode: char,
        sentinel: &'static str,
        #[source]
        source: ChannelError,
    },

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// The reason a single record was skipped.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Fatal errors, terminating the program before or outside of a session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to open serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("invalid setting: {0}")]
    InvalidSetting(&'static str),
}
