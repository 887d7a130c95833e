//! Secretcom is a utility to provision per-device secrets (name, MAC address,
//! key and blob) into the non-volatile storage of a board over its serial
//! port connection.
//!
//! The board firmware exposes a *secrets mode* with a small line based
//! command/response protocol. `secretcom` reads the device secrets from a YAML
//! file and, for each of them, selects a storage slot, uploads the fields into
//! the device's staging buffer, checks the staged record's CRC32, commits it
//! and finally reads the committed CRC back.
//!
//! The crate is layered, bottom to top:
//!
//! * [`secrets`] decodes the hex or base64 fields of the input file into fixed
//!   length buffers.
//! * [`channel`] turns a duplex byte stream, usually the serial port, into a
//!   line oriented [`LineChannel`](channel::LineChannel).
//! * [`protocol`] implements the device commands. Field uploads run as an
//!   explicit state machine and every command needing secrets mode is a method
//!   of the [`SecretsMode`](protocol::SecretsMode) session.
//! * [`provisioner`] drives a whole session and reports what happened to each
//!   record.
//!
//! Nothing is retried. A failure while provisioning a record only skips that
//! record, and the session goes on with the next one.

pub mod channel;
pub mod error;
pub mod protocol;
pub mod provisioner;
pub mod secrets;
mod settings;

pub use channel::{open_port, LineChannel, SerialLine};
pub use error::{ChannelError, DecodeError, Error, ProtocolError, RecordError};
pub use protocol::{Command, FieldValue, SecretsMode};
pub use provisioner::{Provisioner, ProvisioningReport, RecordOutcome};
pub use secrets::{load_secrets, DeviceSecret, SecretRecord};
pub use settings::{Settings, SettingsBuilder, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
