//! `secretcom` serial provisioning protocol.
//!
//! The device firmware implements a small line based command/response
//! protocol. Each command is a single character written on the wire, answered
//! by the device with one or more lines:
//!
//! | Host writes                     | Device answers                 |
//! |---------------------------------|--------------------------------|
//! | `X`                             | banner, ending with `!`        |
//! | `l`                             | one line per slot, then empty  |
//! | `<slot index>`                  | `slot=<i>`                     |
//! | `N`, `M`, `K`, `B`              | `set=<opcode>`                 |
//! | value, newline terminated       | `<opcode>=[OK]`                |
//! | `s`                             | `slot=tmp crc=<hex8>`          |
//! | `W`                             | `[OK]`, then `write=1`         |
//! | `S`                             | `slot=<i> crc=<hex8>`          |
//! | `q`                             | ..., ending with `X`           |
//!
//! The name is sent as text, the MAC, key and blob are sent base64 encoded.
//!
//! **Example** - Provisioning one record by hand:
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use secretcom::{SecretsMode, SerialLine, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
//! let port = secretcom::open_port(&settings)?;
//! let (mut mode, _banner) = SecretsMode::enter(SerialLine::new(port));
//! mode.select_slot(0)?;
//! mode.set_name("dev1")?;
//! mode.set_mac(&[0x8c, 0x2b, 0x8a, 0x29, 0xd3, 0x14])?;
//! mode.set_key(&[0; 16])?;
//! mode.set_blob(&[0; 256])?;
//! mode.check_staging_crc(0x211e_6032)?;
//! mode.commit(0)?;
//! let (_port, _) = mode.exit();
//! # Ok(())
//! # }
//! ```

mod command;
mod events;
mod session;
mod state_machine;
mod states;

pub use command::{Command, FieldValue};
pub use session::{SecretsMode, MODE_ENTERED_SENTINEL, MODE_EXITED_SENTINEL};
