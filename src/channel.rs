//! Line oriented view of the duplex byte channel to the device.
//!
//! The device protocol frames every response as one line. Everything above
//! this module talks to the device through the [`LineChannel`] capability, so
//! the real serial port can be swapped for an in-memory stream in tests.

use std::io::{self, BufRead, BufReader, Read, Write};

use console::style;
use log::trace;

use crate::error::ChannelError;

mod serial;

#[cfg(test)]
pub(crate) mod scripted;

pub use serial::open_port;

// =============================================================================
// Public Interface
// =============================================================================

/// Capability to exchange raw bytes and lines with the device.
pub trait LineChannel {
    /// Write `bytes` as they are.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ChannelError>;

    /// Write `bytes` followed by a newline.
    fn write_line(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.write_raw(bytes)?;
        self.write_raw(b"\n")
    }

    /// Block until a full line is received and return it without its line
    /// terminator. Fails with [`ChannelError::Timeout`] when the stream's
    /// configured timeout elapses first.
    fn read_line(&mut self) -> Result<String, ChannelError>;
}

/// [`LineChannel`] over any duplex byte stream, usually a serial port.
///
/// A single buffered reader is kept for the whole lifetime of the channel so
/// that bytes received past the end of a line are not lost between reads.
/// Every received line is echoed to the terminal.
pub struct SerialLine<P: Read + Write> {
    reader: BufReader<P>,
}
impl<P: Read + Write> SerialLine<P> {
    pub fn new(port: P) -> Self {
        SerialLine {
            reader: BufReader::new(port),
        }
    }
}
impl<P: Read + Write> LineChannel for SerialLine<P> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        trace!("-> {:?}", String::from_utf8_lossy(bytes));
        let port = self.reader.get_mut();
        port.write_all(bytes).map_err(ChannelError::Write)?;
        port.flush().map_err(ChannelError::Write)
    }

    fn read_line(&mut self) -> Result<String, ChannelError> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => Err(ChannelError::Closed),
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                println!("{} {}", style(">").dim(), line.trim_end());
                Ok(line)
            }
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                if !buf.is_empty() {
                    trace!("dropping partial line {:?}", String::from_utf8_lossy(&buf));
                }
                Err(ChannelError::Timeout)
            }
            Err(e) => Err(ChannelError::Read(e)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
