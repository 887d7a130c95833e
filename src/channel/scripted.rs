//! In-memory stand-in for the device end of the serial link.
//!
//! A [`ScriptedDevice`] holds a script of expected host writes and the lines
//! the device answers with. The host side gets a [`ScriptedPort`] through
//! [`ScriptedDevice::port`], usable anywhere a `Read + Write` stream is, while
//! the test keeps the device to inspect what was written and whether the port
//! was closed. Reading with nothing to read behaves like a serial port whose
//! read timeout elapsed, or like an end of stream once the device hung up.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, Read, Write},
    rc::Rc,
};

#[derive(Default)]
struct Inner {
    script: VecDeque<(Vec<u8>, Vec<u8>)>,
    pending: Vec<u8>,
    desynced: bool,
    to_read: VecDeque<u8>,
    written: Vec<u8>,
    fail_writes: bool,
    hung_up: bool,
    closed: usize,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedDevice {
    inner: Rc<RefCell<Inner>>,
}
impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The host end of the link. Dropping it counts as closing the port.
    pub fn port(&self) -> ScriptedPort {
        ScriptedPort {
            inner: self.inner.clone(),
        }
    }

    /// Make `reply` available for reading right away.
    pub fn respond(&self, reply: &str) {
        self.inner
            .borrow_mut()
            .to_read
            .extend(reply.as_bytes().iter().copied());
    }

    /// Answer with `reply` once the host has written exactly `input` since
    /// the previous expectation was met. Expectations are met in order; a
    /// write that does not match stops all further answers.
    pub fn expect(&self, input: &str, reply: &str) -> &Self {
        self.inner
            .borrow_mut()
            .script
            .push_back((input.as_bytes().to_vec(), reply.as_bytes().to_vec()));
        self
    }

    /// Reach end of stream once everything already answered has been read.
    pub fn hang_up(&self) {
        self.inner.borrow_mut().hung_up = true;
    }

    pub fn fail_writes(&self) {
        self.inner.borrow_mut().fail_writes = true;
    }

    /// Everything the host wrote so far.
    pub fn written(&self) -> Vec<u8> {
        self.inner.borrow().written.clone()
    }

    /// Whether every scripted expectation was met, in order.
    pub fn script_done(&self) -> bool {
        let inner = self.inner.borrow();
        inner.script.is_empty() && !inner.desynced
    }

    /// How many times the host end was closed.
    pub fn closed(&self) -> usize {
        self.inner.borrow().closed
    }
}

pub(crate) struct ScriptedPort {
    inner: Rc<RefCell<Inner>>,
}
impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        if inner.to_read.is_empty() {
            if inner.hung_up {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"));
        }
        let n = buf.len().min(inner.to_read.len());
        for (slot, byte) in buf.iter_mut().zip(inner.to_read.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}
impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        inner.written.extend_from_slice(buf);
        if inner.desynced {
            return Ok(buf.len());
        }

        inner.pending.extend_from_slice(buf);
        let expected = inner.script.front().map(|(input, _)| input.clone());
        match expected {
            Some(input) if input == inner.pending => {
                if let Some((_, reply)) = inner.script.pop_front() {
                    inner.to_read.extend(reply);
                }
                inner.pending.clear();
            }
            Some(input) if input.starts_with(&inner.pending) => {}
            _ => inner.desynced = true,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl Drop for ScriptedPort {
    fn drop(&mut self) {
        self.inner.borrow_mut().closed += 1;
    }
}

#[test]
fn replies_follow_expected_writes() {
    let device = ScriptedDevice::new();
    device.expect("N", "set=N\n").expect("dev1\n", "N=[OK]\n");
    let mut port = device.port();

    let mut buf = [0u8; 16];
    assert!(port.read(&mut buf).is_err());

    port.write_all(b"N").unwrap();
    let n = port.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"set=N\n");

    port.write_all(b"dev1").unwrap();
    assert!(port.read(&mut buf).is_err());
    port.write_all(b"\n").unwrap();
    let n = port.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"N=[OK]\n");

    assert!(device.script_done());
    drop(port);
    assert_eq!(device.closed(), 1);
}

#[test]
fn unexpected_write_silences_the_device() {
    let device = ScriptedDevice::new();
    device.expect("M", "set=M\n");
    let mut port = device.port();
    port.write_all(b"K").unwrap();
    let mut buf = [0u8; 16];
    assert!(port.read(&mut buf).is_err());
    assert!(!device.script_done());
}
