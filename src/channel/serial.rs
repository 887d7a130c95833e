//! Serial port opening and configuration.

use log::{debug, info};
use serialport::SerialPort;

use crate::{error::Error, Settings};

//==============================================================================
// Public Interface
//==============================================================================

/// Open the port named in `settings` and configure it for the session.
///
/// A single attempt is made; failing to open the port is fatal for the
/// provisioning session.
pub fn open_port(settings: &Settings) -> Result<Box<dyn SerialPort>, Error> {
    let path = settings
        .path
        .as_deref()
        .ok_or(Error::InvalidSetting("serial port path"))?;

    debug!("Opening {}", path);
    let port = serialport::new(path, settings.baud_rate)
        .data_bits(settings.data_bits)
        .stop_bits(settings.stop_bits)
        .parity(settings.parity)
        .flow_control(settings.flow_control)
        .timeout(settings.timeout)
        .open()?;

    info!(
        "Connected to {} at {} baud",
        port.name().unwrap_or_else(|| path.to_owned()),
        settings.baud_rate
    );
    debug!("data_bits    : {:#?}", port.data_bits());
    debug!("stop_bits    : {:#?}", port.stop_bits());
    debug!("parity       : {:#?}", port.parity());
    debug!("flow control : {:#?}", port.flow_control());
    debug!("timeout      : {:?}", port.timeout());

    Ok(port)
}
