//! Serial port transport.

use std::{
    fmt,
    io::{self, Read, Write},
    thread,
    time::{Duration, Instant},
};

use console::{style, Term};
use log::{debug, info, trace};
use serialport::{available_ports, SerialPort, SerialPortType};

use super::Link;
use crate::{error::LinkError, Settings};

/// How long a single read on the port may block before we look at the receive
/// timeout again.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

//==============================================================================
// Public Interface
//==============================================================================

/// A [`Link`] over an open serial port.
pub struct PortLink {
    port: Box<dyn SerialPort>,
    timeout: Option<Duration>,
}

impl PortLink {
    pub fn new(port: Box<dyn SerialPort>, timeout: Option<Duration>) -> Self {
        PortLink { port, timeout }
    }

    /// Open the port described by `settings` and wrap it in a link.
    pub fn open(settings: &Settings) -> Result<Self, serialport::Error> {
        let port = open_and_setup_port(settings)?;
        Ok(PortLink::new(port, settings.receive_timeout))
    }
}

impl Link for PortLink {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        trace!("tx {:#04x}", byte);
        self.port.write_all(&[byte]).map_err(map_io)?;
        self.port.flush().map_err(map_io)
    }

    fn recv(&mut self) -> Result<u8, LinkError> {
        let started = Instant::now();
        loop {
            if let Some(byte) = read_byte(&mut self.port)? {
                trace!("rx {:#04x}", byte);
                return Ok(byte);
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(LinkError::TimedOut);
                }
            }
        }
    }
}

impl fmt::Debug for PortLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = &self.port;
        debug_fmt_serialport!(port, self.timeout, f).finish()
    }
}

/// Present the serial ports found on the system and let the user pick one.
///
/// Keeps waiting while no port is connected. Returns `None` when the user
/// cancels the selection, so the caller can refresh and ask again.
pub fn select_port() -> Option<String> {
    let mut waited: u64 = 0;
    let found_ports = loop {
        let ports = enumerate_serial_ports();
        if !ports.is_empty() {
            break ports;
        }
        if waited % 5 == 0 {
            println!(
                "[DC] [{:03}s] ⌛ Waiting for a serial controller to be connected...",
                style(waited).dim()
            );
        }
        thread::sleep(Duration::from_secs(1));
        waited += 1;
    };

    let selection = select_port_interactive(&found_ports);
    match &selection {
        Some(path) => println!("[DC] 👍 Serial port {} is ready", style(path).green()),
        None => println!("[DC] ❌ Selection canceled"),
    }
    selection
}

pub fn open_and_setup_port(settings: &Settings) -> Result<Box<dyn SerialPort>, serialport::Error> {
    use retry::{delay, retry_with_index};

    let path = settings.path.clone().ok_or_else(|| {
        serialport::Error::new(
            serialport::ErrorKind::InvalidInput,
            "no serial port path was given",
        )
    })?;

    let result = retry_with_index(
        delay::Fixed::from_millis(1000).take(4),
        |index| -> Result<Box<dyn SerialPort>, serialport::Error> {
            debug!("Trying to connect {} ({})", path, index);
            serialport::new(&path, settings.baud_rate)
                .data_bits(settings.data_bits)
                .stop_bits(settings.stop_bits)
                .parity(settings.parity)
                .flow_control(settings.flow_control)
                .timeout(POLL_INTERVAL)
                .open()
        },
    );
    match result {
        Ok(mut port) => {
            // Apply the settings again after `open`, some drivers ignore the
            // builder values.
            port.set_baud_rate(settings.baud_rate)?;
            port.set_data_bits(settings.data_bits)?;
            port.set_stop_bits(settings.stop_bits)?;
            port.set_parity(settings.parity)?;
            port.set_flow_control(settings.flow_control)?;

            info!("Connected to {} at {} baud", path, port.baud_rate()?);
            debug!("data_bits    : {:#?}", port.data_bits()?);
            debug!("stop_bits    : {:#?}", port.stop_bits()?);
            debug!("parity       : {:#?}", port.parity()?);
            debug!("flow control : {:#?}", port.flow_control()?);

            if port.baud_rate()? != settings.baud_rate {
                return Err(serialport::Error::new(
                    serialport::ErrorKind::InvalidInput,
                    format!("baud rate {} is not supported", settings.baud_rate),
                ));
            }

            Ok(port)
        }
        Err(err) => match err {
            retry::Error::Operation {
                error,
                total_delay,
                tries,
            } => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                Err(error)
            }
            retry::Error::Internal(_) => {
                info!("Internal retry error while opening port");
                Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "internal error while retrying to open the port",
                ))
            }
        },
    }
}

//==============================================================================
// Private stuff
//==============================================================================

/// One read attempt. `None` when the port's own read timeout expired with
/// nothing received. A read of zero bytes is end of file: the device is gone.
fn read_byte<R: Read + ?Sized>(port: &mut R) -> Result<Option<u8>, LinkError> {
    let mut buf = [0_u8; 1];
    match port.read(&mut buf) {
        Ok(0) => Err(LinkError::Closed),
        Ok(_) => Ok(Some(buf[0])),
        Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
        Err(e) => Err(map_io(e)),
    }
}

fn map_io(e: io::Error) -> LinkError {
    match e.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof => {
            LinkError::Closed
        }
        _ => LinkError::Io(e),
    }
}

/// Enumerates serial devices on the system, with the USB details when known.
fn enumerate_serial_ports() -> Vec<String> {
    let mut found = vec![];
    match available_ports() {
        Ok(ports) => {
            for p in ports {
                match p.port_type {
                    SerialPortType::UsbPort(info) => {
                        let extended_name = format!(
                            "{}: ({} / {})",
                            p.port_name,
                            info.manufacturer.as_ref().map_or("", String::as_str),
                            info.product.as_ref().map_or("", String::as_str)
                        );
                        found.push(extended_name);
                    }
                    // Virtual ports (e.g. socat pairs) are what two nodes on one
                    // machine talk over.
                    _ => {
                        found.push(p.port_name);
                    }
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e.to_string());
        }
    }
    found
}

fn select_port_interactive(ports: &[String]) -> Option<String> {
    use dialoguer::{theme::ColorfulTheme, Select};

    let term = Term::buffered_stderr();
    let theme = ColorfulTheme::default();

    let mut select = Select::with_theme(&theme);
    select.with_prompt("Select a port to be used");
    for item in ports {
        select.item(item);
    }

    let selection = select.default(0).interact_on_opt(&term).ok().flatten()?;
    ports
        .get(selection)
        .and_then(|entry| entry.split(':').next())
        .map(String::from)
}

// =============================================================================
// Unit Tests
// =============================================================================
