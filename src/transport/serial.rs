//! Real serial-port transport
//!
//! Wraps a physical port opened through the `serialport` crate. Parameter
//! validation happens before the device is touched; parameters the backend
//! cannot express (mark/space parity, 1.5 stop bits) are rejected as
//! configuration errors. The split for the two pump threads uses the
//! port's `try_clone`, which shares the underlying handle while keeping
//! the read path and write path on their own objects.

use crate::config::{FlowControl, Parity, SerialSettings, StopBits};
use crate::error::{PortScopeError, Result};
use crate::transport::{ReadHalf, Transport, WriteHalf};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

/// Read buffer size for a single `read` call
const READ_CHUNK: usize = 4096;

/// Convert the data bits count to the serialport crate's type
fn to_serialport_data_bits(bits: u8) -> Result<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(PortScopeError::Config(format!(
            "data bits must be 5-8, got {}",
            other
        ))),
    }
}

/// Convert our parity enum to the serialport crate's type
fn to_serialport_parity(parity: Parity) -> Result<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Odd => Ok(serialport::Parity::Odd),
        // Mark/space parity is part of the configuration surface but no
        // supported backend can open it.
        Parity::Mark | Parity::Space => Err(PortScopeError::Config(format!(
            "{} parity is not supported by the serial backend",
            parity
        ))),
    }
}

/// Convert our stop bits enum to the serialport crate's type
fn to_serialport_stop_bits(stop_bits: StopBits) -> Result<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(PortScopeError::Config(
            "1.5 stop bits are not supported by the serial backend".to_string(),
        )),
    }
}

/// Convert the flow-control flags to the serialport crate's type
///
/// The DSR/DTR flag has no `FlowControl` equivalent; it is applied by
/// raising DTR after open.
fn to_serialport_flow_control(flow: FlowControl) -> serialport::FlowControl {
    if flow.software {
        serialport::FlowControl::Software
    } else if flow.rts_cts {
        serialport::FlowControl::Hardware
    } else {
        serialport::FlowControl::None
    }
}

/// A physical serial port ready to be split for the engine
pub struct SerialTransport {
    path: String,
    settings: SerialSettings,
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Open `path` with the given parameter set
    ///
    /// # Errors
    ///
    /// [`PortScopeError::Config`] for parameter combinations no backend can
    /// open, [`PortScopeError::DeviceUnavailable`] when the device itself
    /// cannot be opened.
    pub fn open(path: &str, settings: &SerialSettings, read_timeout: Duration) -> Result<Self> {
        settings.validate()?;

        let builder = serialport::new(path, settings.baud_or_default())
            .data_bits(to_serialport_data_bits(settings.data_bits)?)
            .parity(to_serialport_parity(settings.parity)?)
            .stop_bits(to_serialport_stop_bits(settings.stop_bits)?)
            .flow_control(to_serialport_flow_control(settings.flow))
            .timeout(read_timeout);

        let mut port = builder
            .open()
            .map_err(|e| PortScopeError::from_serialport(path, e))?;

        if settings.flow.dsr_dtr {
            port.write_data_terminal_ready(true)
                .map_err(|e| PortScopeError::from_serialport(path, e))?;
        }

        tracing::info!("Opened {} at {}", path, settings);

        Ok(Self {
            path: path.to_string(),
            settings: settings.clone(),
            port,
        })
    }

    /// The parameter set the port was opened with
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

impl Transport for SerialTransport {
    fn identity(&self) -> String {
        format!("{} ({})", self.path, self.settings)
    }

    fn split(self: Box<Self>) -> Result<(Box<dyn ReadHalf>, Box<dyn WriteHalf>)> {
        let writer = self
            .port
            .try_clone()
            .map_err(|e| PortScopeError::from_serialport(&self.path, e))?;

        Ok((
            Box::new(SerialReadHalf {
                port: self.port,
                timeout: None,
            }),
            Box::new(SerialWriteHalf { port: writer }),
        ))
    }
}

struct SerialReadHalf {
    port: Box<dyn SerialPort>,
    /// Last timeout applied to the port, to skip redundant ioctls
    timeout: Option<Duration>,
}

impl ReadHalf for SerialReadHalf {
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        if self.timeout != Some(timeout) {
            self.port
                .set_timeout(timeout)
                .map_err(|e| PortScopeError::TransportIo(e.to_string()))?;
            self.timeout = Some(timeout);
        }

        let mut buf = [0u8; READ_CHUNK];
        match self.port.read(&mut buf) {
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(PortScopeError::TransportIo(e.to_string())),
        }
    }
}

struct SerialWriteHalf {
    port: Box<dyn SerialPort>,
}

impl WriteHalf for SerialWriteHalf {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        match self.port.write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(PortScopeError::TransportIo(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bits_conversion() {
        assert_eq!(
            to_serialport_data_bits(5).unwrap(),
            serialport::DataBits::Five
        );
        assert_eq!(
            to_serialport_data_bits(8).unwrap(),
            serialport::DataBits::Eight
        );
        assert!(to_serialport_data_bits(4).is_err());
        assert!(to_serialport_data_bits(9).is_err());
    }

    #[test]
    fn test_parity_conversion() {
        assert_eq!(
            to_serialport_parity(Parity::None).unwrap(),
            serialport::Parity::None
        );
        assert_eq!(
            to_serialport_parity(Parity::Even).unwrap(),
            serialport::Parity::Even
        );
        assert!(matches!(
            to_serialport_parity(Parity::Mark),
            Err(PortScopeError::Config(_))
        ));
        assert!(to_serialport_parity(Parity::Space).is_err());
    }

    #[test]
    fn test_stop_bits_conversion() {
        assert_eq!(
            to_serialport_stop_bits(StopBits::One).unwrap(),
            serialport::StopBits::One
        );
        assert!(matches!(
            to_serialport_stop_bits(StopBits::OnePointFive),
            Err(PortScopeError::Config(_))
        ));
    }

    #[test]
    fn test_flow_control_conversion() {
        let none = FlowControl::default();
        assert_eq!(
            to_serialport_flow_control(none),
            serialport::FlowControl::None
        );

        let software = FlowControl {
            software: true,
            ..Default::default()
        };
        assert_eq!(
            to_serialport_flow_control(software),
            serialport::FlowControl::Software
        );

        let hardware = FlowControl {
            rts_cts: true,
            ..Default::default()
        };
        assert_eq!(
            to_serialport_flow_control(hardware),
            serialport::FlowControl::Hardware
        );
    }

    #[test]
    fn test_open_rejects_unsupported_parameters_before_touching_device() {
        // Mark parity fails as Config even on a nonexistent path
        let settings = SerialSettings {
            parity: Parity::Mark,
            ..Default::default()
        };
        assert!(matches!(
            SerialTransport::open("/dev/does-not-exist", &settings, Duration::from_millis(50)),
            Err(PortScopeError::Config(_))
        ));
    }

    #[test]
    fn test_open_missing_device_is_unavailable() {
        let settings = SerialSettings::default();
        let err = SerialTransport::open(
            "/dev/portscope-no-such-device",
            &settings,
            Duration::from_millis(50),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PortScopeError::DeviceUnavailable { .. } | PortScopeError::TransportIo(_)
        ));
    }
}
