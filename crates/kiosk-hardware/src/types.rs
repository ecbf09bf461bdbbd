//! Common types shared across coin acceptor implementations.

use serde::{Deserialize, Serialize};

/// Generic device information.
///
/// Contains metadata about an open coin acceptor such as its name, model
/// and the path it was opened on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "Serial Coin Acceptor", "Mock Coin Acceptor").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Device path the acceptor was opened on.
    pub port_path: Option<String>,

    /// Line speed in bits per second.
    pub baud_rate: Option<u32>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            port_path: None,
            baud_rate: None,
        }
    }

    /// Set the device path.
    pub fn with_port_path(mut self, port_path: impl Into<String>) -> Self {
        self.port_path = Some(port_path.into());
        self
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }
}

/// A serial device found during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// OS device path (e.g., "/dev/ttyUSB0", "COM3").
    pub path: String,

    /// USB manufacturer string, when known.
    pub manufacturer: Option<String>,

    /// USB product string, when known.
    pub product: Option<String>,
}

impl PortInfo {
    /// Create a port entry with only a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            manufacturer: None,
            product: None,
        }
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Self {
                path: info.port_name,
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self::new(info.port_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new("Serial Coin Acceptor", "Serial")
            .with_port_path("/dev/ttyUSB0")
            .with_baud_rate(9600);

        assert_eq!(info.port_path.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(info.baud_rate, Some(9600));
    }

    #[test]
    fn test_port_info_from_usb() {
        let info = serialport::SerialPortInfo {
            port_name: "/dev/ttyACM0".to_string(),
            port_type: serialport::SerialPortType::UsbPort(serialport::UsbPortInfo {
                vid: 0x2341,
                pid: 0x0043,
                serial_number: None,
                manufacturer: Some("Arduino".to_string()),
                product: Some("Uno".to_string()),
            }),
        };

        let port = PortInfo::from(info);
        assert_eq!(port.path, "/dev/ttyACM0");
        assert_eq!(port.manufacturer.as_deref(), Some("Arduino"));
        assert_eq!(port.product.as_deref(), Some("Uno"));
    }

    #[test]
    fn test_port_info_from_unknown() {
        let info = serialport::SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: serialport::SerialPortType::Unknown,
        };

        assert_eq!(PortInfo::from(info), PortInfo::new("/dev/ttyS0"));
    }
}
