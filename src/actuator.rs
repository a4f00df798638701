//! Actuator link: position commands to the pan/tilt controller.
//!
//! The controller listens on a point-to-point serial line for ASCII
//! `"<horizontal>,<vertical>"` commands and never answers. Correctness relies
//! on an open-loop timing contract: after every command the link blocks for
//! a fixed settle window before anything else touches the rig.
//!
//! [`ActuatorLink`] separates sending from settling so an acknowledging
//! protocol can later replace the fixed wait without the orchestrator
//! noticing. [`SerialActuator`] is the production implementation.

use crate::config::{HomeConfig, SerialConfig};
use crate::types::ScanPosition;
use serialport::SerialPort;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("actuator link unavailable on {device}: {source}")]
    Unavailable {
        device: String,
        source: serialport::Error,
    },
    #[error("failed to send position {position} to actuator: {source}")]
    Write {
        position: ScanPosition,
        source: io::Error,
    },
}

/// Encode a position as the controller's wire command.
pub fn encode_command(position: ScanPosition) -> Vec<u8> {
    position.to_string().into_bytes()
}

/// A rig that can be told where to point.
///
/// Implementations hold the open device handle; dropping the link releases it.
pub trait ActuatorLink {
    /// Transmit a position command without waiting.
    fn send(&mut self, position: ScanPosition) -> Result<(), ActuatorError>;

    /// Block until the last commanded move can be assumed complete.
    fn wait_settled(&mut self);

    /// Rest position the rig returns to at the start and end of a scan.
    fn home(&self) -> ScanPosition;

    /// Command a move and wait for it to settle.
    fn move_to(&mut self, position: ScanPosition) -> Result<(), ActuatorError> {
        self.send(position)?;
        self.wait_settled();
        Ok(())
    }

    /// Move to [`home`](Self::home) and wait for it to settle.
    fn return_home(&mut self) -> Result<(), ActuatorError> {
        let home = self.home();
        self.move_to(home)
    }
}

/// Actuator driven over a serial port.
pub struct SerialActuator {
    port: Box<dyn SerialPort>,
    home: ScanPosition,
    settle: Duration,
}

impl SerialActuator {
    /// Open the configured serial device.
    pub fn open(
        serial: &SerialConfig,
        home: &HomeConfig,
        settle: Duration,
    ) -> Result<Self, ActuatorError> {
        let port = serialport::new(&serial.device, serial.baud_rate)
            .timeout(Duration::from_millis(serial.timeout_ms))
            .open()
            .map_err(|source| ActuatorError::Unavailable {
                device: serial.device.clone(),
                source,
            })?;
        info!(device = %serial.device, baud = serial.baud_rate, "actuator link open");
        Ok(Self {
            port,
            home: home.position(),
            settle,
        })
    }
}

impl ActuatorLink for SerialActuator {
    fn send(&mut self, position: ScanPosition) -> Result<(), ActuatorError> {
        debug!(%position, "sending position");
        self.port
            .write_all(&encode_command(position))
            .and_then(|_| self.port.flush())
            .map_err(|source| ActuatorError::Write { position, source })
    }

    fn wait_settled(&mut self) {
        std::thread::sleep(self.settle);
    }

    fn home(&self) -> ScanPosition {
        self.home
    }
}
