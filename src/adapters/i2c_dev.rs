//! `/dev/i2c-N` adapter implementing [`BusPort`].
//!
//! The device node is opened per transaction and closed again afterwards,
//! so a bus that disappears (module unloaded, adapter unplugged) only costs
//! the current transaction.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;

use log::debug;

use crate::app::ports::BusPort;
use crate::error::BusError;

mod sys {
    // `I2C_SLAVE` takes the address by value, not by pointer.
    nix::ioctl_write_int_bad!(set_slave_address, 0x0703);
}

pub struct I2cDevBus {
    path: String,
    file: Option<File>,
}

impl I2cDevBus {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The open device, or `on_missing(NotConnected)` outside a transaction.
    fn file(&mut self, on_missing: fn(io::ErrorKind) -> BusError) -> Result<&mut File, BusError> {
        self.file.as_mut().ok_or(on_missing(io::ErrorKind::NotConnected))
    }
}

impl BusPort for I2cDevBus {
    fn open(&mut self) -> Result<(), BusError> {
        if self.file.is_some() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| BusError::Open(e.kind()))?;
        self.file = Some(file);
        Ok(())
    }

    fn select(&mut self, address: u8) -> Result<(), BusError> {
        let fd = self
            .file
            .as_ref()
            .ok_or(BusError::Select {
                address,
                kind: io::ErrorKind::NotConnected,
            })?
            .as_raw_fd();

        // SAFETY: `fd` is a live i2c-dev descriptor and I2C_SLAVE takes a
        // plain integer argument.
        unsafe { sys::set_slave_address(fd, i32::from(address)) }.map_err(|e| BusError::Select {
            address,
            kind: io::Error::from(e).kind(),
        })?;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let n = self
            .file(BusError::Write)?
            .write(bytes)
            .map_err(|e| BusError::Write(e.kind()))?;
        if n != bytes.len() {
            return Err(BusError::ShortTransfer {
                expected: bytes.len(),
                actual: n,
            });
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), BusError> {
        // One read() is one bus transfer; it is not retried for the rest.
        let n = self
            .file(BusError::Read)?
            .read(buf)
            .map_err(|e| BusError::Read(e.kind()))?;
        if n != buf.len() {
            return Err(BusError::ShortTransfer {
                expected: buf.len(),
                actual: n,
            });
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("i2c: {} closed", self.path);
        }
    }
}
