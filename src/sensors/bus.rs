//! Bus-scoped arbitration for the shared I²C bus.
//!
//! Several logical sensors sit on one physical bus and are told apart by
//! address.  Selecting an address is bus state, so two interleaved
//! transactions would read each other's devices.  [`SharedBus`] owns the
//! [`BusPort`] behind a single mutex and only hands it out for a complete
//! open → select → (write/read …) → close sequence:
//!
//! ```text
//!   lock ─▶ open ─▶ select(addr) ─▶ body(session) ─▶ close ─▶ unlock
//! ```
//!
//! The lock belongs to the bus, not to a sensor: every reader sharing the
//! same `Arc<SharedBus>` is serialized with every other.

use std::sync::{Mutex, PoisonError};

use crate::app::ports::BusPort;
use crate::error::BusError;

pub struct SharedBus<B> {
    port: Mutex<B>,
}

/// Borrowed view of the bus inside one transaction.  Only data transfer is
/// exposed; open, select and close are sequenced by [`SharedBus`].
pub struct BusSession<'a, B> {
    port: &'a mut B,
}

impl<B: BusPort> BusSession<'_, B> {
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.port.write(bytes)
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), BusError> {
        self.port.read(buf)
    }

    /// Point at `register` and read `N` bytes back.
    pub fn read_register<const N: usize>(&mut self, register: u8) -> Result<[u8; N], BusError> {
        self.write(&[register])?;
        let mut buf = [0u8; N];
        self.read(&mut buf)?;
        Ok(buf)
    }

    /// Write a 16-bit big-endian value to `register`.
    pub fn write_register_u16(&mut self, register: u8, value: u16) -> Result<(), BusError> {
        let [hi, lo] = value.to_be_bytes();
        self.write(&[register, hi, lo])
    }
}

impl<B: BusPort> SharedBus<B> {
    pub fn new(port: B) -> Self {
        Self {
            port: Mutex::new(port),
        }
    }

    /// Run `body` as one exclusive transaction against `address`.
    ///
    /// The bus is closed on every path out, including failures in `open`,
    /// `select` or `body`.  Nothing is retried.
    pub fn transaction<T, F>(&self, address: u8, body: F) -> Result<T, BusError>
    where
        F: FnOnce(&mut BusSession<'_, B>) -> Result<T, BusError>,
    {
        let mut port = self.port.lock().unwrap_or_else(PoisonError::into_inner);

        let result = port
            .open()
            .and_then(|()| port.select(address))
            .and_then(|()| {
                let mut session = BusSession { port: &mut *port };
                body(&mut session)
            });
        port.close();
        result
    }
}
