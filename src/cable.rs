//! Implementations for different JTAG hardware adapters live here.  Hardware adapters should
//! implement the `Cable` trait.
use alloc::vec::Vec;

use thiserror::Error;

pub mod gpio;
#[cfg(feature = "std")]
pub mod mpsse;
#[cfg(test)]
pub(crate) mod sim;

#[derive(Debug, Error)]
pub enum CableError {
    #[cfg(feature = "std")]
    #[error("FTDI driver error: {0:?}")]
    Ftdi(libftd2xx::FtStatus),

    #[cfg(feature = "std")]
    #[error("FTDI MPSSE command timed out: {0:?}")]
    Timeout(libftd2xx::TimeoutError),

    #[cfg(feature = "std")]
    #[error("adapter is not an FT2232H: {0:?}")]
    DeviceType(libftd2xx::DeviceTypeError),

    #[error("no adapter with vendor 0x{vendor:04x}, product 0x{product:04x}, interface {interface}")]
    NotFound {
        vendor: u16,
        product: u16,
        interface: u8,
    },

    #[error("GPIO pin access failed")]
    Gpio,

    #[error("adapter returned {found} bytes, expected {expected}")]
    ShortRead { expected: usize, found: usize },
}

#[cfg(feature = "std")]
impl From<libftd2xx::FtStatus> for CableError {
    fn from(e: libftd2xx::FtStatus) -> Self {
        CableError::Ftdi(e)
    }
}

#[cfg(feature = "std")]
impl From<libftd2xx::TimeoutError> for CableError {
    fn from(e: libftd2xx::TimeoutError) -> Self {
        CableError::Timeout(e)
    }
}

#[cfg(feature = "std")]
impl From<libftd2xx::DeviceTypeError> for CableError {
    fn from(e: libftd2xx::DeviceTypeError) -> Self {
        CableError::DeviceType(e)
    }
}

pub trait Cable {
    /// Clock out a series of TMS values to change the state of the JTAG chain.  Each element of
    /// `tms` determines the value of the TMS line, zero for low and any other value for high.
    /// `tdo` controls the state of the TDI line during mode changes.
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError>;
    /// Shift in bits from the TDO line.  `bits` is the total number of bits to read.  Should be
    /// called with state = ShiftIR or ShiftDR, and will remain in that state.  Should clock out
    /// all ones.
    fn read_data(&mut self, bits: usize) -> Result<Vec<u8>, CableError>;
    /// Shift out bits on the TDI line.  `bits` is the number of bits to send from the last byte.
    /// Should be called with state = ShiftIR or ShiftDR.  State won't change unless `pause_after`
    /// is true, in which case it will be PauseIR or PauseDR on exit.
    fn write_data(&mut self, data: &[u8], bits: u8, pause_after: bool) -> Result<(), CableError>;
    /// Same as `write_data`, but returns the bits shifted out on TDO, packed the same way as
    /// `data`.
    fn read_write_data(&mut self, data: &[u8], bits: u8, pause_after: bool)
        -> Result<Vec<u8>, CableError>;
    /// Push out anything the cable has buffered.
    fn flush(&mut self) -> Result<(), CableError> {
        Ok(())
    }
}
