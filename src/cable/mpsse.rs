//! Implement the `Cable` trait for FT2232H adapters in MPSSE mode, like the Olimex
//! ARM-USB-TINY-H
use alloc::vec;
use alloc::vec::Vec;

use std::time::Duration;

use ftdi_mpsse::{ClockTMS, ClockTMSOut};
use libftd2xx::{Ft2232h, Ftdi, FtdiCommon, FtdiMpsse, MpsseCmdBuilder, MpsseCmdExecutor};
use libftd2xx::{ClockBits, ClockBitsOut, ClockData, ClockDataOut};
use log::{debug, trace};

use crate::cable::{Cable, CableError};
use crate::config::DeviceInfo;

/// Queued commands are sent once they would grow past this
const BUFFER_LIMIT: usize = 4096;

pub struct Mpsse<T> {
    ft: T,
    // Commands not yet sent to the adapter
    buffer: Vec<u8>,
}

impl<T> Mpsse<T>
    where T: FtdiMpsse + MpsseCmdExecutor,
          CableError: From<<T as MpsseCmdExecutor>::Error>
{
    pub fn new(mut ft: T, clock: u32) -> Result<Self, CableError> {
        ft.initialize_mpsse_default()?;
        ft.set_clock(clock)?;

        let builder = MpsseCmdBuilder::new()
            .disable_3phase_data_clocking()
            .disable_adaptive_data_clocking();
        ft.send(builder.as_slice())?;

        Ok(Self {
            ft,
            buffer: vec![],
        })
    }

    fn queue(&mut self, builder: MpsseCmdBuilder) -> Result<(), CableError> {
        if builder.as_slice().len() + self.buffer.len() > BUFFER_LIMIT {
            self.flush()?;
        }
        self.buffer.extend_from_slice(builder.as_slice());
        Ok(())
    }

    /// Send everything queued plus `builder`, and read back `bytes` bytes
    fn transfer(&mut self, builder: MpsseCmdBuilder, bytes: usize) -> Result<Vec<u8>, CableError> {
        self.buffer.extend_from_slice(builder.as_slice());
        let mut reply = vec![0; bytes];
        trace!("xfer {} command bytes, {} reply bytes", self.buffer.len(), bytes);
        self.ft.xfer(&self.buffer, &mut reply)?;
        self.buffer.clear();
        Ok(reply)
    }
}

impl<T> Cable for Mpsse<T>
    where T: FtdiMpsse + MpsseCmdExecutor,
          CableError: From<<T as MpsseCmdExecutor>::Error>
{
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError> {
        let mut builder = MpsseCmdBuilder::new();

        // At most 7 TMS bits go out per command
        for chunk in tms.chunks(7) {
            let mut buf = 0;
            for (i, x) in chunk.iter().enumerate() {
                if *x != 0 {
                    buf |= 1 << i;
                }
            }
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, buf, tdo, chunk.len() as u8);
        }
        self.queue(builder)
    }

    fn read_data(&mut self, mut bits: usize) -> Result<Vec<u8>, CableError> {
        let mut bytes = bits / 8;
        let mut builder = MpsseCmdBuilder::new();
        if bytes > 0 {
            bits -= bytes * 8;
            builder = builder.clock_data(ClockData::LsbPosIn, &vec![0xff; bytes]);
        }

        if bits > 0 {
            builder = builder.clock_bits(ClockBits::LsbPosIn, 0xff, bits as u8);
            bytes += 1;
        }

        let mut buf = self.transfer(builder, bytes)?;
        if bits > 0 {
            // Partial bytes arrive in the top bits
            if let Some(last) = buf.last_mut() {
                *last >>= 8 - bits;
            }
        }
        Ok(buf)
    }

    fn write_data(&mut self, data: &[u8], mut bits: u8, pause_after: bool) -> Result<(), CableError> {
        let mut builder = MpsseCmdBuilder::new();
        assert!(bits <= 8);
        assert!(bits != 0);

        // We will send the last bit using clock_tms
        bits -= 1;

        if data.len() > 1 {
            builder = builder.clock_data_out(ClockDataOut::LsbNeg, &data[..data.len()-1]);
        }
        let last_byte = data[data.len()-1];
        if bits >= 1 {
            builder = builder.clock_bits_out(ClockBitsOut::LsbNeg, last_byte, bits);
        }
        let last_bit = last_byte & (1 << bits) != 0;
        // Change to pause state
        if pause_after {
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, 1, last_bit, 2);
        } else {
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, 0, last_bit, 1);
        }

        self.queue(builder)
    }

    fn read_write_data(&mut self, data: &[u8], mut bits: u8, pause_after: bool)
        -> Result<Vec<u8>, CableError>
    {
        let mut read_bytes = 1;
        let mut builder = MpsseCmdBuilder::new();

        assert!(bits <= 8);
        assert!(bits != 0);

        // We will send the last bit using clock_tms
        bits -= 1;

        if data.len() > 1 {
            builder = builder.clock_data(ClockData::LsbPosIn, &data[..data.len()-1]);
            read_bytes += data.len()-1;
        }
        let last_byte = data[data.len()-1];
        if bits >= 1 {
            builder = builder.clock_bits(ClockBits::LsbPosIn, last_byte, bits);
            read_bytes += 1;
        }
        let last_bit = last_byte & (1 << bits) != 0;

        if pause_after {
            // Exit1 samples the final bit, then on to Pause
            builder = builder.clock_tms(ClockTMS::NegTMSPosTDO, 1, last_bit, 1);
            builder = builder.clock_tms_out(ClockTMSOut::NegEdge, 0, last_bit, 1);
        } else {
            builder = builder.clock_tms(ClockTMS::NegTMSPosTDO, 0, last_bit, 1);
        }

        let mut buf = self.transfer(builder, read_bytes)?;

        // The bit clocked with TMS lands in bit 7 of its own byte; repack it after the rest
        let tms_byte = buf.pop().ok_or(CableError::ShortRead { expected: read_bytes, found: 0 })?;
        let last_recv = tms_byte >> 7;
        if bits >= 1 {
            if let Some(partial) = buf.last_mut() {
                *partial >>= 8 - bits;
                *partial |= last_recv << bits;
            }
        } else {
            buf.push(last_recv);
        }
        Ok(buf)
    }

    fn flush(&mut self) -> Result<(), CableError> {
        if !self.buffer.is_empty() {
            self.ft.send(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }
}

// Lower pins
const PIN_TCK: u8 = 1;
const PIN_TDI: u8 = 1 << 1;
//const PIN_TDO: u8 = 1 << 2;
const PIN_TMS: u8 = 1 << 3;
const PIN_N_OE: u8 = 1 << 4;
const LOWER_OUTPUT_PINS: u8 = PIN_TCK | PIN_TDI | PIN_TMS | PIN_N_OE;

// Upper pins
const PIN_N_TRST: u8 = 1;
const PIN_N_SRST_OE: u8 = 1 << 1;
const PIN_LED: u8 = 1 << 3;
const UPPER_OUTPUT_PINS: u8 = PIN_N_TRST | PIN_N_SRST_OE | PIN_LED;

pub struct FtdiJtag {
    ft: Mpsse<Ft2232h>,
}

impl FtdiJtag {
    /// Open the adapter identified by `device` and run TCK at `clock` hertz.  Dual-channel parts
    /// enumerate once per channel; `device.interface` picks the channel, counting from 1.
    pub fn open(device: &DeviceInfo, clock: u32) -> Result<Self, CableError> {
        let not_found = || CableError::NotFound {
            vendor: device.vendor,
            product: device.product,
            interface: device.interface,
        };

        #[cfg(unix)]
        libftd2xx::set_vid_pid(device.vendor, device.product)?;

        let index = usize::from(device.interface).checked_sub(1).ok_or_else(not_found)?;
        let info = libftd2xx::list_devices()?
            .into_iter()
            .filter(|d| d.vendor_id == device.vendor && d.product_id == device.product)
            .nth(index)
            .ok_or_else(not_found)?;
        debug!("opening {} ({}) at {} Hz", info.description, info.serial_number, clock);

        let ft = Ftdi::with_serial_number(&info.serial_number)?;
        let mut ft = Ft2232h::try_from(ft)?;
        ft.set_latency_timer(Duration::from_millis(1))?;
        let mut ft = Mpsse::new(ft, clock)?;
        ft.ft.set_gpio_upper(PIN_N_TRST | PIN_LED, UPPER_OUTPUT_PINS)?;

        let builder = MpsseCmdBuilder::new()
            .set_gpio_lower(PIN_TMS, LOWER_OUTPUT_PINS);
        ft.ft.send(builder.as_slice())?;

        Ok(FtdiJtag {
            ft,
        })
    }

    /// Drive TRST low, resetting the TAP asynchronously
    pub fn assert_trst(&mut self) -> Result<(), CableError> {
        self.ft.flush()?;
        self.ft.ft.set_gpio_upper(PIN_LED, UPPER_OUTPUT_PINS)?;
        Ok(())
    }

    /// Release TRST
    pub fn deassert_trst(&mut self) -> Result<(), CableError> {
        self.ft.flush()?;
        self.ft.ft.set_gpio_upper(PIN_N_TRST | PIN_LED, UPPER_OUTPUT_PINS)?;
        Ok(())
    }
}

impl Cable for FtdiJtag {
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError> {
        self.ft.change_mode(tms, tdo)
    }

    fn read_data(&mut self, bits: usize) -> Result<Vec<u8>, CableError> {
        self.ft.read_data(bits)
    }

    fn write_data(&mut self, data: &[u8], bits: u8, pause_after: bool) -> Result<(), CableError> {
        self.ft.write_data(data, bits, pause_after)
    }

    fn read_write_data(&mut self, data: &[u8], bits: u8, pause_after: bool)
        -> Result<Vec<u8>, CableError>
    {
        self.ft.read_write_data(data, bits, pause_after)
    }

    fn flush(&mut self) -> Result<(), CableError> {
        self.ft.flush()
    }
}
