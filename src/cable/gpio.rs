//! Bit-banged JTAG over embedded-hal GPIO pins, for adapters that are just a microcontroller
//! with four wires to the target.
use alloc::vec::Vec;
use alloc::vec;
use embedded_hal::{delay::DelayNs, digital::{InputPin, OutputPin, PinState}};

use crate::cable::{Cable, CableError};

fn pin<T, E>(r: Result<T, E>) -> Result<T, CableError> {
    r.map_err(|_| CableError::Gpio)
}

pub struct Gpio<Clk, Tdi, Tdo, Tms, Delay> where Clk: OutputPin, Tdi: OutputPin, Tdo: InputPin, Tms: OutputPin, Delay: DelayNs {
    half_period: u32,
    delay: Delay,
    clock: Clk,
    tdi: Tdi,
    tdo: Tdo,
    tms: Tms
}

impl<Clk, Tdi, Tdo, Tms, Delay> Gpio<Clk, Tdi, Tdo, Tms, Delay> where Clk: OutputPin, Tdi: OutputPin, Tdo: InputPin, Tms: OutputPin, Delay: DelayNs {
    pub fn new(freq_khz: u32, clock: Clk, tdi: Tdi, tdo: Tdo, tms: Tms, delay: Delay) -> Gpio<Clk, Tdi, Tdo, Tms, Delay> {
        let period_ns = 1_000_000 / freq_khz.max(1);
        let half_period = period_ns / 2;
        Gpio { half_period, clock, tdi, tdo, tms, delay }
    }

    /// One full TCK period.  TDO is sampled on the rising edge.
    fn clock_bit(&mut self, tms: bool, tdi: bool) -> Result<bool, CableError> {
        pin(self.tms.set_state(PinState::from(tms)))?;
        pin(self.tdi.set_state(PinState::from(tdi)))?;

        pin(self.clock.set_high())?;
        let tdo = pin(self.tdo.is_high())?;

        self.delay.delay_ns(self.half_period);
        pin(self.clock.set_low())?;
        self.delay.delay_ns(self.half_period);
        Ok(tdo)
    }
}

impl<Clk, Tdi, Tdo, Tms, Delay> Cable for Gpio<Clk, Tdi, Tdo, Tms, Delay> where Clk: OutputPin, Tdi: OutputPin, Tdo: InputPin, Tms: OutputPin, Delay: DelayNs {
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError> {
        // clock starts low
        for d in tms {
            self.clock_bit(*d != 0, tdo)?;
        }
        Ok(())
    }

    fn read_data(&mut self, bits: usize) -> Result<Vec<u8>, CableError> {
        let mut buf = vec![];
        let mut value: u8 = 0;
        let mut b = 0;
        for _ in 0..bits {
            let bit = self.clock_bit(false, true)? as u8;

            // Shift in the bit into the next byte
            value |= bit << b;
            b = (b + 1) % 8;

            // When we get back to 0, we've finished a byte
            if b == 0 {
                buf.push(value);
                value = 0;
            }
        }
        // If we have anything left over, push it onto buf incomplete
        if b != 0 {
            buf.push(value);
        }
        Ok(buf)
    }

    fn write_data(&mut self, data: &[u8], bits: u8, pause_after: bool) -> Result<(), CableError> {
        self.read_write_data(data, bits, pause_after).map(|_| ())
    }

    fn read_write_data(&mut self, data: &[u8], bits: u8, pause_after: bool)
        -> Result<Vec<u8>, CableError>
    {
        // data: [d0, d1, ..., d_n-1]
        // we go up to d_n-1, and send `bits` number of bits from d_n-1
        let bits = bits.clamp(1, 8);
        let mut out_buffer = vec![];

        for (i, d) in data.iter().enumerate() {
            let last_byte = i == data.len() - 1;
            let count = if last_byte { bits } else { 8 };

            let mut byte = 0;
            for b in 0..count {
                // Leave Shift on the last bit if we're supposed to pause after
                let tms = last_byte && b == count - 1 && pause_after;
                let tdo = self.clock_bit(tms, (d >> b) & 1 == 1)? as u8;
                byte |= tdo << b;
            }
            out_buffer.push(byte);
        }

        if pause_after {
            // Exit1 to Pause
            self.clock_bit(false, true)?;
        }
        Ok(out_buffer)
    }
}
