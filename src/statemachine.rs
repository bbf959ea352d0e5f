//! This provides a higher-level interface than the `Cable` trait.  Specifically, it keeps track of
//! the state of the JTAG state machine, and allows setting the state to any desired state.
//! `JtagSM` will get to that state by the most efficient path, based on the current state.
//!
//! `JtagSM` is also the stock implementation of `TapDriver`, the capability the TAP operations
//! in `crate::taps` are written against.
use alloc::vec;
use alloc::vec::Vec;

use bitvec::prelude::*;
use log::trace;

use crate::bits::BitSeq;
use crate::cable::{Cable, CableError};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    Data,
    Instruction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JtagState {
    Reset = 0,
    Idle = 1,
    SelectDR = 2,
    CaptureDR = 3,
    ShiftDR = 4,
    Exit1DR = 5,
    PauseDR = 6,
    Exit2DR = 7,
    UpdateDR = 8,
    SelectIR = 9,
    CaptureIR = 10,
    ShiftIR = 11,
    Exit1IR = 12,
    PauseIR = 13,
    Exit2IR = 14,
    UpdateIR = 15,
}

/// Next state for TMS low and TMS high, indexed by `JtagState as usize`
const EDGES: [[JtagState; 2]; 16] = {
    use JtagState::*;
    [
        [Idle, Reset],
        [Idle, SelectDR],
        [CaptureDR, SelectIR],
        [ShiftDR, Exit1DR],
        [ShiftDR, Exit1DR],
        [PauseDR, UpdateDR],
        [PauseDR, Exit2DR],
        [ShiftDR, UpdateDR],
        [Idle, SelectDR],
        [CaptureIR, Reset],
        [ShiftIR, Exit1IR],
        [ShiftIR, Exit1IR],
        [PauseIR, UpdateIR],
        [PauseIR, Exit2IR],
        [ShiftIR, UpdateIR],
        [Idle, SelectIR],
    ]
};

/// Five clocks with TMS high reach Test-Logic-Reset from any state
const RESET_TMS: [usize; 5] = [1, 1, 1, 1, 1];

/// Longest register `detect_register_size` can measure
const MAX_REGISTER_BYTES: usize = 8;

/// The TAP-level capability the protocol core is written against.  Each call blocks until the
/// adapter has finished clocking.
pub trait TapDriver {
    /// Drive the TAP into Test-Logic-Reset
    fn reset(&mut self) -> Result<(), Error>;
    /// Move to Run-Test/Idle
    fn go_idle(&mut self) -> Result<(), Error>;
    /// Move to Capture-IR, loading the instruction register's capture pattern
    fn capture_ir(&mut self) -> Result<(), Error>;
    fn change_state(&mut self, state: JtagState) -> Result<(), Error>;
    /// Shift `ir` into the instruction register, update it and return to Run-Test/Idle
    fn write_ir(&mut self, ir: &BitSeq) -> Result<(), Error>;
    /// Shift `bits` into the register selected by the current Shift-DR/Shift-IR state, then
    /// update it.  Returns the previous contents, with the same length as `bits`.
    fn shift_and_update(&mut self, bits: &BitSeq) -> Result<BitSeq, Error>;
    /// Read `bits` bits out of the active data register
    fn read_dr(&mut self, bits: usize) -> Result<BitSeq, Error>;
    /// Measure the length of the register being captured or shifted
    fn detect_register_size(&mut self) -> Result<usize, Error>;
}

pub struct JtagSM<T> {
    pub cable: T,
    state: JtagState,
}

impl<T, U> JtagSM<T>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    /// Create a JTAG state machine using an existing `Cable`.  The chain is reset so the
    /// tracked state matches the hardware.
    pub fn new(mut cable: T) -> Result<Self, CableError> {
        cable.change_mode(&RESET_TMS, true)?;

        Ok(Self {
            cable,
            state: JtagState::Reset,
        })
    }

    pub fn state(&self) -> JtagState {
        self.state
    }

    /// Reset the scan chain by driving TMS high for 5 clocks
    pub fn mode_reset(&mut self) -> Result<(), CableError> {
        self.cable.change_mode(&RESET_TMS, true)?;
        self.state = JtagState::Reset;
        Ok(())
    }

    fn get_path(&self, state: JtagState) -> Vec<usize> {
        let mut seen = [false; 16];
        seen[self.state as usize] = true;
        let mut paths = vec![(self.state, Vec::new())];

        loop {
            let mut newpaths = Vec::new();

            for (from, path) in paths {
                for (tms, &to) in EDGES[from as usize].iter().enumerate() {
                    let mut p = path.clone();
                    p.push(tms);

                    if to == state {
                        return p;
                    }
                    if !seen[to as usize] {
                        seen[to as usize] = true;
                        newpaths.push((to, p));
                    }
                }
            }

            paths = newpaths;
        }
    }

    /// Use TMS to get into `state` by the most efficient path
    pub fn change_mode(&mut self, state: JtagState) -> Result<(), CableError> {
        if self.state == state {
            return Ok(());
        }

        let path = self.get_path(state);
        trace!("path from {:?} to {:?}: {:?}", self.state, state, path);
        self.cable.change_mode(&path, true)?;
        self.state = state;
        Ok(())
    }

    fn enter_shift(&mut self, reg: Register) -> Result<(), CableError> {
        match reg {
            Register::Data => self.change_mode(JtagState::ShiftDR),
            Register::Instruction => self.change_mode(JtagState::ShiftIR),
        }
    }

    fn after_write(&mut self, reg: Register, pause_after: bool) {
        if pause_after {
            self.state = match reg {
                Register::Data => JtagState::PauseDR,
                Register::Instruction => JtagState::PauseIR,
            };
        }
    }

    /// Read `bits` from either the instruction or data register
    pub fn read_reg(&mut self, reg: Register, bits: usize) -> Result<Vec<u8>, CableError> {
        self.enter_shift(reg)?;
        self.cable.read_data(bits)
    }

    /// Write `data` into either the instruction or data register.  `bits` indicates how many bits
    /// of the last byte should be written (8 indicates that the entire byte should be written).
    /// The mode will either be ShiftIR / ShiftDR if `pause_after` is false, or PauseIR / PauseDR
    /// if `pause_after` is true.
    pub fn write_reg(&mut self, reg: Register, data: &[u8], bits: u8, pause_after: bool)
        -> Result<(), CableError>
    {
        self.enter_shift(reg)?;
        self.cable.write_data(data, bits, pause_after)?;
        self.after_write(reg, pause_after);
        Ok(())
    }

    /// Similar to `write_reg` except it returns the bits that were shifted out during writing.
    pub fn read_write_reg(&mut self, reg: Register, data: &[u8], bits: u8, pause_after: bool)
        -> Result<Vec<u8>, CableError>
    {
        self.enter_shift(reg)?;
        let data = self.cable.read_write_data(data, bits, pause_after)?;
        self.after_write(reg, pause_after);
        Ok(data)
    }
}

fn non_empty(bits: &BitSeq) -> Result<(), Error> {
    if bits.is_empty() {
        return Err(Error::WidthMismatch {
            register: "shifted value",
            expected: 1,
            found: 0,
        });
    }
    Ok(())
}

impl<T, U> TapDriver for JtagSM<T>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    fn reset(&mut self) -> Result<(), Error> {
        self.mode_reset()?;
        // Nothing may stay queued once the TAP is supposed to be in reset
        Ok(self.cable.flush()?)
    }

    fn go_idle(&mut self) -> Result<(), Error> {
        Ok(self.change_mode(JtagState::Idle)?)
    }

    fn capture_ir(&mut self) -> Result<(), Error> {
        Ok(self.change_mode(JtagState::CaptureIR)?)
    }

    fn change_state(&mut self, state: JtagState) -> Result<(), Error> {
        Ok(self.change_mode(state)?)
    }

    fn write_ir(&mut self, ir: &BitSeq) -> Result<(), Error> {
        non_empty(ir)?;
        self.write_reg(Register::Instruction, &ir.to_bytes(), ir.last_byte_bits(), true)?;
        self.change_mode(JtagState::UpdateIR)?;
        self.change_mode(JtagState::Idle)?;
        Ok(())
    }

    fn shift_and_update(&mut self, bits: &BitSeq) -> Result<BitSeq, Error> {
        let reg = match self.state {
            JtagState::ShiftDR => Register::Data,
            JtagState::ShiftIR => Register::Instruction,
            found => return Err(Error::UnexpectedState { expected: "ShiftDR or ShiftIR", found }),
        };
        non_empty(bits)?;

        let out = self.read_write_reg(reg, &bits.to_bytes(), bits.last_byte_bits(), true)?;
        self.change_mode(match reg {
            Register::Data => JtagState::UpdateDR,
            Register::Instruction => JtagState::UpdateIR,
        })?;
        BitSeq::from_bytes(&out, bits.len())
    }

    fn read_dr(&mut self, bits: usize) -> Result<BitSeq, Error> {
        let out = self.read_reg(Register::Data, bits)?;
        self.change_mode(JtagState::UpdateDR)?;
        BitSeq::from_bytes(&out, bits)
    }

    fn detect_register_size(&mut self) -> Result<usize, Error> {
        let reg = match self.state {
            JtagState::CaptureIR | JtagState::ShiftIR => Register::Instruction,
            JtagState::CaptureDR | JtagState::ShiftDR => Register::Data,
            found => return Err(Error::UnexpectedState { expected: "a capture or shift state", found }),
        };

        // Flush the register with zeros, then count the clocks until a one falls out
        let zeros = vec![0u8; MAX_REGISTER_BYTES];
        self.read_write_reg(reg, &zeros, 8, false)?;
        let ones = vec![0xffu8; MAX_REGISTER_BYTES];
        let out = self.read_write_reg(reg, &ones, 8, false)?;

        let size = out.view_bits::<Lsb0>().first_one().ok_or(Error::RegisterSizeUndetected)?;
        trace!("detected {:?} register of {} bits", reg, size);
        Ok(size)
    }
}
