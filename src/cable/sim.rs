//! A bit-accurate model of a single RISC-V DTM TAP behind a `Cable`, for tests.
//!
//! Every TCK edge walks the IEEE 1149.1 state machine, shifts the active register while in a
//! Shift state, captures on entry to Capture and commits on entry to Update.
use alloc::vec::Vec;

use bitvec::prelude::*;

use crate::cable::{Cable, CableError};
use crate::statemachine::JtagState;

const IDCODE: u8 = 0x01;
const DTMCS: u8 = 0x10;
const DMI: u8 = 0x11;

fn next_state(state: JtagState, tms: bool) -> JtagState {
    use JtagState::*;
    match (state, tms) {
        (Reset, false) => Idle,
        (Reset, true) => Reset,
        (Idle, false) => Idle,
        (Idle, true) => SelectDR,
        (SelectDR, false) => CaptureDR,
        (SelectDR, true) => SelectIR,
        (CaptureDR, false) => ShiftDR,
        (CaptureDR, true) => Exit1DR,
        (ShiftDR, false) => ShiftDR,
        (ShiftDR, true) => Exit1DR,
        (Exit1DR, false) => PauseDR,
        (Exit1DR, true) => UpdateDR,
        (PauseDR, false) => PauseDR,
        (PauseDR, true) => Exit2DR,
        (Exit2DR, false) => ShiftDR,
        (Exit2DR, true) => UpdateDR,
        (UpdateDR, false) => Idle,
        (UpdateDR, true) => SelectDR,
        (SelectIR, false) => CaptureIR,
        (SelectIR, true) => Reset,
        (CaptureIR, false) => ShiftIR,
        (CaptureIR, true) => Exit1IR,
        (ShiftIR, false) => ShiftIR,
        (ShiftIR, true) => Exit1IR,
        (Exit1IR, false) => PauseIR,
        (Exit1IR, true) => UpdateIR,
        (PauseIR, false) => PauseIR,
        (PauseIR, true) => Exit2IR,
        (Exit2IR, false) => ShiftIR,
        (Exit2IR, true) => UpdateIR,
        (UpdateIR, false) => Idle,
        (UpdateIR, true) => SelectDR,
    }
}

pub(crate) struct SimTap {
    pub irlen: usize,
    pub idcode: u32,
    pub dtmcs: u32,
    /// Contents of `dmi`, replaced on every Update-DR while DMI is selected
    pub dmi: u128,
    /// A healthy BYPASS register delays TDO by one clock.  When false, TDI goes straight to TDO.
    pub bypass_delay: bool,
    state: JtagState,
    instruction: u8,
    shift: u128,
    shift_len: usize,
}

impl SimTap {
    /// A SiFive FE310-like DTM with `abits` = 7
    pub fn new() -> Self {
        Self {
            irlen: 5,
            idcode: 0x2000_0913,
            dtmcs: 0x0000_5071,
            dmi: 0,
            bypass_delay: true,
            state: JtagState::Reset,
            instruction: IDCODE,
            shift: 0,
            shift_len: 0,
        }
    }

    pub fn state(&self) -> JtagState {
        self.state
    }

    fn abits(&self) -> usize {
        ((self.dtmcs >> 4) & 0x3f) as usize
    }

    fn capture_dr(&self) -> (u128, usize) {
        match self.instruction {
            IDCODE => (self.idcode as u128, 32),
            DTMCS => (self.dtmcs as u128, 32),
            DMI => (self.dmi, 33 + self.abits()),
            _ if self.bypass_delay => (0, 1),
            _ => (0, 0),
        }
    }

    /// One TCK rising edge.  Returns the TDO value sampled on that edge.
    pub fn clock(&mut self, tms: bool, tdi: bool) -> bool {
        let mut tdo = tdi;
        if matches!(self.state, JtagState::ShiftDR | JtagState::ShiftIR) && self.shift_len > 0 {
            tdo = self.shift & 1 != 0;
            self.shift = (self.shift >> 1) | ((tdi as u128) << (self.shift_len - 1));
        }

        let next = next_state(self.state, tms);
        match next {
            JtagState::Reset => self.instruction = IDCODE,
            JtagState::CaptureIR => {
                self.shift = 0b01;
                self.shift_len = self.irlen;
            }
            JtagState::CaptureDR => {
                let (value, len) = self.capture_dr();
                self.shift = value;
                self.shift_len = len;
            }
            JtagState::UpdateIR => {
                self.instruction = (self.shift & ((1u128 << self.irlen) - 1)) as u8;
            }
            JtagState::UpdateDR if self.instruction == DMI => self.dmi = self.shift,
            _ => {}
        }
        self.state = next;
        tdo
    }
}

impl Cable for SimTap {
    fn change_mode(&mut self, tms: &[usize], tdo: bool) -> Result<(), CableError> {
        for t in tms {
            self.clock(*t != 0, tdo);
        }
        Ok(())
    }

    fn read_data(&mut self, bits: usize) -> Result<Vec<u8>, CableError> {
        let mut out = BitVec::<u8, Lsb0>::new();
        for _ in 0..bits {
            out.push(self.clock(false, true));
        }
        out.set_uninitialized(false);
        Ok(out.into_vec())
    }

    fn write_data(&mut self, data: &[u8], bits: u8, pause_after: bool) -> Result<(), CableError> {
        self.read_write_data(data, bits, pause_after).map(|_| ())
    }

    fn read_write_data(&mut self, data: &[u8], bits: u8, pause_after: bool)
        -> Result<Vec<u8>, CableError>
    {
        let total = (data.len() - 1) * 8 + bits as usize;
        let input = data.view_bits::<Lsb0>();
        let mut out = BitVec::<u8, Lsb0>::new();
        for i in 0..total {
            let last = i == total - 1;
            out.push(self.clock(pause_after && last, input[i]));
        }
        if pause_after {
            self.clock(false, true);
        }
        out.set_uninitialized(false);
        Ok(out.into_vec())
    }
}
