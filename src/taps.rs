//! Protocol operations against a single RISC-V DTM TAP.
//!
//! A `TapSession` owns its `TapDriver` for as long as it lives, so no two operations can
//! interleave shifts on the same TAP.  Every operation starts from Test-Logic-Reset and puts the
//! TAP back there when it finishes, whether it succeeded or not.
use core::ops::{Deref, DerefMut};

use log::{debug, info, warn};

use crate::bits::{BitOrder, BitSeq};
use crate::codec::{dmi_width, DmiStatus, DmiValue, DtmControl, DTMCS_WIDTH};
use crate::error::Error;
use crate::registers::{IdcodeFields, Instruction, KnownIdcode, IR_LENGTH};
use crate::statemachine::{JtagState, TapDriver};

/// Pattern used by `bypass` when the caller doesn't supply one
pub const DEFAULT_BYPASS_PATTERN: &str = "011011110000011011110000";

/// Where `read_idcode` reads IDCODE from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdcodeSource {
    /// The data register selected after Test-Logic-Reset, which is IDCODE
    Reset,
    /// Shift the IDCODE instruction first
    Instruction,
}

/// What to shift into `dmi` in `write_dmi`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DmiWrite {
    Value(DmiValue),
    Bits(BitSeq),
}

impl From<DmiValue> for DmiWrite {
    fn from(value: DmiValue) -> Self {
        DmiWrite::Value(value)
    }
}

impl From<BitSeq> for DmiWrite {
    fn from(bits: BitSeq) -> Self {
        DmiWrite::Bits(bits)
    }
}

/// Resets the TAP when dropped
struct ResetOnDrop<'a, D: TapDriver + ?Sized> {
    driver: &'a mut D,
}

impl<D: TapDriver + ?Sized> Deref for ResetOnDrop<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &*self.driver
    }
}

impl<D: TapDriver + ?Sized> DerefMut for ResetOnDrop<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut *self.driver
    }
}

impl<D: TapDriver + ?Sized> Drop for ResetOnDrop<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.driver.reset() {
            warn!("failed to reset the TAP on exit: {}", e);
        }
    }
}

pub struct TapSession<D> {
    driver: D,
}

impl<D: TapDriver> TapSession<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Reset the TAP and hand out a guard that resets it again on the way out
    fn begin(&mut self) -> Result<ResetOnDrop<'_, D>, Error> {
        self.driver.reset()?;
        Ok(ResetOnDrop { driver: &mut self.driver })
    }

    /// Select `inst` and park in Shift-DR, ready for `shift_and_update`
    fn select_dr(tap: &mut ResetOnDrop<'_, D>, inst: Instruction) -> Result<(), Error> {
        tap.write_ir(&inst.bits()?)?;
        tap.go_idle()?;
        tap.change_state(JtagState::ShiftDR)
    }

    /// Detect the instruction register length.  Everything this crate talks to has a 5-bit IR,
    /// so anything else is an error.
    pub fn detect_ir_length(&mut self) -> Result<usize, Error> {
        let mut tap = self.begin()?;
        tap.go_idle()?;
        tap.capture_ir()?;
        let irlen = tap.detect_register_size()?;
        debug!("IR length is {}", irlen);

        if irlen != IR_LENGTH {
            return Err(Error::UnexpectedIrLength { found: irlen, expected: IR_LENGTH });
        }
        Ok(irlen)
    }

    /// Read IDCODE and check it against the known-good values.  Returns the raw code along
    /// with the device it identifies.
    pub fn read_idcode(&mut self, source: IdcodeSource) -> Result<(u32, KnownIdcode), Error> {
        let mut tap = self.begin()?;
        if source == IdcodeSource::Instruction {
            tap.write_ir(&Instruction::Idcode.bits()?)?;
        }
        let idcode = tap.read_dr(32)?.value() as u32;
        debug!("IDCODE 0x{:08x}: {:?}", idcode, IdcodeFields::from(idcode));

        let known = KnownIdcode::lookup(idcode)?;
        info!("Detected the IDCODE for {}", known);
        Ok((idcode, known))
    }

    /// Move into BYPASS, send `input` and check it comes back unchanged.  BYPASS delays the data
    /// by one clock, so what comes out is shifted right by one bit before comparing; the result
    /// is directly comparable to `input`.  With no `input` the default pattern is sent.
    pub fn bypass(&mut self, input: Option<BitSeq>) -> Result<BitSeq, Error> {
        let input = match input {
            Some(input) => input,
            None => BitSeq::from_literal(DEFAULT_BYPASS_PATTERN, BitOrder::LsbFirst)?,
        };

        let mut tap = self.begin()?;
        Self::select_dr(&mut tap, Instruction::Bypass)?;
        let mut out = tap.shift_and_update(&input)?;
        out.shr(1);

        if out != input {
            return Err(Error::BypassMismatch { sent: input, received: out });
        }
        info!("Bypass check passed, sent and received {}", out);
        Ok(out)
    }

    /// Read `dtmcs`.  Returns its integer and decoded values.
    pub fn read_dtmcontrol(&mut self) -> Result<(u32, DtmControl), Error> {
        let mut tap = self.begin()?;
        Self::select_dr(&mut tap, Instruction::Dtmcs)?;
        let out = tap.shift_and_update(&BitSeq::zeros(DTMCS_WIDTH)?)?;

        let raw = out.value() as u32;
        let dtmcs = DtmControl::decode(&out)?;
        info!("Read DtmControl: 0x{:x} => {:?}", raw, dtmcs);
        Ok((raw, dtmcs))
    }

    /// Read `dmi`, which is `33 + abits` bits wide.  `abits` comes from `read_dtmcontrol`.
    pub fn read_dmi(&mut self, abits: u8) -> Result<(u128, DmiValue), Error> {
        let mut tap = self.begin()?;
        Self::select_dr(&mut tap, Instruction::Dmi)?;
        let out = tap.shift_and_update(&BitSeq::zeros(dmi_width(abits))?)?;

        let dmi = DmiValue::decode(&out)?;
        info!("Read Dmi: 0x{:x} => {:?}", out.value(), dmi);
        check_status(&dmi);
        Ok((out.value(), dmi))
    }

    /// Write `dmi`.  The value must be exactly `33 + abits` bits wide.  Returns what was shifted
    /// out, which is the register's previous contents.
    pub fn write_dmi(&mut self, abits: u8, data: impl Into<DmiWrite>) -> Result<(u128, DmiValue), Error> {
        let bits = match data.into() {
            DmiWrite::Value(value) => value.encode()?,
            DmiWrite::Bits(bits) => bits,
        };
        let expected = dmi_width(abits);
        if bits.len() != expected {
            return Err(Error::WidthMismatch { register: "dmi", expected, found: bits.len() });
        }

        let mut tap = self.begin()?;
        Self::select_dr(&mut tap, Instruction::Dmi)?;
        let out = tap.shift_and_update(&bits)?;

        let dmi = DmiValue::decode(&out)?;
        info!("Wrote Dmi 0x{:x}, got back: 0x{:x} => {:?}", bits.value(), out.value(), dmi);
        check_status(&dmi);
        Ok((out.value(), dmi))
    }
}

/// The DTM reports failed and busy operations through `op`.  That is for the caller to act on,
/// so it is only logged here.
fn check_status(dmi: &DmiValue) {
    match dmi.status() {
        DmiStatus::Failed => warn!("dmi reports a failed operation"),
        DmiStatus::Busy => warn!("dmi reports an operation still in progress"),
        DmiStatus::Success | DmiStatus::Reserved => {}
    }
}
