//! Connection checks, typically run at startup before anything more elaborate is attempted.
use log::info;

use crate::bits::BitSeq;
use crate::codec::{DmiValue, DtmControl};
use crate::error::Error;
use crate::registers::KnownIdcode;
use crate::statemachine::TapDriver;
use crate::taps::{IdcodeSource, TapSession};

/// Everything `check_connection` read along the way
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionReport {
    pub ir_length: usize,
    /// IDCODE as selected by Test-Logic-Reset
    pub reset_idcode: u32,
    /// IDCODE after shifting the IDCODE instruction
    pub idcode: u32,
    pub device: KnownIdcode,
    pub bypass: BitSeq,
    pub dtmcontrol_raw: u32,
    pub dtmcontrol: DtmControl,
    pub dmi_raw: u128,
    pub dmi: DmiValue,
}

impl<D: TapDriver> TapSession<D> {
    /// Check for a valid connection.  The steps run in order and the first failure is
    /// returned as is:
    ///
    /// 1. the instruction register is 5 bits
    /// 2. IDCODE read from the reset state is a known device
    /// 3. IDCODE read through the IDCODE instruction is a known device
    /// 4. BYPASS returns the default pattern
    /// 5. `dtmcs` decodes
    /// 6. `dmi` reads at the width `dtmcs` reports
    pub fn check_connection(&mut self) -> Result<ConnectionReport, Error> {
        info!("Checking Connection");

        info!("Detecting IR Length");
        let ir_length = self.detect_ir_length()?;

        info!("Reading the reset-value data-register (IDCODE)");
        let (reset_idcode, _) = self.read_idcode(IdcodeSource::Reset)?;

        info!("Reading IDCODE");
        let (idcode, device) = self.read_idcode(IdcodeSource::Instruction)?;

        info!("Testing BYPASS");
        let bypass = self.bypass(None)?;

        info!("Reading DTMCONTROL");
        let (dtmcontrol_raw, dtmcontrol) = self.read_dtmcontrol()?;

        info!("Reading DMI");
        let (dmi_raw, dmi) = self.read_dmi(dtmcontrol.abits())?;

        // TODO: issue a real Debug Module request through write_dmi once there is one worth
        // validating against, e.g. reading dmstatus
        info!("Connection Checks Succeeded");
        Ok(ConnectionReport {
            ir_length,
            reset_idcode,
            idcode,
            device,
            bypass,
            dtmcontrol_raw,
            dtmcontrol,
            dmi_raw,
            dmi,
        })
    }
}
