//! JTAG registers spelled out by the RISC-V Debug Spec, and the IDCODEs we are willing to talk to.
use core::fmt;

use crate::bits::BitSeq;
use crate::error::Error;

/// Width of the instruction register on every TAP this crate supports
pub const IR_LENGTH: usize = 5;

/// Instruction register opcodes of a RISC-V Debug Transport Module
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Bypass,
    Idcode,
    Dtmcs,
    Dmi,
}

impl Instruction {
    pub const fn code(self) -> u8 {
        match self {
            Instruction::Bypass => 0x00,
            Instruction::Idcode => 0x01,
            Instruction::Dtmcs => 0x10,
            Instruction::Dmi => 0x11,
        }
    }

    /// Decode a 5-bit opcode.  BYPASS is also available at the reserved opcodes 0x12 through
    /// 0x1F.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 | 0x12..=0x1f => Some(Instruction::Bypass),
            0x01 => Some(Instruction::Idcode),
            0x10 => Some(Instruction::Dtmcs),
            0x11 => Some(Instruction::Dmi),
            _ => None,
        }
    }

    /// The opcode as it is shifted into the instruction register
    pub fn bits(self) -> Result<BitSeq, Error> {
        BitSeq::from_value(self.code() as u128, IR_LENGTH)
    }
}

/// Known-good IDCODE values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownIdcode {
    /// Default ID
    Default,
    /// SiFive FE310, as on the SparkFun RED-V board
    Sifive,
}

impl KnownIdcode {
    pub const ALL: [KnownIdcode; 2] = [KnownIdcode::Default, KnownIdcode::Sifive];

    pub const fn code(self) -> u32 {
        match self {
            KnownIdcode::Default => 0x0000_0001,
            KnownIdcode::Sifive => 0x2000_0913,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            KnownIdcode::Default => "DEFAULT",
            KnownIdcode::Sifive => "SIFIVE",
        }
    }

    /// Look `code` up in the allow-list.  Anything else is `Error::UnknownIdcode`.
    pub fn lookup(code: u32) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|known| known.code() == code)
            .ok_or(Error::UnknownIdcode(code))
    }
}

impl fmt::Display for KnownIdcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// IEEE 1149.1 fields of an IDCODE, for logging what came back
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdcodeFields {
    pub version: u8,
    pub part_number: u16,
    pub manufacturer: u16,
    /// Always set on a real IDCODE
    pub marker: bool,
}

impl From<u32> for IdcodeFields {
    fn from(id: u32) -> Self {
        Self {
            version: ((id >> 28) & 0xf) as u8,
            part_number: ((id >> 12) & 0xffff) as u16,
            manufacturer: ((id >> 1) & 0x7ff) as u16,
            marker: id & 1 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_bits() {
        assert_eq!(Instruction::Idcode.bits().unwrap().value(), 1);
        assert_eq!(Instruction::Dtmcs.bits().unwrap().value(), 0x10);
        assert_eq!(Instruction::Dmi.bits().unwrap().len(), IR_LENGTH);
        assert_eq!(Instruction::Bypass.bits().unwrap(), BitSeq::zeros(IR_LENGTH).unwrap());
    }

    #[test]
    fn instruction_codes_round_trip() {
        for inst in [Instruction::Bypass, Instruction::Idcode, Instruction::Dtmcs, Instruction::Dmi] {
            assert_eq!(Instruction::from_code(inst.code()), Some(inst));
        }
        assert_eq!(Instruction::from_code(0x1f), Some(Instruction::Bypass));
        assert_eq!(Instruction::from_code(0x12), Some(Instruction::Bypass));
        assert_eq!(Instruction::from_code(0x02), None);
    }

    #[test]
    fn idcode_allow_list() {
        assert_eq!(KnownIdcode::lookup(0x2000_0913).unwrap().label(), "SIFIVE");
        assert_eq!(KnownIdcode::lookup(0x0000_0001).unwrap().label(), "DEFAULT");
        assert!(matches!(KnownIdcode::lookup(0xdead_beef), Err(Error::UnknownIdcode(0xdead_beef))));
    }

    #[test]
    fn idcode_fields() {
        let fields = IdcodeFields::from(0x2000_0913);
        assert_eq!(fields.version, 2);
        assert_eq!(fields.part_number, 0x0000);
        assert_eq!(fields.manufacturer, 0x489);
        assert!(fields.marker);
    }
}
