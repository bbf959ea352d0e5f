//! Field codecs for the Debug Transport Module registers `dtmcs` and `dmi`.
//!
//! These are pure functions of the bits; nothing here touches a TAP.
use bitfield::bitfield;

use crate::bits::BitSeq;
use crate::error::Error;

/// Width of the `dtmcs` register
pub const DTMCS_WIDTH: usize = 32;

/// Bits of `dmi` besides the address field
pub const DMI_FIXED_BITS: usize = 33;

/// Offset of the `data` field in `dmi`
const DMI_DATA_OFFSET: u32 = 2;

/// Offset of the `address` field in `dmi`
const DMI_ADDRESS_OFFSET: u32 = 34;

/// `abits` is a 6-bit field, which bounds how wide `dmi` can be
pub const DMI_MAX_WIDTH: usize = DMI_FIXED_BITS + 0x3f;

/// Width of `dmi` on a DTM reporting `abits` address bits
pub const fn dmi_width(abits: u8) -> usize {
    DMI_FIXED_BITS + abits as usize
}

bitfield! {
    /// Field-decoded `dtmcs` (a.k.a. `dtmcontrol`) register value.  Only `decode` builds one.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct DtmControl(u32);
    impl Debug;

    pub u8, version, _: 3, 0;
    pub u8, abits, _: 9, 4;
    pub u8, dmistat, _: 11, 10;
    pub u8, idle, _: 14, 12;
    pub u8, dmireset, _: 16, 16;
    pub u8, dmihardreset, _: 17, 17;
}

impl DtmControl {
    pub fn decode(bits: &BitSeq) -> Result<Self, Error> {
        if bits.len() != DTMCS_WIDTH {
            return Err(Error::WidthMismatch {
                register: "dtmcs",
                expected: DTMCS_WIDTH,
                found: bits.len(),
            });
        }

        let value = bits.value() as u32;
        if (value >> 15) & 0x1 != 0 {
            return Err(Error::MalformedRegister {
                register: "dtmcs",
                value,
                reason: "bit 15 is hard-wired low",
            });
        }
        if value >> 18 != 0 {
            return Err(Error::MalformedRegister {
                register: "dtmcs",
                value,
                reason: "bits 18-31 must be zero",
            });
        }
        Ok(DtmControl(value))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Width of `dmi` on this DTM
    pub fn dmi_width(&self) -> usize {
        dmi_width(self.abits())
    }
}

/// Field-decoded `dmi` register value.  `len` is the register width the value was read from,
/// or will be written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DmiValue {
    pub len: usize,
    pub address: u64,
    pub data: u32,
    pub op: u8,
}

/// Request encodings for the `op` field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmiOp {
    Nop = 0,
    Read = 1,
    Write = 2,
}

/// Response meanings of the `op` field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmiStatus {
    Success = 0,
    Reserved = 1,
    Failed = 2,
    Busy = 3,
}

impl From<u8> for DmiStatus {
    fn from(op: u8) -> Self {
        match op & 0x3 {
            0 => DmiStatus::Success,
            1 => DmiStatus::Reserved,
            2 => DmiStatus::Failed,
            _ => DmiStatus::Busy,
        }
    }
}

impl DmiValue {
    /// A request sized for a DTM with `abits` address bits
    pub fn request(abits: u8, op: DmiOp, address: u64, data: u32) -> Self {
        Self {
            len: dmi_width(abits),
            address,
            data,
            op: op as u8,
        }
    }

    /// Decode from a `BitSeq`.  `len` is kept identical to that of `bits`.
    pub fn decode(bits: &BitSeq) -> Result<Self, Error> {
        if bits.len() > DMI_MAX_WIDTH {
            return Err(Error::WidthMismatch {
                register: "dmi",
                expected: DMI_MAX_WIDTH,
                found: bits.len(),
            });
        }

        let value = bits.value();
        Ok(Self {
            len: bits.len(),
            op: (value & 0x3) as u8,
            data: (value >> DMI_DATA_OFFSET) as u32,
            address: (value >> DMI_ADDRESS_OFFSET) as u64,
        })
    }

    /// Encode to a `len`-bit `BitSeq`
    pub fn encode(&self) -> Result<BitSeq, Error> {
        let value = (self.op as u128 & 0x3)
            | ((self.data as u128) << DMI_DATA_OFFSET)
            | ((self.address as u128) << DMI_ADDRESS_OFFSET);
        BitSeq::from_value(value, self.len)
    }

    /// What the `op` field means when the value came back from the DTM
    pub fn status(&self) -> DmiStatus {
        DmiStatus::from(self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dtmcs(value: u32) -> BitSeq {
        BitSeq::from_value(value as u128, 32).unwrap()
    }

    fn pack(version: u32, abits: u32, dmistat: u32, idle: u32, dmireset: u32, dmihardreset: u32)
        -> u32
    {
        version | abits << 4 | dmistat << 10 | idle << 12 | dmireset << 16 | dmihardreset << 17
    }

    #[test]
    fn dtmcontrol_fields() {
        for (version, abits, dmistat, idle, dmireset, dmihardreset) in [
            (1, 7, 0, 5, 0, 0),
            (0, 0, 0, 0, 0, 0),
            (15, 63, 3, 7, 1, 1),
            (1, 6, 2, 1, 1, 0),
        ] {
            let raw = pack(version, abits, dmistat, idle, dmireset, dmihardreset);
            let dtm = DtmControl::decode(&dtmcs(raw)).unwrap();
            assert_eq!(dtm.raw(), raw);
            assert_eq!(dtm.version() as u32, version);
            assert_eq!(dtm.abits() as u32, abits);
            assert_eq!(dtm.dmistat() as u32, dmistat);
            assert_eq!(dtm.idle() as u32, idle);
            assert_eq!(dtm.dmireset() as u32, dmireset);
            assert_eq!(dtm.dmihardreset() as u32, dmihardreset);
        }
    }

    #[test]
    fn dtmcontrol_reserved_bits() {
        let good = pack(1, 7, 0, 5, 0, 0);
        assert!(matches!(
            DtmControl::decode(&dtmcs(good | 1 << 15)),
            Err(Error::MalformedRegister { register: "dtmcs", .. })
        ));
        for bit in 18..32 {
            assert!(matches!(
                DtmControl::decode(&dtmcs(good | 1 << bit)),
                Err(Error::MalformedRegister { register: "dtmcs", .. })
            ));
        }
    }

    #[test]
    fn dtmcontrol_width() {
        let bits = BitSeq::from_value(0x71, 31).unwrap();
        assert!(matches!(
            DtmControl::decode(&bits),
            Err(Error::WidthMismatch { expected: 32, found: 31, .. })
        ));
    }

    #[test]
    fn dmi_decode_fields() {
        // abits = 7: address 0x11 (dmstatus), data 0x0040_0c82, op 2
        let raw: u128 = (0x11 << 34) | (0x0040_0c82 << 2) | 2;
        let bits = BitSeq::from_value(raw, dmi_width(7)).unwrap();
        let dmi = DmiValue::decode(&bits).unwrap();
        assert_eq!(dmi, DmiValue { len: 40, address: 0x11, data: 0x0040_0c82, op: 2 });
        assert_eq!(dmi.status(), DmiStatus::Failed);
        assert_eq!(dmi.encode().unwrap(), bits);
    }

    #[test]
    fn dmi_round_trip() {
        for (abits, op, address, data) in [
            (7u8, 0u8, 0x3fu64, 0xffff_ffffu32),
            (7, 3, 0x00, 0x0000_0000),
            (10, 1, 0x1ff, 0x1234_5678),
            (63, 2, 0x3fff_ffff_ffff_ffff, 0xdead_beef),
        ] {
            let value = DmiValue { len: dmi_width(abits), address, data, op };
            let bits = value.encode().unwrap();
            assert_eq!(bits.len(), dmi_width(abits));
            assert_eq!(DmiValue::decode(&bits).unwrap(), value);
        }
    }

    #[test]
    fn dmi_request() {
        let req = DmiValue::request(7, DmiOp::Write, 0x10, 0x8000_0001);
        assert_eq!(req.len, 40);
        assert_eq!(req.op, 2);
        let bits = req.encode().unwrap();
        assert_eq!(bits.value(), (0x10 << 34) | (0x8000_0001 << 2) | 2);
    }

    #[test]
    fn dmi_too_wide() {
        let bits = BitSeq::zeros(DMI_MAX_WIDTH + 1).unwrap();
        assert!(matches!(DmiValue::decode(&bits), Err(Error::WidthMismatch { .. })));
    }
}
