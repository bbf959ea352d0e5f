//! Fixed-length bit sequences as they travel over the wire.
//!
//! JTAG shifts registers least-significant bit first, so a `BitSeq` stores bit 0 (the first
//! bit shifted) at index 0.  The length is fixed when the sequence is built and survives
//! shifting, which is what lets the BYPASS check compare what went out with what came back.
use alloc::vec::Vec;
use core::fmt;

use bitvec::prelude::*;

use crate::error::Error;

/// Widest sequence that still converts losslessly to and from a `u128`.
pub const MAX_BITS: usize = 128;

/// Which end of a bit literal is the most significant bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOrder {
    /// `"00001"` is the value 1
    MsbFirst,
    /// `"00001"` is the value 16
    LsbFirst,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSeq {
    bits: BitVec<u8, Lsb0>,
}

fn check_len(len: usize) -> Result<(), Error> {
    if len > MAX_BITS {
        return Err(Error::BitSeqTooLong(len));
    }
    Ok(())
}

impl BitSeq {
    /// A sequence of `len` zero bits
    pub fn zeros(len: usize) -> Result<Self, Error> {
        check_len(len)?;
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; len],
        })
    }

    /// Build a `len`-bit sequence from the low bits of `value`.  Bits above `len` are dropped.
    pub fn from_value(value: u128, len: usize) -> Result<Self, Error> {
        let mut seq = Self::zeros(len)?;
        if len > 0 {
            seq.bits.store_le(value);
        }
        Ok(seq)
    }

    /// Parse a string of `0` and `1` characters.  Underscores are ignored and the length of
    /// the sequence is the number of digits.
    pub fn from_literal(literal: &str, order: BitOrder) -> Result<Self, Error> {
        let mut bits = BitVec::<u8, Lsb0>::new();
        for c in literal.chars() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                '_' => {}
                other => return Err(Error::InvalidBitLiteral(other)),
            }
        }
        check_len(bits.len())?;
        if order == BitOrder::MsbFirst {
            bits.reverse();
        }
        Ok(Self { bits })
    }

    /// Take the first `len` bits of `bytes`, least significant bit of the first byte first.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self, Error> {
        check_len(len)?;
        let view = bytes.view_bits::<Lsb0>();
        if view.len() < len {
            return Err(Error::WidthMismatch {
                register: "cable response",
                expected: len,
                found: view.len(),
            });
        }
        Ok(Self {
            bits: view[..len].to_bitvec(),
        })
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        self.bits.get(index).map(|b| *b)
    }

    /// The sequence as an unsigned integer
    pub fn value(&self) -> u128 {
        if self.bits.is_empty() {
            0
        } else {
            self.bits.load_le::<u128>()
        }
    }

    /// Logical shift towards the most significant bit.  The top `count` bits fall off and
    /// zeros enter at bit 0.
    pub fn shl(&mut self, count: usize) {
        if count >= self.bits.len() {
            self.bits.fill(false);
        } else {
            self.bits.shift_right(count);
        }
    }

    /// Logical shift towards bit 0.  The low `count` bits fall off and zeros enter at the top.
    pub fn shr(&mut self, count: usize) {
        if count >= self.bits.len() {
            self.bits.fill(false);
        } else {
            self.bits.shift_left(count);
        }
    }

    /// Pack into bytes for a cable.  Unused bits of the last byte are zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bits = self.bits.clone();
        bits.set_uninitialized(false);
        bits.into_vec()
    }

    /// Number of bits of the last byte from `to_bytes` that belong to the sequence, in the
    /// `1..=8` form the `Cable` trait expects.
    pub fn last_byte_bits(&self) -> u8 {
        match self.bits.len() % 8 {
            0 => 8,
            n => n as u8,
        }
    }
}

impl fmt::Display for BitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'b", self.bits.len())?;
        for bit in self.bits.iter().by_vals().rev() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitSeq({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn literal_order() {
        let msb = BitSeq::from_literal("00001", BitOrder::MsbFirst).unwrap();
        assert_eq!(msb.len(), 5);
        assert_eq!(msb.value(), 1);

        let lsb = BitSeq::from_literal("00001", BitOrder::LsbFirst).unwrap();
        assert_eq!(lsb.len(), 5);
        assert_eq!(lsb.value(), 0x10);

        let spaced = BitSeq::from_literal("1_0000", BitOrder::MsbFirst).unwrap();
        assert_eq!(spaced.value(), 0x10);
    }

    #[test]
    fn literal_rejects_garbage() {
        assert!(matches!(
            BitSeq::from_literal("0102", BitOrder::MsbFirst),
            Err(Error::InvalidBitLiteral('2'))
        ));
    }

    #[test]
    fn value_is_truncated_to_length() {
        let seq = BitSeq::from_value(0x1ff, 8).unwrap();
        assert_eq!(seq.value(), 0xff);
        assert!(matches!(BitSeq::from_value(0, 129), Err(Error::BitSeqTooLong(129))));
    }

    #[test]
    fn equality_needs_equal_length() {
        let a = BitSeq::from_value(5, 8).unwrap();
        let b = BitSeq::from_value(5, 9).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, BitSeq::from_literal("0000_0101", BitOrder::MsbFirst).unwrap());
    }

    #[test]
    fn shifts_keep_length() {
        let mut seq = BitSeq::from_value(0b1000_0001, 8).unwrap();
        seq.shl(1);
        assert_eq!(seq.len(), 8);
        assert_eq!(seq.value(), 0b0000_0010);

        seq.shr(2);
        assert_eq!(seq.len(), 8);
        assert_eq!(seq.value(), 0);

        let mut seq = BitSeq::from_value(0xff, 8).unwrap();
        seq.shr(8);
        assert_eq!(seq.value(), 0);
    }

    #[test]
    fn byte_packing() {
        let seq = BitSeq::from_value(0x1_2345, 17).unwrap();
        assert_eq!(seq.to_bytes(), [0x45, 0x23, 0x01]);
        assert_eq!(seq.last_byte_bits(), 1);
        assert_eq!(BitSeq::from_bytes(&[0x45, 0x23, 0xff], 17).unwrap(), seq);

        let seq = BitSeq::zeros(32).unwrap();
        assert_eq!(seq.last_byte_bits(), 8);

        assert!(matches!(
            BitSeq::from_bytes(&[0x00], 9),
            Err(Error::WidthMismatch { expected: 9, found: 8, .. })
        ));
    }

    #[test]
    fn display_is_msb_first() {
        let seq = BitSeq::from_value(0b0110, 4).unwrap();
        assert_eq!(seq.to_string(), "4'b0110");
    }
}
