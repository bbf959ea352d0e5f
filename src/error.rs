//! Errors surfaced by the TAP driver, the register codecs and the TAP operations.
use thiserror::Error;

use crate::bits::BitSeq;
use crate::cable::CableError;
use crate::statemachine::JtagState;

#[derive(Debug, Error)]
pub enum Error {
    /// A register read back with a bit set that the RISC-V Debug Spec hard-wires to zero.
    #[error("malformed {register} value 0x{value:08x}: {reason}")]
    MalformedRegister {
        register: &'static str,
        value: u32,
        reason: &'static str,
    },

    #[error("IR length is {found}, expected {expected}")]
    UnexpectedIrLength { found: usize, expected: usize },

    #[error("unknown IDCODE: 0x{0:08x}")]
    UnknownIdcode(u32),

    #[error("bypass failed: sent {sent}, received {received}")]
    BypassMismatch { sent: BitSeq, received: BitSeq },

    #[error("{register} is {expected} bits wide, got {found} bits")]
    WidthMismatch {
        register: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("TAP is in {found:?}, expected {expected}")]
    UnexpectedState {
        expected: &'static str,
        found: JtagState,
    },

    #[error("unable to detect the register length, TDO may be stuck low")]
    RegisterSizeUndetected,

    #[error("invalid character {0:?} in bit literal")]
    InvalidBitLiteral(char),

    #[error("bit sequence of {0} bits exceeds the supported width")]
    BitSeqTooLong(usize),

    #[error(transparent)]
    Cable(#[from] CableError),
}
