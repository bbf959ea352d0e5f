//! This crate talks to the Debug Transport Module of a RISC-V target through its JTAG TAP.  It
//! can detect the TAP's instruction register length, read and check the IDCODE, exercise
//! BYPASS as a wire-level sanity check, and read and write the `dtmcs` and `dmi` registers
//! described by the RISC-V Debug Spec.
//!
//! At the lowest level, the `Cable` trait shifts bits in and out of a hardware adapter, such
//! as an FT2232H in MPSSE mode or a set of GPIO pins.  `JtagSM` sits on a cable and keeps
//! track of the TAP state, getting from one state to another by the shortest TMS path.  It
//! implements `TapDriver`, which is all the protocol layer needs.
//!
//! `TapSession` owns a `TapDriver` and runs one protocol operation at a time, each starting
//! and ending in Test-Logic-Reset.  `TapSession::check_connection` chains the operations into
//! the usual startup check.
//!
//! # Example
//! ```no_run
//! use jtag_dtm::cable::mpsse::FtdiJtag;
//! use jtag_dtm::config::{DEFAULT_CLOCK_HZ, OLIMEX_ARM_USB_TINY_H};
//! use jtag_dtm::statemachine::JtagSM;
//! use jtag_dtm::taps::TapSession;
//!
//! let cable = FtdiJtag::open(&OLIMEX_ARM_USB_TINY_H, DEFAULT_CLOCK_HZ)?;
//! let jtag = JtagSM::new(Box::new(cable))?;
//! let mut tap = TapSession::new(jtag);
//! let report = tap.check_connection()?;
//!
//! let (_, dmi) = tap.read_dmi(report.dtmcontrol.abits())?;
//! println!("dmi: {:?}", dmi);
//! # Ok::<(), jtag_dtm::Error>(())
//! ```


#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod bits;
pub mod cable;
pub mod codec;
pub mod config;
pub mod error;
pub mod registers;
pub mod statemachine;
pub mod taps;
pub mod validate;

pub use error::Error;
