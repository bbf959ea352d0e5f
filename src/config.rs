//! Adapter identity and clocking.  None of this is part of the protocol; it only says which
//! adapter to open and how fast to drive it.

/// Identifies an FTDI-based USB-JTAG adapter.  `interface` counts from 1, so interface 1 is
/// the "A" channel of a dual-channel part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor: u16,
    pub product: u16,
    pub interface: u8,
}

/// Olimex ARM-USB-TINY-H
pub const OLIMEX_ARM_USB_TINY_H: DeviceInfo = DeviceInfo {
    vendor: 0x15ba,
    product: 0x002a,
    interface: 1,
};

/// TCK frequency in hertz
pub const DEFAULT_CLOCK_HZ: u32 = 100_000;

impl Default for DeviceInfo {
    fn default() -> Self {
        OLIMEX_ARM_USB_TINY_H
    }
}
