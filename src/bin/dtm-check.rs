//! Run the connection check against a RISC-V DTM and print what was read.
use std::num::ParseIntError;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use jtag_dtm::cable::mpsse::FtdiJtag;
use jtag_dtm::config::{DeviceInfo, DEFAULT_CLOCK_HZ, OLIMEX_ARM_USB_TINY_H};
use jtag_dtm::statemachine::JtagSM;
use jtag_dtm::taps::TapSession;

/// Accepts `0x15ba` as well as `5562`
fn parse_u32(s: &str) -> Result<u32, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn parse_id(s: &str) -> Result<u16, String> {
    let value = parse_u32(s).map_err(|e| e.to_string())?;
    u16::try_from(value).map_err(|_| format!("{} does not fit in 16 bits", s))
}

#[derive(Parser)]
#[command(version, about)]
struct CliArguments {
    /// USB vendor ID of the adapter
    #[arg(long, value_parser = parse_id, default_value_t = OLIMEX_ARM_USB_TINY_H.vendor)]
    vendor: u16,
    /// USB product ID of the adapter
    #[arg(long, value_parser = parse_id, default_value_t = OLIMEX_ARM_USB_TINY_H.product)]
    product: u16,
    /// Adapter channel, counting from 1
    #[arg(long, default_value_t = OLIMEX_ARM_USB_TINY_H.interface)]
    interface: u8,
    /// TCK frequency in hertz
    #[arg(long, value_parser = parse_u32, default_value_t = DEFAULT_CLOCK_HZ)]
    clock: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = CliArguments::parse();
    let device = DeviceInfo {
        vendor: args.vendor,
        product: args.product,
        interface: args.interface,
    };

    let cable = FtdiJtag::open(&device, args.clock)
        .with_context(|| format!("opening adapter {:04x}:{:04x}", device.vendor, device.product))?;
    let jtag = JtagSM::new(Box::new(cable))?;
    let mut tap = TapSession::new(jtag);

    let report = tap.check_connection()?;
    info!("IR length: {}", report.ir_length);
    info!("IDCODE: 0x{:08x} ({})", report.idcode, report.device);
    info!("BYPASS: {}", report.bypass);
    info!("dtmcontrol: 0x{:08x} {:?}", report.dtmcontrol_raw, report.dtmcontrol);
    info!("dmi: 0x{:x} {:?}", report.dmi_raw, report.dmi);
    Ok(())
}
