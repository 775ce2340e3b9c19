//! # Userspace I/O for FPGA peripherals
//!
//! This crate provides a Rust interface to Linux
//! [UIO](https://www.kernel.org/doc/html/latest/driver-api/uio-howto.html)
//! devices: sysfs attribute discovery, register-window mapping, and the
//! irqcontrol/read interrupt protocol. On top of that sits a driver for the
//! Xilinx AXI GPIO IP core, the usual demonstration peripheral for wiring an
//! FPGA interrupt into a userspace loop.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axi_uio::{AxiGpio, Channel, Channels, UioDevice};
//!
//! fn main() -> anyhow::Result<()> {
//!     let device = UioDevice::find_by_name("gpio")?;
//!     let gpio = AxiGpio::new(device.map(0)?);
//!
//!     gpio.set_direction(Channel::One, u32::MAX);
//!     gpio.enable_interrupts(Channels::CH1);
//!
//!     loop {
//!         device.irq_enable()?;
//!         let total = device.wait()?;
//!         let pending = gpio.clear_pending(Channels::all());
//!         println!(
//!             "event #{total}: {pending:?}, inputs {:#010x}",
//!             gpio.read(Channel::One)
//!         );
//!     }
//! }
//! ```

pub mod device;
pub mod hardware;
pub mod mapping;
pub mod sysfs;

pub use device::{UioDevice, UioError, UioInfo};
pub use hardware::axi_gpio::{AxiGpio, Channel, Channels};
pub use mapping::{Mapping, Registers};
pub use sysfs::MapInfo;
