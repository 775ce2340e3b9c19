//! Drivers for FPGA peripherals reached through a UIO register window.

pub mod axi_gpio;
