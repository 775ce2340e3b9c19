//! Interrupt demo for an AXI GPIO block behind UIO.
//!
//! Locates the GPIO device (by sysfs name, or a `/dev/uioN` path), maps its
//! register block, configures channel 1 as inputs with interrupts enabled,
//! then loops: unmask, block until the next input edge, report and
//! acknowledge.
//!
//! Usage: `gpio-irq [name-or-/dev/uioN [iterations]]`

use std::time::Duration;

use anyhow::{Context, Result};
use axi_uio::{AxiGpio, Channel, Channels, UioDevice};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "gpio".to_string());
    let iterations: u32 = match args.next() {
        Some(raw) => raw.parse().context("iteration count must be a number")?,
        None => 10,
    };

    let device = if target.starts_with("/dev/") {
        UioDevice::open_path(&target)?
    } else {
        UioDevice::find_by_name(&target)?
    };
    println!(
        "uio{}: {} (version {})",
        device.number(),
        device.name()?,
        device.version()?
    );

    let gpio = AxiGpio::new(device.map(0)?);
    gpio.set_direction(Channel::One, u32::MAX);
    gpio.enable_interrupts(Channels::CH1);

    for _ in 0..iterations {
        device.irq_enable()?;
        let Some(total) = device.wait_timeout(WAIT_TIMEOUT)? else {
            println!("no interrupt within {WAIT_TIMEOUT:?}");
            continue;
        };
        let pending = gpio.clear_pending(Channels::all());
        println!(
            "event #{total}: pending {pending:?}, channel 1 reads {:#010x}",
            gpio.read(Channel::One)
        );
    }

    gpio.disable_interrupts(Channels::all());
    device.irq_disable()?;
    Ok(())
}
