//! Lists every UIO device in sysfs with its regions and event count.

use anyhow::Result;
use axi_uio::UioDevice;

fn main() -> Result<()> {
    env_logger::init();

    let devices = UioDevice::list()?;
    if devices.is_empty() {
        println!("no UIO devices found");
        return Ok(());
    }

    for info in devices {
        println!("uio{}: {} (version {})", info.number, info.name, info.version);
        println!("  events: {}", info.event_count()?);
        for (index, map) in info.map_infos()?.iter().enumerate() {
            println!(
                "  map{index}: {:12} addr {:#010x} size {:#x} offset {:#x}",
                if map.name.is_empty() { "-" } else { map.name.as_str() },
                map.addr,
                map.size,
                map.offset
            );
        }
    }
    Ok(())
}
