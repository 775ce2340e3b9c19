//! UIO device handles: discovery, attributes, mapping and interrupt control.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::mapping::Mapping;
use crate::sysfs::{self, MapInfo, SysfsError};

#[derive(thiserror::Error, Debug)]
pub enum UioError {
    /// Device node could not be opened.
    #[error("opening {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No device in `/sys/class/uio` carries the requested name.
    #[error("no UIO device named {0:?}")]
    NotFound(String),

    /// Path does not look like a `/dev/uioN` node.
    #[error("{} is not a UIO device node", .path.display())]
    BadPath { path: PathBuf },

    /// The device does not expose the requested region.
    #[error("device has no map{0}")]
    NoSuchMap(usize),

    #[error("mapping map{index}: {source}")]
    Mmap {
        index: usize,
        #[source]
        source: nix::Error,
    },

    /// Reading the 4-byte event count failed. `EIO` here usually means the
    /// device has no interrupt wired.
    #[error("waiting for interrupt: {0}")]
    Wait(#[source] io::Error),

    /// Writing the 4-byte irqcontrol value failed.
    #[error("interrupt control: {0}")]
    IrqControl(#[source] io::Error),

    #[error("polling device: {0}")]
    Poll(#[source] nix::Error),

    #[error(transparent)]
    Sysfs(#[from] SysfsError),
}

/// A UIO device as listed in sysfs, prior to opening its node.
#[derive(Debug, Clone)]
pub struct UioInfo {
    /// Device number `N` in `uioN`.
    pub number: usize,
    /// The `name` attribute, usually the device-tree node name.
    pub name: String,
    /// The `version` attribute supplied by the kernel driver.
    pub version: String,
}

impl UioInfo {
    fn sysfs_dir(&self) -> PathBuf {
        Path::new(sysfs::SYSFS_CLASS_UIO).join(format!("uio{}", self.number))
    }

    /// Total number of interrupt events the device has raised.
    pub fn event_count(&self) -> Result<u64, UioError> {
        Ok(sysfs::read_numeric_attr(&self.sysfs_dir(), "event")?)
    }

    /// Metadata of every mappable region.
    pub fn map_infos(&self) -> Result<Vec<MapInfo>, UioError> {
        Ok(sysfs::read_map_infos(&self.sysfs_dir())?)
    }

    /// Opens the matching `/dev/uioN` node.
    pub fn open(&self) -> Result<UioDevice, UioError> {
        UioDevice::open(self.number)
    }
}

/// An opened UIO device.
///
/// Owns the `/dev/uioN` file descriptor. Interrupt control goes through
/// 4-byte native-endian writes (irqcontrol) and reads (event count) on that
/// descriptor; register access goes through [`Mapping`]s obtained from
/// [`UioDevice::map`].
pub struct UioDevice {
    number: usize,
    file: File,
    sysfs_dir: PathBuf,
}

impl UioDevice {
    /// Opens `/dev/uioN` read/write.
    pub fn open(number: usize) -> Result<UioDevice, UioError> {
        Self::open_node(PathBuf::from(format!("/dev/uio{number}")), number)
    }

    /// Opens an explicit device node such as `/dev/uio0`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<UioDevice, UioError> {
        let path = path.as_ref();
        let number = number_from_path(path).ok_or_else(|| UioError::BadPath {
            path: path.to_path_buf(),
        })?;
        Self::open_node(path.to_path_buf(), number)
    }

    fn open_node(path: PathBuf, number: usize) -> Result<UioDevice, UioError> {
        debug!("opening UIO device {}", path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| UioError::Open { path, source })?;
        Ok(UioDevice {
            number,
            file,
            sysfs_dir: Path::new(sysfs::SYSFS_CLASS_UIO).join(format!("uio{number}")),
        })
    }

    /// Scans sysfs for a device whose `name` attribute matches and opens it.
    ///
    /// The lowest-numbered match wins; designs instantiating several
    /// identical IPs expose them under the same name.
    pub fn find_by_name(name: &str) -> Result<UioDevice, UioError> {
        for candidate in Self::list()? {
            if candidate.name == name {
                info!("found UIO device {name:?} at /dev/uio{}", candidate.number);
                return candidate.open();
            }
        }
        Err(UioError::NotFound(name.to_string()))
    }

    /// Enumerates all UIO devices present in sysfs.
    pub fn list() -> Result<Vec<UioInfo>, UioError> {
        let root = Path::new(sysfs::SYSFS_CLASS_UIO);
        let mut devices = Vec::new();
        for number in sysfs::device_numbers(root)? {
            let dir = root.join(format!("uio{number}"));
            devices.push(UioInfo {
                number,
                name: sysfs::read_attr(&dir, "name")?,
                version: sysfs::read_attr(&dir, "version")?,
            });
        }
        Ok(devices)
    }

    /// Device number `N` in `uioN`.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The device's `name` attribute.
    pub fn name(&self) -> Result<String, UioError> {
        Ok(sysfs::read_attr(&self.sysfs_dir, "name")?)
    }

    /// The device's `version` attribute.
    pub fn version(&self) -> Result<String, UioError> {
        Ok(sysfs::read_attr(&self.sysfs_dir, "version")?)
    }

    /// Total number of interrupt events the device has raised.
    pub fn event_count(&self) -> Result<u64, UioError> {
        Ok(sysfs::read_numeric_attr(&self.sysfs_dir, "event")?)
    }

    /// Metadata of region `index`, or `None` if the device has no such region.
    pub fn map_info(&self, index: usize) -> Result<Option<MapInfo>, UioError> {
        Ok(sysfs::read_map_info(&self.sysfs_dir, index)?)
    }

    /// Metadata of every mappable region.
    pub fn map_infos(&self) -> Result<Vec<MapInfo>, UioError> {
        Ok(sysfs::read_map_infos(&self.sysfs_dir)?)
    }

    /// Memory-maps region `index` of the device.
    pub fn map(&self, index: usize) -> Result<Mapping, UioError> {
        let info = self.map_info(index)?.ok_or(UioError::NoSuchMap(index))?;
        debug!(
            "uio{}: mapping map{index} ({:#x} bytes at {:#x})",
            self.number, info.size, info.addr
        );
        Mapping::new(&self.file, index, &info).map_err(|source| UioError::Mmap { index, source })
    }

    /// Unmasks the device interrupt via the irqcontrol protocol.
    ///
    /// Drivers like `uio_pdrv_genirq` disable the interrupt after delivering
    /// an event, so this must be called before each [`UioDevice::wait`].
    pub fn irq_enable(&self) -> Result<(), UioError> {
        self.irq_control(1)
    }

    /// Masks the device interrupt.
    pub fn irq_disable(&self) -> Result<(), UioError> {
        self.irq_control(0)
    }

    fn irq_control(&self, value: u32) -> Result<(), UioError> {
        (&self.file)
            .write_all(&value.to_ne_bytes())
            .map_err(UioError::IrqControl)
    }

    /// Blocks until the next interrupt and returns the cumulative event count.
    pub fn wait(&self) -> Result<u32, UioError> {
        let mut buf = [0u8; 4];
        (&self.file).read_exact(&mut buf).map_err(UioError::Wait)?;
        Ok(u32::from_ne_bytes(buf))
    }

    /// Like [`UioDevice::wait`], but gives up after `timeout`.
    ///
    /// Returns `None` on timeout. Uses poll(2) so the descriptor stays in
    /// blocking mode for plain `wait()`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<u32>, UioError> {
        let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
        let timeout = PollTimeout::try_from(timeout).unwrap_or(PollTimeout::MAX);
        let ready = poll(&mut fds, timeout).map_err(UioError::Poll)?;
        if ready == 0 {
            return Ok(None);
        }
        self.wait().map(Some)
    }
}

fn number_from_path(path: &Path) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix("uio")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_number_comes_from_the_node_name() {
        assert_eq!(number_from_path(Path::new("/dev/uio0")), Some(0));
        assert_eq!(number_from_path(Path::new("/dev/uio12")), Some(12));
        assert_eq!(number_from_path(Path::new("uio3")), Some(3));
    }

    #[test]
    fn non_uio_paths_are_rejected() {
        assert_eq!(number_from_path(Path::new("/dev/mem")), None);
        assert_eq!(number_from_path(Path::new("/dev/uio")), None);
        assert_eq!(number_from_path(Path::new("/dev/uiox")), None);
        assert_eq!(number_from_path(Path::new("/dev/")), None);
    }
}
