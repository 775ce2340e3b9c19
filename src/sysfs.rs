//! Readers for the UIO sysfs attribute tree.
//!
//! The kernel publishes per-device metadata under `/sys/class/uio/uioN/`:
//! `name` and `version` strings, the decimal interrupt `event` counter, and
//! one `maps/mapM/` directory per mappable region carrying `name`, `addr`,
//! `size` and `offset` attributes. Addresses and sizes are `0x`-prefixed hex;
//! the event counter is plain decimal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Root of the UIO class tree.
pub const SYSFS_CLASS_UIO: &str = "/sys/class/uio";

#[derive(thiserror::Error, Debug)]
pub enum SysfsError {
    /// Attribute file missing or unreadable.
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Attribute contents did not parse as a number.
    #[error("parsing {}: {value:?} is not a number", .path.display())]
    Parse { path: PathBuf, value: String },
}

/// Metadata for one mappable region of a UIO device, as published under
/// `maps/mapM/` in sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapInfo {
    /// Region name. Platform devices often leave this empty.
    pub name: String,
    /// Physical base address.
    pub addr: u64,
    /// Region size in bytes.
    pub size: u64,
    /// Offset of the valid data from the start of the mapping.
    pub offset: u64,
}

/// Reads an attribute file and strips the trailing newline.
pub fn read_attr(dir: &Path, attr: &str) -> Result<String, SysfsError> {
    let path = dir.join(attr);
    let raw = fs::read_to_string(&path).map_err(|source| SysfsError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(raw.trim_end().to_string())
}

/// Reads a numeric attribute, accepting `0x`-prefixed hex or plain decimal.
pub fn read_numeric_attr(dir: &Path, attr: &str) -> Result<u64, SysfsError> {
    let value = read_attr(dir, attr)?;
    parse_number(&value).ok_or_else(|| SysfsError::Parse {
        path: dir.join(attr),
        value,
    })
}

fn parse_number(s: &str) -> Option<u64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Reads the metadata of region `index`, or `None` if the device has no such
/// region.
pub fn read_map_info(dev_dir: &Path, index: usize) -> Result<Option<MapInfo>, SysfsError> {
    let map_dir = dev_dir.join("maps").join(format!("map{index}"));
    if !map_dir.is_dir() {
        return Ok(None);
    }
    // The name attribute may be an empty file; treat a missing one the same.
    let name = read_attr(&map_dir, "name").unwrap_or_default();
    Ok(Some(MapInfo {
        name,
        addr: read_numeric_attr(&map_dir, "addr")?,
        size: read_numeric_attr(&map_dir, "size")?,
        offset: read_numeric_attr(&map_dir, "offset")?,
    }))
}

/// Reads all region metadata in index order.
///
/// Region indices are dense, so enumeration stops at the first missing
/// `mapM` directory. A device without mappable memory yields an empty vec.
pub fn read_map_infos(dev_dir: &Path) -> Result<Vec<MapInfo>, SysfsError> {
    let mut maps = Vec::new();
    while let Some(info) = read_map_info(dev_dir, maps.len())? {
        maps.push(info);
    }
    Ok(maps)
}

/// Lists the device numbers present under a UIO class directory, sorted.
///
/// A missing class directory means no UIO driver is loaded and yields an
/// empty list rather than an error.
pub fn device_numbers(root: &Path) -> Result<Vec<usize>, SysfsError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SysfsError::Read {
                path: root.to_path_buf(),
                source,
            })
        }
    };

    let mut numbers = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SysfsError::Read {
            path: root.to_path_buf(),
            source,
        })?;
        if let Some(n) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.strip_prefix("uio"))
            .and_then(|s| s.parse().ok())
        {
            numbers.push(n);
        }
    }
    numbers.sort_unstable();
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("axi-uio-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_map(dev_dir: &Path, index: usize, name: &str, addr: &str, size: &str) {
        let map_dir = dev_dir.join("maps").join(format!("map{index}"));
        fs::create_dir_all(&map_dir).unwrap();
        fs::write(map_dir.join("name"), format!("{name}\n")).unwrap();
        fs::write(map_dir.join("addr"), format!("{addr}\n")).unwrap();
        fs::write(map_dir.join("size"), format!("{size}\n")).unwrap();
        fs::write(map_dir.join("offset"), "0x0\n").unwrap();
    }

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_number("0x41200000"), Some(0x4120_0000));
        assert_eq!(parse_number("0X10"), Some(0x10));
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("0xzz"), None);
    }

    #[test]
    fn attr_is_trimmed() {
        let dir = fixture("attr");
        fs::write(dir.join("name"), "gpio\n").unwrap();
        assert_eq!(read_attr(&dir, "name").unwrap(), "gpio");
    }

    #[test]
    fn missing_attr_names_the_path() {
        let dir = fixture("missing");
        let err = read_attr(&dir, "version").unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn bad_number_reports_the_value() {
        let dir = fixture("badnum");
        fs::write(dir.join("event"), "not-a-number\n").unwrap();
        match read_numeric_attr(&dir, "event") {
            Err(SysfsError::Parse { value, .. }) => assert_eq!(value, "not-a-number"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn reads_map_tree_in_order() {
        let dev = fixture("maps");
        write_map(&dev, 0, "gpio", "0x41200000", "0x10000");
        write_map(&dev, 1, "", "0x41210000", "0x1000");

        let maps = read_map_infos(&dev).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(
            maps[0],
            MapInfo {
                name: "gpio".to_string(),
                addr: 0x4120_0000,
                size: 0x10000,
                offset: 0,
            }
        );
        assert_eq!(maps[1].name, "");
        assert_eq!(maps[1].size, 0x1000);
    }

    #[test]
    fn missing_maps_dir_is_empty() {
        let dev = fixture("nomaps");
        assert!(read_map_infos(&dev).unwrap().is_empty());
    }

    #[test]
    fn device_numbers_are_sorted_and_filtered() {
        let root = fixture("class");
        for entry in ["uio2", "uio0", "uio10", "uevent", "uiox"] {
            fs::create_dir_all(root.join(entry)).unwrap();
        }
        assert_eq!(device_numbers(&root).unwrap(), vec![0, 2, 10]);
    }

    #[test]
    fn missing_class_dir_is_empty() {
        let root = std::env::temp_dir().join("axi-uio-no-such-class");
        assert!(device_numbers(&root).unwrap().is_empty());
    }
}
