use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to scan sensor root {0:?}")]
    Scan(PathBuf, #[source] std::io::Error),
    #[error("no sensor device matching \"{0}\" was found")]
    NotFound(String),
    #[error("failed to read {0:?}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("malformed reading in {0:?}")]
    Malformed(PathBuf),
    #[error("device at {0:?} exposes no temperature readings")]
    NoReadings(PathBuf),
}

// One reading reported by the sensor device
#[derive(Debug, Clone, PartialEq)]
pub struct StatusField {
    pub label: String,
    pub value: f64,
    pub unit: &'static str,
}

// A hwmon device found during discovery
#[derive(Debug)]
pub struct SensorDevice {
    path: PathBuf,
    description: String,
}

// List the devices under the given hwmon root in a
// deterministic order
pub fn discover(root: &Path) -> Result<Vec<SensorDevice>, SensorError> {
    let mut devices = Vec::new();

    let entries =
        fs::read_dir(root).map_err(|err| SensorError::Scan(root.to_path_buf(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| SensorError::Scan(root.to_path_buf(), err))?;
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }

        // The hwmon name attribute doubles as the device description,
        // entries without one are not sensor devices
        let Ok(name) = fs::read_to_string(path.join("name")) else {
            continue;
        };

        devices.push(SensorDevice {
            path,
            description: name.trim().to_string(),
        });
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(devices)
}

// Find the first discovered device whose description contains
// the given pattern
pub fn find_device(root: &Path, pattern: &str) -> Result<SensorDevice, SensorError> {
    for device in discover(root)? {
        debug!("Discovered sensor device \"{}\"", device.description());

        if device.description().contains(pattern) {
            return Ok(device);
        }
    }

    Err(SensorError::NotFound(pattern.to_string()))
}

impl SensorDevice {
    pub fn description(&self) -> &str {
        &self.description
    }

    // Open the device, pinning its sysfs location for the lifetime
    // of the returned connection. Fails if the device exposes
    // no temperature readings
    pub fn connect(self) -> Result<SensorConnection, SensorError> {
        let conn = SensorConnection {
            path: self.path,
            description: self.description,
        };

        conn.status()?;

        Ok(conn)
    }
}

// An open sensor connection. Dropping it releases the device
#[derive(Debug)]
pub struct SensorConnection {
    path: PathBuf,
    description: String,
}

impl SensorConnection {
    pub fn description(&self) -> &str {
        &self.description
    }

    // A hwmon backed device has no handshake to perform, the
    // current readings double as the initialization status
    pub fn initialize(&mut self) -> Result<Vec<StatusField>, SensorError> {
        self.status()
    }

    // Read every temperature channel of the device, ordered by
    // channel number. By convention the first field holds the
    // liquid temperature
    pub fn status(&self) -> Result<Vec<StatusField>, SensorError> {
        let mut channels = Vec::new();

        let entries = fs::read_dir(&self.path)
            .map_err(|err| SensorError::Scan(self.path.clone(), err))?;

        for entry in entries {
            let entry =
                entry.map_err(|err| SensorError::Scan(self.path.clone(), err))?;
            let name = entry.file_name();

            let Some(name) = name.to_str() else {
                continue;
            };

            let index = name
                .strip_prefix("temp")
                .and_then(|n| n.strip_suffix("_input"))
                .and_then(|n| n.parse::<u32>().ok());

            if let Some(index) = index {
                channels.push(index);
            }
        }

        if channels.is_empty() {
            return Err(SensorError::NoReadings(self.path.clone()));
        }

        channels.sort_unstable();

        let mut status = Vec::with_capacity(channels.len());

        for index in channels {
            let input = self.path.join(format!("temp{index}_input"));

            // Values are reported in millidegrees Celsius
            let raw = fs::read_to_string(&input)
                .map_err(|err| SensorError::Read(input.clone(), err))?;
            let millideg: f64 = raw
                .trim()
                .parse()
                .map_err(|_| SensorError::Malformed(input.clone()))?;

            let label = fs::read_to_string(self.path.join(format!("temp{index}_label")))
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|_| format!("temp{index}"));

            status.push(StatusField {
                label,
                value: millideg / 1000.0,
                unit: "°C",
            });
        }

        Ok(status)
    }

    // The liquid temperature in degrees Celsius
    pub fn liquid_temp(&self) -> Result<f64, SensorError> {
        let status = self.status()?;

        let field = status
            .first()
            .ok_or_else(|| SensorError::NoReadings(self.path.clone()))?;

        Ok(field.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_device(root: &Path, name: &str, description: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("name"), format!("{description}\n")).unwrap();
        dir
    }

    #[test]
    fn discovers_devices_in_order() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "hwmon1", "kraken");
        fake_device(root.path(), "hwmon0", "amdgpu");

        let devices = discover(root.path()).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].description(), "amdgpu");
        assert_eq!(devices[1].description(), "kraken");
    }

    #[test]
    fn finds_device_by_description_substring() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "hwmon0", "amdgpu");
        let dir = fake_device(root.path(), "hwmon1", "kraken");
        fs::write(dir.join("temp1_input"), "27850\n").unwrap();

        let device = find_device(root.path(), "krak").unwrap();
        assert_eq!(device.description(), "kraken");

        assert!(matches!(
            find_device(root.path(), "corsair"),
            Err(SensorError::NotFound(..))
        ));
    }

    #[test]
    fn status_orders_fields_and_scales_values() {
        let root = tempfile::tempdir().unwrap();
        let dir = fake_device(root.path(), "hwmon0", "kraken");
        fs::write(dir.join("temp2_input"), "31000\n").unwrap();
        fs::write(dir.join("temp1_input"), "27850\n").unwrap();
        fs::write(dir.join("temp1_label"), "Liquid temperature\n").unwrap();

        let device = find_device(root.path(), "kraken").unwrap();
        let conn = device.connect().unwrap();

        let status = conn.status().unwrap();

        assert_eq!(status.len(), 2);
        assert_eq!(status[0].label, "Liquid temperature");
        assert!((status[0].value - 27.85).abs() < 1e-9);
        assert_eq!(status[1].label, "temp2");
        assert!((status[1].value - 31.0).abs() < 1e-9);

        assert!((conn.liquid_temp().unwrap() - 27.85).abs() < 1e-9);
    }

    #[test]
    fn connect_rejects_device_without_readings() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "hwmon0", "kraken");

        let device = find_device(root.path(), "kraken").unwrap();

        assert!(matches!(
            device.connect(),
            Err(SensorError::NoReadings(..))
        ));
    }

    #[test]
    fn malformed_reading_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = fake_device(root.path(), "hwmon0", "kraken");
        fs::write(dir.join("temp1_input"), "warm\n").unwrap();

        let device = find_device(root.path(), "kraken").unwrap();

        assert!(matches!(
            device.connect(),
            Err(SensorError::Malformed(..))
        ));
    }
}
