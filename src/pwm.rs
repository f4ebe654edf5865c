use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PwmError {
    #[error("failed to scan PWM root {0:?}")]
    Scan(PathBuf, #[source] std::io::Error),
    #[error("no hwmon instance under PWM root {0:?}")]
    NoInstance(PathBuf),
    #[error("multiple hwmon instances under {0:?} ({1}), set an explicit instance override")]
    AmbiguousInstance(PathBuf, String),
    #[error("hwmon instance \"{1}\" not found under {0:?}")]
    MissingInstance(PathBuf, String),
    #[error("failed to write \"{1}\" to {0:?}")]
    Write(PathBuf, String, #[source] std::io::Error),
}

// The hwmon directory holding the pwm control files
#[derive(Debug, Clone)]
pub struct PwmSink {
    dir: PathBuf,
}

impl PwmSink {
    // Resolve the active hwmon instance under the given root.
    // Candidates are sorted by name so resolution is deterministic,
    // zero candidates or more than one without an override is fatal
    pub fn resolve(root: &Path, instance: Option<&str>) -> Result<PwmSink, PwmError> {
        if let Some(name) = instance {
            let dir = root.join(name);

            if !dir.is_dir() {
                return Err(PwmError::MissingInstance(
                    root.to_path_buf(),
                    name.to_string(),
                ));
            }

            return Ok(PwmSink { dir });
        }

        let mut candidates = Vec::new();

        let entries =
            fs::read_dir(root).map_err(|err| PwmError::Scan(root.to_path_buf(), err))?;

        for entry in entries {
            let entry =
                entry.map_err(|err| PwmError::Scan(root.to_path_buf(), err))?;
            let path = entry.path();

            if path.is_dir() {
                candidates.push(path);
            }
        }

        candidates.sort();

        match candidates.len() {
            0 => Err(PwmError::NoInstance(root.to_path_buf())),
            1 => Ok(PwmSink {
                dir: candidates.remove(0),
            }),
            _ => {
                let names = candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(", ");

                Err(PwmError::AmbiguousInstance(root.to_path_buf(), names))
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Build a channel for the given pwm file name, e.g. "pwm2"
    pub fn channel(&self, name: &str) -> PwmChannel {
        PwmChannel {
            name: name.to_string(),
            value_path: self.dir.join(name),
            enable_path: self.dir.join(format!("{name}_enable")),
        }
    }
}

// One pwm output, addressed through its value and enable files
#[derive(Debug, Clone)]
pub struct PwmChannel {
    name: String,
    value_path: PathBuf,
    enable_path: PathBuf,
}

impl PwmChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    // Switch the channel between the firmware's automatic control
    // and manual duty control
    pub fn set_manual(&self, manual: bool) -> Result<(), PwmError> {
        let bit = if manual { "1" } else { "0" };

        write_value(&self.enable_path, bit)?;
        info!("Set manual control bit to '{}' for {}", bit, self.name);

        Ok(())
    }

    // Write a duty byte to the channel value file
    pub fn write_duty(&self, duty: u8) -> Result<(), PwmError> {
        write_value(&self.value_path, &duty.to_string())
    }
}

// hwmon attributes take whole value overwrites, never appends
fn write_value(path: &Path, value: &str) -> Result<(), PwmError> {
    fs::write(path, value)
        .map_err(|err| PwmError::Write(path.to_path_buf(), value.to_string(), err))
}
