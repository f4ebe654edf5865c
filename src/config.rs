use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

// Compiled in defaults, matching the deployment this daemon
// was originally written for
const DEFAULT_SENSOR_ROOT: &str = "/sys/class/hwmon";
const DEFAULT_SENSOR_MATCH: &str = "kraken";
const DEFAULT_PWM_ROOT: &str = "/sys/devices/platform/it87.2624/hwmon";
const DEFAULT_PERIOD_SECS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open configuration file {0:?}")]
    Open(PathBuf, #[source] std::io::Error),
    #[error("failed to parse configuration file {0:?}")]
    Parse(PathBuf, #[source] serde_json::Error),
    #[error("channel \"{0}\": fan curve has no breakpoints")]
    EmptyCurve(String),
    #[error("channel \"{0}\": breakpoint temperatures must be non-decreasing")]
    UnsortedCurve(String),
    #[error("channel \"{0}\": duty {1} is outside the 0-100 range")]
    DutyRange(String, f64),
    #[error("sample period must be positive, got {0}")]
    PeriodRange(f64),
    #[error("minimum speed {0} is outside the 0-100 range")]
    MinSpeedRange(f64),
}

// Immutable daemon configuration, built once at startup and
// passed by reference into the controller
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub pwm: PwmConfig,

    pub channels: Vec<ChannelConfig>,

    // Seconds between two control cycles
    pub period_secs: f64,
    // Floor in percent for interpolated duty values
    pub min_speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub root: PathBuf,

    // Substring matched against the device description
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PwmConfig {
    pub root: PathBuf,

    // Explicit hwmon instance name, required when the root
    // holds more than one candidate
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    // Name of the pwm file driving this channel, e.g. "pwm2"
    pub pwm: String,

    // (temperature, duty percent) breakpoints sorted by temperature
    pub curve: Vec<(f64, f64)>,
}

impl Config {
    // Load the configuration file, falling back to the compiled in
    // defaults when no file exists at the given path
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let config = if path.exists() {
            debug!("Parsing config file at: {:?}", path);

            let file = File::open(path)
                .map_err(|err| ConfigError::Open(path.to_path_buf(), err))?;
            let buf = BufReader::new(file);

            serde_json::from_reader(buf)
                .map_err(|err| ConfigError::Parse(path.to_path_buf(), err))?
        } else {
            info!("No configuration file at {:?}, using built in defaults", path);

            Config::default()
        };

        config.validate()?;

        Ok(config)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.period_secs)
    }

    // The curve model trusts its breakpoints, everything is
    // checked here before the controller is built
    fn validate(&self) -> Result<(), ConfigError> {
        if self.period_secs <= 0.0 {
            return Err(ConfigError::PeriodRange(self.period_secs));
        }

        if !(0.0..=100.0).contains(&self.min_speed) {
            return Err(ConfigError::MinSpeedRange(self.min_speed));
        }

        for channel in self.channels.iter() {
            if channel.curve.is_empty() {
                return Err(ConfigError::EmptyCurve(channel.pwm.clone()));
            }

            for pair in channel.curve.windows(2) {
                if pair[1].0 < pair[0].0 {
                    return Err(ConfigError::UnsortedCurve(channel.pwm.clone()));
                }
            }

            for (_, duty) in channel.curve.iter() {
                if !(0.0..=100.0).contains(duty) {
                    return Err(ConfigError::DutyRange(channel.pwm.clone(), *duty));
                }
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            pwm: PwmConfig::default(),

            channels: vec![
                // CPU radiator fans
                ChannelConfig {
                    pwm: "pwm2".to_string(),
                    curve: vec![
                        (20.0, 40.0),
                        (30.0, 40.0),
                        (30.0, 60.0),
                        (60.0, 100.0),
                    ],
                },
                // Top case fans, parked below 27 degrees
                ChannelConfig {
                    pwm: "pwm3".to_string(),
                    curve: vec![
                        (20.0, 0.0),
                        (27.0, 0.0),
                        (27.0, 30.0),
                        (30.0, 30.0),
                        (30.0, 40.0),
                        (60.0, 100.0),
                    ],
                },
            ],

            period_secs: DEFAULT_PERIOD_SECS,
            min_speed: 0.0,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_SENSOR_ROOT),
            description: DEFAULT_SENSOR_MATCH.to_string(),
        }
    }
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_PWM_ROOT),
            instance: None,
        }
    }
}
