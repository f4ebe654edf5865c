use thiserror::Error;

use crate::{config::ConfigError, pwm::PwmError, sensor::SensorError};

// The main daemon error type
#[derive(Debug, Error)]
pub enum LiquidfanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Pwm(#[from] PwmError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_transparent() {
        let err = LiquidfanError::from(SensorError::NotFound("kraken".to_string()));
        assert_eq!(
            err.to_string(),
            "no sensor device matching \"kraken\" was found"
        );

        let err = LiquidfanError::from(ConfigError::PeriodRange(0.0));
        assert_eq!(err.to_string(), "sample period must be positive, got 0");
    }
}
