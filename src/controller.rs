use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::{select, sync::mpsc::Sender, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::{
    config::{Config, SensorConfig},
    errors::LiquidfanError,
    fan_curve::linear_curve::LinearCurve,
    pwm::{PwmChannel, PwmSink},
    sensor::{self, SensorConnection},
};

// One fan output paired with its curve and the duty byte
// last written to the hardware
struct ChannelState {
    curve: LinearCurve,
    pwm: PwmChannel,

    last_duty: Option<u8>,
}

pub struct Controller {
    conn: SensorConnection,
    channels: Vec<ChannelState>,

    // Time between two control cycles
    period: Duration,
}

impl Controller {
    // Bring the hardware to a controllable state: resolve the pwm
    // sink, switch every channel to manual control, then connect and
    // initialize the temperature sensor. A failure aborts before the
    // control loop ever runs
    pub fn start(config: &Config) -> Result<Controller, LiquidfanError> {
        let sink = PwmSink::resolve(&config.pwm.root, config.pwm.instance.as_deref())?;
        info!("Using hwmon instance at {:?}", sink.dir());

        let mut channels = Vec::with_capacity(config.channels.len());

        // Channels keep their configuration order, one cycle always
        // visits them deterministically
        for channel in config.channels.iter() {
            let pwm = sink.channel(&channel.pwm);
            pwm.set_manual(true)?;

            let curve = LinearCurve::new(&channel.curve, config.min_speed);
            debug!(
                "Channel \"{}\": {} breakpoint curve",
                channel.pwm,
                curve.points_num()
            );

            channels.push(ChannelState {
                curve,
                pwm,
                last_duty: None,
            });
        }

        let conn = match Self::attach_sensor(&config.sensor) {
            Ok(conn) => conn,
            Err(err) => {
                // The fans must not stay pinned in manual mode when
                // no controller is going to drive them
                restore_auto(&channels);

                return Err(err.into());
            }
        };

        Ok(Controller {
            conn,
            channels,
            period: config.period(),
        })
    }

    fn attach_sensor(config: &SensorConfig) -> Result<SensorConnection, sensor::SensorError> {
        let device = sensor::find_device(&config.root, &config.description)?;
        info!("Found sensor device \"{}\"", device.description());

        let mut conn = device.connect()?;

        let init_status = conn.initialize()?;
        debug!("Init status: {:?}", init_status);

        Ok(conn)
    }

    // Drive the sample, evaluate, dispatch cycle until the token is
    // cancelled or a cycle fails
    pub async fn run(
        mut self,
        run_token: CancellationToken,
        tx_err: Sender<anyhow::Error>,
    ) {
        info!("Controller: Running");

        // The first sample is taken right away, the period only
        // spaces out the cycles that follow
        if let Err(err) = self.update() {
            self.fail(err, &tx_err).await;
            return;
        }

        loop {
            select! {
                _ = run_token.cancelled() => {
                    info!("Controller: Quitting");

                    restore_auto(&self.channels);

                    break;
                },
                _ = sleep(self.period) => {
                    if let Err(err) = self.update() {
                        self.fail(err, &tx_err).await;

                        break;
                    }
                }
            }
        }
    }

    // Run one control cycle: a single temperature sample fans out
    // to every configured channel
    fn update(&mut self) -> Result<()> {
        let status = self
            .conn
            .status()
            .with_context(|| "Failed to read sensor status")?;

        debug!("Status: {:?}", status);

        // The liquid temperature is the first status field
        let temp = status
            .first()
            .map(|field| field.value)
            .ok_or_else(|| anyhow!("Sensor reported no readings"))?;

        for channel in self.channels.iter_mut() {
            channel.update(temp)?;
        }

        Ok(())
    }

    // A cycle failed: hand the fans back to the firmware before
    // forwarding the error to the main task
    async fn fail(&mut self, err: anyhow::Error, tx_err: &Sender<anyhow::Error>) {
        restore_auto(&self.channels);

        tx_err.send(err).await.unwrap_or_else(|err| {
            error!("Failed to send error over channel: {err}");
        });
    }
}

impl ChannelState {
    // Evaluate the curve and push the new duty to the hardware,
    // suppressing the write when the value is unchanged
    fn update(&mut self, temp: f64) -> Result<(u8, bool)> {
        let fraction = self.curve.duty_fraction(temp);
        let duty = (fraction * 255.0) as u8;

        trace!(
            "Channel {}: temp {temp}°C -> duty fraction {fraction}",
            self.pwm.name()
        );

        if self.last_duty == Some(duty) {
            return Ok((duty, false));
        }

        self.pwm.write_duty(duty).with_context(|| {
            format!("Failed to write duty for channel {}", self.pwm.name())
        })?;
        self.last_duty = Some(duty);

        info!(
            "Duty for fan channel \"{}\": {duty} ({:.1}%)",
            self.pwm.name(),
            fraction * 100.0
        );

        Ok((duty, true))
    }
}

// Hand every channel back to the firmware's automatic control.
// Best effort: a failing channel is logged, the rest are
// still restored
fn restore_auto(channels: &[ChannelState]) {
    for channel in channels.iter() {
        if let Err(err) = channel.pwm.set_manual(false) {
            error!(
                "Failed to restore automatic control for channel {}: {err}",
                channel.pwm.name()
            );
        }
    }
}
