//! HC-SR04 ultrasonic ranging sensor.
//!
//! A 10 µs trigger pulse starts a burst; the echo line then stays high for
//! the round-trip time of the sound.  The echo is timed by polling in 1 µs
//! steps, so accuracy depends on how close `DelayNs` runs to nominal.
//!
//! ## Timing limits
//!
//! - echo must rise within 5.8 ms of the trigger
//! - echo longer than the configured maximum distance is rejected

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::RangingPort;

/// Round-trip microseconds per inch.
pub const US_ROUNDTRIP_IN: u32 = 146;
/// Round-trip microseconds per centimetre.
pub const US_ROUNDTRIP_CM: u32 = 57;
/// Rated range of the sensor.
pub const MAX_SENSOR_DISTANCE_CM: u32 = 500;

const MAX_SENSOR_DELAY_US: u32 = 5800;

pub struct Hcsr04<Trig, Echo, D> {
    trig: Trig,
    echo: Echo,
    delay: D,
    max_echo_us: u32,
}

impl<Trig, Echo, D> Hcsr04<Trig, Echo, D>
where
    Trig: OutputPin,
    Echo: InputPin,
    D: DelayNs,
{
    /// `max_distance_cm` is capped at [`MAX_SENSOR_DISTANCE_CM`].
    pub fn new(trig: Trig, echo: Echo, delay: D, max_distance_cm: u32) -> Self {
        let max_cm = max_distance_cm.min(MAX_SENSOR_DISTANCE_CM);
        Self {
            trig,
            echo,
            delay,
            max_echo_us: max_cm * US_ROUNDTRIP_CM + US_ROUNDTRIP_CM / 2,
        }
    }

    /// Echo width in microseconds, `None` if no echo or out of range.
    pub fn ping_us(&mut self) -> Option<u32> {
        self.trig.set_low().ok()?;
        self.delay.delay_us(4);
        self.trig.set_high().ok()?;
        self.delay.delay_us(10);
        self.trig.set_low().ok()?;

        let mut waited = 0;
        while !self.echo.is_high().ok()? {
            if waited >= MAX_SENSOR_DELAY_US {
                return None;
            }
            self.delay.delay_us(1);
            waited += 1;
        }

        let mut width = 0;
        while self.echo.is_high().ok()? {
            if width >= self.max_echo_us {
                return None;
            }
            self.delay.delay_us(1);
            width += 1;
        }
        Some(width)
    }

    pub fn ping_in(&mut self) -> Option<u32> {
        self.ping_us().map(|us| us / US_ROUNDTRIP_IN)
    }

    pub fn ping_cm(&mut self) -> Option<u32> {
        self.ping_us().map(|us| us / US_ROUNDTRIP_CM)
    }

    pub fn release(self) -> (Trig, Echo, D) {
        (self.trig, self.echo, self.delay)
    }
}

/// Ranging pins report inches.
impl<Trig, Echo, D> RangingPort for Hcsr04<Trig, Echo, D>
where
    Trig: OutputPin,
    Echo: InputPin,
    D: DelayNs,
{
    fn measure_distance(&mut self) -> Option<i32> {
        self.ping_in().map(|inches| inches as i32)
    }
}
