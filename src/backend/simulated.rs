//! Simulated temperature controller
//!
//! Stands in for a real instrument driver. The model is a cryostat whose
//! sensor temperature ramps towards the setpoint at a fixed rate while the
//! heater and the needle valve respond to the remaining error.

use crate::backend::{validate_setpoint, TemperatureFeed};
use crate::config::DEFAULT_HEATER_VOLTAGE_LIMIT;
use crate::error::{Result, ThermoVisError};
use crate::types::Reading;
use chrono::Utc;
use std::time::Instant;

/// Default ramp rate in K/min
const DEFAULT_RAMP_RATE: f64 = 2.0;

/// Temperature the simulation starts at, in K
const ROOM_TEMPERATURE: f64 = 295.0;

/// Simulated controller state
#[derive(Debug, Clone)]
pub struct SimulatedController {
    connected: bool,
    temperature: f64,
    setpoint: f64,
    /// K/min
    ramp_rate: f64,
    heater_voltage_limit: f64,
    noise_amplitude: f64,
    rng_state: u64,
    last_step: Option<Instant>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self {
            connected: false,
            temperature: ROOM_TEMPERATURE,
            setpoint: ROOM_TEMPERATURE,
            ramp_rate: DEFAULT_RAMP_RATE,
            heater_voltage_limit: DEFAULT_HEATER_VOLTAGE_LIMIT,
            noise_amplitude: 0.0,
            rng_state: 0x2545_f491_4f6c_dd1d,
            last_step: None,
        }
    }

    /// Start at `kelvin` with the setpoint equal to it
    pub fn with_temperature(mut self, kelvin: f64) -> Self {
        self.temperature = kelvin;
        self.setpoint = kelvin;
        self
    }

    pub fn with_ramp_rate(mut self, kelvin_per_minute: f64) -> Self {
        self.ramp_rate = kelvin_per_minute.abs();
        self
    }

    pub fn with_heater_voltage_limit(mut self, volts: f64) -> Self {
        self.heater_voltage_limit = volts;
        self
    }

    /// Add uniform noise of +/- `amplitude` K to reported temperatures
    pub fn with_noise(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude.abs();
        self
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Advance the model by `dt_secs` seconds
    pub fn step(&mut self, dt_secs: f64) {
        let max_change = self.ramp_rate * dt_secs.max(0.0) / 60.0;
        let error = self.setpoint - self.temperature;
        self.temperature += error.clamp(-max_change, max_change);
    }

    /// Heater output in percent for the current error
    pub fn heater_percent(&self) -> f64 {
        let error = self.setpoint - self.temperature;
        // Holding a low temperature against the cooling still needs some heat
        let holding = 100.0 * (1.0 - self.setpoint / ROOM_TEMPERATURE).clamp(0.0, 1.0) * 0.2;
        (holding + 8.0 * error).clamp(0.0, 100.0)
    }

    /// Needle valve opening in percent for the current error
    pub fn flow_percent(&self) -> f64 {
        let error = self.setpoint - self.temperature;
        (25.0 - 6.0 * error).clamp(0.0, 100.0)
    }

    /// Next value in [0, 1) from a xorshift generator
    fn next_random(&mut self) -> f64 {
        let mut s = self.rng_state;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.rng_state = s;
        (s >> 11) as f64 / (1u64 << 53) as f64
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_step {
            self.step(now.duration_since(last).as_secs_f64());
        }
        self.last_step = Some(now);
    }
}

impl TemperatureFeed for SimulatedController {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        self.last_step = Some(Instant::now());
        tracing::info!("Simulated controller connected at {:.2} K", self.temperature);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.last_step = None;
    }

    fn read(&mut self) -> Result<Reading> {
        if !self.connected {
            return Err(ThermoVisError::Feed("Simulated controller not connected".to_string()));
        }
        self.advance_clock();

        let noise = if self.noise_amplitude > 0.0 {
            (self.next_random() - 0.5) * 2.0 * self.noise_amplitude
        } else {
            0.0
        };
        let heater = self.heater_percent();
        Ok(Reading::new(
            Utc::now(),
            (self.temperature + noise).max(0.0),
            heater,
            self.flow_percent(),
        )
        .with_setpoint(self.setpoint)
        .with_heater_volt(heater / 100.0 * self.heater_voltage_limit))
    }

    fn set_setpoint(&mut self, kelvin: f64) -> Result<()> {
        if !self.connected {
            return Err(ThermoVisError::Feed("Simulated controller not connected".to_string()));
        }
        self.setpoint = validate_setpoint(kelvin)?;
        Ok(())
    }

    fn name(&self) -> String {
        "simulated controller".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_requires_connection() {
        let mut sim = SimulatedController::new();
        assert!(sim.read().is_err());
        sim.connect().unwrap();
        let reading = sim.read().unwrap();
        assert!((reading.temperature - ROOM_TEMPERATURE).abs() < 0.1);
        assert_eq!(reading.temperature_setpoint, Some(ROOM_TEMPERATURE));
        sim.disconnect();
        assert!(sim.read().is_err());
    }

    #[test]
    fn test_ramps_towards_setpoint() {
        let mut sim = SimulatedController::new()
            .with_temperature(100.0)
            .with_ramp_rate(1.0);
        sim.connect().unwrap();
        sim.set_setpoint(90.0).unwrap();

        // Cooling: heater off, valve open
        assert_eq!(sim.heater_percent(), 0.0);
        assert!(sim.flow_percent() > 25.0);

        sim.step(120.0);
        assert!((sim.temperature() - 98.0).abs() < 1e-9);

        // Never overshoots
        sim.step(3600.0);
        assert_eq!(sim.temperature(), 90.0);
    }

    #[test]
    fn test_setpoint_validation() {
        let mut sim = SimulatedController::new();
        assert!(sim.set_setpoint(77.0).is_err());

        sim.connect().unwrap();
        assert!(sim.set_setpoint(3.5).is_err());
        assert!(sim.set_setpoint(300.0).is_err());
        assert!(sim.set_setpoint(4.2).is_ok());
        assert_eq!(sim.setpoint(), 4.2);
    }

    #[test]
    fn test_percentages_in_range() {
        let mut sim = SimulatedController::new().with_temperature(10.0);
        sim.connect().unwrap();
        for sp in [4.0, 50.0, 299.0] {
            sim.set_setpoint(sp).unwrap();
            let reading = sim.read().unwrap();
            assert!((0.0..=100.0).contains(&reading.heater_percent));
            assert!((0.0..=100.0).contains(&reading.flow_percent));
            let volt = reading.heater_volt.unwrap();
            assert!((0.0..=DEFAULT_HEATER_VOLTAGE_LIMIT).contains(&volt));
        }
    }

    #[test]
    fn test_noise_is_bounded() {
        let mut sim = SimulatedController::new().with_temperature(50.0).with_noise(0.1);
        sim.connect().unwrap();
        for _ in 0..100 {
            let t = sim.read().unwrap().temperature;
            assert!((t - 50.0).abs() <= 0.1 + 1e-6);
        }
    }
}
