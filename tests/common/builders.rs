//! Test data builders

use thermovis_rs::Sample;

/// Builder for a series of samples taken at a fixed interval
pub struct HistoryBuilder {
    start: f64,
    interval_secs: f64,
    samples: Vec<Sample>,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self {
            start: 0.0,
            interval_secs: 1.0,
            samples: Vec::new(),
        }
    }

    pub fn start_at(mut self, timestamp: f64) -> Self {
        self.start = timestamp;
        self
    }

    pub fn every(mut self, interval_secs: f64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    /// Append one sample at the next timestamp
    pub fn sample(mut self, temperature: f64, heater_percent: f64, flow_percent: f64) -> Self {
        let t = self.start + self.samples.len() as f64 * self.interval_secs;
        self.samples
            .push(Sample::new(t, temperature, heater_percent, flow_percent));
        self
    }

    /// Append `count` samples with a linear temperature ramp
    pub fn ramp(mut self, count: usize, from: f64, to: f64) -> Self {
        for i in 0..count {
            let frac = if count > 1 {
                i as f64 / (count - 1) as f64
            } else {
                0.0
            };
            self = self.sample(from + (to - from) * frac, 50.0 * frac, 100.0 * (1.0 - frac));
        }
        self
    }

    pub fn build(self) -> Vec<Sample> {
        self.samples
    }
}

impl Default for HistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_builder() {
        let samples = HistoryBuilder::new()
            .start_at(100.0)
            .every(60.0)
            .sample(10.0, 0.0, 0.0)
            .sample(20.0, 50.0, 50.0)
            .build();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].timestamp, 160.0);
        assert_eq!(samples[1].heater_percent, 50.0);
    }
}
