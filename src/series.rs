//! Rolling sample windows for the live plots.
//!
//! Each channel keeps a fixed-capacity window that starts full of zeros, so
//! the plotted length never changes; new samples push the oldest out.
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_RESAMPLE_FACTOR: usize = 4;
pub const DEFAULT_FORECAST_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct RollingSeries {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingSeries {
    /// Window of `capacity` zeros.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn append(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Refill with zeros.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.samples.extend(std::iter::repeat(0.0).take(self.capacity));
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Linearly interpolated `(x, y)` points, `len * factor` of them, spread
    /// evenly from the first to the last sample index.
    ///
    /// With a single sample the point is repeated.
    pub fn resample(&self, factor: usize) -> Vec<(f64, f64)> {
        let n = self.samples.len();
        let count = n * factor.max(1);
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![(0.0, self.samples[0]); count];
        }
        let span = (n - 1) as f64;
        (0..count)
            .map(|i| {
                let x = if count == 1 {
                    0.0
                } else {
                    span * i as f64 / (count - 1) as f64
                };
                let lo = (x.floor() as usize).min(n - 1);
                let hi = (lo + 1).min(n - 1);
                let frac = x - lo as f64;
                let y = self.samples[lo] + (self.samples[hi] - self.samples[lo]) * frac;
                (x, y)
            })
            .collect()
    }

    /// One-step linear trend over the last `window` samples.
    ///
    /// Fits ordinary least squares against sample index and evaluates one
    /// index past the end. Returns the last sample (or 0.0 when empty) if
    /// fewer than two samples are available or they are all equal. Poor on
    /// non-linear signals.
    pub fn forecast_next(&self, window: usize) -> f64 {
        let n = self.samples.len();
        let take = window.min(n);
        let slice: Vec<f64> = self.samples.iter().skip(n - take).copied().collect();
        let last = slice.last().copied().unwrap_or(0.0);
        if slice.len() < 2 || slice.iter().all(|v| *v == slice[0]) {
            return last;
        }
        let len = slice.len() as f64;
        let mean_x = (len - 1.0) / 2.0;
        let mean_y = slice.iter().sum::<f64>() / len;
        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (i, y) in slice.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxy += dx * (y - mean_y);
            sxx += dx * dx;
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        intercept + slope * len
    }
}

/// One rolling window per plotted channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorHistory {
    pub temperature: RollingSeries,
    pub humidity: RollingSeries,
    pub moisture: RollingSeries,
}

/// Next-step forecasts for each channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
}

impl SensorHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            temperature: RollingSeries::new(capacity),
            humidity: RollingSeries::new(capacity),
            moisture: RollingSeries::new(capacity),
        }
    }

    pub fn record(&mut self, temperature: f64, humidity: f64, moisture: f64) {
        self.temperature.append(temperature);
        self.humidity.append(humidity);
        self.moisture.append(moisture);
    }

    pub fn clear(&mut self) {
        self.temperature.clear();
        self.humidity.clear();
        self.moisture.clear();
    }

    pub fn forecast(&self, window: usize) -> Forecast {
        Forecast {
            temperature: self.temperature.forecast_next(window),
            humidity: self.humidity.forecast_next(window),
            moisture: self.moisture.forecast_next(window),
        }
    }
}
