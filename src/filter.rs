// filter.rs

/// Samples averaged per water-level reading.
pub const WATER_WINDOW: usize = 10;

/// Full-scale raw reading of the water sensor ADC (10-bit).
pub const ADC_FULL_SCALE: f32 = 1023.0;

/// Moving-average filter over the last [`WATER_WINDOW`] raw ADC samples.
///
/// The running total is maintained incrementally: the slot being
/// overwritten is subtracted before the new sample is added, so
/// `total == Σ readings[i]` holds after every push. The average always
/// divides by the fixed capacity; the zero-initialized slots of a
/// not-yet-full window count toward it.
#[derive(Debug)]
pub struct WaterFilter {
    readings: [u16; WATER_WINDOW],
    index: usize,
    total: u32,
}

impl WaterFilter {
    pub fn new() -> Self {
        WaterFilter {
            readings: [0; WATER_WINDOW],
            index: 0,
            total: 0,
        }
    }

    /// Overwrites the oldest sample with `sample` and returns the new
    /// window average.
    pub fn push(&mut self, sample: u16) -> u16 {
        self.total -= self.readings[self.index] as u32;
        self.readings[self.index] = sample;
        self.total += sample as u32;
        self.index = (self.index + 1) % WATER_WINDOW;
        self.average()
    }

    pub fn average(&self) -> u16 {
        (self.total / WATER_WINDOW as u32) as u16
    }
}

impl Default for WaterFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rescales an averaged raw reading to a percentage of full scale.
/// Not clamped: a reading above full scale yields more than 100%.
pub fn water_percent(average: u16) -> f32 {
    (average as f32 / ADC_FULL_SCALE) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_total_matches_window_after_wraparound() {
        let mut f = WaterFilter::new();
        let samples: Vec<u16> = (1..=25).map(|i| i * 37).collect();
        for &s in &samples {
            f.push(s);
        }
        let expect: u32 = samples[samples.len() - WATER_WINDOW..]
            .iter()
            .map(|&s| s as u32)
            .sum();
        assert_eq!(f.total, expect);
        assert_eq!(f.average(), (expect / WATER_WINDOW as u32) as u16);
    }

    #[test]
    fn partial_window_divides_by_capacity() {
        let mut f = WaterFilter::new();
        let mut avg = 0;
        for _ in 0..5 {
            avg = f.push(1023);
        }
        // 5 * 1023 / 10, empty slots count as zero
        assert_eq!(avg, 511);
    }

    #[test]
    fn push_returns_same_value_as_average() {
        let mut f = WaterFilter::new();
        for s in [3, 900, 1023, 0, 512] {
            let a = f.push(s);
            assert_eq!(a, f.average());
        }
    }

    #[test]
    fn percent_endpoints_format_to_two_decimals() {
        assert_eq!(format!("{:.2}", water_percent(1023)), "100.00");
        assert_eq!(format!("{:.2}", water_percent(0)), "0.00");
    }

    #[test]
    fn percent_is_not_clamped() {
        // a 12-bit reading sneaking in pushes the percentage past 100
        assert!(water_percent(2046) > 199.0);
    }
}

// EOF
